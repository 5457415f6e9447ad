pub mod app;
pub mod error;
pub mod error_log;

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use core_entities::app_config::LoggingConfig;

// Re-export key components
pub use app::{App, AppServices, RunReport};
pub use core_entities::app_config::AppConfig;
pub use error::AppError;
pub use error_log::{ErrorEntry, ErrorLog};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 按日志配置初始化 tracing，RUST_LOG 优先于配置中的级别
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&*config.level))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.console {
        let layer = fmt::layer().with_writer(std::io::stdout);
        layers.push(if config.json_format {
            layer.json().boxed()
        } else {
            layer.boxed()
        });
    }

    if config.file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&*config.file_path)?;
        let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
        layers.push(if config.json_format {
            layer.json().boxed()
        } else {
            layer.boxed()
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;
    Ok(())
}
