//! 统一配置管理模块
//!
//! 提供通过配置文件（YAML）管理所有子模块配置的功能

use std::sync::{Arc, LazyLock};

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

// 静态默认值常量
pub const DEFAULT_DATABASE_URL: &str = "sqlite://portfolio.db?mode=rwc";
pub const DEFAULT_LOG_FILE_PATH: &str = "logs/app.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";

static DEFAULT_DATABASE_URL_ARC: LazyLock<Arc<str>> = LazyLock::new(|| DEFAULT_DATABASE_URL.into());
static DEFAULT_LOG_FILE_PATH_ARC: LazyLock<Arc<str>> = LazyLock::new(|| DEFAULT_LOG_FILE_PATH.into());
static DEFAULT_LOG_LEVEL_ARC: LazyLock<Arc<str>> = LazyLock::new(|| DEFAULT_LOG_LEVEL.into());

fn deserialize_arc_str<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.into())
}

/// 应用程序统一配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,
    /// 投资组合配置
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

// 默认值函数
fn default_database_url() -> Arc<str> {
    DEFAULT_DATABASE_URL_ARC.clone()
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_total_capital() -> Decimal {
    Decimal::from(100_000)
}

fn default_price_stale_after_secs() -> u64 {
    300
}

fn default_error_log_capacity() -> usize {
    200
}

fn default_log_level() -> Arc<str> {
    DEFAULT_LOG_LEVEL_ARC.clone()
}

fn default_log_file_path() -> Arc<str> {
    DEFAULT_LOG_FILE_PATH_ARC.clone()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接URL
    #[serde(default = "default_database_url", deserialize_with = "deserialize_arc_str")]
    pub database_url: Arc<str>,
    /// 最大连接数
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_db_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// 投资组合配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConfig {
    /// 首次启动时的总资金（之后以数据库中的值为准）
    #[serde(default = "default_total_capital")]
    pub total_capital: Decimal,
    /// 行情缓存过期时间（秒）
    #[serde(default = "default_price_stale_after_secs")]
    pub price_stale_after_secs: u64,
    /// 错误日志保留条数
    #[serde(default = "default_error_log_capacity")]
    pub error_log_capacity: usize,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            total_capital: default_total_capital(),
            price_stale_after_secs: default_price_stale_after_secs(),
            error_log_capacity: default_error_log_capacity(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level", deserialize_with = "deserialize_arc_str")]
    pub level: Arc<str>,
    /// 是否输出到控制台
    #[serde(default = "default_true")]
    pub console: bool,
    /// 是否输出到文件
    #[serde(default = "default_false")]
    pub file: bool,
    /// 日志文件路径
    #[serde(default = "default_log_file_path", deserialize_with = "deserialize_arc_str")]
    pub file_path: Arc<str>,
    /// 是否启用 JSON 格式
    #[serde(default = "default_false")]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: true,
            file: false,
            file_path: default_log_file_path(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// 从配置文件加载配置
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("PORTFOLIO").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// 从默认位置加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let possible_paths = [
            "config.yml",
            "config.yaml",
            "config/app.yml",
            "config/app.yaml",
        ];

        for path in &possible_paths {
            if std::path::Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // 没有配置文件时使用默认配置
        Ok(Self::default())
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.database.database_url.as_ref(), DEFAULT_DATABASE_URL);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.portfolio.total_capital, dec!(100000));
        assert_eq!(config.portfolio.price_stale_after_secs, 300);
        assert_eq!(config.logging.level.as_ref(), "info");
        assert!(config.logging.console);
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();

        assert!(yaml.contains("database:"));
        assert!(yaml.contains("portfolio:"));
        assert!(yaml.contains("logging:"));

        let deserialized: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(deserialized.database.database_url.as_ref(), config.database.database_url.as_ref());
        assert_eq!(deserialized.portfolio.total_capital, config.portfolio.total_capital);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "portfolio:\n  error_log_capacity: 16\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.portfolio.error_log_capacity, 16);
        assert_eq!(config.portfolio.price_stale_after_secs, 300);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = AppConfig::default();
        config.database.database_url = "sqlite::memory:".into();
        config.logging.level = "debug".into();

        let temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        let file_path = temp_file.path().to_str().unwrap();

        config.save_to_file(file_path).unwrap();

        // 直接从YAML文件加载，不使用环境变量
        let settings = Config::builder()
            .add_source(File::with_name(file_path))
            .build()
            .unwrap();
        let loaded_config: AppConfig = settings.try_deserialize().unwrap();

        assert_eq!(loaded_config.database.database_url.as_ref(), "sqlite::memory:");
        assert_eq!(loaded_config.logging.level.as_ref(), "debug");
        assert_eq!(loaded_config.portfolio.total_capital, dec!(100000));
    }
}
