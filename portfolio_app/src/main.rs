use portfolio_app::{App, AppConfig, init_tracing};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载配置
    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // 初始化日志
    init_tracing(&config.logging)?;

    match load_error {
        None => info!("成功加载配置文件"),
        Some(e) => warn!("加载配置文件失败，使用默认配置: {}", e),
    }

    info!("启动投资组合指标重算");
    info!(
        "配置信息: 数据库URL={}, 初始总资金={}",
        config.database.database_url, config.portfolio.total_capital
    );

    // 创建应用程序实例
    let mut app = App::new(config);

    // 初始化服务
    app.initialize_services().await?;

    info!("服务初始化完成，开始重算");
    match app.run().await {
        Ok(report) => {
            info!(
                "重算完成: 项目={} 现价更新={}",
                report.recalculated, report.prices_updated
            );
        }
        Err(e) => {
            error!("重算出错: {}", e);
            return Err(e.into());
        }
    }

    info!("正常退出");
    Ok(())
}
