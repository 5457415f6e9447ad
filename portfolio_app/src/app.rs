use std::borrow::Cow;
use std::sync::Arc;

use tracing::{error, info, warn};

use core_entities::app_config::AppConfig;
use metrics_engine::{PortfolioOverview, PortfolioStatistics};
use portfolio_engine::{
    DatabaseConfig, PortfolioEngine, PortfolioEngineBuilder, PortfolioEngineError, PriceCache,
    SqlitePortfolioRepository,
};

use crate::error::AppError;
use crate::error_log::ErrorLog;

/// 应用程序服务
pub struct AppServices {
    /// 投资组合引擎实例
    pub engine: Arc<PortfolioEngine>,
    /// 报价缓存，外部行情抓取写入此处
    pub price_cache: Arc<PriceCache>,
    /// 失败操作记录
    pub error_log: Arc<ErrorLog>,
}

/// 一次重算周期的结果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub recalculated: usize,
    pub prices_updated: usize,
    pub overview: PortfolioOverview,
    pub statistics: PortfolioStatistics,
}

/// 应用程序主入口，负责管理服务的生命周期
pub struct App {
    /// 应用配置
    config: AppConfig,
    /// 已初始化的服务
    services: Option<AppServices>,
}

impl App {
    /// 创建新的应用程序实例
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            services: None,
        }
    }

    /// 初始化所有服务
    pub async fn initialize_services(&mut self) -> Result<(), AppError> {
        info!("开始初始化应用服务");

        let database_config = DatabaseConfig {
            database_url: Cow::Owned(self.config.database.database_url.to_string()),
            max_connections: self.config.database.max_connections,
            connect_timeout_secs: self.config.database.connect_timeout_secs,
        };

        // 1. 连接数据库并建表
        let repository = SqlitePortfolioRepository::connect(database_config)
            .await
            .map_err(|e| AppError::application_with_source("创建SQLite仓库失败".to_string(), e))?;
        info!("SQLite仓库初始化完成");

        // 2. 报价缓存
        let price_cache = Arc::new(PriceCache::new(self.config.portfolio.price_stale_after_secs));

        // 3. 创建投资组合引擎
        let engine = PortfolioEngineBuilder::new()
            .with_repository(Arc::new(repository))
            .with_price_feed(price_cache.clone())
            .build()
            .map_err(|e| AppError::application_with_source("创建投资组合引擎失败".to_string(), e))?;

        let total_capital = engine
            .load_capital(self.config.portfolio.total_capital)
            .await
            .map_err(|e| AppError::application_with_source("加载总资金失败".to_string(), e))?;
        info!("投资组合引擎初始化完成，总资金={}", total_capital);

        self.services = Some(AppServices {
            engine: Arc::new(engine),
            price_cache,
            error_log: Arc::new(ErrorLog::new(self.config.portfolio.error_log_capacity)),
        });

        info!("所有服务初始化完成");
        Ok(())
    }

    /// 执行一次完整的重算周期：重算所有项目、刷新现价、汇总
    pub async fn run(&mut self) -> Result<RunReport, AppError> {
        // 确保服务已初始化
        if self.services.is_none() {
            self.initialize_services().await?;
        }
        let services = self.services.as_ref().ok_or(AppError::NotInitialized)?;

        let recalculated = record(
            &services.error_log,
            "recalculate_all",
            services.engine.recalculate_all().await,
        )?
        .len();

        // 行情刷新失败不影响本次汇总
        let prices_updated = match record(
            &services.error_log,
            "refresh_prices",
            services.engine.refresh_prices().await,
        ) {
            Ok(updated) => updated,
            Err(e) => {
                warn!("现价刷新失败，沿用已保存价格: {}", e);
                0
            }
        };

        let overview = record(&services.error_log, "overview", services.engine.overview().await)?;
        let statistics = record(
            &services.error_log,
            "statistics",
            services.engine.statistics().await,
        )?;

        info!(
            "总资金={} 总市值={} 总盈亏={} 闲置资金={}",
            overview.total_capital,
            overview.total_market_value,
            overview.total_profit_loss_amount,
            overview.idle_capital
        );
        info!(
            "项目={} 基金={} 盈利={} 亏损={} 已执行交易={} 计划交易={}",
            statistics.project_count,
            statistics.fund_count,
            statistics.profitable_positions,
            statistics.losing_positions,
            statistics.executed_transactions,
            statistics.planned_transactions
        );

        Ok(RunReport {
            recalculated,
            prices_updated,
            overview,
            statistics,
        })
    }

    /// 获取服务引用（用于测试或外部访问）
    pub fn services(&self) -> Option<&AppServices> {
        self.services.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// 失败时写入错误日志后继续向上传播
fn record<T>(
    error_log: &ErrorLog,
    context: &str,
    result: Result<T, PortfolioEngineError>,
) -> Result<T, AppError> {
    result.map_err(|e| {
        error!("{} 失败: {}", context, e);
        error_log.record(context, e.to_string());
        AppError::Engine(e)
    })
}
