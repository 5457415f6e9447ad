//! # 投资组合引擎 (Portfolio Engine)
//!
//! 负责项目、交易、基金的持久化与持仓重算的编排。
//!
//! ## 功能特性
//!
//! - **持久化**: 基于 sqlx 的 SQLite 存储
//! - **项目锁**: 同一项目的"修改 → 重算 → 持久化"串行执行
//! - **总资金**: 全局资金池，修改后重算全部项目
//! - **行情缓存**: 带过期时间的报价缓存，驱动现价刷新
//!
//! ## 模块结构
//!
//! ```text
//! portfolio_engine/
//! ├── capital.rs      - 总资金句柄
//! ├── database.rs     - 存储接口与 SQLite 实现
//! ├── engine.rs       - 引擎与构建器
//! ├── errors.rs       - 错误类型
//! ├── price_feed.rs   - 行情源接口与报价缓存
//! └── lib.rs          - 模块入口和重导出
//! ```

pub mod capital;
pub mod database;
pub mod engine;
pub mod errors;
pub mod price_feed;

pub use capital::CapitalBase;
pub use database::{DatabaseConfig, DatabaseError, PortfolioRepository, SqlitePortfolioRepository};
pub use engine::{NewTransaction, PortfolioEngine, PortfolioEngineBuilder, TransactionUpdate};
pub use errors::{PortfolioEngineError, PortfolioEngineResult};
pub use price_feed::{PriceCache, PriceFeed, Quote};

// 重新导出常用类型
pub use metrics_engine::{
    FieldEdit, FundHolding, PlannedTrade, PortfolioOverview, PortfolioStatistics, Project,
    TradeDirection, Transaction, TransactionStatus, WarningDirection,
};
