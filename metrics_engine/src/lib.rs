//! # 持仓指标引擎 (Metrics Engine)
//!
//! 纯计算模块：根据已执行交易、现价和总资金重算持仓指标，
//! 并为计划交易求解触发价、距离、股数、金额和仓位占比。
//!
//! ## 功能特性
//!
//! - **持仓重算**: 成本、股数、市值、盈亏、仓位占比，整体重算
//! - **计划交易求解**: 单字段编辑驱动其余字段重算
//! - **基金指标**: 份额 × 净值的市值与盈亏
//! - **总览统计**: 汇总所有项目与基金
//!
//! 所有比率在分母 ≤ 0 时返回 0，任何输入都不会 panic。
//!
//! ## 模块结构
//!
//! ```text
//! metrics_engine/
//! ├── guard.rs          - 零值保护的算术工具
//! ├── position.rs       - 持仓指标重算
//! ├── planned_trade.rs  - 计划交易字段求解
//! ├── fund.rs           - 基金指标
//! ├── overview.rs       - 组合总览与统计
//! └── lib.rs            - 模块入口和重导出
//! ```

mod guard;
pub mod position;
pub mod planned_trade;
pub mod fund;
pub mod overview;

pub use position::{derive_position, fold_executed, recalculate_from_history, recalculate_position};
pub use planned_trade::{
    allocation_from_cash, apply_edit, cash_from_allocation, cash_from_shares, distance_percent,
    shares_from_allocation, shares_from_cash, trigger_price_from_distance,
};
pub use fund::{FundMetrics, calculate_fund_metrics};
pub use overview::{
    FundSummary, PortfolioOverview, PortfolioStatistics, ProjectSummary, build_overview,
    build_statistics,
};

// 重新导出核心实体类型
pub use core_entities::{
    EditableField, FieldEdit, FundHolding, PlannedTrade, Position, Project, TradeDirection,
    Transaction, TransactionStatus, WarningDirection,
};
