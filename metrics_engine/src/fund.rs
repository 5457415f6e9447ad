//! 基金持仓指标

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_entities::FundHolding;

use crate::guard::{percent, product};

/// 基金衍生指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FundMetrics {
    /// 市值 = 份额 × 单位净值
    pub market_value: Decimal,
    /// 盈亏金额
    pub profit_loss_amount: Decimal,
    /// 盈亏比例（相对投入成本）
    pub profit_loss_percent: Decimal,
    /// 仓位占比（相对总资金）
    pub allocation_percent: Decimal,
    /// 盈亏占总资金比例
    pub capital_profit_loss_percent: Decimal,
}

pub fn calculate_fund_metrics(fund: &FundHolding, total_capital: Decimal) -> FundMetrics {
    let market_value = product(fund.units, fund.nav);
    let profit_loss_amount = market_value
        .checked_sub(fund.cost_amount)
        .unwrap_or(Decimal::ZERO);

    FundMetrics {
        market_value,
        profit_loss_amount,
        profit_loss_percent: percent(profit_loss_amount, fund.cost_amount),
        allocation_percent: percent(market_value, total_capital),
        capital_profit_loss_percent: percent(profit_loss_amount, total_capital),
    }
}
