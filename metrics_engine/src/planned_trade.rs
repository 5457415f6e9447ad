//! 计划交易字段求解
//!
//! 每次只编辑一个字段（枢轴），其余字段由枢轴推导，不做多字段联立求解。
//! 现价由调用方在编辑时传入，不存放在计划交易中。

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use core_entities::{FieldEdit, PlannedTrade, WarningDirection};

use crate::guard::{HUNDRED, percent, product, ratio};

/// 触发价与现价的距离（百分比），向下时取反
///
/// 只对现价做零值保护；触发价为 0 时向下距离为 100，向上为 -100，
/// 与 [`trigger_price_from_distance`] 互为反函数。
pub fn distance_percent(
    trigger_price: Decimal,
    current_price: Decimal,
    warning_direction: WarningDirection,
) -> Decimal {
    let gap = trigger_price
        .checked_sub(current_price)
        .unwrap_or(Decimal::ZERO);
    product(percent(gap, current_price), warning_direction.sign())
}

/// 由距离反推触发价：现价 × (1 + 符号 × 距离/100)
pub fn trigger_price_from_distance(
    distance_percent: Decimal,
    current_price: Decimal,
    warning_direction: WarningDirection,
) -> Decimal {
    if current_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let offset = product(warning_direction.sign(), ratio(distance_percent, HUNDRED));
    let factor = Decimal::ONE.checked_add(offset).unwrap_or(Decimal::ZERO);
    product(current_price, factor)
}

/// 金额 = 股数 × 触发价
pub fn cash_from_shares(shares: u64, trigger_price: Decimal) -> Decimal {
    if trigger_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    product(Decimal::from(shares), trigger_price)
}

/// 仓位占比 = 金额 / 总资金 × 100
pub fn allocation_from_cash(cash_amount: Decimal, total_capital: Decimal) -> Decimal {
    percent(cash_amount, total_capital)
}

/// 金额 = 仓位占比 / 100 × 总资金
pub fn cash_from_allocation(allocation_percent: Decimal, total_capital: Decimal) -> Decimal {
    if total_capital <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    product(ratio(allocation_percent, HUNDRED), total_capital)
}

/// 仓位占比路径：股数向下取整
pub fn shares_from_allocation(
    allocation_percent: Decimal,
    total_capital: Decimal,
    trigger_price: Decimal,
) -> u64 {
    let cash = cash_from_allocation(allocation_percent, total_capital);
    whole_shares(ratio(cash, trigger_price).floor())
}

/// 金额路径：股数四舍五入
pub fn shares_from_cash(cash_amount: Decimal, trigger_price: Decimal) -> u64 {
    whole_shares(
        ratio(cash_amount, trigger_price)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
    )
}

fn whole_shares(value: Decimal) -> u64 {
    value.to_u64().unwrap_or(0)
}

/// 对计划交易应用一次单字段编辑
///
/// | 编辑字段 | 重算字段 |
/// |---|---|
/// | 预警方向 | 距离 |
/// | 距离 | 触发价 |
/// | 触发价 | 距离、金额、仓位占比 |
/// | 股数 | 金额、仓位占比 |
/// | 仓位占比 | 金额、股数（向下取整） |
/// | 金额 | 股数（四舍五入）、仓位占比 |
pub fn apply_edit(
    trade: PlannedTrade,
    edit: FieldEdit,
    current_price: Decimal,
    total_capital: Decimal,
) -> PlannedTrade {
    let mut next = trade;
    next.last_edited = Some(edit.field());

    match edit {
        FieldEdit::WarningDirection(direction) => {
            next.warning_direction = direction;
            next.distance_percent = distance_percent(next.trigger_price, current_price, direction);
        }
        FieldEdit::DistancePercent(distance) => {
            next.distance_percent = distance;
            next.trigger_price =
                trigger_price_from_distance(distance, current_price, next.warning_direction);
        }
        FieldEdit::TriggerPrice(price) => {
            next.trigger_price = price;
            next.distance_percent = distance_percent(price, current_price, next.warning_direction);
            next.cash_amount = cash_from_shares(next.shares, price);
            next.allocation_percent = allocation_from_cash(next.cash_amount, total_capital);
        }
        FieldEdit::Shares(shares) => {
            next.shares = shares;
            next.cash_amount = cash_from_shares(shares, next.trigger_price);
            next.allocation_percent = allocation_from_cash(next.cash_amount, total_capital);
        }
        FieldEdit::AllocationPercent(allocation) => {
            next.allocation_percent = allocation;
            next.cash_amount = cash_from_allocation(allocation, total_capital);
            next.shares = shares_from_allocation(allocation, total_capital, next.trigger_price);
        }
        FieldEdit::CashAmount(cash) => {
            next.cash_amount = cash;
            next.shares = shares_from_cash(cash, next.trigger_price);
            next.allocation_percent = allocation_from_cash(cash, total_capital);
        }
    }

    next
}
