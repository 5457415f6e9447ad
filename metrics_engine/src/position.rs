//! 持仓指标重算
//!
//! 持仓是已执行交易、现价、总资金三者的纯函数，每次都从头折叠，
//! 不保留任何累加器状态。做多与空头平仓增加净敞口，做空与多头平仓减少净敞口，
//! 多空合并为单一净持仓。

use rust_decimal::Decimal;

use core_entities::{Position, Transaction};

use crate::guard::{percent, product, ratio};

/// 折叠已执行交易，返回 (净股数, 累计成本)
///
/// 股数在 i128 中精确累加，成本按流入、流出分别累加（均为非负和），
/// 最后各做一次截断，因此结果与交易顺序无关。
pub fn fold_executed<'a, I>(transactions: I) -> (i64, Decimal)
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut shares = 0i128;
    let mut inflow = Decimal::ZERO;
    let mut outflow = Decimal::ZERO;

    for txn in transactions {
        let delta = i128::from(txn.shares);
        let cash = if txn.direction.adds_exposure() {
            shares += delta;
            txn.cash_amount
        } else {
            shares -= delta;
            -txn.cash_amount
        };
        if cash.is_sign_negative() {
            outflow = outflow.saturating_add(cash.abs());
        } else {
            inflow = inflow.saturating_add(cash);
        }
    }

    let share_count = i64::try_from(shares).unwrap_or(if shares > 0 { i64::MAX } else { i64::MIN });
    (share_count, inflow.saturating_sub(outflow))
}

/// 由净股数与累计成本推导全部持仓指标
pub fn derive_position(
    share_count: i64,
    cost_basis_total: Decimal,
    current_price: Decimal,
    total_capital: Decimal,
) -> Position {
    let shares = Decimal::from(share_count);

    let cost_basis_per_share = if share_count > 0 {
        ratio(cost_basis_total, shares)
    } else {
        Decimal::ZERO
    };
    let market_value = product(shares, current_price);
    let profit_loss_amount = market_value
        .checked_sub(cost_basis_total)
        .unwrap_or(Decimal::ZERO);

    Position {
        share_count,
        cost_basis_total,
        cost_basis_per_share,
        market_value,
        profit_loss_amount,
        profit_loss_percent: percent(profit_loss_amount, cost_basis_total),
        allocation_percent: percent(market_value, total_capital),
        capital_profit_loss_percent: percent(profit_loss_amount, total_capital),
    }
}

/// 根据已执行交易重算持仓
///
/// 调用方只能传入属于同一持仓且状态为已执行的交易；
/// 该前置条件只在 debug 构建中断言。
pub fn recalculate_position(
    transactions: &[Transaction],
    current_price: Decimal,
    total_capital: Decimal,
) -> Position {
    debug_assert!(
        transactions.iter().all(Transaction::is_executed),
        "recalculate_position expects executed transactions only"
    );
    let (share_count, cost_basis_total) = fold_executed(transactions);
    derive_position(share_count, cost_basis_total, current_price, total_capital)
}

/// 从完整交易历史（含计划交易）重算持仓，只折叠已执行交易
pub fn recalculate_from_history(
    transactions: &[Transaction],
    current_price: Decimal,
    total_capital: Decimal,
) -> Position {
    let (share_count, cost_basis_total) =
        fold_executed(transactions.iter().filter(|txn| txn.is_executed()));
    derive_position(share_count, cost_basis_total, current_price, total_capital)
}
