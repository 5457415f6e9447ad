//! 组合总览与统计
//!
//! 汇总所有项目持仓与基金持仓，比例一律以单一总资金为分母。

use std::cmp::Ordering;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_entities::{FundHolding, Position, Project, Transaction};

use crate::fund::{FundMetrics, calculate_fund_metrics};
use crate::guard::percent;

/// 总览中的项目行
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub project_id: Arc<str>,
    pub name: Arc<str>,
    pub symbol: Arc<str>,
    pub current_price: Decimal,
    pub position: Position,
}

/// 总览中的基金行
#[derive(Debug, Clone, PartialEq)]
pub struct FundSummary {
    pub fund_id: Arc<str>,
    pub name: Arc<str>,
    pub code: Arc<str>,
    pub nav: Decimal,
    pub metrics: FundMetrics,
}

/// 组合总览
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioOverview {
    /// 总资金
    pub total_capital: Decimal,
    /// 总市值（项目 + 基金）
    pub total_market_value: Decimal,
    /// 总成本（项目累计成本 + 基金投入）
    pub total_cost_basis: Decimal,
    /// 总盈亏
    pub total_profit_loss_amount: Decimal,
    /// 总盈亏比例（相对总成本）
    pub total_profit_loss_percent: Decimal,
    /// 总仓位占比
    pub total_allocation_percent: Decimal,
    /// 盈亏占总资金比例
    pub capital_profit_loss_percent: Decimal,
    /// 闲置资金 = 总资金 − 总市值，超配时为负
    pub idle_capital: Decimal,
    pub projects: Vec<ProjectSummary>,
    pub funds: Vec<FundSummary>,
}

/// 组合统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortfolioStatistics {
    pub project_count: usize,
    pub fund_count: usize,
    pub profitable_positions: usize,
    pub losing_positions: usize,
    pub flat_positions: usize,
    pub net_long_positions: usize,
    pub net_short_positions: usize,
    pub executed_transactions: usize,
    pub planned_transactions: usize,
}

/// 构建组合总览，项目持仓需已按当前总资金重算
pub fn build_overview(
    projects: &[Project],
    funds: &[FundHolding],
    total_capital: Decimal,
) -> PortfolioOverview {
    let project_rows: Vec<ProjectSummary> = projects
        .iter()
        .map(|project| ProjectSummary {
            project_id: Arc::clone(&project.project_id),
            name: Arc::clone(&project.name),
            symbol: Arc::clone(&project.symbol),
            current_price: project.current_price,
            position: project.position,
        })
        .collect();

    let fund_rows: Vec<FundSummary> = funds
        .iter()
        .map(|fund| FundSummary {
            fund_id: Arc::clone(&fund.fund_id),
            name: Arc::clone(&fund.name),
            code: Arc::clone(&fund.code),
            nav: fund.nav,
            metrics: calculate_fund_metrics(fund, total_capital),
        })
        .collect();

    let mut total_market_value = Decimal::ZERO;
    let mut total_cost_basis = Decimal::ZERO;
    for row in &project_rows {
        total_market_value = total_market_value.saturating_add(row.position.market_value);
        total_cost_basis = total_cost_basis.saturating_add(row.position.cost_basis_total);
    }
    for (row, fund) in fund_rows.iter().zip(funds) {
        total_market_value = total_market_value.saturating_add(row.metrics.market_value);
        total_cost_basis = total_cost_basis.saturating_add(fund.cost_amount);
    }

    let total_profit_loss_amount = total_market_value.saturating_sub(total_cost_basis);
    let idle_capital = if total_capital > Decimal::ZERO {
        total_capital.saturating_sub(total_market_value)
    } else {
        Decimal::ZERO
    };

    PortfolioOverview {
        total_capital,
        total_market_value,
        total_cost_basis,
        total_profit_loss_amount,
        total_profit_loss_percent: percent(total_profit_loss_amount, total_cost_basis),
        total_allocation_percent: percent(total_market_value, total_capital),
        capital_profit_loss_percent: percent(total_profit_loss_amount, total_capital),
        idle_capital,
        projects: project_rows,
        funds: fund_rows,
    }
}

/// 构建组合统计
pub fn build_statistics(
    projects: &[Project],
    funds: &[FundHolding],
    transactions: &[Transaction],
) -> PortfolioStatistics {
    let mut stats = PortfolioStatistics {
        project_count: projects.len(),
        fund_count: funds.len(),
        ..PortfolioStatistics::default()
    };

    for project in projects {
        let position = &project.position;
        match position.profit_loss_amount.cmp(&Decimal::ZERO) {
            Ordering::Greater => stats.profitable_positions += 1,
            Ordering::Less => stats.losing_positions += 1,
            Ordering::Equal => stats.flat_positions += 1,
        }
        match position.share_count.cmp(&0) {
            Ordering::Greater => stats.net_long_positions += 1,
            Ordering::Less => stats.net_short_positions += 1,
            Ordering::Equal => {}
        }
    }

    for txn in transactions {
        if txn.is_executed() {
            stats.executed_transactions += 1;
        } else {
            stats.planned_transactions += 1;
        }
    }

    stats
}
