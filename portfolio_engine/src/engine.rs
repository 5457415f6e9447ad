//! 投资组合引擎核心实现
//!
//! 所有写操作都在项目锁内完成"修改 → 重算 → 持久化"，
//! 同一项目的并发写入因此串行化，不同项目之间互不阻塞。

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use core_entities::{
    FieldEdit, FundHolding, PlannedTrade, Project, Timestamp, TradeDirection, Transaction,
    TransactionStatus,
};
use metrics_engine::{
    PortfolioOverview, PortfolioStatistics, apply_edit, build_overview, build_statistics,
    cash_from_shares, recalculate_from_history,
};

use crate::capital::CapitalBase;
use crate::database::PortfolioRepository;
use crate::errors::{PortfolioEngineError, PortfolioEngineResult};
use crate::price_feed::{PriceCache, PriceFeed};

/// 新增交易请求
#[derive(Debug, Clone)]
pub enum NewTransaction {
    /// 已执行的交易，未给出执行时间时取当前时间
    Executed {
        direction: TradeDirection,
        shares: u64,
        cash_amount: Decimal,
        executed_at: Option<Timestamp>,
    },
    /// 计划交易
    Planned {
        direction: TradeDirection,
        plan: PlannedTrade,
    },
}

/// 交易修改请求，None 表示保持原值
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionUpdate {
    pub direction: Option<TradeDirection>,
    pub shares: Option<u64>,
    pub cash_amount: Option<Decimal>,
    pub status: Option<TransactionStatus>,
}

/// 投资组合引擎
pub struct PortfolioEngine {
    repository: Arc<dyn PortfolioRepository>,
    price_feed: Arc<dyn PriceFeed>,
    capital: CapitalBase,
    /// 项目ID -> 项目锁
    project_locks: DashMap<Arc<str>, Arc<Mutex<()>>>,
}

fn ensure_non_negative(value: Decimal, what: &str) -> PortfolioEngineResult<()> {
    if value < Decimal::ZERO {
        return Err(PortfolioEngineError::invalid_input(format!(
            "{what} 不能为负数: {value}"
        )));
    }
    Ok(())
}

fn ensure_not_blank(value: &str, what: &str) -> PortfolioEngineResult<()> {
    if value.trim().is_empty() {
        return Err(PortfolioEngineError::invalid_input(format!("{what} 不能为空")));
    }
    Ok(())
}

/// 计划交易编辑的输入校验；距离允许为负（触发价在现价另一侧）
fn validate_planned_edit(edit: FieldEdit) -> PortfolioEngineResult<()> {
    match edit {
        FieldEdit::TriggerPrice(price) => ensure_non_negative(price, "触发价"),
        FieldEdit::CashAmount(cash) => ensure_non_negative(cash, "金额"),
        FieldEdit::AllocationPercent(allocation) => ensure_non_negative(allocation, "仓位占比"),
        FieldEdit::WarningDirection(_) | FieldEdit::DistancePercent(_) | FieldEdit::Shares(_) => {
            Ok(())
        }
    }
}

impl PortfolioEngine {
    pub fn new(
        repository: Arc<dyn PortfolioRepository>,
        price_feed: Arc<dyn PriceFeed>,
        capital: CapitalBase,
    ) -> Self {
        Self {
            repository,
            price_feed,
            capital,
            project_locks: DashMap::new(),
        }
    }

    fn project_lock(&self, project_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.project_locks.get(project_id) {
            return Arc::clone(lock.value());
        }
        Arc::clone(self.project_locks.entry(project_id.into()).or_default().value())
    }

    /// 仅为已存在的项目创建锁，未知项目ID不会留下锁条目
    async fn existing_project_lock(
        &self,
        project_id: &str,
    ) -> PortfolioEngineResult<Arc<Mutex<()>>> {
        if let Some(lock) = self.project_locks.get(project_id) {
            return Ok(Arc::clone(lock.value()));
        }
        self.repository.get_project(project_id).await?;
        Ok(self.project_lock(project_id))
    }

    /// 重算并持久化项目持仓，调用方须持有该项目的锁
    async fn recompute_locked(&self, project_id: &str) -> PortfolioEngineResult<Project> {
        let mut project = self.repository.get_project(project_id).await?;
        let transactions = self.repository.list_transactions(project_id).await?;

        project.position = recalculate_from_history(
            &transactions,
            project.current_price,
            self.capital.get(),
        );
        project.updated_at = Utc::now();
        self.repository.update_project(&project).await?;

        debug!(
            "Recomputed project {}: shares={} market_value={}",
            project_id, project.position.share_count, project.position.market_value
        );
        Ok(project)
    }

    // ---- 总资金 ----

    /// 从存储加载总资金，不存在时写入 fallback
    #[instrument(skip(self))]
    pub async fn load_capital(&self, fallback: Decimal) -> PortfolioEngineResult<Decimal> {
        let total_capital = match self.repository.load_total_capital().await? {
            Some(stored) => stored,
            None => {
                ensure_non_negative(fallback, "总资金")?;
                self.repository.save_total_capital(fallback).await?;
                fallback
            }
        };
        self.capital.set(total_capital);
        info!("总资金: {}", total_capital);
        Ok(total_capital)
    }

    pub fn total_capital(&self) -> Decimal {
        self.capital.get()
    }

    /// 修改总资金并重算所有项目
    #[instrument(skip(self))]
    pub async fn set_total_capital(
        &self,
        total_capital: Decimal,
    ) -> PortfolioEngineResult<Vec<Project>> {
        ensure_non_negative(total_capital, "总资金")?;

        self.repository.save_total_capital(total_capital).await?;
        let previous = self.capital.set(total_capital);
        info!("总资金更新: {} -> {}", previous, total_capital);

        self.recalculate_all().await
    }

    // ---- 项目 ----

    #[instrument(skip(self))]
    pub async fn create_project(
        &self,
        name: &str,
        symbol: &str,
        current_price: Decimal,
    ) -> PortfolioEngineResult<Project> {
        ensure_not_blank(name, "项目名称")?;
        ensure_not_blank(symbol, "股票代码")?;
        ensure_non_negative(current_price, "现价")?;

        let sort_order = i64::try_from(self.repository.list_projects().await?.len())
            .unwrap_or(i64::MAX);
        let project = Project::new(
            Uuid::new_v4().to_string(),
            name.trim().to_string(),
            symbol.trim().to_string(),
            current_price,
            sort_order,
            Utc::now(),
        );
        self.repository.insert_project(&project).await?;

        info!("Created project {} ({})", project.project_id, project.symbol);
        Ok(project)
    }

    pub async fn get_project(&self, project_id: &str) -> PortfolioEngineResult<Project> {
        Ok(self.repository.get_project(project_id).await?)
    }

    pub async fn list_projects(&self) -> PortfolioEngineResult<Vec<Project>> {
        Ok(self.repository.list_projects().await?)
    }

    #[instrument(skip(self))]
    pub async fn rename_project(
        &self,
        project_id: &str,
        name: &str,
    ) -> PortfolioEngineResult<Project> {
        ensure_not_blank(name, "项目名称")?;

        let lock = self.existing_project_lock(project_id).await?;
        let _guard = lock.lock().await;

        let mut project = self.repository.get_project(project_id).await?;
        project.name = name.trim().into();
        project.updated_at = Utc::now();
        self.repository.update_project(&project).await?;
        Ok(project)
    }

    /// 按给定顺序重排项目，未列出的项目保持原序号
    #[instrument(skip(self))]
    pub async fn reorder_projects(&self, ordered_ids: &[&str]) -> PortfolioEngineResult<()> {
        for (index, project_id) in ordered_ids.iter().enumerate() {
            let lock = self.existing_project_lock(project_id).await?;
            let _guard = lock.lock().await;

            let mut project = self.repository.get_project(project_id).await?;
            let sort_order = i64::try_from(index).unwrap_or(i64::MAX);
            if project.sort_order != sort_order {
                project.sort_order = sort_order;
                project.updated_at = Utc::now();
                self.repository.update_project(&project).await?;
            }
        }
        Ok(())
    }

    /// 更新现价并重算持仓
    #[instrument(skip(self))]
    pub async fn update_current_price(
        &self,
        project_id: &str,
        current_price: Decimal,
    ) -> PortfolioEngineResult<Project> {
        ensure_non_negative(current_price, "现价")?;

        let lock = self.existing_project_lock(project_id).await?;
        let _guard = lock.lock().await;

        let mut project = self.repository.get_project(project_id).await?;
        project.current_price = current_price;
        self.repository.update_project(&project).await?;

        self.recompute_locked(project_id).await
    }

    /// 删除项目及其全部交易
    #[instrument(skip(self))]
    pub async fn delete_project(&self, project_id: &str) -> PortfolioEngineResult<()> {
        let lock = self.existing_project_lock(project_id).await?;
        {
            let _guard = lock.lock().await;
            self.repository.delete_project(project_id).await?;
        }
        self.project_locks.remove(project_id);

        info!("Deleted project {}", project_id);
        Ok(())
    }

    pub async fn recalculate_project(&self, project_id: &str) -> PortfolioEngineResult<Project> {
        let lock = self.existing_project_lock(project_id).await?;
        let _guard = lock.lock().await;
        self.recompute_locked(project_id).await
    }

    /// 重算所有项目
    #[instrument(skip(self))]
    pub async fn recalculate_all(&self) -> PortfolioEngineResult<Vec<Project>> {
        let projects = self.repository.list_projects().await?;
        let mut recomputed = Vec::with_capacity(projects.len());

        for project in projects {
            recomputed.push(self.recalculate_project(&project.project_id).await?);
        }

        info!("Recalculated {} projects", recomputed.len());
        Ok(recomputed)
    }

    /// 从行情源拉取报价，返回成功更新现价的项目数
    ///
    /// 单个项目更新失败只记录告警，不影响其余项目。
    #[instrument(skip(self))]
    pub async fn refresh_prices(&self) -> PortfolioEngineResult<usize> {
        let projects = self.repository.list_projects().await?;
        let mut updated = 0;

        for project in projects {
            match self.price_feed.latest_price(&project.symbol).await {
                Some(price) if price < Decimal::ZERO => {
                    warn!("忽略 {} 的负报价: {}", project.symbol, price);
                }
                Some(price) if price != project.current_price => {
                    match self.update_current_price(&project.project_id, price).await {
                        Ok(_) => updated += 1,
                        Err(e) => warn!(
                            "更新 {} ({}) 现价失败: {}",
                            project.project_id, project.symbol, e
                        ),
                    }
                }
                Some(_) => {}
                None => debug!("No fresh quote for {}", project.symbol),
            }
        }

        info!("Price refresh updated {} projects", updated);
        Ok(updated)
    }

    // ---- 交易 ----

    #[instrument(skip(self, request))]
    pub async fn add_transaction(
        &self,
        project_id: &str,
        request: NewTransaction,
    ) -> PortfolioEngineResult<Transaction> {
        let transaction_id = Uuid::new_v4().to_string();
        let transaction = match request {
            NewTransaction::Executed {
                direction,
                shares,
                cash_amount,
                executed_at,
            } => {
                ensure_non_negative(cash_amount, "成交金额")?;
                Transaction::new_executed(
                    transaction_id,
                    project_id.to_string(),
                    direction,
                    shares,
                    cash_amount,
                    executed_at.unwrap_or_else(Utc::now),
                )
            }
            NewTransaction::Planned { direction, plan } => {
                ensure_non_negative(plan.trigger_price, "触发价")?;
                ensure_non_negative(plan.cash_amount, "金额")?;
                Transaction::new_planned(
                    transaction_id,
                    project_id.to_string(),
                    direction,
                    plan,
                    Utc::now(),
                )
            }
        };

        let lock = self.existing_project_lock(project_id).await?;
        let _guard = lock.lock().await;

        // 持锁后再次确认项目存在
        self.repository.get_project(project_id).await?;
        self.repository.insert_transaction(&transaction).await?;
        if transaction.is_executed() {
            self.recompute_locked(project_id).await?;
        }

        info!(
            "Added {} transaction {} ({}) to project {}",
            transaction.status, transaction.transaction_id, transaction.direction, project_id
        );
        Ok(transaction)
    }

    pub async fn get_transaction(&self, transaction_id: &str) -> PortfolioEngineResult<Transaction> {
        Ok(self.repository.get_transaction(transaction_id).await?)
    }

    pub async fn list_transactions(
        &self,
        project_id: &str,
    ) -> PortfolioEngineResult<Vec<Transaction>> {
        Ok(self.repository.list_transactions(project_id).await?)
    }

    /// 修改交易方向、股数、金额或状态，涉及已执行交易时重算项目
    ///
    /// 修改后仍为计划交易时，股数与金额按单字段编辑联动求解，一次只能改其中一个。
    #[instrument(skip(self))]
    pub async fn update_transaction(
        &self,
        transaction_id: &str,
        update: TransactionUpdate,
    ) -> PortfolioEngineResult<Transaction> {
        if let Some(cash_amount) = update.cash_amount {
            ensure_non_negative(cash_amount, "金额")?;
        }

        let project_id = self.repository.get_transaction(transaction_id).await?.project_id;
        let lock = self.existing_project_lock(&project_id).await?;
        let _guard = lock.lock().await;

        let mut transaction = self.repository.get_transaction(transaction_id).await?;
        let was_executed = transaction.is_executed();

        if let Some(direction) = update.direction {
            transaction.direction = direction;
        }
        if let Some(status) = update.status {
            transaction.status = status;
            transaction.executed_at = match status {
                TransactionStatus::Executed => transaction.executed_at.or_else(|| Some(Utc::now())),
                TransactionStatus::Planned => None,
            };
        }

        if transaction.is_planned() {
            let edit = match (update.shares, update.cash_amount) {
                (Some(_), Some(_)) => {
                    return Err(PortfolioEngineError::invalid_input(
                        "计划交易的股数与金额不能同时修改",
                    ));
                }
                (Some(shares), None) => Some(FieldEdit::Shares(shares)),
                (None, Some(cash_amount)) => Some(FieldEdit::CashAmount(cash_amount)),
                (None, None) => None,
            };
            if let Some(edit) = edit {
                let project = self.repository.get_project(&project_id).await?;
                let plan = apply_edit(
                    transaction.planned_trade(),
                    edit,
                    project.current_price,
                    self.capital.get(),
                );
                transaction.apply_planned_trade(&plan);
            }
        } else {
            if let Some(shares) = update.shares {
                transaction.shares = shares;
            }
            if let Some(cash_amount) = update.cash_amount {
                transaction.cash_amount = cash_amount;
            }
            // 计划交易转为已执行时沿用的金额同样不能为负
            ensure_non_negative(transaction.cash_amount, "成交金额")?;
        }

        self.repository.update_transaction(&transaction).await?;
        if was_executed || transaction.is_executed() {
            self.recompute_locked(&project_id).await?;
        }
        Ok(transaction)
    }

    /// 编辑计划交易的单个字段，其余字段按现价与总资金联动求解
    #[instrument(skip(self))]
    pub async fn edit_planned_trade(
        &self,
        transaction_id: &str,
        edit: FieldEdit,
    ) -> PortfolioEngineResult<Transaction> {
        validate_planned_edit(edit)?;

        let project_id = self.repository.get_transaction(transaction_id).await?.project_id;
        let lock = self.existing_project_lock(&project_id).await?;
        let _guard = lock.lock().await;

        let mut transaction = self.repository.get_transaction(transaction_id).await?;
        if !transaction.is_planned() {
            return Err(PortfolioEngineError::NotPlanned {
                transaction_id: transaction_id.to_string(),
            });
        }

        let project = self.repository.get_project(&project_id).await?;
        let plan = apply_edit(
            transaction.planned_trade(),
            edit,
            project.current_price,
            self.capital.get(),
        );
        // 距离编辑可能反推出负触发价
        ensure_non_negative(plan.trigger_price, "触发价")?;
        transaction.apply_planned_trade(&plan);
        self.repository.update_transaction(&transaction).await?;

        debug!(
            "Edited {:?} on planned trade {}: trigger={} shares={} cash={}",
            edit.field(),
            transaction_id,
            plan.trigger_price,
            plan.shares,
            plan.cash_amount
        );
        Ok(transaction)
    }

    /// 按成交价执行计划交易
    #[instrument(skip(self))]
    pub async fn execute_planned_trade(
        &self,
        transaction_id: &str,
        execution_price: Decimal,
    ) -> PortfolioEngineResult<Transaction> {
        if execution_price <= Decimal::ZERO {
            return Err(PortfolioEngineError::invalid_input(format!(
                "成交价必须为正数: {execution_price}"
            )));
        }

        let project_id = self.repository.get_transaction(transaction_id).await?.project_id;
        let lock = self.existing_project_lock(&project_id).await?;
        let _guard = lock.lock().await;

        let mut transaction = self.repository.get_transaction(transaction_id).await?;
        if !transaction.is_planned() {
            return Err(PortfolioEngineError::NotPlanned {
                transaction_id: transaction_id.to_string(),
            });
        }

        transaction.status = TransactionStatus::Executed;
        transaction.cash_amount = cash_from_shares(transaction.shares, execution_price);
        transaction.executed_at = Some(Utc::now());
        self.repository.update_transaction(&transaction).await?;
        self.recompute_locked(&project_id).await?;

        info!(
            "Executed planned trade {}: {} shares at {}",
            transaction_id, transaction.shares, execution_price
        );
        Ok(transaction)
    }

    #[instrument(skip(self))]
    pub async fn delete_transaction(&self, transaction_id: &str) -> PortfolioEngineResult<()> {
        let project_id = self.repository.get_transaction(transaction_id).await?.project_id;
        let lock = self.existing_project_lock(&project_id).await?;
        let _guard = lock.lock().await;

        let transaction = self.repository.get_transaction(transaction_id).await?;
        self.repository.delete_transaction(transaction_id).await?;
        if transaction.is_executed() {
            self.recompute_locked(&project_id).await?;
        }
        Ok(())
    }

    // ---- 基金 ----

    #[instrument(skip(self))]
    pub async fn add_fund(
        &self,
        name: &str,
        code: &str,
        units: Decimal,
        cost_amount: Decimal,
        nav: Decimal,
    ) -> PortfolioEngineResult<FundHolding> {
        ensure_not_blank(name, "基金名称")?;
        ensure_non_negative(units, "份额")?;
        ensure_non_negative(cost_amount, "投入成本")?;
        ensure_non_negative(nav, "净值")?;

        let fund = FundHolding::new(
            Uuid::new_v4().to_string(),
            name.trim().to_string(),
            code.trim().to_string(),
            units,
            cost_amount,
            nav,
            Utc::now(),
        );
        self.repository.insert_fund(&fund).await?;

        info!("Added fund {} ({})", fund.fund_id, fund.code);
        Ok(fund)
    }

    pub async fn list_funds(&self) -> PortfolioEngineResult<Vec<FundHolding>> {
        Ok(self.repository.list_funds().await?)
    }

    pub async fn update_fund_nav(
        &self,
        fund_id: &str,
        nav: Decimal,
    ) -> PortfolioEngineResult<FundHolding> {
        ensure_non_negative(nav, "净值")?;

        let mut fund = self.repository.get_fund(fund_id).await?;
        fund.nav = nav;
        fund.updated_at = Utc::now();
        self.repository.update_fund(&fund).await?;
        Ok(fund)
    }

    pub async fn update_fund_holding(
        &self,
        fund_id: &str,
        units: Decimal,
        cost_amount: Decimal,
    ) -> PortfolioEngineResult<FundHolding> {
        ensure_non_negative(units, "份额")?;
        ensure_non_negative(cost_amount, "投入成本")?;

        let mut fund = self.repository.get_fund(fund_id).await?;
        fund.units = units;
        fund.cost_amount = cost_amount;
        fund.updated_at = Utc::now();
        self.repository.update_fund(&fund).await?;
        Ok(fund)
    }

    pub async fn delete_fund(&self, fund_id: &str) -> PortfolioEngineResult<()> {
        self.repository.delete_fund(fund_id).await?;
        Ok(())
    }

    // ---- 汇总 ----

    pub async fn overview(&self) -> PortfolioEngineResult<PortfolioOverview> {
        let projects = self.repository.list_projects().await?;
        let funds = self.repository.list_funds().await?;
        Ok(build_overview(&projects, &funds, self.capital.get()))
    }

    pub async fn statistics(&self) -> PortfolioEngineResult<PortfolioStatistics> {
        let projects = self.repository.list_projects().await?;
        let funds = self.repository.list_funds().await?;
        let transactions = self.repository.list_all_transactions().await?;
        Ok(build_statistics(&projects, &funds, &transactions))
    }
}

/// 投资组合引擎构建器
pub struct PortfolioEngineBuilder {
    repository: Option<Arc<dyn PortfolioRepository>>,
    price_feed: Option<Arc<dyn PriceFeed>>,
    capital: CapitalBase,
}

impl PortfolioEngineBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            repository: None,
            price_feed: None,
            capital: CapitalBase::default(),
        }
    }

    /// 设置数据存储
    pub fn with_repository(mut self, repository: Arc<dyn PortfolioRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// 设置行情源，未设置时使用空的永不过期报价缓存
    pub fn with_price_feed(mut self, price_feed: Arc<dyn PriceFeed>) -> Self {
        self.price_feed = Some(price_feed);
        self
    }

    /// 共享外部的总资金句柄
    pub fn with_capital_base(mut self, capital: CapitalBase) -> Self {
        self.capital = capital;
        self
    }

    /// 设置初始总资金
    pub fn with_total_capital(self, total_capital: Decimal) -> Self {
        self.capital.set(total_capital);
        self
    }

    /// 构建引擎
    pub fn build(self) -> PortfolioEngineResult<PortfolioEngine> {
        let repository = self
            .repository
            .ok_or(PortfolioEngineError::ConfigError("数据存储未设置".to_string()))?;
        let price_feed = self
            .price_feed
            .unwrap_or_else(|| Arc::new(PriceCache::new(0)));

        Ok(PortfolioEngine::new(repository, price_feed, self.capital))
    }
}

impl Default for PortfolioEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
