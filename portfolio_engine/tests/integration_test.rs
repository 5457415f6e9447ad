use std::sync::Arc;

use portfolio_engine::{
    DatabaseConfig, FieldEdit, NewTransaction, PlannedTrade, PortfolioEngine,
    PortfolioEngineBuilder, PortfolioEngineError, PriceCache, SqlitePortfolioRepository,
    TradeDirection, TransactionStatus, TransactionUpdate,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

async fn build_engine(price_cache: Arc<PriceCache>) -> PortfolioEngine {
    let repository = SqlitePortfolioRepository::connect(DatabaseConfig::in_memory())
        .await
        .expect("内存数据库连接失败");

    let engine = PortfolioEngineBuilder::new()
        .with_repository(Arc::new(repository))
        .with_price_feed(price_cache)
        .build()
        .expect("引擎构建失败");
    engine.load_capital(dec!(100000)).await.unwrap();
    engine
}

fn executed(direction: TradeDirection, shares: u64, cash_amount: Decimal) -> NewTransaction {
    NewTransaction::Executed {
        direction,
        shares,
        cash_amount,
        executed_at: None,
    }
}

#[tokio::test]
async fn test_position_lifecycle_with_planned_trade() {
    let engine = build_engine(Arc::new(PriceCache::new(0))).await;
    let project = engine
        .create_project("贵州茅台", "SH600519", dec!(120))
        .await
        .unwrap();
    let project_id = project.project_id.to_string();

    engine
        .add_transaction(&project_id, executed(TradeDirection::OpenLong, 100, dec!(11000)))
        .await
        .unwrap();

    let opened = engine.get_project(&project_id).await.unwrap();
    assert_eq!(opened.position.share_count, 100);
    assert_eq!(opened.position.cost_basis_per_share, dec!(110));
    assert_eq!(opened.position.market_value, dec!(12000));
    assert_eq!(opened.position.allocation_percent, dec!(12));
    assert_eq!(opened.position.capital_profit_loss_percent, dec!(1));

    let repriced = engine.update_current_price(&project_id, dec!(100)).await.unwrap();
    assert_eq!(repriced.position.profit_loss_amount, dec!(-1000));

    // 计划交易不影响持仓
    let planned = engine
        .add_transaction(
            &project_id,
            NewTransaction::Planned {
                direction: TradeDirection::OpenLong,
                plan: PlannedTrade::default(),
            },
        )
        .await
        .unwrap();
    let txn_id = planned.transaction_id.to_string();
    assert_eq!(
        engine.get_project(&project_id).await.unwrap().position,
        repriced.position
    );

    let edited = engine
        .edit_planned_trade(&txn_id, FieldEdit::TriggerPrice(dec!(90)))
        .await
        .unwrap();
    assert_eq!(edited.distance_percent, dec!(-10));

    let edited = engine
        .edit_planned_trade(&txn_id, FieldEdit::AllocationPercent(dec!(9)))
        .await
        .unwrap();
    assert_eq!(edited.cash_amount, dec!(9000));
    assert_eq!(edited.shares, 100);

    let executed_txn = engine.execute_planned_trade(&txn_id, dec!(90)).await.unwrap();
    assert_eq!(executed_txn.status, TransactionStatus::Executed);
    assert_eq!(executed_txn.cash_amount, dec!(9000));
    assert!(executed_txn.executed_at.is_some());

    let combined = engine.get_project(&project_id).await.unwrap();
    assert_eq!(combined.position.share_count, 200);
    assert_eq!(combined.position.cost_basis_total, dec!(20000));
    assert_eq!(combined.position.profit_loss_amount, Decimal::ZERO);

    // 已执行的交易不能再编辑或执行
    assert!(matches!(
        engine.edit_planned_trade(&txn_id, FieldEdit::Shares(5)).await,
        Err(PortfolioEngineError::NotPlanned { .. })
    ));
    assert!(matches!(
        engine.execute_planned_trade(&txn_id, dec!(95)).await,
        Err(PortfolioEngineError::NotPlanned { .. })
    ));
}

#[tokio::test]
async fn test_capital_change_recomputes_every_project() {
    let engine = build_engine(Arc::new(PriceCache::new(0))).await;
    let a = engine.create_project("招商银行", "SH600036", dec!(40)).await.unwrap();
    let b = engine.create_project("平安银行", "SZ000001", dec!(10)).await.unwrap();

    engine
        .add_transaction(&a.project_id, executed(TradeDirection::OpenLong, 500, dec!(18000)))
        .await
        .unwrap();
    engine
        .add_transaction(&b.project_id, executed(TradeDirection::OpenLong, 1000, dec!(11000)))
        .await
        .unwrap();

    let projects = engine.set_total_capital(dec!(200000)).await.unwrap();
    assert_eq!(projects.len(), 2);

    let a = engine.get_project(&a.project_id).await.unwrap();
    let b = engine.get_project(&b.project_id).await.unwrap();
    assert_eq!(a.position.allocation_percent, dec!(10));
    assert_eq!(b.position.allocation_percent, dec!(5));
    assert_eq!(b.position.capital_profit_loss_percent, dec!(-0.5));

    let overview = engine.overview().await.unwrap();
    assert_eq!(overview.total_capital, dec!(200000));
    assert_eq!(overview.total_market_value, dec!(30000));
    assert_eq!(overview.idle_capital, dec!(170000));
}

#[tokio::test]
async fn test_transaction_edits_and_deletes_recompute() {
    let engine = build_engine(Arc::new(PriceCache::new(0))).await;
    let project = engine.create_project("宁德时代", "SZ300750", dec!(200)).await.unwrap();
    let project_id = project.project_id.to_string();

    let first = engine
        .add_transaction(&project_id, executed(TradeDirection::OpenLong, 100, dec!(18000)))
        .await
        .unwrap();
    let second = engine
        .add_transaction(&project_id, executed(TradeDirection::CloseLong, 50, dec!(10000)))
        .await
        .unwrap();
    assert_eq!(
        engine.get_project(&project_id).await.unwrap().position.share_count,
        50
    );

    engine
        .update_transaction(
            &second.transaction_id,
            TransactionUpdate {
                shares: Some(20),
                cash_amount: Some(dec!(4000)),
                ..TransactionUpdate::default()
            },
        )
        .await
        .unwrap();
    let position = engine.get_project(&project_id).await.unwrap().position;
    assert_eq!(position.share_count, 80);
    assert_eq!(position.cost_basis_total, dec!(14000));

    // 改回计划状态后不再计入持仓
    engine
        .update_transaction(
            &second.transaction_id,
            TransactionUpdate {
                status: Some(TransactionStatus::Planned),
                ..TransactionUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        engine.get_project(&project_id).await.unwrap().position.share_count,
        100
    );

    engine.delete_transaction(&first.transaction_id).await.unwrap();
    let flat = engine.get_project(&project_id).await.unwrap().position;
    assert_eq!(flat.share_count, 0);
    assert_eq!(flat.market_value, Decimal::ZERO);
    assert_eq!(flat.cost_basis_per_share, Decimal::ZERO);
}

#[tokio::test]
async fn test_planned_update_keeps_plan_consistent() {
    let engine = build_engine(Arc::new(PriceCache::new(0))).await;
    let project = engine.create_project("五粮液", "SZ000858", dec!(12)).await.unwrap();
    let planned = engine
        .add_transaction(
            &project.project_id,
            NewTransaction::Planned {
                direction: TradeDirection::OpenLong,
                plan: PlannedTrade {
                    trigger_price: dec!(10),
                    shares: 100,
                    cash_amount: dec!(1000),
                    allocation_percent: dec!(1),
                    ..PlannedTrade::default()
                },
            },
        )
        .await
        .unwrap();
    let txn_id = planned.transaction_id.to_string();

    // 股数按触发价联动金额与仓位占比
    let updated = engine
        .update_transaction(
            &txn_id,
            TransactionUpdate {
                shares: Some(500),
                ..TransactionUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.shares, 500);
    assert_eq!(updated.cash_amount, dec!(5000));
    assert_eq!(updated.allocation_percent, dec!(5));

    // 金额按四舍五入联动股数
    let updated = engine
        .update_transaction(
            &txn_id,
            TransactionUpdate {
                cash_amount: Some(dec!(2505)),
                ..TransactionUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.shares, 251);
    assert_eq!(updated.allocation_percent, dec!(2.505));

    assert!(matches!(
        engine
            .update_transaction(
                &txn_id,
                TransactionUpdate {
                    shares: Some(10),
                    cash_amount: Some(dec!(100)),
                    ..TransactionUpdate::default()
                },
            )
            .await,
        Err(PortfolioEngineError::InvalidInput { .. })
    ));

    let stored = engine.get_transaction(&txn_id).await.unwrap();
    assert_eq!(stored.shares, 251);
    assert_eq!(stored.cash_amount, dec!(2505));
    assert_eq!(
        engine.get_project(&project.project_id).await.unwrap().position.share_count,
        0
    );
}

#[tokio::test]
async fn test_concurrent_writes_on_one_project() {
    let engine = Arc::new(build_engine(Arc::new(PriceCache::new(0))).await);
    let project = engine.create_project("中国平安", "SH601318", dec!(50)).await.unwrap();
    let project_id = project.project_id.to_string();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let engine = Arc::clone(&engine);
        let project_id = project_id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .add_transaction(&project_id, executed(TradeDirection::OpenLong, 10, dec!(450)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let position = engine.get_project(&project_id).await.unwrap().position;
    assert_eq!(position.share_count, 200);
    assert_eq!(position.cost_basis_total, dec!(9000));
    assert_eq!(position.market_value, dec!(10000));
}

#[tokio::test]
async fn test_refresh_prices_from_cache() {
    let cache = Arc::new(PriceCache::new(300));
    let engine = build_engine(Arc::clone(&cache)).await;
    let quoted = engine.create_project("招商银行", "SH600036", dec!(35)).await.unwrap();
    let unquoted = engine.create_project("万科A", "SZ000002", dec!(8)).await.unwrap();
    engine
        .add_transaction(&quoted.project_id, executed(TradeDirection::OpenLong, 100, dec!(3500)))
        .await
        .unwrap();

    cache.update_quote("SH600036", dec!(38.5));

    assert_eq!(engine.refresh_prices().await.unwrap(), 1);
    let refreshed = engine.get_project(&quoted.project_id).await.unwrap();
    assert_eq!(refreshed.current_price, dec!(38.5));
    assert_eq!(refreshed.position.profit_loss_amount, dec!(350));
    assert_eq!(
        engine.get_project(&unquoted.project_id).await.unwrap().current_price,
        dec!(8)
    );

    // 价格未变化时不重复更新
    assert_eq!(engine.refresh_prices().await.unwrap(), 0);
}

#[tokio::test]
async fn test_projects_funds_and_statistics() {
    let engine = build_engine(Arc::new(PriceCache::new(0))).await;
    let first = engine.create_project("A", "SH600000", dec!(10)).await.unwrap();
    let second = engine.create_project("B", "SH600001", dec!(10)).await.unwrap();

    engine
        .reorder_projects(&[&*second.project_id, &*first.project_id])
        .await
        .unwrap();
    let names: Vec<String> = engine
        .list_projects()
        .await
        .unwrap()
        .iter()
        .map(|p| p.name.to_string())
        .collect();
    assert_eq!(names, vec!["B".to_string(), "A".to_string()]);

    let renamed = engine.rename_project(&first.project_id, "浦发银行").await.unwrap();
    assert_eq!(renamed.name.as_ref(), "浦发银行");

    engine
        .add_transaction(&first.project_id, executed(TradeDirection::OpenShort, 100, dec!(1100)))
        .await
        .unwrap();
    engine
        .add_transaction(
            &second.project_id,
            NewTransaction::Planned {
                direction: TradeDirection::OpenLong,
                plan: PlannedTrade::default(),
            },
        )
        .await
        .unwrap();

    let fund = engine
        .add_fund("沪深300ETF", "510300", dec!(10000), dec!(20000), dec!(2))
        .await
        .unwrap();
    engine.update_fund_nav(&fund.fund_id, dec!(2.2)).await.unwrap();

    let overview = engine.overview().await.unwrap();
    // 空头 -1000 + 基金 22000
    assert_eq!(overview.total_market_value, dec!(21000));
    assert_eq!(overview.funds[0].metrics.profit_loss_amount, dec!(2000));

    let stats = engine.statistics().await.unwrap();
    assert_eq!(stats.project_count, 2);
    assert_eq!(stats.fund_count, 1);
    assert_eq!(stats.net_short_positions, 1);
    assert_eq!(stats.profitable_positions, 1);
    assert_eq!(stats.executed_transactions, 1);
    assert_eq!(stats.planned_transactions, 1);

    engine.delete_project(&first.project_id).await.unwrap();
    engine.delete_fund(&fund.fund_id).await.unwrap();
    let stats = engine.statistics().await.unwrap();
    assert_eq!(stats.project_count, 1);
    assert_eq!(stats.fund_count, 0);
    assert_eq!(stats.executed_transactions, 0);

    let err = engine.get_project(&first.project_id).await.unwrap_err();
    assert!(err.is_not_found());
}
