//! 投资组合数据库操作接口

use std::borrow::Cow;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use thiserror::Error;
use tracing::{debug, info, instrument};

use core_entities::{EditableField, FundHolding, Position, Project, Transaction};

const TOTAL_CAPITAL_KEY: &str = "total_capital";

/// 数据库配置
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 数据库连接URL
    pub database_url: Cow<'static, str>,
    /// 最大连接数
    pub max_connections: u32,
    /// 连接超时时间（秒）
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: Cow::Borrowed("sqlite://portfolio.db?mode=rwc"),
            max_connections: 5,
            connect_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    /// 内存数据库，用于测试
    pub fn in_memory() -> Self {
        Self {
            database_url: Cow::Borrowed("sqlite::memory:"),
            max_connections: 1,
            connect_timeout_secs: 5,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

/// 数据库操作错误类型
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("数据库连接错误: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("项目 {project_id} 未找到")]
    ProjectNotFound { project_id: String },

    #[error("交易 {transaction_id} 未找到")]
    TransactionNotFound { transaction_id: String },

    #[error("基金 {fund_id} 未找到")]
    FundNotFound { fund_id: String },

    #[error("数据解析错误: {0}")]
    DataParseError(String),
}

/// 投资组合存储接口
#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    async fn insert_project(&self, project: &Project) -> Result<(), DatabaseError>;

    async fn get_project(&self, project_id: &str) -> Result<Project, DatabaseError>;

    /// 按排序序号、创建时间列出所有项目
    async fn list_projects(&self) -> Result<Vec<Project>, DatabaseError>;

    /// 更新项目的全部字段（含衍生持仓指标）
    async fn update_project(&self, project: &Project) -> Result<(), DatabaseError>;

    /// 删除项目及其全部交易
    async fn delete_project(&self, project_id: &str) -> Result<(), DatabaseError>;

    async fn insert_transaction(&self, transaction: &Transaction) -> Result<(), DatabaseError>;

    async fn get_transaction(&self, transaction_id: &str) -> Result<Transaction, DatabaseError>;

    async fn update_transaction(&self, transaction: &Transaction) -> Result<(), DatabaseError>;

    async fn delete_transaction(&self, transaction_id: &str) -> Result<(), DatabaseError>;

    /// 按执行时间（未执行则按创建时间）列出项目的交易
    async fn list_transactions(&self, project_id: &str) -> Result<Vec<Transaction>, DatabaseError>;

    async fn list_all_transactions(&self) -> Result<Vec<Transaction>, DatabaseError>;

    async fn insert_fund(&self, fund: &FundHolding) -> Result<(), DatabaseError>;

    async fn get_fund(&self, fund_id: &str) -> Result<FundHolding, DatabaseError>;

    async fn list_funds(&self) -> Result<Vec<FundHolding>, DatabaseError>;

    async fn update_fund(&self, fund: &FundHolding) -> Result<(), DatabaseError>;

    async fn delete_fund(&self, fund_id: &str) -> Result<(), DatabaseError>;

    /// 读取持久化的总资金
    async fn load_total_capital(&self) -> Result<Option<Decimal>, DatabaseError>;

    async fn save_total_capital(&self, total_capital: Decimal) -> Result<(), DatabaseError>;
}

const CREATE_TABLES: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        project_id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        symbol TEXT NOT NULL,
        current_price TEXT NOT NULL,
        share_count INTEGER NOT NULL DEFAULT 0,
        cost_basis_total TEXT NOT NULL DEFAULT '0',
        cost_basis_per_share TEXT NOT NULL DEFAULT '0',
        market_value TEXT NOT NULL DEFAULT '0',
        profit_loss_amount TEXT NOT NULL DEFAULT '0',
        profit_loss_percent TEXT NOT NULL DEFAULT '0',
        allocation_percent TEXT NOT NULL DEFAULT '0',
        capital_profit_loss_percent TEXT NOT NULL DEFAULT '0',
        sort_order INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        transaction_id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
        direction TEXT NOT NULL,
        status TEXT NOT NULL,
        shares INTEGER NOT NULL,
        cash_amount TEXT NOT NULL,
        trigger_price TEXT NOT NULL DEFAULT '0',
        warning_direction TEXT NOT NULL DEFAULT 'ABOVE',
        distance_percent TEXT NOT NULL DEFAULT '0',
        allocation_percent TEXT NOT NULL DEFAULT '0',
        last_edited TEXT,
        created_at TEXT NOT NULL,
        executed_at TEXT
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_transactions_project ON transactions(project_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS funds (
        fund_id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        code TEXT NOT NULL,
        units TEXT NOT NULL,
        cost_amount TEXT NOT NULL,
        nav TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

const TRANSACTION_COLUMNS: &str = r#"
    transaction_id, project_id, direction, status, shares, cash_amount,
    trigger_price, warning_direction, distance_percent, allocation_percent,
    last_edited, created_at, executed_at
"#;

/// SQLite 数据库实现
pub struct SqlitePortfolioRepository {
    pool: SqlitePool,
}

impl SqlitePortfolioRepository {
    /// 创建新的 SQLite 存储实例
    pub async fn new(config: DatabaseConfig) -> Result<Self, DatabaseError> {
        info!("正在连接SQLite数据库: {}", config.database_url);

        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));

        // 内存库随连接关闭而消失，只能使用一条常驻连接
        if config.is_in_memory() {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;

        info!("成功连接到SQLite数据库");

        Ok(Self { pool })
    }

    /// 连接并初始化数据表
    pub async fn connect(config: DatabaseConfig) -> Result<Self, DatabaseError> {
        let repository = Self::new(config).await?;
        repository.initialize_tables().await?;
        Ok(repository)
    }

    /// 初始化数据库表
    pub async fn initialize_tables(&self) -> Result<(), DatabaseError> {
        info!("正在初始化投资组合数据表...");

        for statement in CREATE_TABLES {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("投资组合数据表初始化完成");
        Ok(())
    }

    /// 获取数据库连接池
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, DatabaseError> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw)
        .map_err(|e| DatabaseError::DataParseError(format!("{column}={raw}: {e}")))
}

fn parsed_column<T>(row: &SqliteRow, column: &str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>()
        .map_err(|e| DatabaseError::DataParseError(format!("{column}: {e}")))
}

fn shares_to_db(shares: u64) -> Result<i64, DatabaseError> {
    i64::try_from(shares)
        .map_err(|_| DatabaseError::DataParseError(format!("shares out of range: {shares}")))
}

fn project_from_row(row: &SqliteRow) -> Result<Project, DatabaseError> {
    let project_id: String = row.try_get("project_id")?;
    let name: String = row.try_get("name")?;
    let symbol: String = row.try_get("symbol")?;

    Ok(Project {
        project_id: project_id.into(),
        name: name.into(),
        symbol: symbol.into(),
        current_price: decimal_column(row, "current_price")?,
        position: Position {
            share_count: row.try_get("share_count")?,
            cost_basis_total: decimal_column(row, "cost_basis_total")?,
            cost_basis_per_share: decimal_column(row, "cost_basis_per_share")?,
            market_value: decimal_column(row, "market_value")?,
            profit_loss_amount: decimal_column(row, "profit_loss_amount")?,
            profit_loss_percent: decimal_column(row, "profit_loss_percent")?,
            allocation_percent: decimal_column(row, "allocation_percent")?,
            capital_profit_loss_percent: decimal_column(row, "capital_profit_loss_percent")?,
        },
        sort_order: row.try_get("sort_order")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn transaction_from_row(row: &SqliteRow) -> Result<Transaction, DatabaseError> {
    let transaction_id: String = row.try_get("transaction_id")?;
    let project_id: String = row.try_get("project_id")?;
    let shares: i64 = row.try_get("shares")?;
    let last_edited: Option<String> = row.try_get("last_edited")?;
    let last_edited = match last_edited {
        Some(code) => Some(EditableField::from_code(&code).ok_or_else(|| {
            DatabaseError::DataParseError(format!("last_edited: {code}"))
        })?),
        None => None,
    };

    Ok(Transaction {
        transaction_id: transaction_id.into(),
        project_id: project_id.into(),
        direction: parsed_column(row, "direction")?,
        status: parsed_column(row, "status")?,
        shares: u64::try_from(shares)
            .map_err(|_| DatabaseError::DataParseError(format!("shares: {shares}")))?,
        cash_amount: decimal_column(row, "cash_amount")?,
        trigger_price: decimal_column(row, "trigger_price")?,
        warning_direction: parsed_column(row, "warning_direction")?,
        distance_percent: decimal_column(row, "distance_percent")?,
        allocation_percent: decimal_column(row, "allocation_percent")?,
        last_edited,
        created_at: row.try_get("created_at")?,
        executed_at: row.try_get::<Option<DateTime<Utc>>, _>("executed_at")?,
    })
}

fn fund_from_row(row: &SqliteRow) -> Result<FundHolding, DatabaseError> {
    let fund_id: String = row.try_get("fund_id")?;
    let name: String = row.try_get("name")?;
    let code: String = row.try_get("code")?;

    Ok(FundHolding {
        fund_id: fund_id.into(),
        name: name.into(),
        code: code.into(),
        units: decimal_column(row, "units")?,
        cost_amount: decimal_column(row, "cost_amount")?,
        nav: decimal_column(row, "nav")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl PortfolioRepository for SqlitePortfolioRepository {
    #[instrument(skip(self, project), fields(project_id = %project.project_id))]
    async fn insert_project(&self, project: &Project) -> Result<(), DatabaseError> {
        let position = &project.position;
        sqlx::query(
            r#"
            INSERT INTO projects (
                project_id, name, symbol, current_price,
                share_count, cost_basis_total, cost_basis_per_share, market_value,
                profit_loss_amount, profit_loss_percent, allocation_percent,
                capital_profit_loss_percent, sort_order, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&*project.project_id)
        .bind(&*project.name)
        .bind(&*project.symbol)
        .bind(project.current_price.to_string())
        .bind(position.share_count)
        .bind(position.cost_basis_total.to_string())
        .bind(position.cost_basis_per_share.to_string())
        .bind(position.market_value.to_string())
        .bind(position.profit_loss_amount.to_string())
        .bind(position.profit_loss_percent.to_string())
        .bind(position.allocation_percent.to_string())
        .bind(position.capital_profit_loss_percent.to_string())
        .bind(project.sort_order)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_project(&self, project_id: &str) -> Result<Project, DatabaseError> {
        let row = sqlx::query("SELECT * FROM projects WHERE project_id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => project_from_row(&row),
            None => Err(DatabaseError::ProjectNotFound {
                project_id: project_id.to_string(),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn list_projects(&self) -> Result<Vec<Project>, DatabaseError> {
        let rows = sqlx::query("SELECT * FROM projects ORDER BY sort_order, created_at, rowid")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(project_from_row).collect()
    }

    #[instrument(skip(self, project), fields(project_id = %project.project_id))]
    async fn update_project(&self, project: &Project) -> Result<(), DatabaseError> {
        let position = &project.position;
        let result = sqlx::query(
            r#"
            UPDATE projects SET
                name = ?, symbol = ?, current_price = ?,
                share_count = ?, cost_basis_total = ?, cost_basis_per_share = ?,
                market_value = ?, profit_loss_amount = ?, profit_loss_percent = ?,
                allocation_percent = ?, capital_profit_loss_percent = ?,
                sort_order = ?, updated_at = ?
            WHERE project_id = ?
            "#,
        )
        .bind(&*project.name)
        .bind(&*project.symbol)
        .bind(project.current_price.to_string())
        .bind(position.share_count)
        .bind(position.cost_basis_total.to_string())
        .bind(position.cost_basis_per_share.to_string())
        .bind(position.market_value.to_string())
        .bind(position.profit_loss_amount.to_string())
        .bind(position.profit_loss_percent.to_string())
        .bind(position.allocation_percent.to_string())
        .bind(position.capital_profit_loss_percent.to_string())
        .bind(project.sort_order)
        .bind(project.updated_at)
        .bind(&*project.project_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::ProjectNotFound {
                project_id: project.project_id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_project(&self, project_id: &str) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM transactions WHERE project_id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let result = sqlx::query("DELETE FROM projects WHERE project_id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DatabaseError::ProjectNotFound {
                project_id: project_id.to_string(),
            });
        }

        tx.commit().await?;
        debug!("删除项目 {} 及其 {} 条交易", project_id, removed);
        Ok(())
    }

    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.transaction_id))]
    async fn insert_transaction(&self, transaction: &Transaction) -> Result<(), DatabaseError> {
        let sql = format!(
            "INSERT INTO transactions ({TRANSACTION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(&*transaction.transaction_id)
            .bind(&*transaction.project_id)
            .bind(transaction.direction.code())
            .bind(transaction.status.code())
            .bind(shares_to_db(transaction.shares)?)
            .bind(transaction.cash_amount.to_string())
            .bind(transaction.trigger_price.to_string())
            .bind(transaction.warning_direction.code())
            .bind(transaction.distance_percent.to_string())
            .bind(transaction.allocation_percent.to_string())
            .bind(transaction.last_edited.map(|field| field.code()))
            .bind(transaction.created_at)
            .bind(transaction.executed_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_transaction(&self, transaction_id: &str) -> Result<Transaction, DatabaseError> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE transaction_id = ?");
        let row = sqlx::query(&sql)
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => transaction_from_row(&row),
            None => Err(DatabaseError::TransactionNotFound {
                transaction_id: transaction_id.to_string(),
            }),
        }
    }

    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.transaction_id))]
    async fn update_transaction(&self, transaction: &Transaction) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions SET
                direction = ?, status = ?, shares = ?, cash_amount = ?,
                trigger_price = ?, warning_direction = ?, distance_percent = ?,
                allocation_percent = ?, last_edited = ?, executed_at = ?
            WHERE transaction_id = ?
            "#,
        )
        .bind(transaction.direction.code())
        .bind(transaction.status.code())
        .bind(shares_to_db(transaction.shares)?)
        .bind(transaction.cash_amount.to_string())
        .bind(transaction.trigger_price.to_string())
        .bind(transaction.warning_direction.code())
        .bind(transaction.distance_percent.to_string())
        .bind(transaction.allocation_percent.to_string())
        .bind(transaction.last_edited.map(|field| field.code()))
        .bind(transaction.executed_at)
        .bind(&*transaction.transaction_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::TransactionNotFound {
                transaction_id: transaction.transaction_id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_transaction(&self, transaction_id: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM transactions WHERE transaction_id = ?")
            .bind(transaction_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::TransactionNotFound {
                transaction_id: transaction_id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_transactions(&self, project_id: &str) -> Result<Vec<Transaction>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE project_id = ?
            ORDER BY COALESCE(executed_at, created_at), rowid
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn list_all_transactions(&self) -> Result<Vec<Transaction>, DatabaseError> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY project_id, COALESCE(executed_at, created_at), rowid"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(transaction_from_row).collect()
    }

    #[instrument(skip(self, fund), fields(fund_id = %fund.fund_id))]
    async fn insert_fund(&self, fund: &FundHolding) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO funds (fund_id, name, code, units, cost_amount, nav, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&*fund.fund_id)
        .bind(&*fund.name)
        .bind(&*fund.code)
        .bind(fund.units.to_string())
        .bind(fund.cost_amount.to_string())
        .bind(fund.nav.to_string())
        .bind(fund.created_at)
        .bind(fund.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_fund(&self, fund_id: &str) -> Result<FundHolding, DatabaseError> {
        let row = sqlx::query("SELECT * FROM funds WHERE fund_id = ?")
            .bind(fund_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => fund_from_row(&row),
            None => Err(DatabaseError::FundNotFound {
                fund_id: fund_id.to_string(),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn list_funds(&self) -> Result<Vec<FundHolding>, DatabaseError> {
        let rows = sqlx::query("SELECT * FROM funds ORDER BY created_at, rowid")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(fund_from_row).collect()
    }

    #[instrument(skip(self, fund), fields(fund_id = %fund.fund_id))]
    async fn update_fund(&self, fund: &FundHolding) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE funds SET name = ?, code = ?, units = ?, cost_amount = ?, nav = ?, updated_at = ?
            WHERE fund_id = ?
            "#,
        )
        .bind(&*fund.name)
        .bind(&*fund.code)
        .bind(fund.units.to_string())
        .bind(fund.cost_amount.to_string())
        .bind(fund.nav.to_string())
        .bind(fund.updated_at)
        .bind(&*fund.fund_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::FundNotFound {
                fund_id: fund.fund_id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_fund(&self, fund_id: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM funds WHERE fund_id = ?")
            .bind(fund_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::FundNotFound {
                fund_id: fund_id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_total_capital(&self) -> Result<Option<Decimal>, DatabaseError> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(TOTAL_CAPITAL_KEY)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| decimal_column(&row, "value")).transpose()
    }

    #[instrument(skip(self))]
    async fn save_total_capital(&self, total_capital: Decimal) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(TOTAL_CAPITAL_KEY)
        .bind(total_capital.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_entities::{PlannedTrade, TradeDirection, TransactionStatus, WarningDirection};
    use rust_decimal_macros::dec;

    async fn repository() -> SqlitePortfolioRepository {
        SqlitePortfolioRepository::connect(DatabaseConfig::in_memory())
            .await
            .unwrap()
    }

    fn project(id: &str, sort_order: i64) -> Project {
        Project::new(
            id.to_string(),
            "招商银行".to_string(),
            "SH600036".to_string(),
            dec!(35.20),
            sort_order,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_project_round_trip() {
        let repo = repository().await;
        let mut stored = project("proj_001", 0);
        repo.insert_project(&stored).await.unwrap();

        stored.position.share_count = -20;
        stored.position.cost_basis_total = dec!(-704.5);
        stored.position.profit_loss_percent = dec!(9.0909090909090909090909090909);
        repo.update_project(&stored).await.unwrap();

        let loaded = repo.get_project("proj_001").await.unwrap();
        assert_eq!(loaded.position, stored.position);
        assert_eq!(loaded.current_price, dec!(35.20));
        assert_eq!(loaded.name.as_ref(), "招商银行");
    }

    #[tokio::test]
    async fn test_missing_rows_report_not_found() {
        let repo = repository().await;

        assert!(matches!(
            repo.get_project("nope").await,
            Err(DatabaseError::ProjectNotFound { .. })
        ));
        assert!(matches!(
            repo.update_project(&project("nope", 0)).await,
            Err(DatabaseError::ProjectNotFound { .. })
        ));
        assert!(matches!(
            repo.delete_transaction("nope").await,
            Err(DatabaseError::TransactionNotFound { .. })
        ));
        assert!(matches!(
            repo.get_fund("nope").await,
            Err(DatabaseError::FundNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_transactions_round_trip_and_cascade() {
        let repo = repository().await;
        repo.insert_project(&project("proj_001", 0)).await.unwrap();

        let executed = Transaction::new_executed(
            "txn_001".to_string(),
            "proj_001".to_string(),
            TradeDirection::OpenLong,
            100,
            dec!(3520),
            Utc::now(),
        );
        let planned = Transaction::new_planned(
            "txn_002".to_string(),
            "proj_001".to_string(),
            TradeDirection::CloseLong,
            PlannedTrade {
                trigger_price: dec!(40),
                warning_direction: WarningDirection::Above,
                distance_percent: dec!(13.64),
                shares: 50,
                cash_amount: dec!(2000),
                allocation_percent: dec!(2),
                last_edited: Some(EditableField::Shares),
            },
            Utc::now(),
        );
        repo.insert_transaction(&executed).await.unwrap();
        repo.insert_transaction(&planned).await.unwrap();

        let listed = repo.list_transactions("proj_001").await.unwrap();
        assert_eq!(listed.len(), 2);

        let loaded = repo.get_transaction("txn_002").await.unwrap();
        assert_eq!(loaded.status, TransactionStatus::Planned);
        assert_eq!(loaded.planned_trade(), planned.planned_trade());
        assert!(loaded.executed_at.is_none());

        repo.delete_project("proj_001").await.unwrap();
        assert!(repo.list_transactions("proj_001").await.unwrap().is_empty());
        assert!(repo.list_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_projects_listed_by_sort_order() {
        let repo = repository().await;
        repo.insert_project(&project("b", 1)).await.unwrap();
        repo.insert_project(&project("a", 0)).await.unwrap();

        let ids: Vec<String> = repo
            .list_projects()
            .await
            .unwrap()
            .iter()
            .map(|p| p.project_id.to_string())
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_total_capital_setting() {
        let repo = repository().await;
        assert_eq!(repo.load_total_capital().await.unwrap(), None);

        repo.save_total_capital(dec!(100000)).await.unwrap();
        repo.save_total_capital(dec!(125000.50)).await.unwrap();
        assert_eq!(repo.load_total_capital().await.unwrap(), Some(dec!(125000.50)));
    }

    #[tokio::test]
    async fn test_fund_round_trip() {
        let repo = repository().await;
        let mut fund = FundHolding::new(
            "fund_001".to_string(),
            "沪深300指数".to_string(),
            "510300".to_string(),
            dec!(10000),
            dec!(20000),
            dec!(2.2),
            Utc::now(),
        );
        repo.insert_fund(&fund).await.unwrap();

        fund.nav = dec!(2.35);
        repo.update_fund(&fund).await.unwrap();

        let funds = repo.list_funds().await.unwrap();
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].nav, dec!(2.35));

        repo.delete_fund("fund_001").await.unwrap();
        assert!(repo.list_funds().await.unwrap().is_empty());
    }
}
