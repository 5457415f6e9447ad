//! 投资组合引擎错误类型定义

use thiserror::Error;

use crate::database::DatabaseError;

/// 投资组合引擎相关的错误类型
#[derive(Error, Debug)]
pub enum PortfolioEngineError {
    #[error("数据库错误: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("输入无效: {reason}")]
    InvalidInput { reason: String },

    #[error("交易 {transaction_id} 不是计划交易")]
    NotPlanned { transaction_id: String },

    #[error("配置错误: {0}")]
    ConfigError(String),
}

impl PortfolioEngineError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// 是否为记录不存在
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(
                DatabaseError::ProjectNotFound { .. }
                    | DatabaseError::TransactionNotFound { .. }
                    | DatabaseError::FundNotFound { .. }
            )
        )
    }
}

/// 投资组合引擎结果类型
pub type PortfolioEngineResult<T> = Result<T, PortfolioEngineError>;
