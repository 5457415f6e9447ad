use thiserror::Error;

use portfolio_engine::{DatabaseError, PortfolioEngineError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] PortfolioEngineError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Services not initialized")]
    NotInitialized,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// 创建一个应用层错误，包含源错误信息用于传播
    pub fn application_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: String,
        source: E,
    ) -> Self {
        Self::Other(anyhow::Error::new(source).context(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_conversion() {
        let engine_error = PortfolioEngineError::invalid_input("总资金 不能为负数: -1");
        let app_error: AppError = engine_error.into();

        match app_error {
            AppError::Engine(inner) => assert!(inner.to_string().contains("总资金")),
            _ => panic!("引擎错误转换失败"),
        }
    }

    #[test]
    fn test_every_variant_is_reachable() {
        let errors = [
            AppError::from(std::io::Error::other("磁盘已满")),
            AppError::from(PortfolioEngineError::invalid_input("现价 不能为负数: -1")),
            AppError::from(DatabaseError::FundNotFound {
                fund_id: "fund_001".to_string(),
            }),
            AppError::NotInitialized,
            AppError::from(anyhow::anyhow!("重算中断")),
        ];

        for error in errors {
            let label = match &error {
                AppError::Io(_) => "io",
                AppError::Engine(_) => "engine",
                AppError::Database(_) => "database",
                AppError::NotInitialized => "not_initialized",
                AppError::Other(_) => "other",
            };
            assert!(!error.to_string().is_empty(), "{label} 缺少错误信息");
        }
    }

    #[test]
    fn test_application_with_source_keeps_chain() {
        let source = DatabaseError::ProjectNotFound {
            project_id: "proj_001".to_string(),
        };
        let error = AppError::application_with_source("重算持仓失败".to_string(), source);

        assert_eq!(error.to_string(), "重算持仓失败");
        match error {
            AppError::Other(inner) => {
                let chain: Vec<String> = inner.chain().map(|e| e.to_string()).collect();
                assert_eq!(chain.len(), 2);
                assert!(chain[1].contains("proj_001"));
            }
            _ => panic!("应用错误包装失败"),
        }
    }
}
