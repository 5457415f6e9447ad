//! 总资金（全局资金池）

use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;

/// 总资金句柄，所有项目与基金共享同一个资金池
///
/// 克隆得到的句柄指向同一个值。
#[derive(Debug, Clone, Default)]
pub struct CapitalBase {
    inner: Arc<RwLock<Decimal>>,
}

impl CapitalBase {
    pub fn new(total_capital: Decimal) -> Self {
        Self {
            inner: Arc::new(RwLock::new(total_capital)),
        }
    }

    pub fn get(&self) -> Decimal {
        *self.inner.read()
    }

    /// 更新总资金，返回旧值
    pub fn set(&self, total_capital: Decimal) -> Decimal {
        std::mem::replace(&mut *self.inner.write(), total_capital)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_shared_handle() {
        let capital = CapitalBase::new(dec!(100000));
        let handle = capital.clone();

        assert_eq!(handle.set(dec!(150000)), dec!(100000));
        assert_eq!(capital.get(), dec!(150000));
        assert_eq!(CapitalBase::default().get(), Decimal::ZERO);
    }
}
