//! 行情价格来源
//!
//! 价格抓取（网络请求）不在本模块范围内；外部抓取到的报价写入 [`PriceCache`]，
//! 引擎通过 [`PriceFeed`] 接口读取。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use core_entities::Timestamp;

/// 行情价格接口
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// 获取股票的最新价格，没有可用报价时返回 None
    async fn latest_price(&self, symbol: &str) -> Option<Decimal>;
}

/// 单条报价
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub price: Decimal,
    pub fetched_at: Timestamp,
}

/// 报价缓存
///
/// 超过过期时间的报价视为不可用；过期时间为 0 表示永不过期。
#[derive(Debug)]
pub struct PriceCache {
    quotes: DashMap<Arc<str>, Quote>,
    stale_after: Option<Duration>,
}

impl PriceCache {
    pub fn new(stale_after_secs: u64) -> Self {
        let stale_after = match stale_after_secs {
            0 => None,
            secs => Some(
                i64::try_from(secs)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .unwrap_or(Duration::MAX),
            ),
        };
        Self {
            quotes: DashMap::new(),
            stale_after,
        }
    }

    /// 写入报价（以当前时间为抓取时间）
    pub fn update_quote(&self, symbol: &str, price: Decimal) {
        self.update_quote_at(symbol, price, Utc::now());
    }

    pub fn update_quote_at(&self, symbol: &str, price: Decimal, fetched_at: Timestamp) {
        debug!("Caching quote {} = {} at {}", symbol, price, fetched_at);
        self.quotes.insert(symbol.into(), Quote { price, fetched_at });
    }

    /// 读取报价（不论是否过期）
    pub fn get_quote(&self, symbol: &str) -> Option<Quote> {
        self.quotes.get(symbol).map(|entry| *entry.value())
    }

    /// 读取未过期的报价
    pub fn fresh_quote(&self, symbol: &str) -> Option<Quote> {
        let quote = self.get_quote(symbol)?;
        match self.stale_after {
            Some(window) if Utc::now() - quote.fetched_at > window => None,
            _ => Some(quote),
        }
    }

    pub fn remove(&self, symbol: &str) -> Option<Quote> {
        self.quotes.remove(symbol).map(|(_, quote)| quote)
    }

    pub fn clear(&self) {
        self.quotes.clear();
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[async_trait]
impl PriceFeed for PriceCache {
    async fn latest_price(&self, symbol: &str) -> Option<Decimal> {
        self.fresh_quote(symbol).map(|quote| quote.price)
    }
}
