//! 错误日志：最近失败操作的有界内存记录

use std::collections::VecDeque;

use chrono::Utc;
use parking_lot::Mutex;

use core_entities::Timestamp;

/// 单条错误记录
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEntry {
    pub timestamp: Timestamp,
    /// 出错的操作
    pub context: String,
    pub message: String,
}

/// 有界错误日志，超出容量时淘汰最旧的记录
#[derive(Debug)]
pub struct ErrorLog {
    entries: Mutex<VecDeque<ErrorEntry>>,
    capacity: usize,
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn record(&self, context: impl Into<String>, message: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }

        let entry = ErrorEntry {
            timestamp: Utc::now(),
            context: context.into(),
            message: message.into(),
        };

        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// 按时间顺序返回所有记录，最新的在最后
    pub fn list(&self) -> Vec<ErrorEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
