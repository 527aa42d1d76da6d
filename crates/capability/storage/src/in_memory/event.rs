//! 事件存储内存实现
//!
//! 仅用于本地测试和占位。

use crate::error::StorageError;
use crate::traits::EventStore;
use domain::EventRecord;
use std::sync::RwLock;

/// 事件内存存储
#[derive(Default)]
pub struct InMemoryEventStore {
    records: RwLock<Vec<EventRecord>>,
}

impl InMemoryEventStore {
    /// 创建新的事件存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已有行创建（模拟已存在的数据库文件）
    pub fn with_records(records: Vec<EventRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// 当前已持久化的全部行
    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<EventRecord>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(records.clone())
    }

    async fn insert(&self, record: &EventRecord) -> Result<(), StorageError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if records.iter().any(|item| item.event_id == record.event_id) {
            return Err(StorageError::new(format!(
                "duplicate event id: {}",
                record.event_id
            )));
        }
        records.push(*record);
        Ok(())
    }
}
