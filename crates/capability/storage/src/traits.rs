//! 存储接口 Trait 定义
//!
//! - EventStore：事件缓冲的持久化后端
//!
//! 设计原则：
//! - 后端只负责"建表、全量加载、插入一行"，ID 分配与过滤由 EventBuffer 负责
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use async_trait::async_trait;
use domain::EventRecord;

/// 事件存储接口
#[async_trait]
pub trait EventStore: Send + Sync {
    /// 创建表 `data(eventId, tickId, value)` 及缺失的列
    async fn ensure_schema(&self) -> Result<(), StorageError>;

    /// 加载全部行（不做过滤）
    async fn load_all(&self) -> Result<Vec<EventRecord>, StorageError>;

    /// 插入一行
    async fn insert(&self, record: &EventRecord) -> Result<(), StorageError>;
}
