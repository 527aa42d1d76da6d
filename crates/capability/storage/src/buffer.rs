//! 事件缓冲
//!
//! 单文件持久化的追加日志，内存中保留可见事件（value > 0）的完整副本。
//!
//! 约束：
//! - 事件 ID 从 `last_event_id + 1` 连续分配，覆盖文件中的全部行（包括不可见行）
//! - value <= 0 的事件直接忽略，不消耗 ID
//! - 同一时刻只允许一次写入，并发写入立即返回 `Busy`，不排队
//! - 持久化失败时内存状态保持不变

use crate::error::StorageError;
use crate::sqlite::SqliteEventStore;
use crate::traits::EventStore;
use domain::EventRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Default)]
struct BufferState {
    content: BTreeMap<i64, EventRecord>,
    last_event_id: i64,
    store: Option<Arc<dyn EventStore>>,
}

/// 事件缓冲
pub struct EventBuffer {
    file_path: PathBuf,
    state: RwLock<BufferState>,
    write_gate: Mutex<()>,
}

impl EventBuffer {
    /// 创建未初始化的缓冲（不触碰文件）
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            state: RwLock::new(BufferState::default()),
            write_gate: Mutex::new(()),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// 打开 SQLite 文件，建表并加载已有事件
    pub async fn init(&self) -> Result<(), StorageError> {
        let store = SqliteEventStore::open(&self.file_path).await?;
        self.init_with_store(Arc::new(store)).await
    }

    /// 使用指定后端初始化
    ///
    /// 失败时缓冲保持未初始化。
    pub async fn init_with_store(&self, store: Arc<dyn EventStore>) -> Result<(), StorageError> {
        let _gate = self.write_gate.try_lock().map_err(|_| StorageError::Busy)?;

        store.ensure_schema().await?;
        let records = store.load_all().await?;

        let last_event_id = records
            .iter()
            .map(|record| record.event_id)
            .max()
            .unwrap_or(0);
        let content: BTreeMap<i64, EventRecord> = records
            .into_iter()
            .filter(|record| record.value > 0)
            .map(|record| (record.event_id, record))
            .collect();

        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        info!(
            target: "gw.events",
            path = %self.file_path.display(),
            events = content.len(),
            last_event_id,
            "event_buffer_initialized"
        );
        state.content = content;
        state.last_event_id = last_event_id;
        state.store = Some(store);
        Ok(())
    }

    /// 追加一个事件
    ///
    /// # 返回
    /// - `Ok(Some(record))`：已持久化
    /// - `Ok(None)`：value <= 0，被忽略
    /// - `Err(NotInitialized | Busy | Persistence)`：未写入，状态不变
    pub async fn add_event(&self, tick_id: i64, value: i64) -> Result<Option<EventRecord>, StorageError> {
        if value <= 0 {
            debug!(target: "gw.events", tick_id, value, "event_ignored");
            return Ok(None);
        }

        let store = self.store()?;
        let _gate = self.write_gate.try_lock().map_err(|_| {
            warn!(target: "gw.events", tick_id, value, "event_rejected_busy");
            StorageError::Busy
        })?;

        let record = EventRecord {
            event_id: self.last_event_id() + 1,
            tick_id,
            value,
        };
        store.insert(&record).await?;

        let mut state = self
            .state
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        state.last_event_id = record.event_id;
        state.content.insert(record.event_id, record);
        debug!(
            target: "gw.events",
            event_id = record.event_id,
            tick_id,
            value,
            "event_appended"
        );
        Ok(Some(record))
    }

    /// 可见事件（value > 0）的快照，按事件 ID 排序
    pub fn content(&self) -> BTreeMap<i64, EventRecord> {
        self.state
            .read()
            .map(|state| state.content.clone())
            .unwrap_or_default()
    }

    /// tickId 不大于 `tick_id` 的最新可见事件；tickId 相同时取事件 ID 较大者
    pub fn latest_at(&self, tick_id: i64) -> Option<EventRecord> {
        let state = self.state.read().ok()?;
        state
            .content
            .values()
            .filter(|record| record.tick_id <= tick_id)
            .max_by_key(|record| (record.tick_id, record.event_id))
            .copied()
    }

    pub fn last_event_id(&self) -> i64 {
        self.state
            .read()
            .map(|state| state.last_event_id)
            .unwrap_or(0)
    }

    /// 是否有写入（或初始化）正在进行
    pub fn is_busy(&self) -> bool {
        self.write_gate.try_lock().is_err()
    }

    pub fn is_initialized(&self) -> bool {
        self.state
            .read()
            .map(|state| state.store.is_some())
            .unwrap_or(false)
    }

    fn store(&self) -> Result<Arc<dyn EventStore>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        state.store.clone().ok_or(StorageError::NotInitialized)
    }
}
