//! # Gateway Storage 模块
//!
//! 事件缓冲（EventBuffer）及其持久化后端。
//!
//! ## 架构设计
//!
//! 1. **接口抽象层** (`traits.rs`)：`EventStore` 异步 Trait
//! 2. **错误处理层** (`error.rs`)：统一的存储错误类型
//! 3. **连接管理层** (`connection.rs`)：SQLite 连接池
//! 4. **缓冲层** (`buffer.rs`)：ID 分配、过滤、单写入门控
//! 5. **实现层**：
//!    - `in_memory/`：内存存储实现（用于测试）
//!    - `sqlite/`：SQLite 存储实现（生产环境使用）
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use gw_storage::EventBuffer;
//!
//! let buffer = EventBuffer::new("./data/events/dev1_log.db");
//! buffer.init().await?;
//! buffer.add_event(1_700_000_000, 2).await?;
//! ```

pub mod buffer;
pub mod connection;
pub mod error;
pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use buffer::EventBuffer;
pub use connection::*;
pub use error::*;
pub use traits::*;

pub use in_memory::InMemoryEventStore;
pub use sqlite::SqliteEventStore;
