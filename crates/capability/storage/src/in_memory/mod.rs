//! 内存存储实现模块
//!
//! 仅用于本地测试和演示。
//!
//! 包含以下实现：
//! - EventStore: InMemoryEventStore

pub mod event;

pub use event::*;
