//! # SQLite 存储实现模块
//!
//! 事件缓冲的持久化后端，每个缓冲对应一个数据库文件。
//!
//! ## 表结构
//!
//! ```sql
//! data(eventId INTEGER PRIMARY KEY, tickId INTEGER, value INTEGER)
//! ```
//!
//! 已存在但缺列的旧文件在建表时补齐缺失列。

pub mod event;

pub use event::*;
