//! 存储层错误类型
//!
//! 区分三类失败：
//! - 未初始化：缓冲尚未 init 成功
//! - 忙：已有写入在进行中（并发错误，调用方决定丢弃或上报）
//! - 持久化失败：SQL 执行、连接、文件错误

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("event buffer not initialized")]
    NotInitialized,

    #[error("event buffer busy: another write is in flight")]
    Busy,

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}
