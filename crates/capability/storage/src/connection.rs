//! 数据库连接管理
//!
//! 提供 SQLite 单文件连接池初始化：
//! - connect_sqlite：打开（必要时创建）数据库文件
//!
//! 设计原则：
//! - 每个事件缓冲独占一个文件，单连接即可满足一次一页的写入
//! - 父目录不存在时自动创建

use crate::error::StorageError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;

/// 建立 SQLite 连接池
///
/// # 参数
/// - `path`：数据库文件路径，不存在时创建
///
/// # 返回
/// - `Result<SqlitePool, StorageError>`：连接池或错误
pub async fn connect_sqlite(path: &Path) -> Result<SqlitePool, StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    Ok(pool)
}
