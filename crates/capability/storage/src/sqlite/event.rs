//! SQLite 事件存储实现

use crate::connection::connect_sqlite;
use crate::error::StorageError;
use crate::traits::EventStore;
use domain::EventRecord;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::info;

const TABLE_NAME: &str = "data";
const COLUMNS: [&str; 3] = ["eventId", "tickId", "value"];

pub struct SqliteEventStore {
    pub pool: SqlitePool,
}

impl SqliteEventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 打开（必要时创建）事件数据库文件
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        let pool = connect_sqlite(path).await?;
        Ok(Self { pool })
    }

    async fn existing_columns(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("select name from pragma_table_info(?)")
            .bind(TABLE_NAME)
            .fetch_all(&self.pool)
            .await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            columns.push(row.try_get::<String, _>("name")?);
        }
        Ok(columns)
    }
}

#[async_trait::async_trait]
impl EventStore for SqliteEventStore {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            "create table if not exists data \
             (eventId integer primary key, tickId integer, value integer)",
        )
        .execute(&self.pool)
        .await?;

        let existing = self.existing_columns().await?;
        for column in COLUMNS {
            if existing.iter().any(|name| name == column) {
                continue;
            }
            // 列名来自常量表，不存在注入
            let statement = format!("alter table {} add column {} integer", TABLE_NAME, column);
            sqlx::query(&statement).execute(&self.pool).await?;
            info!(target: "gw.events", column, "event_column_added");
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<EventRecord>, StorageError> {
        let rows = sqlx::query("select eventId, tickId, value from data order by eventId")
            .fetch_all(&self.pool)
            .await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let event_id: Option<i64> = row.try_get("eventId")?;
            let Some(event_id) = event_id else {
                continue;
            };
            let tick_id: Option<i64> = row.try_get("tickId")?;
            let value: Option<i64> = row.try_get("value")?;
            records.push(EventRecord {
                event_id,
                tick_id: tick_id.unwrap_or(0),
                value: value.unwrap_or(0),
            });
        }
        Ok(records)
    }

    async fn insert(&self, record: &EventRecord) -> Result<(), StorageError> {
        sqlx::query("insert into data (eventId, tickId, value) values (?, ?, ?)")
            .bind(record.event_id)
            .bind(record.tick_id)
            .bind(record.value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
