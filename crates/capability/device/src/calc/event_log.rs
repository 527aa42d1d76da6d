//! 事件日志元素
//!
//! 监视若干 `{tickVarId, valueVarId}` 对：tick 变量的值变化时，
//! 把 `(tick 值, value 变量的原始值)` 追加到该元素独占的 [`EventBuffer`]。
//! 描述只在查询时套用，缓冲中保存原始值。

use crate::config::LogVariable;
use gw_storage::{EventBuffer, StorageError};
use gw_telemetry::{record_event_appended, record_event_rejected_busy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// 查询结果中的事件标签：有描述时为描述，否则为原始值
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventLabel {
    Description(String),
    Raw(i64),
}

pub struct EventLog {
    log_variables: Vec<LogVariable>,
    descriptions: BTreeMap<i64, String>,
    buffer: Arc<EventBuffer>,
    /// 每个监视对最后处理过的 tick 值
    last_ticks: Vec<Option<i64>>,
    last_value: Option<i64>,
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("log_variables", &self.log_variables)
            .field("descriptions", &self.descriptions)
            .field("file_path", &self.buffer.file_path())
            .field("last_value", &self.last_value)
            .finish()
    }
}

impl EventLog {
    pub fn new(
        log_variables: Vec<LogVariable>,
        descriptions: BTreeMap<i64, String>,
        buffer: Arc<EventBuffer>,
    ) -> Self {
        let last_ticks = vec![None; log_variables.len()];
        Self {
            log_variables,
            descriptions,
            buffer,
            last_ticks,
            last_value: None,
        }
    }

    pub fn log_variables(&self) -> &[LogVariable] {
        &self.log_variables
    }

    pub fn descriptions(&self) -> &BTreeMap<i64, String> {
        &self.descriptions
    }

    pub fn buffer(&self) -> &Arc<EventBuffer> {
        &self.buffer
    }

    /// 最后一次写入的原始值
    pub fn last_value(&self) -> Option<i64> {
        self.last_value
    }

    /// 初始化缓冲；已初始化（例如测试中注入的后端）时跳过
    pub(crate) async fn init(&mut self) -> Result<(), StorageError> {
        if !self.buffer.is_initialized() {
            self.buffer.init().await?;
        }
        self.last_value = self
            .buffer
            .content()
            .values()
            .next_back()
            .map(|record| record.value);
        Ok(())
    }

    /// 检查每个监视对，记录发生变化的 tick 值
    ///
    /// 写入失败的监视对保持未处理状态，下一次刷新重试；返回遇到的第一个错误。
    pub(crate) async fn refresh(
        &mut self,
        value_of: impl Fn(&str) -> Option<i64>,
    ) -> Result<(), StorageError> {
        let mut first_error = None;

        for (index, pair) in self.log_variables.iter().enumerate() {
            let Some(tick_value) = value_of(&pair.tick_var_id) else {
                continue;
            };
            let last_tick = self.last_ticks[index];
            if last_tick == Some(tick_value) {
                continue;
            }
            // 重启后的第一次观察：缓冲中已有同一 tick 的事件则视为已记录
            if last_tick.is_none()
                && self
                    .buffer
                    .latest_at(tick_value)
                    .is_some_and(|record| record.tick_id == tick_value)
            {
                self.last_ticks[index] = Some(tick_value);
                continue;
            }

            let value = value_of(&pair.value_var_id).unwrap_or(0);
            match self.buffer.add_event(tick_value, value).await {
                Ok(stored) => {
                    if stored.is_some() {
                        record_event_appended();
                        self.last_value = Some(value);
                    }
                    self.last_ticks[index] = Some(tick_value);
                }
                Err(err) => {
                    if matches!(err, StorageError::Busy) {
                        record_event_rejected_busy();
                    }
                    warn!(
                        target: "gw.events",
                        tick_var_id = %pair.tick_var_id,
                        tick_value,
                        value,
                        error = %err,
                        "event_append_failed"
                    );
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// `timestamp` 时刻（含）之前最近的一条事件：`{tick 值: 描述或原始值}`；没有事件时为空
    pub fn get_event_at(&self, timestamp: i64) -> BTreeMap<i64, EventLabel> {
        let mut result = BTreeMap::new();
        if let Some(record) = self.buffer.latest_at(timestamp) {
            let label = match self.descriptions.get(&record.value) {
                Some(description) => EventLabel::Description(description.clone()),
                None => EventLabel::Raw(record.value),
            };
            result.insert(record.tick_id, label);
        }
        result
    }
}
