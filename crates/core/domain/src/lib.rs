//! 采集网关共享领域类型。

pub mod data;
pub mod tick;

pub use data::{EventRecord, VariableValue};
pub use tick::{convert_date_to_tick_number, does_tick_id_match_tick};

/// 获取当前时间戳（毫秒）
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
