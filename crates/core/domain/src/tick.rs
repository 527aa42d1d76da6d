//! tick 运算
//!
//! tick 是秒级整数时间单位，所有采样与计算周期都以 tick 为网格。

/// 周期 `id` 是否在 `tick` 上触发（`tick mod id == 0`）
///
/// 周期为 0 或负数时永不触发。
pub fn does_tick_id_match_tick(tick: i64, id: i64) -> bool {
    id > 0 && tick.rem_euclid(id) == 0
}

/// 毫秒时间戳 → tick（四舍五入到秒，.5 向上）
pub fn convert_date_to_tick_number(epoch_ms: i64) -> i64 {
    (epoch_ms + 500).div_euclid(1000)
}
