//! # 采样调度模块
//!
//! 全局 tick 时钟：定时器每 `tick_interval`（默认 100ms）触发一次，
//! 计算 `tick = round(now_ms / 1000)`，tick 变化时执行一次刷新周期：
//!
//! 1. 快照设备注册表，按 `refresh_group_id` 分组
//! 2. 各组并发执行，组内设备顺序刷新；单个设备失败只记录，不影响其它设备
//! 3. 等待全部组完成
//! 4. 记录 tick，并向订阅者广播
//!
//! `stop()` 不中断正在执行的周期，只阻止后续 tick。

mod error;
mod sampler;

pub use error::SamplerError;
pub use sampler::{CycleResults, Sampler, SharedDevice};
