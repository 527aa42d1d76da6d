//! 追踪初始化、刷新周期 ID 与进程级计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub device_refresh_success: u64,
    pub device_refresh_failure: u64,
    pub variable_read_failure: u64,
    pub events_appended: u64,
    pub events_rejected_busy: u64,
    pub cycle_duration_ms_total: u64,
    pub cycle_duration_ms_count: u64,
}

/// 基础指标。
pub struct TelemetryMetrics {
    ticks: AtomicU64,
    device_refresh_success: AtomicU64,
    device_refresh_failure: AtomicU64,
    variable_read_failure: AtomicU64,
    events_appended: AtomicU64,
    events_rejected_busy: AtomicU64,
    cycle_duration_ms_total: AtomicU64,
    cycle_duration_ms_count: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            device_refresh_success: AtomicU64::new(0),
            device_refresh_failure: AtomicU64::new(0),
            variable_read_failure: AtomicU64::new(0),
            events_appended: AtomicU64::new(0),
            events_rejected_busy: AtomicU64::new(0),
            cycle_duration_ms_total: AtomicU64::new(0),
            cycle_duration_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            device_refresh_success: self.device_refresh_success.load(Ordering::Relaxed),
            device_refresh_failure: self.device_refresh_failure.load(Ordering::Relaxed),
            variable_read_failure: self.variable_read_failure.load(Ordering::Relaxed),
            events_appended: self.events_appended.load(Ordering::Relaxed),
            events_rejected_busy: self.events_rejected_busy.load(Ordering::Relaxed),
            cycle_duration_ms_total: self.cycle_duration_ms_total.load(Ordering::Relaxed),
            cycle_duration_ms_count: self.cycle_duration_ms_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的刷新周期 ID。
pub fn new_cycle_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录已发出的 tick 次数。
pub fn record_tick() {
    metrics().ticks.fetch_add(1, Ordering::Relaxed);
}

/// 记录设备刷新成功次数。
pub fn record_device_refresh_success() {
    metrics()
        .device_refresh_success
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录设备刷新失败次数（任一变量或计算元素失败）。
pub fn record_device_refresh_failure() {
    metrics()
        .device_refresh_failure
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录变量读取失败次数。
pub fn record_variable_read_failure() {
    metrics()
        .variable_read_failure
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录事件写入次数。
pub fn record_event_appended() {
    metrics().events_appended.fetch_add(1, Ordering::Relaxed);
}

/// 记录事件因并发写入被拒绝的次数。
pub fn record_event_rejected_busy() {
    metrics()
        .events_rejected_busy
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录刷新周期耗时（毫秒）。
pub fn record_cycle_duration_ms(duration_ms: u64) {
    let metrics = metrics();
    metrics
        .cycle_duration_ms_total
        .fetch_add(duration_ms, Ordering::Relaxed);
    metrics
        .cycle_duration_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
