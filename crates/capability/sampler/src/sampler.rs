//! 采样调度器

use crate::error::SamplerError;
use domain::{convert_date_to_tick_number, does_tick_id_match_tick, now_epoch_ms};
use gw_device::{Device, DeviceError, RefreshReport};
use gw_telemetry::{
    new_cycle_id, record_cycle_duration_ms, record_device_refresh_failure,
    record_device_refresh_success, record_tick,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

/// 注册表中的设备；外部 API 通过同一把锁做结构编辑
pub type SharedDevice = Arc<tokio::sync::Mutex<Device>>;

/// 一次刷新周期中每个设备的结果
pub type CycleResults = BTreeMap<String, Result<RefreshReport, DeviceError>>;

const NO_TICK: i64 = i64::MIN;
const TICK_CHANNEL_CAPACITY: usize = 64;

struct RegisteredDevice {
    group_id: String,
    device: SharedDevice,
}

struct SamplerInner {
    devices: RwLock<BTreeMap<String, RegisteredDevice>>,
    last_tick: AtomicI64,
    tick_tx: broadcast::Sender<i64>,
}

struct RunningTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct Sampler {
    inner: Arc<SamplerInner>,
    tick_interval: Duration,
    task: Mutex<Option<RunningTask>>,
    /// `stop()` 后仍可能在执行最后一个周期的旧任务
    draining: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl Sampler {
    pub fn new(tick_interval: Duration) -> Self {
        let (tick_tx, _) = broadcast::channel(TICK_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(SamplerInner {
                devices: RwLock::new(BTreeMap::new()),
                last_tick: AtomicI64::new(NO_TICK),
                tick_tx,
            }),
            tick_interval,
            task: Mutex::new(None),
            draining: Mutex::new(None),
        }
    }

    /// 周期 `id` 是否在 `tick` 上触发
    pub fn does_tick_id_match_tick(tick: i64, id: i64) -> bool {
        does_tick_id_match_tick(tick, id)
    }

    pub fn convert_date_to_tick_number(epoch_ms: i64) -> i64 {
        convert_date_to_tick_number(epoch_ms)
    }

    /// 采样周期（秒）→ tick 周期；tick 即秒，两者相同
    pub fn convert_time_sample_to_tick_id(time_sample: i64) -> i64 {
        time_sample
    }

    pub fn convert_tick_id_to_time_sample(tick_id: i64) -> i64 {
        tick_id
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// 最近一次完成的周期的 tick
    pub fn last_tick_number(&self) -> Option<i64> {
        match self.inner.last_tick.load(Ordering::Acquire) {
            NO_TICK => None,
            tick => Some(tick),
        }
    }

    pub fn is_active(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.is_some())
            .unwrap_or(false)
    }

    /// 订阅 tick 完成通知
    pub fn subscribe(&self) -> broadcast::Receiver<i64> {
        self.inner.tick_tx.subscribe()
    }

    /// 注册设备；同 ID 设备被替换
    pub fn add_device(&self, device: Device) -> Result<SharedDevice, SamplerError> {
        let device_id = device.id().to_string();
        let group_id = device.refresh_group_id().to_string();
        let shared = Arc::new(tokio::sync::Mutex::new(device));

        let mut devices = self.inner.devices.write().map_err(|_| SamplerError::Lock)?;
        let replaced = devices
            .insert(
                device_id.clone(),
                RegisteredDevice {
                    group_id,
                    device: shared.clone(),
                },
            )
            .is_some();
        info!(target: "gw.sampler", device_id = %device_id, replaced, "device_registered");
        Ok(shared)
    }

    pub fn remove_device(&self, device_id: &str) -> Result<SharedDevice, SamplerError> {
        let mut devices = self.inner.devices.write().map_err(|_| SamplerError::Lock)?;
        let removed = devices
            .remove(device_id)
            .ok_or_else(|| SamplerError::DeviceNotFound(device_id.to_string()))?;
        info!(target: "gw.sampler", device_id = %device_id, "device_removed");
        Ok(removed.device)
    }

    pub fn device(&self, device_id: &str) -> Option<SharedDevice> {
        let devices = self.inner.devices.read().ok()?;
        devices.get(device_id).map(|entry| entry.device.clone())
    }

    pub fn device_ids(&self) -> Vec<String> {
        self.inner
            .devices
            .read()
            .map(|devices| devices.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// 启动定时器；已启动时无操作
    pub fn start(&self) {
        let Ok(mut task) = self.task.lock() else {
            error!(target: "gw.sampler", "sampler_task_lock_failed");
            return;
        };
        if task.is_some() {
            return;
        }

        let (stop, mut stopped) = oneshot::channel();
        let inner = self.inner.clone();
        let tick_interval = self.tick_interval;
        let previous = self.take_draining();
        let handle = tokio::spawn(async move {
            // 旧任务完成当前周期后才开始计时，同一 tick 不会被刷新两次
            if let Some(previous) = previous {
                if let Err(err) = previous.await {
                    error!(target: "gw.sampler", error = %err, "sampler_task_failed");
                }
            }
            let mut interval = tokio::time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = interval.tick() => {
                        let tick = convert_date_to_tick_number(now_epoch_ms());
                        if inner.last_tick.load(Ordering::Acquire) != tick {
                            inner.run_cycle(tick).await;
                        }
                    }
                }
            }
            info!(target: "gw.sampler", "sampler_stopped");
        });

        *task = Some(RunningTask { stop, handle });
        info!(
            target: "gw.sampler",
            tick_interval_ms = tick_interval.as_millis() as u64,
            "sampler_started"
        );
    }

    /// 停止定时器；正在执行的周期自然完成。未启动时无操作
    pub fn stop(&self) {
        if let Some(task) = self.take_task() {
            let _ = task.stop.send(());
            match self.draining.lock() {
                Ok(mut draining) => *draining = Some(task.handle),
                Err(_) => error!(target: "gw.sampler", "sampler_task_lock_failed"),
            }
        }
    }

    /// 停止并等待正在执行的周期完成
    pub async fn shutdown(&self) {
        let running = self.take_task().map(|task| {
            let _ = task.stop.send(());
            task.handle
        });
        for handle in [self.take_draining(), running].into_iter().flatten() {
            if let Err(err) = handle.await {
                error!(target: "gw.sampler", error = %err, "sampler_task_failed");
            }
        }
    }

    /// 刷新全部设备（不记录 tick、不广播）
    pub async fn refresh_all(&self, tick: i64) -> CycleResults {
        self.inner.refresh_all(tick).await
    }

    /// 执行一次完整周期：刷新、记录 tick、广播
    pub async fn run_cycle(&self, tick: i64) -> CycleResults {
        self.inner.run_cycle(tick).await
    }

    fn take_draining(&self) -> Option<JoinHandle<()>> {
        match self.draining.lock() {
            Ok(mut draining) => draining.take(),
            Err(_) => {
                error!(target: "gw.sampler", "sampler_task_lock_failed");
                None
            }
        }
    }

    fn take_task(&self) -> Option<RunningTask> {
        match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(_) => {
                error!(target: "gw.sampler", "sampler_task_lock_failed");
                None
            }
        }
    }
}

impl SamplerInner {
    /// 按刷新组划分的快照
    fn groups(&self) -> BTreeMap<String, Vec<(String, SharedDevice)>> {
        let mut groups: BTreeMap<String, Vec<(String, SharedDevice)>> = BTreeMap::new();
        match self.devices.read() {
            Ok(devices) => {
                for (device_id, entry) in devices.iter() {
                    groups
                        .entry(entry.group_id.clone())
                        .or_default()
                        .push((device_id.clone(), entry.device.clone()));
                }
            }
            Err(_) => error!(target: "gw.sampler", "device_registry_lock_failed"),
        }
        groups
    }

    async fn refresh_all(&self, tick: i64) -> CycleResults {
        let mut tasks = JoinSet::new();
        for (group_id, devices) in self.groups() {
            let group = async move {
                let mut results = Vec::with_capacity(devices.len());
                for (device_id, device) in devices {
                    let result = device.lock().await.refresh(tick).await;
                    match &result {
                        Ok(_) => record_device_refresh_success(),
                        Err(err) => {
                            record_device_refresh_failure();
                            warn!(
                                target: "gw.sampler",
                                group_id = %group_id,
                                device_id = %device_id,
                                error = %err,
                                "device_refresh_failed"
                            );
                        }
                    }
                    results.push((device_id, result));
                }
                results
            };
            tasks.spawn(group.instrument(Span::current()));
        }

        let mut results = CycleResults::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(group) => results.extend(group),
                Err(err) => error!(target: "gw.sampler", error = %err, "refresh_group_panicked"),
            }
        }
        results
    }

    async fn run_cycle(&self, tick: i64) -> CycleResults {
        let span = info_span!(target: "gw.sampler", "refresh_cycle", cycle_id = %new_cycle_id(), tick);
        async {
            let started = Instant::now();
            let results = self.refresh_all(tick).await;

            self.last_tick.store(tick, Ordering::Release);
            let elapsed_ms = started.elapsed().as_millis() as u64;
            record_tick();
            record_cycle_duration_ms(elapsed_ms);

            let failed = results.values().filter(|result| result.is_err()).count();
            debug!(
                target: "gw.sampler",
                devices = results.len(),
                failed,
                elapsed_ms,
                "refresh_cycle_completed"
            );

            if self.tick_tx.send(tick).is_err() {
                debug!(target: "gw.sampler", "tick_without_subscribers");
            }
            results
        }
        .instrument(span)
        .await
    }
}
