use async_trait::async_trait;
use domain::VariableValue;
use gw_device::{Device, DeviceConfig, DeviceOptions};
use gw_protocol::{MemoryClient, ProtocolClient, ProtocolError, RawData, ReadRequest, WriteRequest};
use gw_sampler::{Sampler, SamplerError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn modbus_device(id: &str) -> DeviceConfig {
    serde_json::from_value(json!({
        "id": id,
        "name": format!("device {}", id),
        "connection": {"protocol": "modbus", "ip": "127.0.0.1"},
        "variables": [
            {"id": "level", "name": "level", "type": "mbUInt16", "offset": 5, "fCode": 3}
        ]
    }))
    .expect("device config")
}

fn device_with(id: &str, client: Arc<dyn ProtocolClient>) -> Device {
    Device::from_config(modbus_device(id), Some(client), &DeviceOptions::default()).expect("device")
}

/// 每次读取固定耗时的客户端
struct SlowClient {
    delay: Duration,
}

#[async_trait]
impl ProtocolClient for SlowClient {
    async fn read(&self, _request: &ReadRequest, _timeout: Duration) -> Result<RawData, ProtocolError> {
        tokio::time::sleep(self.delay).await;
        Ok(RawData::Words(vec![42]))
    }

    async fn write(&self, _request: &WriteRequest, _timeout: Duration) -> Result<(), ProtocolError> {
        Ok(())
    }
}

#[test]
fn tick_helpers_follow_second_boundaries() {
    assert!(Sampler::does_tick_id_match_tick(100, 5));
    assert!(!Sampler::does_tick_id_match_tick(101, 5));
    assert!(!Sampler::does_tick_id_match_tick(100, 0));
    assert_eq!(Sampler::convert_date_to_tick_number(1_499), 1);
    assert_eq!(Sampler::convert_date_to_tick_number(1_500), 2);
    assert_eq!(Sampler::convert_time_sample_to_tick_id(15), 15);
    assert_eq!(Sampler::convert_tick_id_to_time_sample(15), 15);
}

#[tokio::test]
async fn failing_device_does_not_block_others() {
    let healthy = Arc::new(MemoryClient::new());
    healthy.set_words(3, 5, &[17]);
    let offline = Arc::new(MemoryClient::new());
    offline.set_offline(true);

    let sampler = Sampler::default();
    let a = sampler.add_device(device_with("a", healthy)).expect("add a");
    sampler.add_device(device_with("b", offline)).expect("add b");

    let results = sampler.run_cycle(100).await;
    assert_eq!(results.len(), 2);
    assert!(results["a"].is_ok());
    assert!(results["b"].is_err());

    let device = a.lock().await;
    let level = device.variable("level").expect("level");
    assert_eq!(level.value(), &VariableValue::Int(17));
    assert_eq!(level.value_tick_id(), 100);
}

#[tokio::test]
async fn run_cycle_notifies_subscribers() {
    let sampler = Sampler::default();
    let mut ticks = sampler.subscribe();
    assert_eq!(sampler.last_tick_number(), None);

    let results = sampler.run_cycle(42).await;
    assert!(results.is_empty());
    assert_eq!(ticks.recv().await.expect("tick"), 42);
    assert_eq!(sampler.last_tick_number(), Some(42));
}

#[tokio::test]
async fn registry_replaces_and_removes_devices() {
    let sampler = Sampler::default();
    let client: Arc<dyn ProtocolClient> = Arc::new(MemoryClient::new());
    sampler.add_device(device_with("a", client.clone())).expect("add");
    sampler.add_device(device_with("a", client)).expect("replace");
    assert_eq!(sampler.device_ids(), vec!["a".to_string()]);

    sampler.remove_device("a").expect("remove");
    assert!(sampler.device("a").is_none());

    let err = sampler.remove_device("a").unwrap_err();
    assert!(matches!(err, SamplerError::DeviceNotFound(ref id) if id == "a"));
    assert_eq!(err.to_string(), "there is no device of id a");
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let sampler = Sampler::new(Duration::from_millis(20));
    let mut ticks = sampler.subscribe();

    sampler.stop();
    assert!(!sampler.is_active());

    sampler.start();
    sampler.start();
    assert!(sampler.is_active());

    let tick = tokio::time::timeout(Duration::from_secs(3), ticks.recv())
        .await
        .expect("tick within timeout")
        .expect("tick");
    assert!(sampler.last_tick_number().is_some_and(|last| last >= tick));

    sampler.shutdown().await;
    assert!(!sampler.is_active());
    sampler.stop();
}

#[tokio::test(start_paused = true)]
async fn refresh_groups_run_in_parallel() {
    let sampler = Sampler::default();
    for id in ["a", "b"] {
        let client: Arc<dyn ProtocolClient> = Arc::new(SlowClient {
            delay: Duration::from_millis(300),
        });
        sampler.add_device(device_with(id, client)).expect("add");
    }

    let started = tokio::time::Instant::now();
    let results = sampler.refresh_all(10).await;
    assert!(started.elapsed() < Duration::from_millis(600));
    assert!(results.values().all(|result| result.is_ok()));
    // refresh_all 不推进 last tick
    assert_eq!(sampler.last_tick_number(), None);
}

#[tokio::test(start_paused = true)]
async fn restart_waits_for_in_flight_cycle() {
    let sampler = Sampler::new(Duration::from_millis(20));
    let client: Arc<dyn ProtocolClient> = Arc::new(SlowClient {
        delay: Duration::from_millis(300),
    });
    sampler.add_device(device_with("a", client)).expect("add");
    let mut ticks = sampler.subscribe();

    sampler.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    // 第一个周期仍在读取中
    assert_eq!(sampler.last_tick_number(), None);
    sampler.stop();
    sampler.start();

    tokio::time::sleep(Duration::from_secs(2)).await;
    sampler.shutdown().await;

    let mut seen = Vec::new();
    while let Ok(tick) = ticks.try_recv() {
        seen.push(tick);
    }
    assert!(!seen.is_empty());
    let mut distinct = seen.clone();
    distinct.dedup();
    assert_eq!(seen, distinct, "a tick was refreshed twice");
}
