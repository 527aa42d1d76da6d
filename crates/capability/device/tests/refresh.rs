use domain::VariableValue;
use gw_device::{
    ConfigError, Device, DeviceConfig, DeviceError, DeviceOptions, DeviceUpdate, ReadError,
    VariableConfig,
};
use gw_protocol::{MemoryClient, ProtocolClient, ProtocolError};
use serde_json::json;
use std::sync::Arc;

fn meter_config() -> DeviceConfig {
    serde_json::from_value(json!({
        "id": "meter",
        "name": "pac3200",
        "connection": {"protocol": "modbus", "ip": "127.0.0.1", "unitId": 3},
        "variables": [
            {"id": "voltage", "name": "voltage", "type": "mbFloat", "offset": 10, "fCode": 3},
            {"id": "current", "name": "current", "type": "mbInt16", "offset": 20, "fCode": 3, "sampleTime": 2},
            {"id": "breaker", "name": "breaker", "type": "mbBoolean", "offset": 1, "fCode": 2}
        ],
        "calcElements": [
            {"id": "power", "name": "power", "type": "factorElement", "variableId": "voltage", "factor": 2}
        ]
    }))
    .expect("device config")
}

fn meter(client: Arc<MemoryClient>) -> Device {
    let client: Arc<dyn ProtocolClient> = client;
    Device::from_config(meter_config(), Some(client), &DeviceOptions::default()).expect("device")
}

fn seeded_client() -> Arc<MemoryClient> {
    let client = Arc::new(MemoryClient::new());
    client.set_words(3, 10, &[0xA45A, 0x42F6]);
    client.set_words(3, 20, &[0xFF9C]);
    client.set_words(2, 1, &[1]);
    client
}

#[tokio::test]
async fn refresh_reads_due_variables_and_recomputes_elements() {
    let client = seeded_client();
    let mut device = meter(client.clone());

    let report = device.refresh(100).await.expect("refresh");
    assert!(report.is_success());
    assert_eq!(report.variables.len(), 3);

    let voltage = device.variable("voltage").expect("voltage");
    assert_eq!(voltage.value(), &VariableValue::Float(123.321f32 as f64));
    assert_eq!(voltage.value_tick_id(), 100);
    assert_eq!(
        device.variable("current").expect("current").value(),
        &VariableValue::Int(-100)
    );
    assert_eq!(
        device.variable("breaker").expect("breaker").value(),
        &VariableValue::Bool(true)
    );

    let power = device.calc_element("power").expect("power");
    assert_eq!(power.value(), &VariableValue::Float(123.321f32 as f64 * 2.0));
    assert_eq!(power.value_tick_id(), 100);

    // sampleTime 2 的变量在奇数 tick 上不采样
    let report = device.refresh(101).await.expect("refresh");
    assert_eq!(report.variables.len(), 2);
    assert!(report.variable("current").is_none());
    assert_eq!(device.variable("current").expect("current").value_tick_id(), 100);
    assert_eq!(client.read_count(), 5);
}

#[tokio::test]
async fn failing_variable_does_not_block_siblings() {
    let client = seeded_client();
    client.fail_offset(20);
    let mut device = meter(client);

    let err = device.refresh(102).await.unwrap_err();
    let DeviceError::RefreshFailed { device_id, report } = err else {
        panic!("expected refresh failure");
    };
    assert_eq!(device_id, "meter");
    assert_eq!(report.failed_variables(), vec!["current"]);
    assert!(matches!(
        report.variable("current"),
        Some(Err(ReadError::Protocol(ProtocolError::Modbus(_))))
    ));
    assert!(matches!(report.variable("voltage"), Some(Ok(()))));

    assert_eq!(device.variable("voltage").expect("voltage").value_tick_id(), 102);
    assert_eq!(device.variable("current").expect("current").value_tick_id(), 0);
    assert_eq!(device.calc_element("power").expect("power").value_tick_id(), 102);
}

#[tokio::test]
async fn offline_device_reports_every_variable() {
    let client = seeded_client();
    client.set_offline(true);
    let mut device = meter(client);

    let err = device.refresh(10).await.unwrap_err();
    let DeviceError::RefreshFailed { report, .. } = err else {
        panic!("expected refresh failure");
    };
    assert_eq!(report.failed_variables().len(), 3);
}

#[tokio::test]
async fn failed_reads_are_not_counted_as_samples() {
    let config: DeviceConfig = serde_json::from_value(json!({
        "id": "flowmeter",
        "name": "flowmeter",
        "connection": {"protocol": "modbus", "ip": "127.0.0.1"},
        "variables": [
            {"id": "flow", "name": "flow", "type": "mbUInt16", "offset": 30, "fCode": 3}
        ],
        "calcElements": [
            {"id": "flowAvg", "name": "flow average", "type": "averageElement",
             "variableId": "flow", "calculationInterval": 4},
            {"id": "flowScaled", "name": "flow scaled", "type": "factorElement",
             "variableId": "flow", "factor": 10}
        ]
    }))
    .expect("device config");
    let client = Arc::new(MemoryClient::new());
    let protocol: Arc<dyn ProtocolClient> = client.clone();
    let mut device =
        Device::from_config(config, Some(protocol), &DeviceOptions::default()).expect("device");

    client.set_words(3, 30, &[100]);
    device.refresh(1).await.expect("refresh");
    assert_eq!(device.calc_element("flowScaled").expect("scaled").value_tick_id(), 1);

    client.set_offline(true);
    for tick in [2, 3] {
        let err = device.refresh(tick).await.unwrap_err();
        let DeviceError::RefreshFailed { report, .. } = err else {
            panic!("expected refresh failure");
        };
        assert!(report.elements.is_empty());
    }
    let scaled = device.calc_element("flowScaled").expect("scaled");
    assert_eq!(scaled.value(), &VariableValue::Float(1000.0));
    assert_eq!(scaled.value_tick_id(), 1);

    client.set_offline(false);
    client.set_words(3, 30, &[0]);
    device.refresh(4).await.expect("refresh");
    let average = device.calc_element("flowAvg").expect("average");
    assert_eq!(average.value(), &VariableValue::Float(50.0));
    assert_eq!(average.value_tick_id(), 4);
}

#[tokio::test]
async fn inactive_device_is_skipped() {
    let client = seeded_client();
    let mut device = meter(client.clone());
    device
        .edit(DeviceUpdate {
            is_active: Some(false),
            ..DeviceUpdate::default()
        })
        .expect("edit");

    let report = device.refresh(100).await.expect("refresh");
    assert!(report.variables.is_empty());
    assert_eq!(client.read_count(), 0);
}

#[tokio::test]
async fn device_without_client_fails_reads() {
    let mut device =
        Device::from_config(meter_config(), None, &DeviceOptions::default()).expect("device");
    let err = device.refresh(1).await.unwrap_err();
    assert!(matches!(err, DeviceError::RefreshFailed { .. }));
}

#[tokio::test]
async fn write_encodes_with_set_single_function_code() {
    let client = seeded_client();
    let mut device = meter(client.clone());
    device.refresh(100).await.expect("refresh");

    let written = device
        .write_variable("voltage", VariableValue::Float(-1.5))
        .await
        .expect("write");
    assert_eq!(written.value(), &VariableValue::Float(-1.5));
    assert_eq!(written.value_tick_id(), 100);
    assert_eq!(client.words(3, 10, 2), vec![0x0000, 0xBFC0]);
    assert_eq!(client.write_count(), 1);

    let err = device
        .write_variable("current", VariableValue::Int(40_000))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::Codec(_)));
    assert_eq!(client.write_count(), 1);
}

#[tokio::test]
async fn s7_write_requires_write_flag() {
    let config: DeviceConfig = serde_json::from_value(json!({
        "id": "plc",
        "name": "plc1200",
        "connection": {"protocol": "s7", "ip": "127.0.0.1", "rack": 0, "slot": 1},
        "variables": [
            {"id": "setpoint", "name": "setpoint", "type": "s7Float", "offset": 4, "areaType": "DB", "dbNumber": 3, "write": true},
            {"id": "status", "name": "status", "type": "s7UInt8", "offset": 0, "areaType": "M"}
        ]
    }))
    .expect("device config");
    let memory = Arc::new(MemoryClient::new());
    let client: Arc<dyn ProtocolClient> = memory.clone();
    let mut device = Device::from_config(config, Some(client), &DeviceOptions::default()).expect("device");

    device
        .write_variable("setpoint", VariableValue::Float(-1.5))
        .await
        .expect("write");
    device.refresh(1).await.expect("refresh");
    assert_eq!(
        device.variable("setpoint").expect("setpoint").value(),
        &VariableValue::Float(-1.5)
    );

    let err = device
        .write_variable("status", VariableValue::Int(1))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::NotWritable(_)));
}

#[tokio::test]
async fn structure_edits_are_validated() {
    let mut device = meter(seeded_client());

    let err = device.remove_variable("voltage").unwrap_err();
    assert!(matches!(
        err,
        DeviceError::Config(ConfigError::VariableInUse { .. })
    ));

    let duplicate: VariableConfig = serde_json::from_value(json!(
        {"id": "power", "name": "duplicate", "type": "mbUInt16", "offset": 30}
    ))
    .expect("variable");
    assert_eq!(
        device.add_variable(duplicate).unwrap_err(),
        ConfigError::DuplicateId("power".to_string())
    );

    let s7_variable: VariableConfig = serde_json::from_value(json!(
        {"id": "s7var", "name": "s7variable", "type": "s7Int16", "offset": 0, "areaType": "M"}
    ))
    .expect("variable");
    assert!(device.add_variable(s7_variable).is_err());

    let element = serde_json::from_value(json!(
        {"id": "avg", "name": "average", "type": "averageElement", "variableId": "missing", "calculationInterval": 15}
    ))
    .expect("element");
    let err = device.add_calc_element(element).await.unwrap_err();
    assert!(matches!(
        err,
        DeviceError::Config(ConfigError::MissingVariable(_))
    ));

    device.remove_calc_element("power").expect("remove element");
    let removed = device.remove_variable("voltage").expect("remove variable");
    assert_eq!(removed.id(), "voltage");
    assert_eq!(device.variables().len(), 2);
}

#[tokio::test]
async fn event_query_on_non_event_element_is_rejected() {
    let device = meter(seeded_client());

    let err = device.get_event_at("voltage", 1).unwrap_err();
    assert_eq!(err.to_string(), "element of type mbFloat does not have events");

    let err = device.get_event_at("power", 1).unwrap_err();
    assert!(matches!(
        err,
        DeviceError::NoEvents {
            type_name: "factorElement"
        }
    ));

    let err = device.get_event_at("4321", 1).unwrap_err();
    assert!(matches!(err, DeviceError::NotFound { .. }));
}
