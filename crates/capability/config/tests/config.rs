use gw_config::{ConfigError, GatewayConfig, load_devices};
use std::io::Write;

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("GW_DEVICES_FILE", "/etc/gateway/devices.json");
        std::env::set_var("GW_TICK_INTERVAL_MS", "250");
        std::env::remove_var("GW_EVENT_DIR");
        std::env::remove_var("GW_DEFAULT_TIMEOUT_MS");
    }

    let config = GatewayConfig::from_env().expect("config");
    assert_eq!(config.devices_file.to_str(), Some("/etc/gateway/devices.json"));
    assert_eq!(config.event_dir.to_str(), Some("./data/events"));
    assert_eq!(config.tick_interval_ms, 250);
    assert_eq!(config.default_timeout().as_millis(), 2000);
}

#[test]
fn load_devices_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{"devices": [{{
            "id": "plc",
            "name": "line plc",
            "connection": {{"protocol": "s7", "ip": "10.0.0.5", "rack": 0, "slot": 2}},
            "variables": [
                {{"id": "speed", "name": "speed", "type": "s7Float", "offset": 4, "areaType": "DB", "dbNumber": 3}}
            ]
        }}]}}"#
    )
    .expect("write");

    let devices = load_devices(file.path()).expect("devices");
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, "plc");
    assert_eq!(devices[0].variables.len(), 1);
    assert!(devices[0].calc_elements.is_empty());
}

#[test]
fn broken_device_file_is_reported() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "{{\"devices\": [{{\"id\": 1}}]}}").expect("write");
    assert!(matches!(
        load_devices(file.path()),
        Err(ConfigError::DeviceFile(_, _))
    ));
    assert!(matches!(
        load_devices("/nonexistent/devices.json"),
        Err(ConfigError::DeviceFile(_, _))
    ));
}
