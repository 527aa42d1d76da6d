//! 设备定义 → 运行时设备

use gw_config::GatewayConfig;
use gw_device::{ConnectionConfig, Device, DeviceConfig, DeviceError, DeviceOptions};
use gw_protocol::{ModbusTcpClient, ModbusTcpConfig, ProtocolClient};
use std::sync::Arc;
use tracing::{info, warn};

/// 按连接参数创建协议客户端；S7 传输不在本进程内实现
pub fn build_client(
    connection: &ConnectionConfig,
    config: &GatewayConfig,
) -> Option<Arc<dyn ProtocolClient>> {
    match connection {
        ConnectionConfig::Modbus { ip, port, .. } => {
            let client = ModbusTcpClient::new(ModbusTcpConfig {
                host: ip.clone(),
                port: *port,
                connect_timeout_ms: connection.timeout_ms().unwrap_or(config.default_timeout_ms),
            });
            Some(Arc::new(client))
        }
        ConnectionConfig::S7 { .. } | ConnectionConfig::Internal => None,
    }
}

/// 构造并初始化全部设备（打开 EventLog 的事件缓冲）
pub async fn build_devices(
    definitions: Vec<DeviceConfig>,
    config: &GatewayConfig,
) -> Result<Vec<Device>, DeviceError> {
    let options = DeviceOptions {
        event_dir: config.event_dir.clone(),
        default_timeout: config.default_timeout(),
    };

    let mut devices = Vec::with_capacity(definitions.len());
    for definition in definitions {
        let client = build_client(&definition.connection, config);
        if client.is_none() && matches!(definition.connection, ConnectionConfig::S7 { .. }) {
            warn!(device_id = %definition.id, "no s7 transport available, device reads will fail");
        }
        let mut device = Device::from_config(definition, client, &options)?;
        device.init().await?;
        info!(
            device_id = %device.id(),
            variables = device.variables().len(),
            calc_elements = device.calc_elements().len(),
            "device ready"
        );
        devices.push(device);
    }
    Ok(devices)
}
