//! Modbus TCP 客户端实现
//!
//! 首次请求时建立连接；请求失败后丢弃连接，下一次请求重新连接。
//! 不做重试。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let config = ModbusTcpConfig {
//!     host: "192.168.1.100".to_string(),
//!     port: 502,
//!     connect_timeout_ms: 5000,
//! };
//! let client = ModbusTcpClient::new(config);
//! let data = client.read(&request, Duration::from_secs(2)).await?;
//! ```

use crate::client::ProtocolClient;
use crate::error::ProtocolError;
use crate::types::{ModbusFunctionCode, RawData, ReadRequest, WriteRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::{debug, info, warn};

/// Modbus TCP 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusTcpConfig {
    /// Modbus 服务器主机地址
    pub host: String,
    /// Modbus 服务器端口（默认 502）
    #[serde(default = "default_modbus_port")]
    pub port: u16,
    /// 连接超时（毫秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_modbus_port() -> u16 {
    502
}

fn default_connect_timeout() -> u64 {
    5000
}

/// Modbus TCP 客户端
///
/// 同一连接上的请求通过内部互斥锁串行执行（Modbus 事务不可交错）。
pub struct ModbusTcpClient {
    config: ModbusTcpConfig,
    ctx: Mutex<Option<Context>>,
}

impl ModbusTcpClient {
    /// 创建新的 Modbus TCP 客户端（不立即连接）
    pub fn new(config: ModbusTcpConfig) -> Self {
        Self {
            config,
            ctx: Mutex::new(None),
        }
    }

    /// 从 JSON 配置字符串解析
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let config: ModbusTcpConfig =
            serde_json::from_str(json).map_err(|e| ProtocolError::ConfigParse(e.to_string()))?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &ModbusTcpConfig {
        &self.config
    }

    fn socket_addr(&self) -> Result<SocketAddr, ProtocolError> {
        format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| ProtocolError::ConfigParse(format!("invalid address: {}", e)))
    }

    async fn connect(&self) -> Result<Context, ProtocolError> {
        let addr = self.socket_addr()?;
        info!("connecting to modbus server at {}", addr);

        let ctx = with_timeout(
            Duration::from_millis(self.config.connect_timeout_ms),
            "connect",
            async {
                tcp::connect(addr)
                    .await
                    .map_err(|e| ProtocolError::Connection(e.to_string()))
            },
        )
        .await?;

        info!("connected to modbus server at {}", addr);
        Ok(ctx)
    }
}

#[async_trait]
impl ProtocolClient for ModbusTcpClient {
    async fn read(&self, request: &ReadRequest, timeout: Duration) -> Result<RawData, ProtocolError> {
        let ReadRequest::Modbus {
            unit_id,
            function_code,
            offset,
            length,
        } = request
        else {
            return Err(ProtocolError::Unsupported(
                "modbus client cannot serve s7 read".to_string(),
            ));
        };

        let mut guard = self.ctx.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(ctx) = guard.as_mut() else {
            return Err(ProtocolError::Connection("not connected".to_string()));
        };
        ctx.set_slave(Slave(*unit_id));

        let result = with_timeout(timeout, "read", read_registers(ctx, *function_code, *offset, *length)).await;
        match result {
            Ok(words) => {
                debug!(
                    slave = unit_id,
                    function_code = function_code,
                    register = offset,
                    count = length,
                    values = ?words,
                    "read modbus registers"
                );
                if words.len() != *length as usize {
                    return Err(ProtocolError::DataParse(format!(
                        "expected {} values, got {}",
                        length,
                        words.len()
                    )));
                }
                Ok(RawData::Words(words))
            }
            Err(e) => {
                warn!(
                    slave = unit_id,
                    register = offset,
                    error = %e,
                    "modbus read failed, dropping connection"
                );
                *guard = None;
                Err(e)
            }
        }
    }

    async fn write(&self, request: &WriteRequest, timeout: Duration) -> Result<(), ProtocolError> {
        let WriteRequest::Modbus {
            unit_id,
            function_code,
            offset,
            registers,
        } = request
        else {
            return Err(ProtocolError::Unsupported(
                "modbus client cannot serve s7 write".to_string(),
            ));
        };

        let mut guard = self.ctx.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(ctx) = guard.as_mut() else {
            return Err(ProtocolError::Connection("not connected".to_string()));
        };
        ctx.set_slave(Slave(*unit_id));

        let result = with_timeout(
            timeout,
            "write",
            write_registers(ctx, *function_code, *offset, registers),
        )
        .await;
        if let Err(e) = &result {
            warn!(
                slave = unit_id,
                register = offset,
                error = %e,
                "modbus write failed, dropping connection"
            );
            *guard = None;
        }
        result
    }
}

async fn read_registers(
    ctx: &mut Context,
    function_code: u8,
    offset: u16,
    length: u16,
) -> Result<Vec<u16>, ProtocolError> {
    let words = match ModbusFunctionCode::from_code(function_code) {
        Some(ModbusFunctionCode::ReadCoils) => bits_to_words(
            ctx.read_coils(offset, length)
                .await
                .map_err(|e| ProtocolError::Modbus(e.to_string()))?
                .map_err(|e| ProtocolError::Modbus(format!("exception: {:?}", e)))?,
            length,
        ),
        Some(ModbusFunctionCode::ReadDiscreteInputs) => bits_to_words(
            ctx.read_discrete_inputs(offset, length)
                .await
                .map_err(|e| ProtocolError::Modbus(e.to_string()))?
                .map_err(|e| ProtocolError::Modbus(format!("exception: {:?}", e)))?,
            length,
        ),
        Some(ModbusFunctionCode::ReadHoldingRegisters) => ctx
            .read_holding_registers(offset, length)
            .await
            .map_err(|e| ProtocolError::Modbus(e.to_string()))?
            .map_err(|e| ProtocolError::Modbus(format!("exception: {:?}", e)))?,
        Some(ModbusFunctionCode::ReadInputRegisters) => ctx
            .read_input_registers(offset, length)
            .await
            .map_err(|e| ProtocolError::Modbus(e.to_string()))?
            .map_err(|e| ProtocolError::Modbus(format!("exception: {:?}", e)))?,
        _ => {
            return Err(ProtocolError::Unsupported(format!(
                "read function code: {}",
                function_code
            )));
        }
    };
    Ok(words)
}

async fn write_registers(
    ctx: &mut Context,
    function_code: u8,
    offset: u16,
    registers: &[u16],
) -> Result<(), ProtocolError> {
    match ModbusFunctionCode::from_code(function_code) {
        Some(ModbusFunctionCode::WriteMultipleRegisters) => ctx
            .write_multiple_registers(offset, registers)
            .await
            .map_err(|e| ProtocolError::Modbus(e.to_string()))?
            .map_err(|e| ProtocolError::Modbus(format!("exception: {:?}", e))),
        Some(ModbusFunctionCode::WriteMultipleCoils) => {
            let coils: Vec<bool> = registers.iter().map(|word| *word != 0).collect();
            ctx.write_multiple_coils(offset, &coils)
                .await
                .map_err(|e| ProtocolError::Modbus(e.to_string()))?
                .map_err(|e| ProtocolError::Modbus(format!("exception: {:?}", e)))
        }
        _ => Err(ProtocolError::Unsupported(format!(
            "write function code: {}",
            function_code
        ))),
    }
}

async fn with_timeout<T, F>(timeout: Duration, operation: &str, fut: F) -> Result<T, ProtocolError>
where
    F: Future<Output = Result<T, ProtocolError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| ProtocolError::Timeout(format!("{} after {}ms", operation, timeout.as_millis())))?
}

/// 线圈响应按字节补齐，需截断到请求个数
fn bits_to_words(bits: Vec<bool>, length: u16) -> Vec<u16> {
    bits.into_iter()
        .take(length as usize)
        .map(u16::from)
        .collect()
}
