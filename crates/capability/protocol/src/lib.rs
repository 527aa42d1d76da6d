//! # 协议通信能力模块
//!
//! 核心层与物理传输之间的边界：
//! - **ProtocolClient**：`read` / `write` 原语，调用方给定超时
//! - **Modbus TCP**：基于 tokio-modbus 的客户端实现
//! - **MemoryClient**：内存模拟设备（测试与离线演示）
//!
//! S7 传输由外部客户端实现 `ProtocolClient` 接入，本模块只定义请求格式。
//!
//! ## 架构设计
//!
//! ```text
//! Device.refresh(tick)
//!       │  ReadRequest::{Modbus, S7}
//!       ▼
//! dyn ProtocolClient
//!       ├── ModbusTcpClient
//!       ├── MemoryClient
//!       └── （外部 S7 客户端）
//!       │
//!       ▼
//! RawData::{Words, Bytes} → gw-codec
//! ```

mod client;
mod error;
mod memory;
mod modbus_tcp;
mod types;

pub use client::ProtocolClient;
pub use error::ProtocolError;
pub use memory::MemoryClient;
pub use modbus_tcp::{ModbusTcpClient, ModbusTcpConfig};
pub use types::*;
