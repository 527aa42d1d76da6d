//! # 设备能力模块
//!
//! - **Variable**：协议地址 + 当前值，构造/编辑时完成全部配置校验
//! - **Device**：变量与计算元素的所有者，`refresh(tick)` 编排一次刷新
//! - **CalcElement**：平均值、比例、增量、加权求和、事件日志
//!
//! ## 数据流
//!
//! ```text
//! Device.refresh(tick)
//!   ├── Variable（到期的）→ ProtocolClient.read → gw-codec decode → value / valueTickId
//!   └── CalcElement（到期的）→ 读取同设备变量 → value
//!                              └── EventLog → EventBuffer.add_event
//! ```

pub mod calc;
pub mod config;
pub mod device;
pub mod error;
pub mod report;
pub mod variable;

pub use calc::{CalcElement, CalcKind, ElementContext, EventLabel, EventLog};
pub use config::*;
pub use device::{Device, DeviceOptions};
pub use error::{ConfigError, DeviceError, ReadError};
pub use report::RefreshReport;
pub use variable::{Address, ModbusAddress, S7Address, Variable};
