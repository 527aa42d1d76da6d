//! 设备定义（JSON，camelCase）
//!
//! ```json
//! {
//!   "id": "dev1",
//!   "name": "meter",
//!   "connection": { "protocol": "modbus", "ip": "10.0.0.5", "unitId": 1 },
//!   "variables": [{ "id": "v1", "name": "voltage", "type": "mbFloat", "offset": 10 }],
//!   "calcElements": [{ "id": "c1", "name": "power", "type": "factorElement", "variableId": "v1", "factor": 2 }]
//! }
//! ```

use domain::VariableValue;
use gw_protocol::S7Area;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_one() -> u32 {
    1
}

fn default_factor() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_modbus_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

fn default_s7_port() -> u16 {
    102
}

fn default_slot() -> u16 {
    1
}

/// 设备定义
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub variables: Vec<VariableConfig>,
    #[serde(default)]
    pub calc_elements: Vec<CalcElementConfig>,
}

/// 连接参数，按 `protocol` 区分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "camelCase")]
pub enum ConnectionConfig {
    #[serde(rename_all = "camelCase")]
    Modbus {
        ip: String,
        #[serde(default = "default_modbus_port")]
        port: u16,
        #[serde(default = "default_unit_id")]
        unit_id: u8,
        /// 毫秒；缺省时使用全局默认超时
        #[serde(default)]
        timeout: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    S7 {
        ip: String,
        #[serde(default = "default_s7_port")]
        port: u16,
        #[serde(default)]
        rack: u16,
        #[serde(default = "default_slot")]
        slot: u16,
        #[serde(default)]
        timeout: Option<u64>,
    },
    /// 无外部连接，仅承载计算元素和手工写入的变量
    Internal,
}

impl ConnectionConfig {
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            ConnectionConfig::Modbus { timeout, .. } | ConnectionConfig::S7 { timeout, .. } => {
                *timeout
            }
            ConnectionConfig::Internal => None,
        }
    }

    pub fn unit_id(&self) -> u8 {
        match self {
            ConnectionConfig::Modbus { unit_id, .. } => *unit_id,
            _ => default_unit_id(),
        }
    }
}

/// 变量定义
///
/// 字段是否生效取决于 `type`：Modbus 类型使用 `fCode`/`length`，
/// S7 类型使用 `areaType`/`dbNumber`/`write`/`length`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_one")]
    pub sample_time: u32,
    #[serde(default = "default_one")]
    pub archive_sample_time: u32,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub archived: bool,
    pub offset: u32,
    #[serde(default)]
    pub length: Option<u16>,
    #[serde(default)]
    pub f_code: Option<u8>,
    #[serde(default)]
    pub area_type: Option<S7Area>,
    #[serde(default)]
    pub db_number: Option<u32>,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub value: Option<VariableValue>,
}

/// 变量编辑：只修改给出的字段，类型不可修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableUpdate {
    pub name: Option<String>,
    pub sample_time: Option<u32>,
    pub archive_sample_time: Option<u32>,
    pub unit: Option<String>,
    pub archived: Option<bool>,
    pub offset: Option<u32>,
    pub length: Option<u16>,
    pub f_code: Option<u8>,
    pub area_type: Option<S7Area>,
    pub db_number: Option<u32>,
    pub write: Option<bool>,
    pub value: Option<VariableValue>,
}

/// 设备编辑
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

/// 计算元素定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalcElementConfig {
    pub id: String,
    pub name: String,
    #[serde(default = "default_one")]
    pub sample_time: u32,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(flatten)]
    pub kind: CalcKindConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalcKindConfig {
    #[serde(rename = "averageElement", rename_all = "camelCase")]
    Average {
        variable_id: String,
        #[serde(default = "default_factor")]
        factor: f64,
        calculation_interval: u32,
    },
    #[serde(rename = "factorElement", rename_all = "camelCase")]
    Factor {
        variable_id: String,
        #[serde(default = "default_factor")]
        factor: f64,
    },
    #[serde(rename = "increaseElement", rename_all = "camelCase")]
    Increase {
        variable_id: String,
        #[serde(default = "default_factor")]
        factor: f64,
        calculation_interval: u32,
        overflow: f64,
    },
    #[serde(rename = "sumElement", rename_all = "camelCase")]
    Sum { variables: Vec<SumSource> },
    #[serde(rename = "eventLogElement", rename_all = "camelCase")]
    EventLog {
        log_variables: Vec<LogVariable>,
        #[serde(default)]
        event_descriptions: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumSource {
    pub id: String,
    #[serde(default = "default_factor")]
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogVariable {
    pub tick_var_id: String,
    pub value_var_id: String,
}
