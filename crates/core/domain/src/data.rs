use serde::{Deserialize, Serialize};

/// 变量的语义值。
///
/// JSON 表示为裸值：`true`、`12`、`1.5`、`[0, 1]`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
}

impl VariableValue {
    /// 数值视图（布尔按 0/1 计）；字节数组没有数值含义。
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            VariableValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            VariableValue::Int(v) => Some(*v as f64),
            VariableValue::Float(v) => Some(*v),
            VariableValue::Bytes(_) => None,
        }
    }

    /// 整数视图；浮点值向零截断，非有限值返回 None。
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            VariableValue::Bool(v) => Some(i64::from(*v)),
            VariableValue::Int(v) => Some(*v),
            VariableValue::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            VariableValue::Float(_) | VariableValue::Bytes(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VariableValue::Bool(v) => Some(*v),
            VariableValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            VariableValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for VariableValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableValue::Bool(v) => write!(f, "{}", v),
            VariableValue::Int(v) => write!(f, "{}", v),
            VariableValue::Float(v) => write!(f, "{}", v),
            VariableValue::Bytes(v) => write!(f, "{:?}", v),
        }
    }
}

/// 事件缓冲中的一条记录。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_id: i64,
    pub tick_id: i64,
    pub value: i64,
}
