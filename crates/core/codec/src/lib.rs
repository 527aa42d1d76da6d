//! # 变量编解码模块
//!
//! 纯函数：类型描述 + 原始数据 ⇄ 语义值，无 I/O、无状态。
//!
//! - **Modbus**：以 16 位寄存器字（`u16`）为单位
//! - **S7**：以字节（`u8`）为单位，大端、自然顺序
//!
//! ## 字序约定（Modbus）
//!
//! ```text
//! mbInt32 / mbUInt32           [hi, lo]
//! mbSwappedInt32 / UInt32      [lo, hi]
//! mbFloat                      [lo, hi]   寄存器交换 + 寄存器内字节交换
//! mbSwappedFloat               [hi, lo]
//! ```
//!
//! `mbFloat` 的双重交换来自特定设备族，属于固定契约。

mod error;
mod modbus;
mod s7;

pub use error::CodecError;
pub use modbus::{ModbusDataType, decode_modbus, encode_modbus};
pub use s7::{S7DataType, decode_s7, encode_s7};

use domain::VariableValue;

/// 取出整数值：接受 Int 或无小数部分的 Float。
pub(crate) fn integer_of(
    data_type: &'static str,
    value: &VariableValue,
    min: i64,
    max: i64,
) -> Result<i64, CodecError> {
    let raw = match value {
        VariableValue::Int(v) => *v,
        VariableValue::Float(v) if v.is_finite() && v.fract() == 0.0 => *v as i64,
        other => {
            return Err(CodecError::ValueType {
                data_type,
                value: other.to_string(),
            });
        }
    };
    if raw < min || raw > max {
        return Err(CodecError::OutOfRange {
            data_type,
            value: raw,
        });
    }
    Ok(raw)
}

pub(crate) fn float_of(data_type: &'static str, value: &VariableValue) -> Result<f32, CodecError> {
    match value {
        VariableValue::Float(v) => Ok(*v as f32),
        VariableValue::Int(v) => Ok(*v as f32),
        other => Err(CodecError::ValueType {
            data_type,
            value: other.to_string(),
        }),
    }
}

pub(crate) fn bytes_of<'a>(
    data_type: &'static str,
    value: &'a VariableValue,
    expected: usize,
) -> Result<&'a [u8], CodecError> {
    let bytes = value.as_bytes().ok_or_else(|| CodecError::ValueType {
        data_type,
        value: value.to_string(),
    })?;
    error::check_width(expected, bytes.len())?;
    Ok(bytes)
}
