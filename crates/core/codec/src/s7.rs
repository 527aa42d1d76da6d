//! S7 字节编解码（大端、自然顺序）

use crate::error::{CodecError, check_width};
use crate::{bytes_of, float_of, integer_of};
use domain::VariableValue;

/// S7 变量数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum S7DataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float,
    /// 不透明字节序列，参数为字节数
    ByteArray(u16),
}

impl S7DataType {
    pub fn byte_len(&self) -> usize {
        match self {
            S7DataType::Int8 | S7DataType::UInt8 => 1,
            S7DataType::Int16 | S7DataType::UInt16 => 2,
            S7DataType::Int32 | S7DataType::UInt32 | S7DataType::Float => 4,
            S7DataType::ByteArray(length) => *length as usize,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            S7DataType::Int8 => "s7Int8",
            S7DataType::UInt8 => "s7UInt8",
            S7DataType::Int16 => "s7Int16",
            S7DataType::UInt16 => "s7UInt16",
            S7DataType::Int32 => "s7Int32",
            S7DataType::UInt32 => "s7UInt32",
            S7DataType::Float => "s7Float",
            S7DataType::ByteArray(_) => "s7ByteArray",
        }
    }

    pub fn default_value(&self) -> VariableValue {
        match self {
            S7DataType::Float => VariableValue::Float(0.0),
            S7DataType::ByteArray(length) => VariableValue::Bytes(vec![0; *length as usize]),
            _ => VariableValue::Int(0),
        }
    }
}

/// 字节 → 语义值
pub fn decode_s7(data_type: S7DataType, bytes: &[u8]) -> Result<VariableValue, CodecError> {
    check_width(data_type.byte_len(), bytes.len())?;

    let value = match data_type {
        S7DataType::Int8 => VariableValue::Int(bytes[0] as i8 as i64),
        S7DataType::UInt8 => VariableValue::Int(bytes[0] as i64),
        S7DataType::Int16 => VariableValue::Int(i16::from_be_bytes([bytes[0], bytes[1]]) as i64),
        S7DataType::UInt16 => VariableValue::Int(u16::from_be_bytes([bytes[0], bytes[1]]) as i64),
        S7DataType::Int32 => VariableValue::Int(i32::from_be_bytes(quad(bytes)) as i64),
        S7DataType::UInt32 => VariableValue::Int(u32::from_be_bytes(quad(bytes)) as i64),
        S7DataType::Float => VariableValue::Float(f32::from_be_bytes(quad(bytes)) as f64),
        S7DataType::ByteArray(_) => VariableValue::Bytes(bytes.to_vec()),
    };

    Ok(value)
}

/// 语义值 → 字节
pub fn encode_s7(data_type: S7DataType, value: &VariableValue) -> Result<Vec<u8>, CodecError> {
    let name = data_type.name();
    let bytes = match data_type {
        S7DataType::Int8 => {
            vec![integer_of(name, value, i8::MIN as i64, i8::MAX as i64)? as i8 as u8]
        }
        S7DataType::UInt8 => vec![integer_of(name, value, 0, u8::MAX as i64)? as u8],
        S7DataType::Int16 => (integer_of(name, value, i16::MIN as i64, i16::MAX as i64)? as i16)
            .to_be_bytes()
            .to_vec(),
        S7DataType::UInt16 => (integer_of(name, value, 0, u16::MAX as i64)? as u16)
            .to_be_bytes()
            .to_vec(),
        S7DataType::Int32 => (integer_of(name, value, i32::MIN as i64, i32::MAX as i64)? as i32)
            .to_be_bytes()
            .to_vec(),
        S7DataType::UInt32 => (integer_of(name, value, 0, u32::MAX as i64)? as u32)
            .to_be_bytes()
            .to_vec(),
        S7DataType::Float => float_of(name, value)?.to_be_bytes().to_vec(),
        S7DataType::ByteArray(length) => bytes_of(name, value, length as usize)?.to_vec(),
    };

    Ok(bytes)
}

fn quad(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_reads_transmitted_order() {
        let value = decode_s7(S7DataType::Float, &[0x42, 0xF6, 0xA4, 0x1A]).unwrap();
        let VariableValue::Float(value) = value else {
            panic!("expected float");
        };
        assert!((value - 123.32).abs() < 1e-3);
    }

    #[test]
    fn int8_sign_extends() {
        assert_eq!(
            decode_s7(S7DataType::Int8, &[0xFF]).unwrap(),
            VariableValue::Int(-1)
        );
        assert_eq!(
            decode_s7(S7DataType::UInt8, &[0xFF]).unwrap(),
            VariableValue::Int(255)
        );
    }

    #[test]
    fn int32_is_big_endian() {
        assert_eq!(
            encode_s7(S7DataType::Int32, &VariableValue::Int(-123456)).unwrap(),
            vec![0xFF, 0xFE, 0x1D, 0xC0]
        );
    }

    #[test]
    fn short_input_is_malformed() {
        assert!(matches!(
            decode_s7(S7DataType::UInt16, &[1]),
            Err(CodecError::MalformedData {
                expected: 2,
                actual: 1
            })
        ));
    }
}
