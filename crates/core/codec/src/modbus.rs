//! Modbus 寄存器编解码

use crate::error::{CodecError, check_width};
use crate::{bytes_of, float_of, integer_of};
use domain::VariableValue;

/// Modbus 变量数据类型
///
/// 线圈/离散输入由协议层映射为 0/1 寄存器字，因此布尔值同样按 1 个字处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModbusDataType {
    Boolean,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float,
    SwappedInt32,
    SwappedUInt32,
    SwappedFloat,
    /// 不透明字节序列，参数为寄存器个数
    ByteArray(u16),
}

impl ModbusDataType {
    /// 占用的寄存器个数
    pub fn word_len(&self) -> usize {
        match self {
            ModbusDataType::Boolean | ModbusDataType::Int16 | ModbusDataType::UInt16 => 1,
            ModbusDataType::Int32
            | ModbusDataType::UInt32
            | ModbusDataType::Float
            | ModbusDataType::SwappedInt32
            | ModbusDataType::SwappedUInt32
            | ModbusDataType::SwappedFloat => 2,
            ModbusDataType::ByteArray(length) => *length as usize,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModbusDataType::Boolean => "mbBoolean",
            ModbusDataType::Int16 => "mbInt16",
            ModbusDataType::UInt16 => "mbUInt16",
            ModbusDataType::Int32 => "mbInt32",
            ModbusDataType::UInt32 => "mbUInt32",
            ModbusDataType::Float => "mbFloat",
            ModbusDataType::SwappedInt32 => "mbSwappedInt32",
            ModbusDataType::SwappedUInt32 => "mbSwappedUInt32",
            ModbusDataType::SwappedFloat => "mbSwappedFloat",
            ModbusDataType::ByteArray(_) => "mbByteArray",
        }
    }

    /// 新建变量或修改长度后的默认值
    pub fn default_value(&self) -> VariableValue {
        match self {
            ModbusDataType::Boolean => VariableValue::Bool(false),
            ModbusDataType::Float | ModbusDataType::SwappedFloat => VariableValue::Float(0.0),
            ModbusDataType::ByteArray(length) => VariableValue::Bytes(vec![0; *length as usize * 2]),
            _ => VariableValue::Int(0),
        }
    }
}

/// 寄存器字 → 语义值
pub fn decode_modbus(
    data_type: ModbusDataType,
    registers: &[u16],
) -> Result<VariableValue, CodecError> {
    check_width(data_type.word_len(), registers.len())?;

    let value = match data_type {
        ModbusDataType::Boolean => VariableValue::Bool(registers[0] != 0),
        ModbusDataType::Int16 => VariableValue::Int(registers[0] as i16 as i64),
        ModbusDataType::UInt16 => VariableValue::Int(registers[0] as i64),
        ModbusDataType::Int32 => VariableValue::Int(join(registers[0], registers[1]) as i32 as i64),
        ModbusDataType::UInt32 => VariableValue::Int(join(registers[0], registers[1]) as i64),
        ModbusDataType::SwappedInt32 => {
            VariableValue::Int(join(registers[1], registers[0]) as i32 as i64)
        }
        ModbusDataType::SwappedUInt32 => VariableValue::Int(join(registers[1], registers[0]) as i64),
        ModbusDataType::Float => {
            // [hi(w1), lo(w1), hi(w0), lo(w0)] 按大端读取
            let [w0_hi, w0_lo] = registers[0].to_be_bytes();
            let [w1_hi, w1_lo] = registers[1].to_be_bytes();
            let value = f32::from_be_bytes([w1_hi, w1_lo, w0_hi, w0_lo]);
            VariableValue::Float(value as f64)
        }
        ModbusDataType::SwappedFloat => {
            VariableValue::Float(f32::from_bits(join(registers[0], registers[1])) as f64)
        }
        ModbusDataType::ByteArray(_) => VariableValue::Bytes(
            registers
                .iter()
                .flat_map(|word| word.to_be_bytes())
                .collect(),
        ),
    };

    Ok(value)
}

/// 语义值 → 寄存器字
pub fn encode_modbus(
    data_type: ModbusDataType,
    value: &VariableValue,
) -> Result<Vec<u16>, CodecError> {
    let name = data_type.name();
    let registers = match data_type {
        ModbusDataType::Boolean => {
            let flag = match value {
                VariableValue::Bool(v) => *v,
                other => integer_of(name, other, 0, 1)? == 1,
            };
            vec![u16::from(flag)]
        }
        ModbusDataType::Int16 => {
            vec![integer_of(name, value, i16::MIN as i64, i16::MAX as i64)? as i16 as u16]
        }
        ModbusDataType::UInt16 => vec![integer_of(name, value, 0, u16::MAX as i64)? as u16],
        ModbusDataType::Int32 => {
            let raw = integer_of(name, value, i32::MIN as i64, i32::MAX as i64)? as i32 as u32;
            split(raw).to_vec()
        }
        ModbusDataType::UInt32 => {
            let raw = integer_of(name, value, 0, u32::MAX as i64)? as u32;
            split(raw).to_vec()
        }
        ModbusDataType::SwappedInt32 => {
            let raw = integer_of(name, value, i32::MIN as i64, i32::MAX as i64)? as i32 as u32;
            let [hi, lo] = split(raw);
            vec![lo, hi]
        }
        ModbusDataType::SwappedUInt32 => {
            let raw = integer_of(name, value, 0, u32::MAX as i64)? as u32;
            let [hi, lo] = split(raw);
            vec![lo, hi]
        }
        ModbusDataType::Float => {
            let [b0, b1, b2, b3] = float_of(name, value)?.to_be_bytes();
            vec![u16::from_be_bytes([b2, b3]), u16::from_be_bytes([b0, b1])]
        }
        ModbusDataType::SwappedFloat => split(float_of(name, value)?.to_bits()).to_vec(),
        ModbusDataType::ByteArray(length) => {
            let bytes = bytes_of(name, value, length as usize * 2)?;
            bytes
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect()
        }
    };

    Ok(registers)
}

fn join(hi: u16, lo: u16) -> u32 {
    ((hi as u32) << 16) | lo as u32
}

fn split(raw: u32) -> [u16; 2] {
    [(raw >> 16) as u16, raw as u16]
}
