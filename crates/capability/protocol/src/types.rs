//! 协议请求与响应类型定义

use serde::{Deserialize, Serialize};

/// Modbus 功能码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModbusFunctionCode {
    /// 读线圈状态 (0x01)
    ReadCoils = 1,
    /// 读离散输入 (0x02)
    ReadDiscreteInputs = 2,
    /// 读保持寄存器 (0x03)
    ReadHoldingRegisters = 3,
    /// 读输入寄存器 (0x04)
    ReadInputRegisters = 4,
    /// 写多个线圈 (0x0F)
    WriteMultipleCoils = 15,
    /// 写多个寄存器 (0x10)
    WriteMultipleRegisters = 16,
}

impl ModbusFunctionCode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::ReadCoils),
            2 => Some(Self::ReadDiscreteInputs),
            3 => Some(Self::ReadHoldingRegisters),
            4 => Some(Self::ReadInputRegisters),
            15 => Some(Self::WriteMultipleCoils),
            16 => Some(Self::WriteMultipleRegisters),
            _ => None,
        }
    }

    pub fn is_read(&self) -> bool {
        (*self as u8) <= 4
    }
}

/// S7 存储区（I / Q / M / DB）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum S7Area {
    #[serde(rename = "I")]
    Inputs,
    #[serde(rename = "Q")]
    Outputs,
    #[serde(rename = "M")]
    Memory,
    #[serde(rename = "DB")]
    DataBlock,
}

/// 读请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadRequest {
    Modbus {
        unit_id: u8,
        function_code: u8,
        offset: u16,
        /// 寄存器（或线圈）个数
        length: u16,
    },
    S7 {
        area: S7Area,
        db_number: u16,
        offset: u32,
        /// 字节数
        length: u16,
    },
}

/// 写请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    Modbus {
        unit_id: u8,
        function_code: u8,
        offset: u16,
        registers: Vec<u16>,
    },
    S7 {
        area: S7Area,
        db_number: u16,
        offset: u32,
        bytes: Vec<u8>,
    },
}

/// 原始响应数据
///
/// 线圈/离散输入以 0/1 字表示，供编解码层统一按寄存器处理。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawData {
    Words(Vec<u16>),
    Bytes(Vec<u8>),
}
