//! 内存协议客户端
//!
//! 模拟一台设备的寄存器/存储区，用于本地测试和离线演示。

use crate::client::ProtocolClient;
use crate::error::ProtocolError;
use crate::types::{RawData, ReadRequest, S7Area, WriteRequest};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;

#[derive(Default)]
struct MemoryState {
    /// (寄存器表, 地址) -> 字；寄存器表：1 线圈、2 离散输入、3 保持、4 输入
    words: HashMap<(u8, u16), u16>,
    /// (存储区, DB 号) -> 字节
    areas: HashMap<(S7Area, u16), Vec<u8>>,
    offline: bool,
    failing_offsets: HashSet<u32>,
    reads: usize,
    writes: usize,
}

/// 内存协议客户端
#[derive(Default)]
pub struct MemoryClient {
    state: RwLock<MemoryState>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入 Modbus 寄存器表（1/2/3/4）
    pub fn set_words(&self, table: u8, offset: u16, words: &[u16]) {
        if let Ok(mut state) = self.state.write() {
            for (index, word) in words.iter().enumerate() {
                state.words.insert((table, offset + index as u16), *word);
            }
        }
    }

    /// 写入 S7 存储区
    pub fn set_bytes(&self, area: S7Area, db_number: u16, offset: u32, bytes: &[u8]) {
        if let Ok(mut state) = self.state.write() {
            let block = state.areas.entry((area, db_number)).or_default();
            let end = offset as usize + bytes.len();
            if block.len() < end {
                block.resize(end, 0);
            }
            block[offset as usize..end].copy_from_slice(bytes);
        }
    }

    /// 模拟设备离线：所有请求返回连接错误
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.state.write() {
            state.offline = offline;
        }
    }

    /// 指定起始地址的读请求返回异常
    pub fn fail_offset(&self, offset: u32) {
        if let Ok(mut state) = self.state.write() {
            state.failing_offsets.insert(offset);
        }
    }

    pub fn words(&self, table: u8, offset: u16, length: u16) -> Vec<u16> {
        self.state
            .read()
            .map(|state| {
                (0..length)
                    .map(|index| {
                        state
                            .words
                            .get(&(table, offset + index))
                            .copied()
                            .unwrap_or(0)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 已处理的读请求数（用于测试）
    pub fn read_count(&self) -> usize {
        self.state.read().map(|state| state.reads).unwrap_or(0)
    }

    pub fn write_count(&self) -> usize {
        self.state.read().map(|state| state.writes).unwrap_or(0)
    }
}

#[async_trait]
impl ProtocolClient for MemoryClient {
    async fn read(&self, request: &ReadRequest, _timeout: Duration) -> Result<RawData, ProtocolError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ProtocolError::Connection("lock failed".to_string()))?;
        if state.offline {
            return Err(ProtocolError::Connection("device offline".to_string()));
        }
        state.reads += 1;

        match request {
            ReadRequest::Modbus {
                function_code,
                offset,
                length,
                ..
            } => {
                if state.failing_offsets.contains(&(*offset as u32)) {
                    return Err(ProtocolError::Modbus(format!(
                        "exception: IllegalDataAddress at {}",
                        offset
                    )));
                }
                if !(1..=4).contains(function_code) {
                    return Err(ProtocolError::Unsupported(format!(
                        "read function code: {}",
                        function_code
                    )));
                }
                let words = (0..*length)
                    .map(|index| {
                        state
                            .words
                            .get(&(*function_code, offset + index))
                            .copied()
                            .unwrap_or(0)
                    })
                    .collect();
                Ok(RawData::Words(words))
            }
            ReadRequest::S7 {
                area,
                db_number,
                offset,
                length,
            } => {
                if state.failing_offsets.contains(offset) {
                    return Err(ProtocolError::DataParse(format!(
                        "address out of range at {}",
                        offset
                    )));
                }
                let block = state.areas.get(&(*area, *db_number));
                let bytes = (0..*length as usize)
                    .map(|index| {
                        block
                            .and_then(|block| block.get(*offset as usize + index))
                            .copied()
                            .unwrap_or(0)
                    })
                    .collect();
                Ok(RawData::Bytes(bytes))
            }
        }
    }

    async fn write(&self, request: &WriteRequest, _timeout: Duration) -> Result<(), ProtocolError> {
        {
            let state = self
                .state
                .read()
                .map_err(|_| ProtocolError::Connection("lock failed".to_string()))?;
            if state.offline {
                return Err(ProtocolError::Connection("device offline".to_string()));
            }
        }

        match request {
            WriteRequest::Modbus {
                function_code,
                offset,
                registers,
                ..
            } => {
                let table = match function_code {
                    15 => 1,
                    16 => 3,
                    other => {
                        return Err(ProtocolError::Unsupported(format!(
                            "write function code: {}",
                            other
                        )));
                    }
                };
                self.set_words(table, *offset, registers);
            }
            WriteRequest::S7 {
                area,
                db_number,
                offset,
                bytes,
            } => self.set_bytes(*area, *db_number, *offset, bytes),
        }

        if let Ok(mut state) = self.state.write() {
            state.writes += 1;
        }
        Ok(())
    }
}
