//! 单次刷新的结果汇总

use crate::error::ReadError;
use gw_storage::StorageError;

/// 设备一次刷新的逐项结果，按声明顺序排列
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub tick: i64,
    pub variables: Vec<(String, Result<(), ReadError>)>,
    pub elements: Vec<(String, Result<(), StorageError>)>,
}

impl RefreshReport {
    pub fn new(tick: i64) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.variables.iter().all(|(_, result)| result.is_ok())
            && self.elements.iter().all(|(_, result)| result.is_ok())
    }

    /// 变量结果；未在本 tick 采样的变量返回 None
    pub fn variable(&self, id: &str) -> Option<&Result<(), ReadError>> {
        self.variables
            .iter()
            .find(|(variable_id, _)| variable_id == id)
            .map(|(_, result)| result)
    }

    pub fn failed_variables(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn failed_elements(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
