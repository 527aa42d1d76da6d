//! 设备层错误类型

use crate::report::RefreshReport;
use gw_codec::CodecError;
use gw_protocol::ProtocolError;
use gw_storage::StorageError;

/// 配置错误：变量或计算元素定义非法
///
/// 只在创建/编辑时出现，不会在刷新过程中出现。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown variable type: {0}")]
    UnknownType(String),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("source variable not found: {0}")]
    MissingVariable(String),

    #[error("variable {variable_id} is used by calc element {element_id}")]
    VariableInUse {
        variable_id: String,
        element_id: String,
    },

    #[error(transparent)]
    Value(#[from] CodecError),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// 单个变量读取失败
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReadError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// 设备操作错误
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// 刷新中有变量读取或计算元素失败；成功的部分已生效
    #[error(
        "device {device_id} refresh failed: {} variable(s), {} element(s)",
        .report.failed_variables().len(),
        .report.failed_elements().len()
    )]
    RefreshFailed {
        device_id: String,
        report: RefreshReport,
    },

    #[error("there is no {kind} of id {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("element of type {type_name} does not have events")]
    NoEvents { type_name: &'static str },

    #[error("variable {0} is not writable")]
    NotWritable(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
