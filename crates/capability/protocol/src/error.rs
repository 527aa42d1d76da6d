//! 协议错误类型定义

/// 协议通信错误
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolError {
    /// 连接错误
    #[error("connection error: {0}")]
    Connection(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(String),

    /// Modbus 错误（传输失败或异常响应）
    #[error("modbus error: {0}")]
    Modbus(String),

    /// 配置解析错误
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// 响应数据与请求不符
    #[error("data parse error: {0}")]
    DataParse(String),

    /// 超时错误
    #[error("timeout: {0}")]
    Timeout(String),

    /// 客户端不支持该请求
    #[error("unsupported request: {0}")]
    Unsupported(String),
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
