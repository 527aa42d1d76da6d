//! 调度器错误类型

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("there is no device of id {0}")]
    DeviceNotFound(String),

    #[error("device registry lock failed")]
    Lock,
}
