//! 协议客户端抽象

use crate::error::ProtocolError;
use crate::types::{RawData, ReadRequest, WriteRequest};
use async_trait::async_trait;
use std::time::Duration;

/// 协议客户端
///
/// 核心层只依赖"发请求、拿原始数据或错误"这一原语；
/// 重试策略（如有）属于具体客户端实现。
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    async fn read(&self, request: &ReadRequest, timeout: Duration) -> Result<RawData, ProtocolError>;

    async fn write(&self, request: &WriteRequest, timeout: Duration) -> Result<(), ProtocolError>;
}
