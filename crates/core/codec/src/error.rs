//! 编解码错误类型定义

/// 编解码错误
///
/// `MalformedData` 只会在调用方传入与声明宽度不符的数据时出现，
/// 内部生成的调用出现该错误即为程序缺陷。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// 数据宽度与类型不符
    #[error("malformed data: expected {expected} units, got {actual}")]
    MalformedData { expected: usize, actual: usize },

    /// 值的种类与类型不符（例如给 float 传入字节数组）
    #[error("value {value} does not fit type {data_type}")]
    ValueType {
        data_type: &'static str,
        value: String,
    },

    /// 整数超出类型范围
    #[error("value {value} out of range for {data_type}")]
    OutOfRange { data_type: &'static str, value: i64 },
}

pub(crate) fn check_width(expected: usize, actual: usize) -> Result<(), CodecError> {
    if expected != actual {
        return Err(CodecError::MalformedData { expected, actual });
    }
    Ok(())
}
