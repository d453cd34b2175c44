//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载压缩链路中的所有失败来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 调用侧需要区分两类失败：
//! - “直接拒绝该文件”：`InvalidInput` / `DecodeFailure`
//! - “该图片难以压缩”：`CompressionBudgetExceeded`

/// 图片压缩统一错误类型。
///
/// 该类型会在应用层被上转为 `AppError`。不提供到 `String` 的隐式转换，
/// 需要文本时显式调用 `to_string()`：
///
/// ```compile_fail
/// use pakel_image_compressor::image_compressor::CompressError;
///
/// let message: String = CompressError::Cancelled.into();
/// ```
///
/// ```rust
/// use pakel_image_compressor::image_compressor::CompressError;
///
/// assert_eq!(CompressError::Cancelled.to_string(), "压缩已取消");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("输入无效：{0}")]
    InvalidInput(String),

    #[error("解码错误：{0}")]
    DecodeFailure(String),

    #[error("编码错误：{0}")]
    EncodeFailure(String),

    #[error(
        "压缩失败：尝试 {} 次后仍为 {} KB，请换一张更小或更简单的图片",
        .attempts,
        .size_bytes / 1024
    )]
    CompressionBudgetExceeded { size_bytes: u64, attempts: u32 },

    #[error("文件错误：{0}")]
    ReadFailure(String),

    #[error("压缩已取消")]
    Cancelled,

    #[error("配置错误：{0}")]
    Config(String),
}

impl CompressError {
    /// 稳定错误码，供前端按码分支展示。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::DecodeFailure(_) => "decode_failure",
            Self::EncodeFailure(_) => "encode_failure",
            Self::CompressionBudgetExceeded { .. } => "compression_budget_exceeded",
            Self::ReadFailure(_) => "read_failure",
            Self::Cancelled => "cancelled",
            Self::Config(_) => "config",
        }
    }

    /// 出错所在的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) | Self::Config(_) => "validating",
            Self::ReadFailure(_) => "reading",
            Self::DecodeFailure(_) => "decoding",
            Self::EncodeFailure(_) | Self::CompressionBudgetExceeded { .. } | Self::Cancelled => {
                "attempting"
            }
        }
    }

    /// 是否属于“文件本身不可用”的失败（应直接拒绝，而不是提示换图重试）。
    pub fn is_rejectable_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::DecodeFailure(_))
    }
}
