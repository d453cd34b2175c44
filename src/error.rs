//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级统一的 `AppError` 枚举，压缩链路错误、设置文件错误与 I/O 错误
//! 在这里汇合，入口层只需处理一种错误类型。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `CompressError` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于直接返回给前端。

use serde::Serialize;

use crate::image_compressor::CompressError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片压缩流水线错误（校验 / 解码 / 搜索）
    #[error("{0}")]
    Compress(#[from] CompressError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置文件不可用
    #[error("设置错误: {0}")]
    Settings(String),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
