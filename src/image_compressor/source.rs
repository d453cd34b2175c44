//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”和“流水线中间结果”解耦：
//! - `SourceImage` 表示用户选择的原始文件（只读，单次调用内有效）
//! - `EncodedCandidate` 表示某次尝试产出的 JPEG Data URL
//! - `CompressionOutcome` 表示唯一返回给调用方的成功结果

/// 允许的图片 MIME 类型。`image/jpg` 按 JPEG 处理。
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

/// 用户选择的原始图片。
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// 文件名（用于日志与诊断）。
    pub name: String,
    /// 声明的 MIME 类型。
    pub mime_type: String,
    /// 原始文件字节。
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// 原始字节长度。
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 规范化后的 MIME 类型；不在白名单内时返回 `None`。
    pub(crate) fn normalized_mime(&self) -> Option<&'static str> {
        match self.mime_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some("image/jpeg"),
            "image/png" => Some("image/png"),
            _ => None,
        }
    }
}

/// 单次尝试产出的 JPEG 编码候选。
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCandidate {
    /// `data:image/jpeg;base64,...` 形式的完整字符串。
    pub data_url: String,
    /// 编码使用的质量（0.0 ~ 1.0）。
    pub quality: f64,
    pub width: u32,
    pub height: u32,
    /// 由载荷估算得到的字节数。
    pub size_bytes: u64,
}

/// 压缩成功结果。
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionOutcome {
    pub candidate: EncodedCandidate,
    /// 得到该结果共用了多少次尝试。
    pub attempts: u32,
}

impl CompressionOutcome {
    pub fn into_data_url(self) -> String {
        self.candidate.data_url
    }
}
