//! # 载荷体积估算模块
//!
//! ## 设计思路
//!
//! 压缩循环的终止判断与写库前的预检都需要知道“这段 base64 解码后有多少字节”。
//! 这里不做真正的解码，只根据字符数与尾部填充计算精确字节数：
//! base64 每 4 个字符编码 3 个字节，末尾的 `=` 表示最后一组缺少 1 或 2 个字节。
//!
//! 前置条件：输入必须是合法 base64（可带 Data URL 头）。非法输入会得到一个数值，
//! 但没有意义。

use serde::Serialize;

/// `validate_payload` 的默认上限：1000 KB。
pub const DEFAULT_PAYLOAD_LIMIT_BYTES: u64 = 1000 * 1024;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// 载荷预检结果，字段名与前端表单保持一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PayloadReport {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    #[serde(rename = "sizeBytes")]
    pub size_bytes: u64,
    #[serde(rename = "sizeKB")]
    pub size_kb: u64,
}

/// 计算 base64 字符串解码后的精确字节数。
///
/// 若字符串包含逗号，逗号之后的部分视为载荷（丢弃 `data:...;base64,` 头）。
///
/// # 示例
/// ```rust
/// use pakel_image_compressor::image_compressor::estimate_payload_size;
///
/// assert_eq!(estimate_payload_size("data:image/jpeg;base64,QUJD"), 3);
/// assert_eq!(estimate_payload_size("QUI="), 2);
/// ```
pub fn estimate_payload_size(data: &str) -> u64 {
    let payload = match data.split_once(',') {
        Some((_, rest)) => rest,
        None => data,
    };

    let len = payload.len() as u64;
    let padding = if payload.ends_with("==") {
        2
    } else if payload.ends_with('=') {
        1
    } else {
        0
    };

    (len * 3 / 4).saturating_sub(padding)
}

/// 使用默认 1000KB 上限做载荷预检。
pub fn validate_payload(data: &str) -> PayloadReport {
    validate_payload_with_limit(data, DEFAULT_PAYLOAD_LIMIT_BYTES)
}

/// 使用指定上限做载荷预检。
pub fn validate_payload_with_limit(data: &str, limit_bytes: u64) -> PayloadReport {
    let size_bytes = estimate_payload_size(data);
    PayloadReport {
        is_valid: size_bytes <= limit_bytes,
        size_bytes,
        size_kb: (size_bytes + 512) / 1024,
    }
}

/// 将字节数格式化为人类可读字符串（1024 进制，保留至多两位小数）。
///
/// # 示例
/// ```rust
/// use pakel_image_compressor::image_compressor::format_byte_size;
///
/// assert_eq!(format_byte_size(0), "0 Bytes");
/// assert_eq!(format_byte_size(1536), "1.5 KB");
/// ```
pub fn format_byte_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    // floor(log1024(bytes))，用整数比较避免浮点对数在整次幂处的误差
    let mut unit = 0;
    let mut threshold = 1024u64;
    while unit < SIZE_UNITS.len() - 1 && bytes >= threshold {
        unit += 1;
        threshold = threshold.saturating_mul(1024);
    }

    let value = bytes as f64 / 1024f64.powi(unit as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}
