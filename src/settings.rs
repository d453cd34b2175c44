//! 压缩设置文件读取。
//!
//! 设置以 JSON 保存，字段与 `CompressionConfig` 一致；缺省字段回落到默认值。

use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::image_compressor::CompressionConfig;

/// 读取并校验设置文件；文件不存在时返回默认配置。
pub fn load_settings(path: &Path) -> Result<CompressionConfig, AppError> {
    if !path.exists() {
        log::info!("设置文件不存在，使用默认配置: {}", path.display());
        return Ok(CompressionConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config = serde_json::from_str::<CompressionConfig>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))?;
    config.validate()?;

    Ok(config)
}
