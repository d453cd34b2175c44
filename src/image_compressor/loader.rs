//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 在“尽可能早”的阶段执行输入校验：类型白名单与体积上限都在任何解码之前完成，
//! 目标是尽快失败，避免对明显不可用的文件付出解码内存与 CPU。
//!
//! ## 实现思路
//!
//! - 文件：存在性 + metadata 体积限制 + 读取，MIME 由扩展名推断。
//! - 校验：空文件 / MIME 白名单 / 体积上限，均映射为 `InvalidInput`。
//! - 签名探测：用 `infer` 识别真实内容；声明类型已通过，因此识别失败归为解码阶段错误。

use std::path::Path;

use super::source::ALLOWED_MIME_TYPES;
use super::{CompressError, CompressionConfig, ImageCompressor, SourceImage};

impl SourceImage {
    /// 从本地路径加载图片。
    ///
    /// 先通过 metadata 检查体积，超限时不读取文件内容。
    pub fn from_path(path: impl AsRef<Path>, config: &CompressionConfig) -> Result<Self, CompressError> {
        let path = path.as_ref();
        log::info!("📁 开始读取本地图片 - 路径: {}", path.display());

        if !path.exists() {
            return Err(CompressError::ReadFailure(format!("文件不存在：{}", path.display())));
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| CompressError::ReadFailure(format!("无法读取文件信息：{}", e)))?;

        if metadata.len() > config.max_input_bytes {
            return Err(oversize_error(metadata.len(), config.max_input_bytes));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| CompressError::ReadFailure(format!("无法读取图片文件：{}", e)))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_from_extension(path)
            .map(str::to_string)
            .or_else(|| infer::get(&bytes).map(|kind| kind.mime_type().to_string()))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(Self::new(name, mime_type, bytes))
    }
}

impl ImageCompressor {
    /// 校验文件是否可进入压缩流程（不触发任何解码）。
    pub(super) fn validate_source(
        source: &SourceImage,
        config: &CompressionConfig,
    ) -> Result<(), CompressError> {
        if source.is_empty() || source.mime_type.trim().is_empty() {
            return Err(CompressError::InvalidInput("未选择文件".to_string()));
        }

        if source.normalized_mime().is_none() {
            return Err(CompressError::InvalidInput(format!(
                "不支持的文件类型：{}（仅支持 {}）",
                source.mime_type,
                ALLOWED_MIME_TYPES.join(" / ")
            )));
        }

        if source.len() > config.max_input_bytes {
            return Err(oversize_error(source.len(), config.max_input_bytes));
        }

        Ok(())
    }

    /// 解码前的签名探测：内容不是可识别的图片时直接失败。
    pub(super) fn inspect_signature(bytes: &[u8]) -> Result<(), CompressError> {
        let kind = infer::get(bytes)
            .ok_or_else(|| CompressError::DecodeFailure("无法识别图片内容".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(CompressError::DecodeFailure(format!(
                "文件签名不是图片类型：{}",
                kind.mime_type()
            )));
        }

        Ok(())
    }
}

fn oversize_error(size: u64, limit: u64) -> CompressError {
    CompressError::InvalidInput(format!(
        "文件过大：{:.2} MB（限制：{:.2} MB）",
        size as f64 / 1024.0 / 1024.0,
        limit as f64 / 1024.0 / 1024.0
    ))
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("pakel-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).expect("create temp file");
        file.write_all(bytes).expect("write temp file");
        path
    }

    #[test]
    fn rejects_disallowed_mime_type() {
        let source = SourceImage::new("notes.txt", "text/plain", b"hello".to_vec());
        let result = ImageCompressor::validate_source(&source, &CompressionConfig::default());

        assert!(matches!(result, Err(CompressError::InvalidInput(msg)) if msg.contains("text/plain")));
    }

    #[test]
    fn rejects_oversize_input() {
        let source = SourceImage::new("big.jpg", "image/jpeg", vec![0u8; 6 * 1024 * 1024]);
        let result = ImageCompressor::validate_source(&source, &CompressionConfig::default());

        assert!(matches!(result, Err(CompressError::InvalidInput(msg)) if msg.contains("文件过大")));
    }

    #[test]
    fn accepts_input_exactly_at_limit() {
        let config = CompressionConfig::default();
        let source = SourceImage::new("edge.png", "image/png", vec![0u8; config.max_input_bytes as usize]);

        assert!(ImageCompressor::validate_source(&source, &config).is_ok());
    }

    #[test]
    fn rejects_missing_file() {
        let source = SourceImage::new("", "", Vec::new());
        assert!(matches!(
            ImageCompressor::validate_source(&source, &CompressionConfig::default()),
            Err(CompressError::InvalidInput(_))
        ));
    }

    #[test]
    fn signature_check_flags_non_image_content() {
        assert!(ImageCompressor::inspect_signature(PNG_SIGNATURE).is_ok());
        assert!(matches!(
            ImageCompressor::inspect_signature(b"plain text pretending"),
            Err(CompressError::DecodeFailure(_))
        ));
        assert!(matches!(
            ImageCompressor::inspect_signature(b"%PDF-1.7\n"),
            Err(CompressError::DecodeFailure(_))
        ));
    }

    #[test]
    fn from_path_infers_mime_from_extension() {
        let path = temp_file("photo.JPG", b"\xFF\xD8\xFF\xE0");
        let source = SourceImage::from_path(&path, &CompressionConfig::default()).expect("load file");

        assert_eq!(source.mime_type, "image/jpeg");
        assert_eq!(source.name, "photo.JPG");
        assert_eq!(source.len(), 4);
    }

    #[test]
    fn from_path_falls_back_to_sniffed_mime() {
        let path = temp_file("upload.bin", PNG_SIGNATURE);
        let source = SourceImage::from_path(&path, &CompressionConfig::default()).expect("load file");

        assert_eq!(source.mime_type, "image/png");
    }

    #[test]
    fn from_path_checks_size_before_reading() {
        let path = temp_file("large.png", &vec![0u8; 2048]);
        let config = CompressionConfig {
            max_input_bytes: 1024,
            ..CompressionConfig::default()
        };

        assert!(matches!(
            SourceImage::from_path(&path, &config),
            Err(CompressError::InvalidInput(_))
        ));
    }

    #[test]
    fn from_path_reports_missing_file_as_read_failure() {
        let path = std::env::temp_dir().join("pakel-loader-does-not-exist.png");
        assert!(matches!(
            SourceImage::from_path(&path, &CompressionConfig::default()),
            Err(CompressError::ReadFailure(_))
        ));
    }
}
