//! # 栅格编解码能力模块
//!
//! ## 设计思路
//!
//! 压缩搜索只依赖三种能力：解码为位图、按尺寸重采样、按质量编码为 JPEG。
//! 将它们抽象为 `RasterCodec`，搜索逻辑即可脱离具体图片库单独测试
//! （例如用计数包装器断言“校验失败时没有发生解码”）。
//!
//! ## 实现思路
//!
//! - 默认实现 `ImageCrateCodec`：`image` 负责解码与 JPEG 编码，
//!   `fast_image_resize` 负责卷积重采样，失败时回退 `image::imageops::resize`。
//! - `RasterSurface` 固定为 RGB8：JPEG 不支持透明通道，解码后直接丢弃 alpha。

use fast_image_resize as fr;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Rgb, RgbImage};
use std::io::Cursor;

use super::{CompressError, ResampleFilter};

/// 内存中的位图（宽高均大于 0）。
#[derive(Debug, Clone)]
pub struct RasterSurface {
    image: RgbImage,
}

impl RasterSurface {
    /// 由 RGB 缓冲构建；宽或高为 0 时返回 `None`。
    pub fn from_rgb(image: RgbImage) -> Option<Self> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.image
    }
}

/// 压缩流水线所需的最小栅格能力集合。
pub trait RasterCodec: Send + Sync {
    /// 将原始文件字节解码为位图。
    fn decode(&self, bytes: &[u8]) -> Result<RasterSurface, CompressError>;

    /// 将位图重采样到指定尺寸。
    fn resample(
        &self,
        surface: &RasterSurface,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<RasterSurface, CompressError>;

    /// 按质量（0.0 ~ 1.0）编码为 JPEG 字节。
    fn encode_jpeg(&self, surface: &RasterSurface, quality: f64) -> Result<Vec<u8>, CompressError>;
}

/// 基于 `image` + `fast_image_resize` 的默认实现。
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateCodec;

impl RasterCodec for ImageCrateCodec {
    fn decode(&self, bytes: &[u8]) -> Result<RasterSurface, CompressError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| CompressError::DecodeFailure(format!("图片解码失败：{}", e)))?;

        RasterSurface::from_rgb(decoded.to_rgb8())
            .ok_or_else(|| CompressError::DecodeFailure("解码后图片尺寸为 0".to_string()))
    }

    fn resample(
        &self,
        surface: &RasterSurface,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<RasterSurface, CompressError> {
        if width == 0 || height == 0 {
            return Err(CompressError::EncodeFailure(format!(
                "重采样目标尺寸非法：{}x{}",
                width, height
            )));
        }

        let resized = match Self::resize_with_fast_image_resize(surface.as_rgb(), width, height, filter) {
            Ok(resized) => resized,
            Err(err) => {
                log::warn!(
                    "⚠️ fast_image_resize 重采样失败，回退 image::imageops::resize：{}",
                    err
                );
                image::imageops::resize(surface.as_rgb(), width, height, filter.to_filter_type())
            }
        };

        RasterSurface::from_rgb(resized)
            .ok_or_else(|| CompressError::EncodeFailure("重采样输出尺寸为 0".to_string()))
    }

    fn encode_jpeg(&self, surface: &RasterSurface, quality: f64) -> Result<Vec<u8>, CompressError> {
        let rgb = surface.as_rgb();
        // JPEG 通常为原始 RGB 体积的 5%~15%，取 10% 预分配
        let mut cursor = Cursor::new(Vec::with_capacity((rgb.as_raw().len() / 10).max(1024)));

        let encoder = JpegEncoder::new_with_quality(&mut cursor, jpeg_quality(quality));
        encoder
            .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
            .map_err(|e| CompressError::EncodeFailure(format!("JPEG 编码失败：{}", e)))?;

        Ok(cursor.into_inner())
    }
}

impl ImageCrateCodec {
    fn resize_with_fast_image_resize(
        src: &RgbImage,
        target_width: u32,
        target_height: u32,
        filter: ResampleFilter,
    ) -> Result<RgbImage, CompressError> {
        let (src_width, src_height) = src.dimensions();

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            src.as_raw().clone(),
            fr::PixelType::U8x3,
        )
        .map_err(|e| CompressError::EncodeFailure(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x3);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new().resize_alg(Self::to_fast_alg(filter));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| CompressError::EncodeFailure(format!("fast_image_resize 执行失败：{}", e)))?;

        ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
            .ok_or_else(|| CompressError::EncodeFailure("fast_image_resize 输出缓冲长度异常".to_string()))
    }

    fn to_fast_alg(filter: ResampleFilter) -> fr::ResizeAlg {
        match filter {
            ResampleFilter::Nearest => fr::ResizeAlg::Nearest,
            ResampleFilter::Triangle => fr::ResizeAlg::Convolution(fr::FilterType::Bilinear),
            ResampleFilter::CatmullRom => fr::ResizeAlg::Convolution(fr::FilterType::CatmullRom),
            ResampleFilter::Lanczos3 => fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3),
        }
    }
}

/// 将 0.0 ~ 1.0 的质量映射到编码器的 1 ~ 100。
pub(crate) fn jpeg_quality(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}
