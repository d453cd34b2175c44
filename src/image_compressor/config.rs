//! # 配置模块
//!
//! ## 设计思路
//!
//! 将压缩搜索中所有“可调常量”集中到 `CompressionConfig`，以显式参数传入压缩器，
//! 而不是散落在流程中的字面量。这样测试可以直接构造边界配置（例如 `max_attempts = 1`），
//! 无需修改任何全局状态。
//!
//! ## 实现思路
//!
//! - `Default` 提供线上使用的默认值（目标 800KB、上限 1000KB、最多 25 次尝试）。
//! - `validate` 在配置进入服务层前拒绝自相矛盾的组合。
//! - `ResampleFilter` 负责滤镜名称解析与反向输出，并映射到 `image` 的 `FilterType`。

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::CompressError;

/// 压缩配置。
///
/// 字段覆盖了输入校验、预缩放、质量/尺寸搜索与协作让出四个阶段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// 原始文件允许的最大体积（字节），在任何解码之前检查。
    pub max_input_bytes: u64,
    /// 软目标：搜索到不超过该体积即提前结束。
    pub target_size_bytes: u64,
    /// 硬上限：返回结果绝不超过该体积。
    pub max_size_bytes: u64,
    /// 预缩放时宽/高单边最大值。
    pub max_dimension: u32,
    /// 最大尝试次数（每次尝试一次编码）。
    pub max_attempts: u32,
    /// 初始 JPEG 质量（0.0 ~ 1.0）。
    pub initial_quality: f64,
    /// 质量下限。
    pub min_quality: f64,
    /// 每次降低的质量步长。
    pub quality_step: f64,
    /// 尺寸缩减系数。
    pub dimension_scale: f64,
    /// 每隔多少次尝试执行一次尺寸缩减。
    pub dimension_cut_every: u32,
    /// 宽高都必须大于该值才允许继续缩尺寸。
    pub dimension_cut_min_side: u32,
    /// 缩尺寸后质量回升的下限。
    pub quality_after_cut: f64,
    /// 两次尝试之间的让出时长（毫秒），为 0 时只做一次调度让出。
    pub attempt_delay_ms: u64,
    /// `validate_payload` 使用的默认上限（字节）。
    pub payload_limit_bytes: u64,
    /// 预缩放与尺寸缩减使用的重采样滤镜。
    pub resize_filter: ResampleFilter,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 5 * 1024 * 1024,
            target_size_bytes: 800 * 1024,
            max_size_bytes: 1000 * 1024,
            max_dimension: 1200,
            max_attempts: 25,
            initial_quality: 0.7,
            min_quality: 0.05,
            quality_step: 0.05,
            dimension_scale: 0.9,
            dimension_cut_every: 3,
            dimension_cut_min_side: 300,
            quality_after_cut: 0.6,
            attempt_delay_ms: 10,
            payload_limit_bytes: 1000 * 1024,
            resize_filter: ResampleFilter::Lanczos3,
        }
    }
}

impl CompressionConfig {
    /// 校验参数组合是否自洽。
    pub fn validate(&self) -> Result<(), CompressError> {
        if self.max_input_bytes == 0 {
            return Err(CompressError::Config("max_input_bytes 必须大于 0".to_string()));
        }
        if self.target_size_bytes > self.max_size_bytes {
            return Err(CompressError::Config(format!(
                "target_size_bytes（{}）不能大于 max_size_bytes（{}）",
                self.target_size_bytes, self.max_size_bytes
            )));
        }
        if self.max_dimension == 0 {
            return Err(CompressError::Config("max_dimension 必须大于 0".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(CompressError::Config("max_attempts 必须大于 0".to_string()));
        }
        if !(self.initial_quality > 0.0 && self.initial_quality <= 1.0) {
            return Err(CompressError::Config("initial_quality 必须在 (0, 1] 之间".to_string()));
        }
        if !(self.min_quality > 0.0 && self.min_quality <= self.initial_quality) {
            return Err(CompressError::Config(
                "min_quality 必须大于 0 且不大于 initial_quality".to_string(),
            ));
        }
        if !(self.quality_after_cut > 0.0 && self.quality_after_cut <= 1.0) {
            return Err(CompressError::Config("quality_after_cut 必须在 (0, 1] 之间".to_string()));
        }
        if self.quality_step <= 0.0 {
            return Err(CompressError::Config("quality_step 必须大于 0".to_string()));
        }
        if !(self.dimension_scale > 0.0 && self.dimension_scale < 1.0) {
            return Err(CompressError::Config("dimension_scale 必须在 (0, 1) 之间".to_string()));
        }
        if self.dimension_cut_every == 0 {
            return Err(CompressError::Config("dimension_cut_every 必须大于 0".to_string()));
        }

        Ok(())
    }
}

/// 重采样滤镜（面向配置文件的稳定名称）。
///
/// - `Lanczos3`：最高质量，默认
/// - `CatmullRom`：质量与速度折中
/// - `Triangle`：双线性
/// - `Nearest`：最快，仅用于调试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Lanczos3,
    CatmullRom,
    Triangle,
    Nearest,
}

impl ResampleFilter {
    /// 从外部字符串解析滤镜。
    ///
    /// # 示例
    /// ```rust
    /// use pakel_image_compressor::image_compressor::ResampleFilter;
    ///
    /// let f = ResampleFilter::parse("catmull_rom")?;
    /// assert_eq!(f.as_str(), "catmull_rom");
    /// # Ok::<(), pakel_image_compressor::image_compressor::CompressError>(())
    /// ```
    pub fn parse(name: &str) -> Result<Self, CompressError> {
        match name.trim().to_lowercase().as_str() {
            "lanczos3" => Ok(Self::Lanczos3),
            "catmull_rom" => Ok(Self::CatmullRom),
            "triangle" => Ok(Self::Triangle),
            "nearest" => Ok(Self::Nearest),
            other => Err(CompressError::Config(format!(
                "未知滤镜：{}（可选：lanczos3 / catmull_rom / triangle / nearest）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lanczos3 => "lanczos3",
            Self::CatmullRom => "catmull_rom",
            Self::Triangle => "triangle",
            Self::Nearest => "nearest",
        }
    }

    pub(crate) fn to_filter_type(self) -> FilterType {
        match self {
            Self::Lanczos3 => FilterType::Lanczos3,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Triangle => FilterType::Triangle,
            Self::Nearest => FilterType::Nearest,
        }
    }
}
