//! # 压缩搜索流水线模块
//!
//! ## 设计思路
//!
//! 压缩是一个有界的参数搜索：在“质量 × 尺寸”空间里寻找第一个不超过软目标的编码，
//! 尝试次数用尽时只接受不超过硬上限的结果。
//!
//! 状态机：`PreScaling → Attempting(n) → Accepted | Rejected`。
//! `CompressionSearch::step` 按值消费自身，只有 `Continue` 会交还搜索状态，
//! 因此终态之后不可能再进入任何状态。
//!
//! ## 实现思路
//!
//! 1. 一次性预缩放：长边超过 `max_dimension` 时按比例缩到恰好等于它
//! 2. 每次尝试：编码 → 生成 Data URL → 估算体积 → 判断接受/拒绝/调整
//! 3. 调整：每第 N 次（默认 3）且宽高都大于下限时缩尺寸并回升质量，否则降低质量
//!
//! 尺寸只会缩小，不会放大。

use base64::{Engine as _, engine::general_purpose};

use super::codec::{RasterCodec, RasterSurface};
use super::payload::estimate_payload_size;
use super::{CompressError, CompressionConfig, CompressionOutcome, EncodedCandidate};

/// 单次尝试的诊断信息。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptReport {
    pub attempt: u32,
    pub quality: f64,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

/// 一次尝试之后的状态转移。
pub enum SearchStep<'a> {
    /// 仍高于目标且还有尝试次数，交还搜索状态。
    Continue(CompressionSearch<'a>),
    /// 终态：得到可返回的结果。
    Accepted(CompressionOutcome),
    /// 终态：尝试用尽仍超过硬上限。
    Rejected(CompressError),
}

/// 按配置执行一次性预缩放。
///
/// 长边等于 `max_dimension`，短边按比例向下取整（至少 1 像素）。
pub fn prescale(
    codec: &dyn RasterCodec,
    surface: RasterSurface,
    config: &CompressionConfig,
) -> Result<RasterSurface, CompressError> {
    let (width, height) = surface.dimensions();
    let max_dimension = config.max_dimension;

    if width <= max_dimension && height <= max_dimension {
        return Ok(surface);
    }

    let (target_width, target_height) = if width >= height {
        let scaled = (height as u64 * max_dimension as u64 / width as u64).max(1) as u32;
        (max_dimension, scaled)
    } else {
        let scaled = (width as u64 * max_dimension as u64 / height as u64).max(1) as u32;
        (scaled, max_dimension)
    };

    log::info!(
        "🧩 预缩放：{}x{} -> {}x{}（filter={}）",
        width,
        height,
        target_width,
        target_height,
        config.resize_filter.as_str()
    );

    codec.resample(&surface, target_width, target_height, config.resize_filter)
}

/// 质量/尺寸搜索状态。
///
/// 位图由搜索独占，结束后随搜索一起释放。
pub struct CompressionSearch<'a> {
    codec: &'a dyn RasterCodec,
    config: &'a CompressionConfig,
    surface: RasterSurface,
    quality: f64,
    attempts: u32,
}

impl<'a> CompressionSearch<'a> {
    /// 以（已预缩放的）位图开始一次搜索。
    pub fn new(codec: &'a dyn RasterCodec, config: &'a CompressionConfig, surface: RasterSurface) -> Self {
        Self {
            codec,
            config,
            surface,
            quality: config.initial_quality,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.surface.dimensions()
    }

    /// 执行一次尝试。
    ///
    /// 编码失败以 `Err` 返回；正常的接受/拒绝通过 `SearchStep` 表达。
    pub fn step(mut self) -> Result<(AttemptReport, SearchStep<'a>), CompressError> {
        self.attempts += 1;

        let jpeg = self.codec.encode_jpeg(&self.surface, self.quality)?;
        let data_url = to_jpeg_data_url(&jpeg);
        let size_bytes = estimate_payload_size(&data_url);
        let (width, height) = self.surface.dimensions();

        let report = AttemptReport {
            attempt: self.attempts,
            quality: self.quality,
            width,
            height,
            size_bytes,
        };

        log::debug!(
            "🔁 第 {} 次尝试 - 质量: {:.2} 尺寸: {}x{} 体积: {} KB",
            self.attempts,
            self.quality,
            width,
            height,
            size_bytes / 1024
        );

        if size_bytes <= self.config.target_size_bytes || self.attempts >= self.config.max_attempts {
            if size_bytes <= self.config.max_size_bytes {
                let outcome = CompressionOutcome {
                    candidate: EncodedCandidate {
                        data_url,
                        quality: self.quality,
                        width,
                        height,
                        size_bytes,
                    },
                    attempts: self.attempts,
                };
                return Ok((report, SearchStep::Accepted(outcome)));
            }

            let error = CompressError::CompressionBudgetExceeded {
                size_bytes,
                attempts: self.attempts,
            };
            return Ok((report, SearchStep::Rejected(error)));
        }

        self.adjust()?;
        Ok((report, SearchStep::Continue(self)))
    }

    /// 同步跑完整个搜索，每次尝试后回调 `on_attempt`。
    pub fn run_to_completion<F>(self, mut on_attempt: F) -> Result<CompressionOutcome, CompressError>
    where
        F: FnMut(&AttemptReport),
    {
        let mut search = self;
        loop {
            let (report, step) = search.step()?;
            on_attempt(&report);
            match step {
                SearchStep::Continue(next) => search = next,
                SearchStep::Accepted(outcome) => return Ok(outcome),
                SearchStep::Rejected(error) => return Err(error),
            }
        }
    }

    fn adjust(&mut self) -> Result<(), CompressError> {
        let (width, height) = self.surface.dimensions();
        let min_side = self.config.dimension_cut_min_side;

        if self.attempts % self.config.dimension_cut_every == 0 && width > min_side && height > min_side {
            let scale = self.config.dimension_scale;
            let new_width = ((width as f64 * scale).floor() as u32).clamp(1, width);
            let new_height = ((height as f64 * scale).floor() as u32).clamp(1, height);

            self.surface = self
                .codec
                .resample(&self.surface, new_width, new_height, self.config.resize_filter)?;
            self.quality = self.quality.max(self.config.quality_after_cut);

            log::debug!(
                "📐 缩小尺寸：{}x{} -> {}x{}，质量回升至 {:.2}",
                width,
                height,
                new_width,
                new_height,
                self.quality
            );
        } else {
            self.quality = (self.quality - self.config.quality_step).max(self.config.min_quality);
        }

        Ok(())
    }
}

/// 将 JPEG 字节编码为 Data URL，按最终长度一次性预分配。
pub(crate) fn to_jpeg_data_url(jpeg: &[u8]) -> String {
    to_data_url("image/jpeg", jpeg)
}

pub(crate) fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    let prefix_len = "data:;base64,".len() + mime.len();
    let base64_len = bytes.len().div_ceil(3) * 4;
    let mut result = String::with_capacity(prefix_len + base64_len);

    result.push_str("data:");
    result.push_str(mime);
    result.push_str(";base64,");
    general_purpose::STANDARD.encode_string(bytes, &mut result);

    result
}
