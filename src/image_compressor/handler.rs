//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageCompressor` 只负责流程编排与配置管理，具体能力分散在子模块：
//! 1. 读取配置快照
//! 2. 校验输入（类型 / 体积），不触发任何解码
//! 3. 签名探测 + 解码
//! 4. 一次性预缩放
//! 5. 逐次尝试搜索，直到接受或拒绝
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<CompressionConfig>>` 支持运行时调整；
//!   单次请求内使用“同一配置快照”，避免处理中途配置漂移。
//! - 每次尝试之间协作式让出（`tokio::time::sleep` / `yield_now`），不长时间占用调度线程。
//! - 取消检查放在每次尝试开始之前，不改变接受/调整逻辑。
//! - 记录 `validate/decode/prescale/search/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::codec::{ImageCrateCodec, RasterCodec};
use super::pipeline::{AttemptReport, CompressionSearch, SearchStep, prescale, to_data_url};
use super::{CompressError, CompressionConfig, CompressionOutcome, SourceImage};

/// 图片压缩器。
///
/// 封装了配置状态与编解码能力，并编排各子模块实现完整流程。
pub struct ImageCompressor {
    config: Arc<RwLock<CompressionConfig>>,
    codec: Arc<dyn RasterCodec>,
}

impl ImageCompressor {
    /// 使用默认编解码器创建压缩器。
    ///
    /// # 示例
    /// ```rust
    /// use pakel_image_compressor::image_compressor::{CompressionConfig, ImageCompressor};
    ///
    /// let compressor = ImageCompressor::new(CompressionConfig::default())?;
    /// # Ok::<(), pakel_image_compressor::image_compressor::CompressError>(())
    /// ```
    pub fn new(config: CompressionConfig) -> Result<Self, CompressError> {
        Self::with_codec(config, Arc::new(ImageCrateCodec))
    }

    /// 注入自定义编解码器（测试或替换图片库时使用）。
    pub fn with_codec(config: CompressionConfig, codec: Arc<dyn RasterCodec>) -> Result<Self, CompressError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            codec,
        })
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次请求链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<CompressionConfig, CompressError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| CompressError::Config("配置读取锁已中毒".to_string()))
    }

    /// 替换配置；不影响正在进行中的压缩。
    pub fn set_config(&self, config: CompressionConfig) -> Result<(), CompressError> {
        config.validate()?;

        let mut guard = self
            .config
            .write()
            .map_err(|_| CompressError::Config("配置写入锁已中毒".to_string()))?;
        *guard = config;

        log::info!(
            "⚙️ 已更新压缩配置（target={}KB, max={}KB, max_dim={}, attempts={}, filter={}）",
            guard.target_size_bytes / 1024,
            guard.max_size_bytes / 1024,
            guard.max_dimension,
            guard.max_attempts,
            guard.resize_filter.as_str()
        );

        Ok(())
    }

    /// 压缩主入口：返回不超过硬上限的 JPEG Data URL。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use pakel_image_compressor::image_compressor::{
    ///     CompressionConfig, ImageCompressor, SourceImage,
    /// };
    ///
    /// # async fn demo() -> Result<(), pakel_image_compressor::image_compressor::CompressError> {
    /// let config = CompressionConfig::default();
    /// let compressor = ImageCompressor::new(config.clone())?;
    /// let source = SourceImage::from_path("umkm/warung.jpg", &config)?;
    /// let outcome = compressor.compress(&source).await?;
    /// println!("{}", outcome.candidate.size_bytes);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compress(&self, source: &SourceImage) -> Result<CompressionOutcome, CompressError> {
        self.compress_with_hooks(source, |_| {}, || false).await
    }

    /// 带进度回调与取消检查的压缩入口。
    ///
    /// `on_attempt` 在每次尝试测量完成后调用；`is_cancelled` 在每次尝试开始前检查。
    pub async fn compress_with_hooks<P, C>(
        &self,
        source: &SourceImage,
        on_attempt: P,
        is_cancelled: C,
    ) -> Result<CompressionOutcome, CompressError>
    where
        P: Fn(&AttemptReport) + Send + Sync,
        C: Fn() -> bool + Send + Sync,
    {
        let config = self.config_snapshot()?;
        let total_start = Instant::now();

        log::info!(
            "🖼️ 开始压缩图片 - 文件: {} 类型: {} 体积: {} KB",
            source.name,
            source.mime_type,
            source.len() / 1024
        );

        let validate_start = Instant::now();
        Self::validate_source(source, &config)?;
        let validate_elapsed = validate_start.elapsed();

        let decode_start = Instant::now();
        Self::inspect_signature(&source.bytes)?;
        let surface = self.codec.decode(&source.bytes)?;
        let (raw_width, raw_height) = surface.dimensions();
        let decode_elapsed = decode_start.elapsed();

        let prescale_start = Instant::now();
        let surface = prescale(self.codec.as_ref(), surface, &config)?;
        let prescale_elapsed = prescale_start.elapsed();

        let search_start = Instant::now();
        let mut search = CompressionSearch::new(self.codec.as_ref(), &config, surface);

        let result = loop {
            if is_cancelled() {
                log::info!("⏹️ 压缩已取消 - 已尝试 {} 次", search.attempts());
                break Err(CompressError::Cancelled);
            }

            let (report, step) = search.step()?;
            on_attempt(&report);

            match step {
                SearchStep::Continue(next) => {
                    search = next;
                    Self::yield_between_attempts(&config).await;
                }
                SearchStep::Accepted(outcome) => break Ok(outcome),
                SearchStep::Rejected(error) => break Err(error),
            }
        };
        let search_elapsed = search_start.elapsed();

        match &result {
            Ok(outcome) => log::info!(
                "✅ 图片压缩完成 - 原始尺寸: {}x{} 输出尺寸: {}x{} 质量: {:.2} 体积: {} KB 尝试: {} 次 \
                 validate={}ms decode={}ms prescale={}ms search={}ms total={}ms",
                raw_width,
                raw_height,
                outcome.candidate.width,
                outcome.candidate.height,
                outcome.candidate.quality,
                outcome.candidate.size_bytes / 1024,
                outcome.attempts,
                validate_elapsed.as_millis(),
                decode_elapsed.as_millis(),
                prescale_elapsed.as_millis(),
                search_elapsed.as_millis(),
                total_start.elapsed().as_millis()
            ),
            Err(err) => log::warn!(
                "❌ 图片压缩失败 - 原始尺寸: {}x{} 错误: {} total={}ms",
                raw_width,
                raw_height,
                err,
                total_start.elapsed().as_millis()
            ),
        }

        result
    }

    /// 预览用：只做类型/体积校验，直接把原始字节转为 Data URL，不做任何有损处理。
    pub fn convert_without_compression(&self, source: &SourceImage) -> Result<String, CompressError> {
        let config = self.config_snapshot()?;
        Self::validate_source(source, &config)?;

        let mime = source
            .normalized_mime()
            .ok_or_else(|| CompressError::InvalidInput(format!("不支持的文件类型：{}", source.mime_type)))?;

        log::debug!("👁️ 生成预览 - 文件: {} 体积: {} KB", source.name, source.len() / 1024);

        Ok(to_data_url(mime, &source.bytes))
    }

    async fn yield_between_attempts(config: &CompressionConfig) {
        if config.attempt_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.attempt_delay_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}
