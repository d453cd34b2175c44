//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! 使用 `CompressionService` 作为表单层持有的状态，替代全局单例函数。
//! 好处：
//! 1. 生命周期清晰（由调用方统一管理）
//! 2. 测试可创建独立实例，减少共享状态副作用
//! 3. 每个请求拥有独立的取消标志，两个文件输入同时压缩互不干扰
//!
//! ## 实现思路
//!
//! 对外仅暴露少量稳定 API：
//! - `compress`：执行完整压缩链路（带请求 ID，可取消）
//! - `cancel`：取消进行中的请求
//! - `convert_without_compression` / `validate_payload`：预览与写库前预检

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::payload::{self, PayloadReport};
use super::pipeline::AttemptReport;
use super::{CompressError, CompressionConfig, CompressionOutcome, ImageCompressor, SourceImage};

/// 图片压缩服务状态。
pub struct CompressionService {
    compressor: ImageCompressor,
    cancel_flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl CompressionService {
    /// 使用默认配置创建服务。
    ///
    /// # 示例
    /// ```rust
    /// use pakel_image_compressor::image_compressor::CompressionService;
    ///
    /// let service = CompressionService::new()?;
    /// # Ok::<(), pakel_image_compressor::image_compressor::CompressError>(())
    /// ```
    pub fn new() -> Result<Self, CompressError> {
        Self::with_config(CompressionConfig::default())
    }

    /// 使用自定义配置创建服务。
    pub fn with_config(config: CompressionConfig) -> Result<Self, CompressError> {
        Ok(Self::with_compressor(ImageCompressor::new(config)?))
    }

    pub fn with_compressor(compressor: ImageCompressor) -> Self {
        Self {
            compressor,
            cancel_flags: Mutex::new(HashMap::new()),
        }
    }

    /// 执行完整压缩流程；请求期间可通过 `cancel(request_id)` 中止。
    pub async fn compress(
        &self,
        request_id: &str,
        source: &SourceImage,
    ) -> Result<CompressionOutcome, CompressError> {
        self.compress_with_progress(request_id, source, |_| {}).await
    }

    /// 同 `compress`，并在每次尝试后回调进度。
    pub async fn compress_with_progress<P>(
        &self,
        request_id: &str,
        source: &SourceImage,
        on_attempt: P,
    ) -> Result<CompressionOutcome, CompressError>
    where
        P: Fn(&AttemptReport) + Send + Sync,
    {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let _registration =
            CancelRegistration::register(&self.cancel_flags, request_id, &cancel_flag)?;

        self.compressor
            .compress_with_hooks(source, on_attempt, || cancel_flag.load(Ordering::SeqCst))
            .await
    }

    /// 取消进行中的请求；请求不存在（已结束或从未开始）时返回 `false`。
    pub fn cancel(&self, request_id: &str) -> Result<bool, CompressError> {
        let guard = self
            .cancel_flags
            .lock()
            .map_err(|_| CompressError::Config("取消标志锁已中毒".to_string()))?;

        match guard.get(request_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                log::info!("⏹️ 已请求取消压缩 - request_id: {}", request_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn convert_without_compression(&self, source: &SourceImage) -> Result<String, CompressError> {
        self.compressor.convert_without_compression(source)
    }

    /// 写库前预检：使用当前配置中的载荷上限。
    pub fn validate_payload(&self, data: &str) -> Result<PayloadReport, CompressError> {
        let config = self.compressor.config_snapshot()?;
        Ok(payload::validate_payload_with_limit(data, config.payload_limit_bytes))
    }

    pub fn set_config(&self, config: CompressionConfig) -> Result<(), CompressError> {
        self.compressor.set_config(config)
    }

    pub fn config(&self) -> Result<CompressionConfig, CompressError> {
        self.compressor.config_snapshot()
    }
}

/// 请求期间持有的取消标志登记。
///
/// 析构时从表中移除 `request_id`：请求正常结束、出错或 future 被丢弃
/// （超时、`select!`、表单关闭）都会释放该 ID。
struct CancelRegistration<'a> {
    flags: &'a Mutex<HashMap<String, Arc<AtomicBool>>>,
    request_id: String,
}

impl<'a> CancelRegistration<'a> {
    fn register(
        flags: &'a Mutex<HashMap<String, Arc<AtomicBool>>>,
        request_id: &str,
        flag: &Arc<AtomicBool>,
    ) -> Result<Self, CompressError> {
        let mut guard = flags
            .lock()
            .map_err(|_| CompressError::Config("取消标志锁已中毒".to_string()))?;
        if guard.contains_key(request_id) {
            return Err(CompressError::InvalidInput(format!("请求 ID 重复：{}", request_id)));
        }
        guard.insert(request_id.to_string(), Arc::clone(flag));

        Ok(Self {
            flags,
            request_id: request_id.to_string(),
        })
    }
}

impl Drop for CancelRegistration<'_> {
    fn drop(&mut self) {
        match self.flags.lock() {
            Ok(mut guard) => {
                guard.remove(&self.request_id);
            }
            Err(_) => log::warn!("⚠️ 取消标志锁已中毒，无法释放 - request_id: {}", self.request_id),
        }
    }
}
