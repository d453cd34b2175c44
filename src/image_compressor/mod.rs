//! # 图片压缩模块（image_compressor）
//!
//! ## 设计思路
//!
//! 该模块把“输入校验 → 解码 → 预缩放 → 质量/尺寸搜索 → Data URL 输出”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `service`：承载可注入状态（`CompressionService`）与请求级取消
//! - `handler`：编排整条压缩流水线
//! - `loader`：负责文件读取与类型/体积校验
//! - `codec`：解码、重采样、JPEG 编码能力（可替换）
//! - `pipeline`：预缩放与逐次尝试的搜索状态机
//! - `payload`：base64 载荷体积估算与预检
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! 表单组件
//!    ↓
//! service.rs（State 持有、请求 ID 与取消）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（类型/体积校验 + 签名探测）
//!    ├─ codec.rs（解码 / 重采样 / 编码）
//!    └─ pipeline.rs（预缩放 + 尝试循环）
//!          └─ payload.rs（每次尝试的体积测量）
//!    ↓
//! data:image/jpeg;base64,...  或  CompressError
//! ```
//!
//! ## 分层职责建议
//!
//! - 阈值与策略变更优先改 `config.rs`
//! - 搜索节奏（何时缩尺寸、质量回升）变更优先改 `pipeline.rs`
//! - 替换图片库只需实现 `RasterCodec`

mod codec;
mod config;
mod error;
mod handler;
mod loader;
mod payload;
mod pipeline;
mod service;
mod source;

pub use codec::{ImageCrateCodec, RasterCodec, RasterSurface};
pub use config::{CompressionConfig, ResampleFilter};
pub use error::CompressError;
pub use handler::ImageCompressor;
pub use payload::{
    DEFAULT_PAYLOAD_LIMIT_BYTES, PayloadReport, estimate_payload_size, format_byte_size,
    validate_payload, validate_payload_with_limit,
};
pub use pipeline::{AttemptReport, CompressionSearch, SearchStep, prescale};
pub use service::CompressionService;
pub use source::{ALLOWED_MIME_TYPES, CompressionOutcome, EncodedCandidate, SourceImage};
