//! # Padukuhan Pakel 管理后台 — 图片压缩库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │         管理后台表单（UMKM / 新闻 / 图库 / 地点）          │
//! │   选择文件 → 预览（无损）→ 保存时压缩 → 写入文档数据库     │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<CompressionOutcome, CompressError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            本库 (Rust)                            │
//! │                                                          │
//! │  ┌─ error ────────────── AppError (统一错误类型)          │
//! │  ├─ settings ─────────── JSON 设置 → CompressionConfig    │
//! │  └─ image_compressor     校验·解码·预缩放·搜索·预检        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`settings`] | 读取并校验压缩设置文件 |
//! | [`image_compressor`] | 把用户选择的图片压缩为不超过 1000KB 的 JPEG Data URL |
//!
//! 结果的持久化与传输由调用方负责，本库不做任何网络访问。

pub mod error;
pub mod image_compressor;
pub mod settings;
