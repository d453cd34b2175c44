//! # 图片压缩命令行入口
//!
//! 本文件仅负责日志初始化、参数解析与结果输出。
//! 压缩逻辑见 `image_compressor` 模块。
//!
//! 用法：`pakel-image-compressor <file> [--settings <json>] [--filter <name>] [--preview]`

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pakel_image_compressor::error::AppError;
use pakel_image_compressor::image_compressor::{
    CompressionService, ResampleFilter, SourceImage, format_byte_size,
};
use pakel_image_compressor::settings;

#[derive(Parser, Debug)]
#[command(name = "pakel-image-compressor")]
#[command(about = "将图片压缩为可直接写库的 JPEG Data URL")]
struct CliArgs {
    /// 待压缩的图片文件
    file: PathBuf,

    /// JSON 设置文件，缺省字段取默认值
    #[arg(long)]
    settings: Option<PathBuf>,

    /// 缩放滤镜：lanczos3 / catmull_rom / triangle / nearest
    #[arg(long, value_parser = ResampleFilter::parse)]
    filter: Option<ResampleFilter>,

    /// 跳过压缩，直接输出原图 Data URL
    #[arg(long, default_value_t = false)]
    preview: bool,
}

async fn run(args: CliArgs) -> Result<(), AppError> {
    let mut config = match &args.settings {
        Some(path) => settings::load_settings(path)?,
        None => Default::default(),
    };
    if let Some(filter) = args.filter {
        config.resize_filter = filter;
    }

    let source = SourceImage::from_path(&args.file, &config)?;
    let service = CompressionService::with_config(config)?;

    let data_url = if args.preview {
        service.convert_without_compression(&source)?
    } else {
        let outcome = service
            .compress_with_progress("cli", &source, |report| {
                log::debug!(
                    "尝试 {}：{}x{} 质量 {:.2} → {}",
                    report.attempt,
                    report.width,
                    report.height,
                    report.quality,
                    format_byte_size(report.size_bytes)
                );
            })
            .await?;
        outcome.into_data_url()
    };

    let report = service.validate_payload(&data_url)?;
    log::info!(
        "输出：{} → {}（{}）",
        format_byte_size(source.len()),
        format_byte_size(report.size_bytes),
        if report.is_valid { "可写入" } else { "超过载荷上限" }
    );

    println!("{}", data_url);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
