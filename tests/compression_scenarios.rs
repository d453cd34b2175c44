// End-to-end compression scenarios with the real image codec
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use pakel_image_compressor::image_compressor::{
    CompressError, CompressionConfig, ImageCompressor, ImageCrateCodec, RasterCodec,
    RasterSurface, ResampleFilter, SourceImage, estimate_payload_size,
};

/// Wraps the real codec and counts every capability call.
#[derive(Default)]
struct CountingCodec {
    inner: ImageCrateCodec,
    decodes: AtomicUsize,
    resamples: AtomicUsize,
    encodes: AtomicUsize,
}

impl RasterCodec for CountingCodec {
    fn decode(&self, bytes: &[u8]) -> Result<RasterSurface, CompressError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        self.inner.decode(bytes)
    }

    fn resample(
        &self,
        surface: &RasterSurface,
        width: u32,
        height: u32,
        filter: ResampleFilter,
    ) -> Result<RasterSurface, CompressError> {
        self.resamples.fetch_add(1, Ordering::SeqCst);
        self.inner.resample(surface, width, height, filter)
    }

    fn encode_jpeg(&self, surface: &RasterSurface, quality: f64) -> Result<Vec<u8>, CompressError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.encode_jpeg(surface, quality)
    }
}

fn fast_config() -> CompressionConfig {
    CompressionConfig {
        attempt_delay_ms: 0,
        ..CompressionConfig::default()
    }
}

fn compressor_with(config: CompressionConfig) -> (ImageCompressor, Arc<CountingCodec>) {
    let codec = Arc::new(CountingCodec::default());
    let compressor = ImageCompressor::with_codec(config, codec.clone()).expect("valid config");
    (compressor, codec)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, format).expect("failed to encode fixture");
    cursor.into_inner()
}

fn smooth_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            ((x + y) * 255 / (width + height)) as u8,
        ])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// xorshift32, deterministic across runs
fn xorshift(seed: u32) -> impl FnMut() -> u32 {
    let mut state = seed;
    move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    }
}

fn noise_png(width: u32, height: u32) -> Vec<u8> {
    let mut next = xorshift(0x9E37_79B9);
    let img = ImageBuffer::from_fn(width, height, |_, _| {
        let v = next();
        Rgb([v as u8, (v >> 8) as u8, (v >> 16) as u8])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// Saturated colour tiles on the 8x8 JPEG grid: each tile is a single DC
/// coefficient in the source file, but after prescaling the tiles are ~2px
/// wide and the re-encode is dominated by high-frequency energy.
fn mosaic_jpeg(width: u32, height: u32) -> Vec<u8> {
    const TILE: u32 = 8;
    let mut next = xorshift(0x2545_F491);
    let tiles_x = width.div_ceil(TILE);
    let palette: Vec<Rgb<u8>> = (0..tiles_x * height.div_ceil(TILE))
        .map(|_| {
            let v = next();
            let channel = |bit: u32| if v >> bit & 1 == 1 { 255 } else { 0 };
            Rgb([channel(0), channel(8), channel(16)])
        })
        .collect();
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        palette[((y / TILE) * tiles_x + x / TILE) as usize]
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

#[tokio::test]
async fn large_photo_is_prescaled_and_fits_ceiling() {
    let bytes = mosaic_jpeg(4000, 3000);
    assert!(bytes.len() <= 5 * 1024 * 1024);

    let (compressor, codec) = compressor_with(fast_config());
    let source = SourceImage::new("pantai.jpg", "image/jpeg", bytes);
    let outcome = compressor.compress(&source).await.expect("should compress");

    let candidate = &outcome.candidate;
    // Too detailed for q0.7 at 1200x900, so the search has to step down.
    assert!(outcome.attempts > 1);
    assert!(candidate.quality < 0.7);
    assert!(candidate.width <= 1200 && candidate.height <= 900);
    assert!((candidate.width as f64 / candidate.height as f64 - 4.0 / 3.0).abs() < 0.01);
    assert!(candidate.size_bytes <= 1000 * 1024);
    assert!(candidate.data_url.starts_with("data:image/jpeg;base64,"));
    assert_eq!(estimate_payload_size(&candidate.data_url), candidate.size_bytes);
    assert!(codec.resamples.load(Ordering::SeqCst) >= 1);
    assert_eq!(codec.encodes.load(Ordering::SeqCst), outcome.attempts as usize);
}

#[tokio::test]
async fn small_solid_png_is_accepted_on_first_attempt() {
    let img = ImageBuffer::from_pixel(500, 500, Rgb([34u8, 139, 34]));
    let bytes = encode(DynamicImage::ImageRgb8(img), ImageFormat::Png);

    let (compressor, codec) = compressor_with(fast_config());
    let source = SourceImage::new("logo.png", "image/png", bytes);
    let outcome = compressor.compress(&source).await.expect("should compress");

    assert_eq!(outcome.attempts, 1);
    assert!((outcome.candidate.quality - 0.7).abs() < 1e-9);
    assert_eq!((outcome.candidate.width, outcome.candidate.height), (500, 500));
    assert_eq!(codec.resamples.load(Ordering::SeqCst), 0);
    assert_eq!(codec.encodes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn oversize_jpeg_is_rejected_without_decoding() {
    let mut bytes = smooth_jpeg(64, 64);
    bytes.resize(6 * 1024 * 1024, 0);

    let (compressor, codec) = compressor_with(fast_config());
    let source = SourceImage::new("raw.jpg", "image/jpeg", bytes);
    let err = compressor.compress(&source).await.unwrap_err();

    assert!(matches!(err, CompressError::InvalidInput(_)));
    assert!(err.is_rejectable_input());
    assert_eq!(codec.decodes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn text_file_is_rejected_without_decoding() {
    let (compressor, codec) = compressor_with(fast_config());
    let source = SourceImage::new("catatan.txt", "text/plain", b"bukan gambar".to_vec());

    assert!(matches!(
        compressor.compress(&source).await,
        Err(CompressError::InvalidInput(_))
    ));
    assert_eq!(codec.decodes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn corrupt_gif_labelled_as_jpeg_fails_to_decode() {
    let mut bytes = b"GIF89a".to_vec();
    bytes.extend_from_slice(&[0xFF; 64]);

    let (compressor, codec) = compressor_with(fast_config());
    let source = SourceImage::new("rusak.jpg", "image/jpeg", bytes);
    let err = compressor.compress(&source).await.unwrap_err();

    assert!(matches!(err, CompressError::DecodeFailure(_)));
    assert_eq!(err.stage(), "decoding");
    assert_eq!(codec.encodes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn incompressible_noise_exhausts_attempt_budget() {
    // Noise stays far above 4 KB even at the smallest size the search can reach
    let config = CompressionConfig {
        target_size_bytes: 2 * 1024,
        max_size_bytes: 4 * 1024,
        ..fast_config()
    };
    let (compressor, codec) = compressor_with(config);
    let source = SourceImage::new("noise.png", "image/png", noise_png(600, 600));
    let dims = Mutex::new(Vec::new());

    let err = compressor
        .compress_with_hooks(
            &source,
            |r| dims.lock().unwrap().push((r.width, r.height)),
            || false,
        )
        .await
        .unwrap_err();

    match err {
        CompressError::CompressionBudgetExceeded { size_bytes, attempts } => {
            assert_eq!(attempts, 25);
            assert!(size_bytes > 4 * 1024);
        }
        other => panic!("expected budget exceeded, got {other}"),
    }
    assert_eq!(codec.encodes.load(Ordering::SeqCst), 25);

    let dims = dims.into_inner().unwrap();
    assert_eq!(dims.len(), 25);
    for pair in dims.windows(2) {
        assert!(pair[1].0 <= pair[0].0 && pair[1].1 <= pair[0].1);
    }
    assert!(dims.last().unwrap().0 < 600);
}

#[tokio::test]
async fn single_attempt_budget_is_honoured() {
    let config = CompressionConfig {
        max_attempts: 1,
        target_size_bytes: 1024,
        max_size_bytes: 2 * 1024,
        ..fast_config()
    };
    let (compressor, codec) = compressor_with(config);
    let source = SourceImage::new("noise.png", "image/png", noise_png(200, 200));

    assert!(matches!(
        compressor.compress(&source).await,
        Err(CompressError::CompressionBudgetExceeded { attempts: 1, .. })
    ));
    assert_eq!(codec.encodes.load(Ordering::SeqCst), 1);
}

#[test]
fn preview_returns_original_bytes_untouched() {
    let bytes = smooth_jpeg(32, 32);
    let (compressor, codec) = compressor_with(fast_config());
    let source = SourceImage::new("preview.jpg", "image/jpg", bytes.clone());

    let url = compressor.convert_without_compression(&source).expect("preview");

    assert!(url.starts_with("data:image/jpeg;base64,"));
    assert_eq!(estimate_payload_size(&url), bytes.len() as u64);
    assert_eq!(codec.decodes.load(Ordering::SeqCst), 0);
}
