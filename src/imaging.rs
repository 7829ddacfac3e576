//! Image normalization.
//!
//! Local images are decoded, then downscaled uniformly until `width * height`
//! fits the pixel budget, so the upload payload stays bounded whatever the
//! input size.

use crate::error::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError};
use log::{debug, error};

/// Dimensions that fit `budget` pixels while keeping the aspect ratio.
///
/// Returns the input unchanged when it already fits.
pub fn scaled_dimensions(width: u32, height: u32, budget: u32) -> (u32, u32) {
    let pixels = width as u64 * height as u64;
    let budget = budget.max(1) as u64;
    if pixels <= budget {
        return (width, height);
    }

    let factor = (budget as f64 / pixels as f64).sqrt();
    let mut w = ((width as f64 * factor) as u32).max(1);
    let mut h = ((height as f64 * factor) as u32).max(1);

    // Degenerate strips and float error can still overshoot by a little.
    if w as u64 * h as u64 > budget {
        if w >= h {
            w = (budget / h as u64).max(1) as u32;
        } else {
            h = (budget / w as u64).max(1) as u32;
        }
    }

    (w, h)
}

/// Downscale `img` to at most `budget` pixels.
///
/// The original buffer is dropped when a resized copy is produced.
pub fn downscale(img: DynamicImage, budget: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let (w, h) = scaled_dimensions(width, height, budget);
    if (w, h) == (width, height) {
        return img;
    }
    debug!("scaling image {}x{} -> {}x{}", width, height, w, h);
    img.resize_exact(w, h, FilterType::Triangle)
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| {
        error!("failed to decode image ({} bytes): {}", bytes.len(), e);
        Error::ImageProcessingFailed(e.to_string())
    })
}

/// Decode `bytes` and bound the result to `budget` pixels.
pub fn normalize(bytes: &[u8], budget: u32) -> Result<DynamicImage> {
    let img = decode(bytes)?;
    Ok(downscale(img, budget))
}

/// Re-encode as baseline JPEG. Alpha is discarded.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> std::result::Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    img.to_rgb8().write_with_encoder(encoder)?;
    Ok(buf)
}
