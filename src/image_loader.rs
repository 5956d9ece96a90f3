//! Decoding of captured photos into [`RawImageBuffer`]
//!
//! The pipeline itself only consumes decoded buffers. This module is the
//! convenience entry for callers holding encoded bytes or a file path.
//!
//! ## Supported Formats
//!
//! Via the `image` crate: JPEG, PNG, WebP, TIFF, BMP.
//!
//! ## Design
//!
//! Every image is converted to 8-bit RGB. EXIF orientation is NOT applied;
//! callers are expected to hand in upright photos.

use std::path::Path;

use tracing::debug;

use crate::buffer::RawImageBuffer;
use crate::error::{AnalysisError, Result};

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG image
    Jpeg,
    /// PNG image
    Png,
    /// WebP image
    WebP,
    /// TIFF image
    Tiff,
    /// BMP image
    Bmp,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::WebP),
            "tiff" | "tif" => Some(ImageFormat::Tiff),
            "bmp" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }
}

/// Load an image from disk as an RGB [`RawImageBuffer`]
///
/// # Errors
///
/// Returns `AnalysisError::ImageLoadError` if the file cannot be opened or
/// decoded, and `ProcessingError` for unknown extensions.
pub fn load_image(path: &Path) -> Result<RawImageBuffer> {
    if ImageFormat::from_extension(path).is_none() {
        return Err(AnalysisError::processing(format!(
            "Unknown image format for file: {}",
            path.display()
        )));
    }

    let reader = image::ImageReader::open(path).map_err(|e| {
        AnalysisError::image_load(format!("Failed to open image file: {}", path.display()), e)
    })?;

    let img = reader.decode().map_err(|e| {
        AnalysisError::image_load(format!("Failed to decode image: {}", path.display()), e)
    })?;

    let buffer = RawImageBuffer::from(img.to_rgb8());
    debug!(
        width = buffer.width(),
        height = buffer.height(),
        path = %path.display(),
        "Loaded image"
    );
    Ok(buffer)
}

/// Decode encoded image bytes (format sniffed from content)
pub fn decode_image(bytes: &[u8]) -> Result<RawImageBuffer> {
    if bytes.is_empty() {
        return Err(AnalysisError::ImageLoadError {
            message: "No image bytes supplied".to_string(),
            source: None,
        });
    }

    let img = image::load_from_memory(bytes)
        .map_err(|e| AnalysisError::image_load("Failed to decode image bytes", e))?;

    Ok(RawImageBuffer::from(img.to_rgb8()))
}

/// Get list of all supported file extensions
pub fn supported_extensions() -> &'static [&'static str] {
    &["jpg", "jpeg", "png", "webp", "tiff", "tif", "bmp"]
}

/// Check if a file extension is supported
pub fn is_supported_extension(ext: &str) -> bool {
    let ext_lower = ext.to_lowercase();
    supported_extensions().contains(&ext_lower.as_str())
}
