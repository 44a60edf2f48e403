//! Image encoding utilities.
//!
//! Photos are uploaded as-is by default. When an upload quality is configured
//! they are decoded and re-encoded as JPEG first, which is also how camera
//! captures are written to disk.

use crate::error::EditError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::path::Path;

/// JPEG quality used for camera captures.
pub const CAPTURE_QUALITY: u8 = 50;

/// Image processing utilities for uploads and captures.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Decodes raw bytes and re-encodes them as a JPEG of the given quality.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::SourceUnavailable`] if the bytes are not a
    /// decodable image or encoding fails.
    pub fn reencode_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, EditError> {
        let image = image::load_from_memory(bytes).map_err(|e| {
            EditError::source_unavailable(format!("Failed to decode image: {}", e))
        })?;
        Self::encode_jpeg(&image, quality)
            .map_err(|e| EditError::source_unavailable(format!("Failed to encode image: {}", e)))
    }

    /// Encodes a DynamicImage as JPEG.
    ///
    /// JPEG has no alpha channel, so the image is flattened to RGB first.
    pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> image::ImageResult<Vec<u8>> {
        let mut buffer: Vec<u8> = Vec::new();
        let rgb = image.to_rgb8();
        JpegEncoder::new_with_quality(&mut buffer, quality).encode_image(&rgb)?;
        Ok(buffer)
    }

    /// Replaces a filename's extension with `.jpg`.
    pub fn jpeg_file_name(file_name: &str) -> String {
        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or("imagem");
        format!("{}.jpg", stem)
    }

    /// MIME type guessed from a filename's extension.
    pub fn mime_for(file_name: &str) -> Option<&'static str> {
        ImageFormat::from_path(file_name)
            .ok()
            .map(|format| format.to_mime_type())
    }
}
