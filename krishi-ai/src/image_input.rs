//! Leaf image intake
//!
//! Decodes uploaded bytes once and normalises them to 8-bit RGB. Grayscale,
//! RGBA and palette images convert losslessly in colour terms (alpha is
//! dropped). Bytes that do not decode are rejected here, before any provider
//! or the offline predictor sees them.

use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

/// Input edge length expected by the PlantVillage classifiers
pub const MODEL_INPUT_SIZE: u32 = 224;

/// Maximum accepted upload size
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10 MB

/// Content types accepted by the upload endpoint
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Rejected input
#[derive(Debug, Error)]
pub enum ImageInputError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Image too large ({0} bytes). Maximum size is 10 MB")]
    TooLarge(usize),

    #[error("Invalid file type '{0}'. Please upload a JPG, PNG, or WEBP image")]
    UnsupportedType(String),

    #[error("Invalid image file: {0}")]
    Undecodable(String),
}

/// Decoded, RGB-normalised upload
///
/// Keeps the original bytes: the offline predictor digests exactly what the
/// client sent, not a re-encoding. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct LeafImage {
    bytes: Arc<[u8]>,
    rgb: Arc<RgbImage>,
    format: Option<ImageFormat>,
}

/// Upload metadata echoed back to clients
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub original_width: u32,
    pub original_height: u32,
    pub preprocessed_size: (u32, u32),
    pub format: String,
}

impl LeafImage {
    /// Decode bytes and convert to RGB
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageInputError> {
        if bytes.is_empty() {
            return Err(ImageInputError::Empty);
        }

        let format = image::guess_format(bytes).ok();
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| ImageInputError::Undecodable(e.to_string()))?;

        Ok(Self {
            bytes: Arc::from(bytes),
            rgb: Arc::new(decoded.to_rgb8()),
            format,
        })
    }

    /// Original upload bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgb.dimensions()
    }

    /// Resize to a square model input (Lanczos3, aspect ratio not preserved)
    pub fn resized(&self, size: u32) -> RgbImage {
        image::imageops::resize(self.rgb.as_ref(), size, size, FilterType::Lanczos3)
    }

    /// Re-encode the RGB pixels as JPEG for remote providers
    pub fn to_jpeg(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buffer = Cursor::new(Vec::new());
        self.rgb.write_to(&mut buffer, ImageFormat::Jpeg)?;
        Ok(buffer.into_inner())
    }

    pub fn info(&self) -> ImageInfo {
        let (original_width, original_height) = self.dimensions();
        ImageInfo {
            original_width,
            original_height,
            preprocessed_size: (MODEL_INPUT_SIZE, MODEL_INPUT_SIZE),
            format: self
                .format
                .map(|f| format!("{:?}", f).to_uppercase())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
        }
    }
}

/// Check upload metadata before decoding
///
/// A missing content type is allowed; the decoder is the final arbiter.
pub fn validate_upload(content_type: Option<&str>, len: usize) -> Result<(), ImageInputError> {
    if let Some(ct) = content_type {
        if !ALLOWED_CONTENT_TYPES.contains(&ct) {
            return Err(ImageInputError::UnsupportedType(ct.to_string()));
        }
    }
    if len == 0 {
        return Err(ImageInputError::Empty);
    }
    if len > MAX_UPLOAD_BYTES {
        return Err(ImageInputError::TooLarge(len));
    }
    Ok(())
}
