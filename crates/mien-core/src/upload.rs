//! Uploaded image validation.
//!
//! Rekognition accepts raw JPEG or PNG bytes up to 5 MiB, with both sides
//! at least 80 px. Uploads are checked against those limits before any
//! network call so that obvious rejects never leave the process.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Largest image Rekognition accepts as inline bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// Smallest width/height Rekognition will analyze.
pub const MIN_IMAGE_DIMENSION: u32 = 80;
/// File extensions offered by the upload widget.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("no image data received")]
    Empty,
    #[error("image is {size} bytes, larger than the {max} byte limit")]
    TooLarge { size: usize, max: usize },
    #[error("unsupported file extension '.{0}' (expected jpg, jpeg or png)")]
    UnsupportedExtension(String),
    #[error("unsupported image format: {0} (expected JPEG or PNG)")]
    UnsupportedFormat(String),
    #[error("image is {width}x{height}, smaller than the {min}x{min} minimum")]
    TooSmall { width: u32, height: u32, min: u32 },
    #[error("image could not be read: {0}")]
    Corrupt(String),
}

/// Image encodings accepted for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Jpeg => f.write_str("jpeg"),
            ImageFormat::Png => f.write_str("png"),
        }
    }
}

/// A validated upload, ready to be sent for analysis.
///
/// Lives for a single request; nothing is written to disk.
#[derive(Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Hex SHA-256 of the raw bytes, used to correlate log lines.
    pub sha256: String,
    bytes: Vec<u8>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("size_bytes", &self.bytes.len())
            .field("sha256", &self.sha256)
            .finish()
    }
}

impl ImageUpload {
    /// Check raw upload bytes and wrap them as an [`ImageUpload`].
    ///
    /// The file name only matters for its extension; content is sniffed
    /// from magic bytes and the header is parsed for dimensions without
    /// decoding pixel data.
    pub fn validate(
        bytes: Vec<u8>,
        file_name: Option<String>,
        max_bytes: usize,
    ) -> Result<Self, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > max_bytes {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                max: max_bytes,
            });
        }

        if let Some(ext) = file_name.as_deref().and_then(extension_of) {
            if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                return Err(UploadError::UnsupportedExtension(ext));
            }
        }

        let format = sniff_format(&bytes)?;

        let decoder_format = match format {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        };
        let (width, height) = image::ImageReader::with_format(Cursor::new(&bytes), decoder_format)
            .into_dimensions()
            .map_err(|e| UploadError::Corrupt(e.to_string()))?;

        if width < MIN_IMAGE_DIMENSION || height < MIN_IMAGE_DIMENSION {
            return Err(UploadError::TooSmall {
                width,
                height,
                min: MIN_IMAGE_DIMENSION,
            });
        }

        let sha256 = format!("{:x}", Sha256::digest(&bytes));

        tracing::debug!(
            file_name = file_name.as_deref().unwrap_or("-"),
            %format,
            width,
            height,
            size = bytes.len(),
            sha256 = %sha256,
            "upload validated"
        );

        Ok(Self {
            file_name,
            format,
            width,
            height,
            sha256,
            bytes,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Lowercased extension of a file name, if it has one.
fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, UploadError> {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => Ok(ImageFormat::Jpeg),
        Ok(image::ImageFormat::Png) => Ok(ImageFormat::Png),
        Ok(other) => Err(UploadError::UnsupportedFormat(format!("{other:?}").to_lowercase())),
        Err(_) => Err(UploadError::UnsupportedFormat("unknown".into())),
    }
}
