use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, ImageReader, Limits};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::diagnosis::strip_data_uri;
use crate::{MAX_IMAGE_ALLOC, MAX_IMAGE_BYTES, MAX_IMAGE_DIMENSION};

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("input bytes empty")]
    EmptyInput,

    #[error("input too large: {size} bytes, max {max_size}")]
    InputTooLarge { size: usize, max_size: usize },

    #[error("image payload is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("unsupported image format")]
    UnsupportedFormat,

    #[error("image exceeds decode limits (max {max_dimension}px per side)")]
    LimitsExceeded { max_dimension: u32 },

    #[error("failed to decode image: {source}")]
    Decode {
        #[from]
        source: image::ImageError,
    },
}

#[derive(Clone, Debug)]
pub struct ProcessingConfig {
    pub max_input_bytes: usize,
    pub max_dimension: u32,
    pub max_alloc_bytes: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: MAX_IMAGE_BYTES,
            max_dimension: MAX_IMAGE_DIMENSION,
            max_alloc_bytes: MAX_IMAGE_ALLOC,
        }
    }
}

/// A photo that decoded cleanly and is ready to be sent for diagnosis.
#[derive(Clone, PartialEq, Eq)]
pub struct StagedImage {
    bytes: Vec<u8>,
    mime_type: &'static str,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for StagedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedImage")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl StagedImage {
    /// Accepts `data:image/png;base64,...` or bare base64.
    pub fn from_data_url(payload: &str, config: &ProcessingConfig) -> Result<Self, ImageError> {
        let encoded = strip_data_uri(payload).trim();
        if encoded.is_empty() {
            return Err(ImageError::EmptyInput);
        }
        // base64 grows by 4/3; reject before allocating the decoded buffer
        if encoded.len() / 4 * 3 > config.max_input_bytes {
            return Err(ImageError::InputTooLarge {
                size: encoded.len() / 4 * 3,
                max_size: config.max_input_bytes,
            });
        }
        let bytes = STANDARD.decode(encoded)?;
        Self::from_bytes(bytes, config)
    }

    #[instrument(skip(bytes, config), fields(input_size = bytes.len()))]
    pub fn from_bytes(bytes: Vec<u8>, config: &ProcessingConfig) -> Result<Self, ImageError> {
        let (format, width, height) = decode_image(config, &bytes)?;
        let mime_type = mime_for(format).ok_or(ImageError::UnsupportedFormat)?;
        debug!(mime_type, width, height, "staged image");
        Ok(Self {
            bytes,
            mime_type,
            width,
            height,
        })
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            bytes: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg",
            width: 1,
            height: 1,
        }
    }
}

fn mime_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

fn decode_image(
    config: &ProcessingConfig,
    raw_bytes: &[u8],
) -> Result<(ImageFormat, u32, u32), ImageError> {
    if raw_bytes.is_empty() {
        return Err(ImageError::EmptyInput);
    }

    if raw_bytes.len() > config.max_input_bytes {
        return Err(ImageError::InputTooLarge {
            size: raw_bytes.len(),
            max_size: config.max_input_bytes,
        });
    }

    let mut reader = ImageReader::new(Cursor::new(raw_bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::Decode { source: e.into() })?;

    let Some(format) = reader.format() else {
        return Err(ImageError::UnsupportedFormat);
    };
    if mime_for(format).is_none() {
        return Err(ImageError::UnsupportedFormat);
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(config.max_dimension);
    limits.max_image_height = Some(config.max_dimension);
    limits.max_alloc = Some(config.max_alloc_bytes);
    reader.limits(limits);

    let img = reader.decode().map_err(|e| match e {
        image::ImageError::Limits(_) => ImageError::LimitsExceeded {
            max_dimension: config.max_dimension,
        },
        other => ImageError::Decode { source: other },
    })?;

    Ok((format, img.width(), img.height()))
}
