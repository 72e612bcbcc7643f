// SPDX-License-Identifier: MPL-2.0

//! Media blobs and image preparation before upload.

use crate::state::settings::MediaSettings;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use thiserror::Error;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("could not decode image: {0}")]
    Decode(image::ImageError),
    #[error("could not encode image: {0}")]
    Encode(image::ImageError),
}

/// Bytes to be stored in object storage, with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl MediaBlob {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decode a picked image, shrink it so its longest side fits
/// `max_dimension`, and re-encode it as JPEG.
pub fn prepare_image(bytes: &[u8], settings: &MediaSettings) -> Result<MediaBlob, MediaError> {
    let mut img = image::load_from_memory(bytes).map_err(MediaError::Decode)?;

    let max = settings.max_dimension;
    if img.width() > max || img.height() > max {
        // resize() keeps the aspect ratio within the bounding box
        img = img.resize(max, max, FilterType::Triangle);
    }

    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, settings.jpeg_quality)
        .encode_image(&rgb)
        .map_err(MediaError::Encode)?;

    tracing::debug!(
        width = rgb.width(),
        height = rgb.height(),
        bytes = out.len(),
        "image prepared for upload"
    );
    Ok(MediaBlob::new(out, JPEG_CONTENT_TYPE))
}
