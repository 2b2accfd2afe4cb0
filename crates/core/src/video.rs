//! Video assets and the frames sampled from them.

use std::path::PathBuf;

use serde::Serialize;

/// A stored, probed video. Immutable once created; downstream stages only
/// reference it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoAsset {
    /// Retrievable locator returned by storage (URL).
    pub locator: String,
    /// Where the bytes live locally, for decoding.
    #[serde(skip)]
    pub path: PathBuf,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
}

/// One decoded image sampled at `offset_secs` into a video.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Seconds from the start of the video. Strictly increasing per job.
    pub offset_secs: f64,
    /// Encoded image bytes.
    pub image: Vec<u8>,
    /// MIME type of `image`, e.g. `image/jpeg`.
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Build a JPEG frame, reading pixel dimensions from the image header.
    ///
    /// Dimensions fall back to `(0, 0)` when the header cannot be parsed; the
    /// inference capability decodes the image itself.
    pub fn jpeg(offset_secs: f64, image: Vec<u8>) -> Self {
        let (width, height) = image_dimensions(&image).unwrap_or((0, 0));
        Self {
            offset_secs,
            image,
            mime_type: "image/jpeg",
            width,
            height,
        }
    }
}

/// Read `(width, height)` from an encoded image header without decoding
/// the pixel data.
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
