//! Image inputs accepted by [`DisplayDriver::show_image`](crate::DisplayDriver::show_image)
//!
//! Whatever the caller hands in is resolved once, at the façade entry point,
//! into a decoded bitmap and then into a panel-sized 8-bit luma frame.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

/// Something that can be shown full-screen.
///
/// Decoded bitmaps are held behind an [`Arc`] because they are immutable
/// once produced and travel between the capture worker, the application
/// loop and the display owner.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// File on disk, decoded by content (JPEG or PNG).
    Path(PathBuf),
    /// Encoded image bytes.
    Bytes(Vec<u8>),
    /// Already-decoded bitmap.
    Bitmap(Arc<DynamicImage>),
}

impl ImageSource {
    /// Image file on disk.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Encoded image bytes.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    /// Decoded bitmap.
    pub fn bitmap(image: impl Into<Arc<DynamicImage>>) -> Self {
        Self::Bitmap(image.into())
    }

    /// Decode into the canonical bitmap representation.
    pub fn load(&self) -> Result<Arc<DynamicImage>, DecodeError> {
        match self {
            Self::Path(path) => load_path(path).map(Arc::new),
            Self::Bytes(data) => Ok(Arc::new(image::load_from_memory(data)?)),
            Self::Bitmap(image) => Ok(Arc::clone(image)),
        }
    }

    /// Decode, convert to 8-bit luma and resample to exactly `width`×`height`.
    pub fn to_panel_gray(&self, width: u32, height: u32) -> Result<GrayImage, DecodeError> {
        let image = self.load()?;
        to_panel_gray(&image, width, height)
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        Self::bitmap(image)
    }
}

impl From<Arc<DynamicImage>> for ImageSource {
    fn from(image: Arc<DynamicImage>) -> Self {
        Self::Bitmap(image)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

fn load_path(path: &Path) -> Result<DynamicImage, DecodeError> {
    let data = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image::load_from_memory(&data)?)
}

/// Convert any bitmap to an 8-bit luma frame of exactly `width`×`height`.
///
/// Aspect ratio is not preserved: the panel is filled edge to edge, the same
/// way the camera preview is captured at panel resolution. Lanczos3
/// resampling is skipped when the source already has the target size.
pub fn to_panel_gray(image: &DynamicImage, width: u32, height: u32) -> Result<GrayImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyTarget { width, height });
    }
    let gray = image.to_luma8();
    if gray.dimensions() == (width, height) {
        return Ok(gray);
    }
    Ok(image::imageops::resize(&gray, width, height, FilterType::Lanczos3))
}

/// Image loading failures
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// File could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
    /// Bytes are not a supported image.
    #[error("cannot decode image: {0}")]
    Format(#[from] image::ImageError),
    /// Requested output has a zero dimension.
    #[error("cannot resample to {width}x{height}")]
    EmptyTarget {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}
