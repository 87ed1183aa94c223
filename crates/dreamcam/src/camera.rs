//! Still-photo sources

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use image::DynamicImage;
use platform::{DecodeError, ImageSource};

/// Capture failures
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The capture program could not be started.
    #[error("cannot run {program}: {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
    /// The capture program exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        /// Program name.
        program: String,
        /// Exit status as text.
        status: String,
        /// Trimmed standard error.
        stderr: String,
    },
    /// Scratch file handling failed.
    #[error("scratch file: {0}")]
    Io(#[from] std::io::Error),
    /// The captured file is unreadable.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Something that takes a photo. Calls block.
pub trait Camera: Send + Sync {
    /// Take one photo, ideally at `width`×`height`.
    fn capture(&self, width: u32, height: u32) -> Result<Arc<DynamicImage>, CaptureError>;
}

impl<C: Camera + ?Sized> Camera for Arc<C> {
    fn capture(&self, width: u32, height: u32) -> Result<Arc<DynamicImage>, CaptureError> {
        (**self).capture(width, height)
    }
}

/// Raspberry Pi camera through `libcamera-still`.
#[derive(Debug, Clone)]
pub struct LibcameraStill {
    program: String,
}

impl Default for LibcameraStill {
    fn default() -> Self {
        Self {
            program: "libcamera-still".into(),
        }
    }
}

impl LibcameraStill {
    /// Use a differently named capture binary (`rpicam-still` on newer images).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    /// Command that writes one JPEG to `output`.
    pub fn command(&self, output: &Path, width: u32, height: u32) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-o")
            .arg(output)
            .arg("--width")
            .arg(width.to_string())
            .arg("--height")
            .arg(height.to_string())
            .args(["-t", "1", "--nopreview"]);
        command
    }
}

impl Camera for LibcameraStill {
    fn capture(&self, width: u32, height: u32) -> Result<Arc<DynamicImage>, CaptureError> {
        let scratch = tempfile::tempdir()?;
        let output = scratch.path().join("capture.jpg");

        let result = self
            .command(&output, width, height)
            .output()
            .map_err(|source| CaptureError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !result.status.success() {
            return Err(CaptureError::Failed {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_owned(),
            });
        }

        let photo = ImageSource::path(&output).load()?;
        tracing::debug!(width = photo.width(), height = photo.height(), "Captured photo");
        Ok(photo)
    }
}

/// The same image on every capture (`--photo`, tests).
#[derive(Debug, Clone)]
pub struct StillFile {
    image: Arc<DynamicImage>,
}

impl StillFile {
    /// Decode `path` once up front.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DecodeError> {
        Ok(Self {
            image: ImageSource::path(path).load()?,
        })
    }

    /// Serve an in-memory image.
    pub fn from_image(image: impl Into<Arc<DynamicImage>>) -> Self {
        Self { image: image.into() }
    }
}

impl Camera for StillFile {
    fn capture(&self, _width: u32, _height: u32) -> Result<Arc<DynamicImage>, CaptureError> {
        Ok(Arc::clone(&self.image))
    }
}
