//! AI transformation client
//!
//! The network service is an external program so the camera carries no
//! HTTP stack of its own. The program is called as
//!
//! ```text
//! PROG image <prompt> <input.jpg> <output.img>
//! PROG text  <prompt> <input.jpg> <output.txt>
//! ```
//!
//! and must write its result to the output path and exit 0. Calls block;
//! run them through [`crate::worker::run_with_spinner`].

use std::ffi::OsString;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::styles::Style;

/// JPEG quality for everything handed to the transformer or saved to disk.
pub const JPEG_QUALITY: u8 = 95;

/// Transformation failures
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// No backend is configured.
    #[error("AI not available")]
    Unavailable,
    /// The program could not be started.
    #[error("cannot run {program}: {source}")]
    Spawn {
        /// Program path.
        program: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
    /// The program exited unsuccessfully.
    #[error("transformer exited with {status}: {stderr}")]
    Failed {
        /// Exit status as text.
        status: String,
        /// Trimmed standard error.
        stderr: String,
    },
    /// The program succeeded but produced nothing.
    #[error("transformer produced no output")]
    EmptyOutput,
    /// Scratch file handling failed.
    #[error("scratch file: {0}")]
    Io(#[from] std::io::Error),
    /// The returned image is unreadable.
    #[error("cannot decode result: {0}")]
    Decode(#[from] image::ImageError),
}

/// Backend that reinterprets a photo.
pub trait Transformer: Send + Sync {
    /// Restyle `photo` as `style`.
    fn dream(&self, photo: &DynamicImage, style: &Style) -> Result<DynamicImage, TransformError>;

    /// Write about `photo` following `style`'s prompt.
    fn describe(&self, photo: &DynamicImage, style: &Style) -> Result<String, TransformError>;

    /// False when every call will fail with [`TransformError::Unavailable`].
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: Transformer + ?Sized> Transformer for Arc<T> {
    fn dream(&self, photo: &DynamicImage, style: &Style) -> Result<DynamicImage, TransformError> {
        (**self).dream(photo, style)
    }

    fn describe(&self, photo: &DynamicImage, style: &Style) -> Result<String, TransformError> {
        (**self).describe(photo, style)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// No backend configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl Transformer for Unavailable {
    fn dream(&self, _photo: &DynamicImage, _style: &Style) -> Result<DynamicImage, TransformError> {
        Err(TransformError::Unavailable)
    }

    fn describe(&self, _photo: &DynamicImage, _style: &Style) -> Result<String, TransformError> {
        Err(TransformError::Unavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Runs an external program per request.
#[derive(Debug, Clone)]
pub struct CommandTransformer {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandTransformer {
    /// Use `program` for every request.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Fixed argument placed before the request arguments.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Program path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, kind: &str, prompt: &str, photo: &DynamicImage) -> Result<Vec<u8>, TransformError> {
        let scratch = tempfile::tempdir()?;
        let input = scratch.path().join("input.jpg");
        let output = scratch.path().join("output");
        std::fs::write(&input, encode_jpeg(photo)?)?;

        tracing::debug!(program = %self.program.display(), kind, "Running transformer");
        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(kind)
            .arg(prompt)
            .arg(&input)
            .arg(&output)
            .output()
            .map_err(|source| TransformError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(TransformError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_owned(),
            });
        }

        let data = match std::fs::read(&output) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(TransformError::EmptyOutput),
            Err(e) => return Err(e.into()),
        };
        if data.is_empty() {
            return Err(TransformError::EmptyOutput);
        }
        Ok(data)
    }
}

impl Transformer for CommandTransformer {
    fn dream(&self, photo: &DynamicImage, style: &Style) -> Result<DynamicImage, TransformError> {
        let data = self.run("image", &style.image_prompt(), photo)?;
        Ok(image::load_from_memory(&data)?)
    }

    fn describe(&self, photo: &DynamicImage, style: &Style) -> Result<String, TransformError> {
        let data = self.run("text", style.prompt, photo)?;
        let text = String::from_utf8_lossy(&data).trim().to_owned();
        if text.is_empty() {
            return Err(TransformError::EmptyOutput);
        }
        Ok(text)
    }
}

/// Encode as RGB JPEG at [`JPEG_QUALITY`].
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&image.to_rgb8())?;
    Ok(out.into_inner())
}
