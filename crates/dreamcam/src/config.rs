//! Application configuration
//!
//! Every field is optional in the JSON file; missing fields take the
//! defaults below. Intervals and sizes must be non-zero.
//!
//! ```json
//! { "gallery_refresh_interval": 4, "auto_reset_interval": 20 }
//! ```

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// Config path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON for [`AppConfig`].
    #[error("cannot parse {path}: {source}")]
    Parse {
        /// Config path.
        path: PathBuf,
        /// Parser error with line and column.
        #[source]
        source: serde_json::Error,
    },
    /// A value is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Field name as written in the file.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Tunables of the camera application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Force a `FullInit` clear before every N-th gallery image.
    pub gallery_refresh_interval: u32,
    /// Reset the display after every N completed captures.
    pub auto_reset_interval: u32,
    /// Spinner square edge in pixels.
    pub spinner_size: u32,
    /// Spinner distance from the top-right corner in pixels.
    pub spinner_margin: u32,
    /// Delay between spinner frames.
    pub spinner_frame_ms: u64,
    /// Button sampling period.
    pub poll_interval_ms: u64,
    /// Slideshow auto-advance period.
    pub slideshow_interval_secs: u64,
    /// Style and mode carousel auto-advance period.
    pub carousel_interval_ms: u64,
    /// Per-command SG_IO timeout.
    pub transport_timeout_ms: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gallery_refresh_interval: 6,
            auto_reset_interval: 10,
            spinner_size: 120,
            spinner_margin: 30,
            spinner_frame_ms: 200,
            poll_interval_ms: 50,
            slideshow_interval_secs: 60,
            carousel_interval_ms: 2000,
            transport_timeout_ms: 10_000,
        }
    }
}

impl AppConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), ?config, "Loaded configuration");
        Ok(config)
    }

    /// Defaults, or the file at `path` when given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject zero intervals and sizes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, bool); 8] = [
            ("gallery_refresh_interval", self.gallery_refresh_interval == 0),
            ("auto_reset_interval", self.auto_reset_interval == 0),
            ("spinner_size", self.spinner_size == 0),
            ("spinner_frame_ms", self.spinner_frame_ms == 0),
            ("poll_interval_ms", self.poll_interval_ms == 0),
            ("slideshow_interval_secs", self.slideshow_interval_secs == 0),
            ("carousel_interval_ms", self.carousel_interval_ms == 0),
            ("transport_timeout_ms", self.transport_timeout_ms == 0),
        ];
        match checks.into_iter().find(|&(_, zero)| zero) {
            Some((field, _)) => Err(ConfigError::Invalid {
                field,
                reason: "must be greater than zero",
            }),
            None => Ok(()),
        }
    }

    /// Reject a spinner square that does not fit inside a `width` x `height`
    /// panel, margin included.
    pub fn check_panel(&self, width: u32, height: u32) -> Result<(), ConfigError> {
        let extent = self.spinner_size.saturating_add(self.spinner_margin);
        if extent > width || extent > height {
            return Err(ConfigError::Invalid {
                field: "spinner_size",
                reason: "spinner and margin do not fit the panel",
            });
        }
        Ok(())
    }

    /// Gallery full-refresh interval.
    pub fn gallery_refresh(&self) -> NonZeroU32 {
        NonZeroU32::new(self.gallery_refresh_interval).unwrap_or(NonZeroU32::MIN)
    }

    /// Captures between preventive resets.
    pub fn auto_reset(&self) -> NonZeroU32 {
        NonZeroU32::new(self.auto_reset_interval).unwrap_or(NonZeroU32::MIN)
    }

    /// Delay between spinner frames.
    pub fn spinner_frame(&self) -> Duration {
        Duration::from_millis(self.spinner_frame_ms)
    }

    /// Button sampling period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Slideshow auto-advance period.
    pub fn slideshow_interval(&self) -> Duration {
        Duration::from_secs(self.slideshow_interval_secs)
    }

    /// Carousel auto-advance period.
    pub fn carousel_interval(&self) -> Duration {
        Duration::from_millis(self.carousel_interval_ms)
    }
}
