//! Saved-dream gallery
//!
//! Lists dream images (never the `_original` captures) newest first and
//! steps through them with wrap-around. Each image is decoded before the
//! panel is touched, so a corrupt file is skipped without a stray clear.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use platform::{DecodeError, DisplayError, ImageSource};

use crate::display::DisplayClient;
use crate::policy::{GhostingGuard, Purpose};

/// Dream images in one directory.
#[derive(Debug)]
pub struct Gallery {
    dir: Option<PathBuf>,
    images: Vec<PathBuf>,
    index: usize,
    guard: GhostingGuard,
}

/// Dream images in `dir`: `*.jpg` whose name does not contain `_original.`,
/// newest first. Saved names start with a sortable timestamp, so newest
/// first is reverse lexicographic order.
pub fn list_dreams(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_dream(path))
        .collect();
    images.sort_unstable_by(|a, b| b.cmp(a));
    Ok(images)
}

fn is_dream(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    path.extension().is_some_and(|ext| ext == "jpg") && !name.contains("_original.")
}

impl Gallery {
    /// Gallery over `dir`. `None` (saving disabled) is always empty.
    pub fn new(dir: Option<PathBuf>, guard: GhostingGuard) -> Self {
        Self {
            dir,
            images: Vec::new(),
            index: 0,
            guard,
        }
    }

    /// Rescan the directory and rewind to the newest image.
    ///
    /// A missing directory is an empty gallery.
    pub fn load(&mut self) -> &[PathBuf] {
        self.images = match &self.dir {
            Some(dir) if dir.is_dir() => list_dreams(dir).unwrap_or_else(|e| {
                tracing::warn!(dir = %dir.display(), error = %e, "Cannot list dreams");
                Vec::new()
            }),
            _ => Vec::new(),
        };
        self.index = 0;
        tracing::info!(count = self.images.len(), "Gallery loaded");
        &self.images
    }

    /// Listed images.
    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    /// True when nothing is listed.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Position of the current image.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Show the current image. `Ok(false)` when empty or the file is unreadable.
    pub async fn show_current(&mut self, display: &DisplayClient) -> Result<bool, DisplayError> {
        self.show(display).await
    }

    /// Advance with wrap-around and show.
    pub async fn next(&mut self, display: &DisplayClient) -> Result<bool, DisplayError> {
        if self.images.is_empty() {
            return Ok(false);
        }
        self.index = (self.index + 1) % self.images.len();
        self.show(display).await
    }

    /// Step back with wrap-around and show.
    pub async fn prev(&mut self, display: &DisplayClient) -> Result<bool, DisplayError> {
        if self.images.is_empty() {
            return Ok(false);
        }
        self.index = (self.index + self.images.len() - 1) % self.images.len();
        self.show(display).await
    }

    async fn show(&mut self, display: &DisplayClient) -> Result<bool, DisplayError> {
        let Some(path) = self.images.get(self.index).cloned() else {
            return Ok(false);
        };
        tracing::info!(
            position = self.index + 1,
            total = self.images.len(),
            file = %path.display(),
            "Gallery image"
        );

        let image = match decode(&path).await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Skipping unreadable image");
                return Ok(false);
            }
        };

        if self.guard.before_frame() {
            display.clear(Purpose::SessionStart.mode()).await?;
        }
        display
            .show_image(ImageSource::bitmap(image), Purpose::Gallery.mode())
            .await?;
        Ok(true)
    }
}

async fn decode(path: &Path) -> Result<Arc<DynamicImage>, DecodeError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || ImageSource::path(owned).load())
        .await
        .unwrap_or_else(|e| {
            Err(DecodeError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other(e),
            })
        })
}
