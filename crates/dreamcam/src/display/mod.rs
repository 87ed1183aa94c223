//! Display backends and the owner thread that serializes access to them

pub mod owner;

use std::path::PathBuf;

use anyhow::Context;
use eink_emulator::{EmulatedIt8951, EmulatorConfig};
use platform::DisplayDriver;

pub use owner::{spawn, DisplayClient, DisplayOwner};

/// Where display commands go.
#[derive(Debug, Clone)]
pub enum Backend {
    /// IT8951 on a generic-SCSI node.
    Usb {
        /// Device node such as `/dev/sg0`.
        path: PathBuf,
        /// Per-command SG_IO timeout.
        timeout_ms: u32,
    },
    /// In-memory controller, optionally writing PNG frames.
    Sim(EmulatorConfig),
}

/// A driver the owner thread can take.
pub type BoxedDriver = Box<dyn DisplayDriver + Send>;

/// Open `backend`, query it and clear it with `FullInit`.
pub fn open(backend: &Backend) -> anyhow::Result<BoxedDriver> {
    match backend {
        Backend::Sim(config) => {
            if let Some(dir) = &config.frame_dir {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("cannot create frame directory {}", dir.display()))?;
            }
            let display = it8951::Display::new(EmulatedIt8951::new(config.clone()))
                .context("simulator failed to start")?;
            tracing::info!(
                width = config.panel.width,
                height = config.panel.height,
                frames = ?config.frame_dir,
                "Simulator backend ready"
            );
            Ok(Box::new(display))
        }
        Backend::Usb { path, timeout_ms } => open_usb(path, *timeout_ms),
    }
}

#[cfg(target_os = "linux")]
fn open_usb(path: &std::path::Path, timeout_ms: u32) -> anyhow::Result<BoxedDriver> {
    let transport = it8951::SgTransport::open_with_timeout(path, timeout_ms)?;
    let display = it8951::Display::new(transport)
        .with_context(|| format!("no IT8951 answering on {}", path.display()))?;
    Ok(Box::new(display))
}

#[cfg(not(target_os = "linux"))]
fn open_usb(path: &std::path::Path, _timeout_ms: u32) -> anyhow::Result<BoxedDriver> {
    anyhow::bail!(
        "the usb backend needs Linux SG_IO ({}); use --backend sim",
        path.display()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::Rect;

    #[test]
    fn test_sim_backend_writes_frames() {
        let dir = tempfile::tempdir().unwrap();
        let frames = dir.path().join("frames");
        let backend = Backend::Sim(EmulatorConfig::with_size(32, 24).frame_dir(&frames));

        let driver = open(&backend).unwrap();
        assert_eq!(driver.panel(), Rect::new(0, 0, 32, 24));
        // Opening clears once, which is one frame.
        assert!(frames.join("frame_0000.png").exists());
    }

    #[test]
    fn test_missing_usb_node_fails() {
        let backend = Backend::Usb {
            path: PathBuf::from("/nonexistent/sg9"),
            timeout_ms: 100,
        };
        assert!(open(&backend).is_err());
    }
}
