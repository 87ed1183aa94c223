//! E-Ink Controller Emulator
//!
//! In-memory IT8951 for tests and the desktop simulator. It sits below the
//! real driver, at the [`platform::Transport`] seam, so everything above it
//! (chunking, session recovery, the camera application) runs unmodified.
//!
//! - Answers query / load-area / display-area CDBs with the driver's own wire records
//! - Separate controller memory and visible panel framebuffers
//! - Optional PNG frame dump after every refresh, optional waveform pacing
//! - Fault injection: one-shot errors, wedged controller, failed reopen
//!
//! # Example
//!
//! ```
//! use eink_emulator::{EmulatedIt8951, EmulatorConfig};
//! use platform::{DisplayDriver, Rect, RefreshMode};
//!
//! # fn main() -> Result<(), platform::DisplayError> {
//! let device = EmulatedIt8951::new(EmulatorConfig::with_size(200, 150));
//! let probe = device.probe();
//! let mut display = it8951::Display::new(device)?;
//!
//! display.display(&[0u8; 100], Rect::new(10, 20, 10, 10), RefreshMode::FastBinary)?;
//! assert_eq!(probe.pixel(10, 20), Some(0));
//! assert_eq!(probe.pixel(0, 0), Some(0xFF));
//! # Ok(())
//! # }
//! ```

#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
mod device;
mod framebuffer;
mod stats;

pub use config::EmulatorConfig;
pub use device::{EmulatedIt8951, EmulatorEvent, EmulatorProbe, Fault};
pub use framebuffer::Framebuffer;
pub use stats::DisplayStats;
