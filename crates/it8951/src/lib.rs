//! IT8951 e-paper controller driver
//!
//! Talks to the IT8951 USB bridge with three vendor SCSI commands:
//!
//! | Layer | Type | Role |
//! |-------|------|------|
//! | Wire | [`wire`] | CDBs and fixed-layout records, documented endianness per field |
//! | Transport | [`SgTransport`] | one SG_IO ioctl per command (Linux) |
//! | Protocol | [`Controller`] | query geometry, stage pixels, trigger a refresh |
//! | Façade | [`Display`] | [`platform::DisplayDriver`]: validation, chunking, reset |
//!
//! Any [`platform::Transport`] can stand in for the SG_IO node; the
//! `eink-emulator` crate provides an in-memory controller for tests and the
//! desktop simulator.
//!
//! ```no_run
//! # #[cfg(target_os = "linux")]
//! # fn main() -> Result<(), platform::DisplayError> {
//! use platform::{DisplayDriver, ImageSource, RefreshMode};
//!
//! let mut display = it8951::Display::open("/dev/sg0")?;
//! display.show_image(ImageSource::path("dream.jpg"), RefreshMode::HighQualityGrayscale)?;
//! display.close();
//! # Ok(())
//! # }
//! # #[cfg(not(target_os = "linux"))]
//! # fn main() {}
//! ```

#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod chunk;
pub mod controller;
pub mod display;
pub mod session;
#[cfg(target_os = "linux")]
pub mod sg;
pub mod wire;

pub use chunk::{lines_per_chunk, ChunkPlan, TransferChunk};
pub use controller::Controller;
pub use display::Display;
pub use session::SessionState;
#[cfg(target_os = "linux")]
pub use sg::SgTransport;
pub use wire::{WireError, TRANSFER_CEILING};
