//! Hardware Abstraction Layer (HAL) for the dream camera e-paper stack
//!
//! This crate provides the types and traits shared by every display backend,
//! enabling development and testing without the physical panel.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (dreamcam crate)
//!         ↓
//! Display Façade (it8951::Display, implements DisplayDriver)
//!         ↓
//! Controller Protocol (it8951::Controller)
//!         ↓
//! Transport (this crate's trait; SG_IO or the eink-emulator device)
//! ```
//!
//! # Contents
//!
//! - [`DisplayDriver`] - the façade every backend exposes to application code
//! - [`Transport`] - one synchronous command/response exchange with a controller
//! - [`RefreshMode`] - waveform selector, values fixed by controller firmware
//! - [`PixelRegion`] / [`Rect`] - 8-bit grayscale rectangles
//! - [`ImageSource`] - path, encoded bytes or decoded bitmap
//!
//! # Example
//!
//! ```no_run
//! use platform::{DisplayDriver, ImageSource, RefreshMode};
//!
//! fn show<D: DisplayDriver>(display: &mut D) -> Result<(), platform::DisplayError> {
//!     display.clear(RefreshMode::FullInit)?;
//!     display.show_image(ImageSource::path("photo.jpg"), RefreshMode::HighQualityGrayscale)
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::print_stdout)] // prefer tracing over println! in lib code
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod display;
pub mod image_source;
pub mod transport;

pub use display::{
    DeviceInfo, BLACK, WHITE, DisplayDriver, DisplayError, PixelRegion, Rect, RefreshMode, UnknownRefreshMode,
};
pub use image_source::{DecodeError, ImageSource};
pub use transport::{DataPhase, Transport, TransportError};
