//! E-Ink Panel Specifications
//!
//! Geometry, controller buffer address and per-waveform refresh timing of the
//! IT8951-driven panels the dream camera supports. The emulator answers the
//! device-info query from these values and paces simulated refreshes with
//! them.
//!
//! # Example
//!
//! ```
//! use eink_specs::displays::WAVESHARE_10_3;
//! use platform::RefreshMode;
//!
//! let spec = WAVESHARE_10_3;
//! assert_eq!((spec.width, spec.height), (1872, 1404));
//! assert!(spec.refresh_ms(RefreshMode::FastBinary) < spec.refresh_ms(RefreshMode::FullInit));
//! ```
//!
//! # Simulated Panels
//!
//! ```
//! use eink_specs::PanelSpec;
//!
//! let spec = PanelSpec::custom(200, 150);
//! assert_eq!(spec.frame_len(), 30_000);
//! ```

pub mod displays;
mod panel_spec;

pub use panel_spec::{PanelSpec, PanelType, DEFAULT_BUFFER_ADDR};
