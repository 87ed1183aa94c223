//! Pre-configured panel specifications
//!
//! Waveshare IT8951 HAT panels, from the vendor datasheets.

pub mod waveshare;

pub use waveshare::*;
