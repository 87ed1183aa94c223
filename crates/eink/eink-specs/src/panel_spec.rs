//! Panel specification types
//!
//! Defines the characteristics of an IT8951-driven panel needed for
//! emulation: geometry, buffer address and refresh timing.

use core::time::Duration;

use platform::RefreshMode;

/// Image buffer address most IT8951 firmware reports.
pub const DEFAULT_BUFFER_ADDR: u32 = 0x0012_36E0;

/// Complete specification of an IT8951 panel
///
/// Contains everything the emulator needs to impersonate the controller:
/// - Physical dimensions
/// - Image buffer address reported by the device-info query
/// - Refresh duration per waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSpec {
    /// Panel name (e.g., "Waveshare 10.3\" IT8951")
    pub name: &'static str,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Diagonal in inches, from the datasheet
    pub diagonal_inches: f32,

    /// E-ink panel type
    pub panel_type: PanelType,

    /// Number of grayscale levels the GC16 waveform resolves
    pub grayscale_levels: u8,

    /// Image buffer address in controller memory
    pub buffer_addr: u32,

    /// INIT waveform duration in milliseconds
    pub init_refresh_ms: u32,

    /// DU waveform duration in milliseconds
    pub du_refresh_ms: u32,

    /// GC16 waveform duration in milliseconds
    pub gc16_refresh_ms: u32,

    /// A2 waveform duration in milliseconds
    pub a2_refresh_ms: u32,
}

impl PanelSpec {
    /// A simulated panel of arbitrary size with 10.3" timing.
    pub const fn custom(width: u32, height: u32) -> Self {
        Self {
            name: "Simulated IT8951 panel",
            width,
            height,
            ..crate::displays::WAVESHARE_10_3
        }
    }

    /// Get panel aspect ratio (width / height)
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Byte length of a full 8-bit frame
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Refresh duration of `mode` in milliseconds
    pub fn refresh_ms(&self, mode: RefreshMode) -> u32 {
        match mode {
            RefreshMode::FullInit => self.init_refresh_ms,
            RefreshMode::DirectUpdate => self.du_refresh_ms,
            RefreshMode::HighQualityGrayscale => self.gc16_refresh_ms,
            RefreshMode::FastBinary => self.a2_refresh_ms,
        }
    }

    /// Refresh duration of `mode`
    pub fn refresh_duration(&self, mode: RefreshMode) -> Duration {
        Duration::from_millis(u64::from(self.refresh_ms(mode)))
    }
}

/// E-ink panel technology types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelType {
    /// E Ink Pearl (older generation)
    Pearl,
    /// E Ink Carta 1000 (improved contrast)
    Carta1000,
    /// E Ink Carta 1200 (faster response)
    Carta1200,
}
