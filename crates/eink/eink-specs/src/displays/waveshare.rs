//! Waveshare IT8951 panel specifications
//!
//! Timings are the typical waveform durations from the Waveshare HAT wiki at
//! 25 °C.

use crate::{PanelSpec, PanelType, DEFAULT_BUFFER_ADDR};

/// Waveshare 10.3" (1872×1404, IT8951, Carta 1200)
///
/// The dream camera's reference panel.
/// - Grayscale: 16 levels
/// - INIT: ~1.2s with flashing
/// - GC16: 450ms
/// - A2: 120ms
pub const WAVESHARE_10_3: PanelSpec = PanelSpec {
    name: "Waveshare 10.3\" IT8951",
    width: 1872,
    height: 1404,
    diagonal_inches: 10.3,
    panel_type: PanelType::Carta1200,
    grayscale_levels: 16,
    buffer_addr: DEFAULT_BUFFER_ADDR,
    init_refresh_ms: 1200,
    du_refresh_ms: 260,
    gc16_refresh_ms: 450,
    a2_refresh_ms: 120,
};

/// Waveshare 7.8" (1872×1404, IT8951, Carta 1200)
///
/// Same resolution as the 10.3" at higher pixel density.
pub const WAVESHARE_7_8: PanelSpec = PanelSpec {
    name: "Waveshare 7.8\" IT8951",
    diagonal_inches: 7.8,
    ..WAVESHARE_10_3
};

/// Waveshare 6" HD (1448×1072, IT8951, Carta 1200)
pub const WAVESHARE_6_HD: PanelSpec = PanelSpec {
    name: "Waveshare 6\" HD IT8951",
    width: 1448,
    height: 1072,
    diagonal_inches: 6.0,
    ..WAVESHARE_10_3
};

/// Waveshare 9.7" (1200×825, IT8951, Carta 1000)
///
/// Older panel with slower waveforms.
pub const WAVESHARE_9_7: PanelSpec = PanelSpec {
    name: "Waveshare 9.7\" IT8951",
    width: 1200,
    height: 825,
    diagonal_inches: 9.7,
    panel_type: PanelType::Carta1000,
    grayscale_levels: 16,
    buffer_addr: DEFAULT_BUFFER_ADDR,
    init_refresh_ms: 1500,
    du_refresh_ms: 300,
    gc16_refresh_ms: 600,
    a2_refresh_ms: 150,
};

/// Every pre-configured panel.
pub const ALL: [PanelSpec; 4] = [WAVESHARE_10_3, WAVESHARE_7_8, WAVESHARE_6_HD, WAVESHARE_9_7];
