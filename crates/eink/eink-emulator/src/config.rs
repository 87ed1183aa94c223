//! Emulator configuration

use std::path::PathBuf;

use eink_specs::displays::WAVESHARE_10_3;
use eink_specs::PanelSpec;

/// Configuration for an emulated controller
#[derive(Debug, Clone, PartialEq)]
pub struct EmulatorConfig {
    /// Panel the controller reports and simulates
    pub panel: PanelSpec,
    /// Write `frame_NNNN.png` here after every refresh
    pub frame_dir: Option<PathBuf>,
    /// Sleep for the waveform duration on every refresh
    pub paced: bool,
    /// Keep at most this many events, dropping the oldest; `None` keeps all
    pub event_limit: Option<usize>,
}

impl EmulatorConfig {
    /// Reference 10.3" panel, no frame output, no pacing
    pub const DEFAULT: Self = Self {
        panel: WAVESHARE_10_3,
        frame_dir: None,
        paced: false,
        event_limit: None,
    };

    /// Emulate `panel` with no frame output and no pacing
    pub fn new(panel: PanelSpec) -> Self {
        Self {
            panel,
            ..Self::DEFAULT
        }
    }

    /// Arbitrary panel size (the `--sim-size` path)
    pub fn with_size(width: u32, height: u32) -> Self {
        Self::new(PanelSpec::custom(width, height))
    }

    /// Write a PNG of the visible panel after every refresh
    pub fn frame_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.frame_dir = Some(dir.into());
        self
    }

    /// Sleep for each waveform's duration
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    /// Bound the event log for long-running sessions
    pub fn event_limit(mut self, limit: usize) -> Self {
        self.event_limit = Some(limit);
        self
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
