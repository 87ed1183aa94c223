//! Refresh statistics and ghosting tracking

use platform::RefreshMode;

/// Display statistics tracking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayStats {
    /// INIT refreshes
    pub full_init_count: u64,
    /// DU refreshes
    pub direct_update_count: u64,
    /// GC16 refreshes
    pub grayscale_count: u64,
    /// A2 refreshes
    pub fast_binary_count: u64,
    /// Load-area commands accepted
    pub upload_count: u64,
    /// Pixel bytes staged
    pub bytes_staged: u64,
    /// Simulated waveform time
    pub total_refresh_time_ms: u64,
    /// Refreshes since the last INIT; ghosting builds up while this grows
    pub refreshes_since_full: u64,
}

impl DisplayStats {
    pub(crate) fn record_upload(&mut self, bytes: usize) {
        self.upload_count += 1;
        self.bytes_staged += bytes as u64;
    }

    pub(crate) fn record_refresh(&mut self, mode: RefreshMode, duration_ms: u32) {
        match mode {
            RefreshMode::FullInit => self.full_init_count += 1,
            RefreshMode::DirectUpdate => self.direct_update_count += 1,
            RefreshMode::HighQualityGrayscale => self.grayscale_count += 1,
            RefreshMode::FastBinary => self.fast_binary_count += 1,
        }
        if mode.clears_ghosting() {
            self.refreshes_since_full = 0;
        } else {
            self.refreshes_since_full += 1;
        }
        self.total_refresh_time_ms += u64::from(duration_ms);
    }

    /// Refreshes of every mode
    pub fn refresh_count(&self) -> u64 {
        self.full_init_count + self.direct_update_count + self.grayscale_count + self.fast_binary_count
    }
}
