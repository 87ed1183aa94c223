//! Refresh-mode policy
//!
//! Maps what is being drawn to a waveform and owns the two counters that
//! keep a long-running panel healthy: the gallery ghosting guard and the
//! preventive reset after N captures.

use std::num::NonZeroU32;

use platform::RefreshMode;

/// What a display operation is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// First paint after open or reset.
    SessionStart,
    /// Freshly captured photo while the dream is computed.
    Preview,
    /// One spinner frame inside its square.
    Spinner,
    /// Short-lived overlay such as the carousel strip.
    Carousel,
    /// Final transformed image.
    Final,
    /// Gallery or slideshow image.
    Gallery,
    /// Any screen meant to stay up (text results, mode splash).
    Screen,
}

impl Purpose {
    /// Waveform for this purpose.
    pub fn mode(self) -> RefreshMode {
        match self {
            Purpose::SessionStart => RefreshMode::FullInit,
            Purpose::Preview | Purpose::Spinner | Purpose::Carousel => RefreshMode::FastBinary,
            Purpose::Final | Purpose::Gallery | Purpose::Screen => RefreshMode::HighQualityGrayscale,
        }
    }
}

/// Forces a `FullInit` clear before every N-th frame.
///
/// Frames are counted from zero, so the clear lands before frame 1, N+1,
/// 2N+1 and so on.
#[derive(Debug, Clone)]
pub struct GhostingGuard {
    interval: NonZeroU32,
    frames: u32,
}

impl GhostingGuard {
    /// Guard with a fresh counter.
    pub fn new(interval: NonZeroU32) -> Self {
        Self { interval, frames: 0 }
    }

    /// Call once per frame, before drawing it. True when a full clear is due.
    pub fn before_frame(&mut self) -> bool {
        let due = self.frames % self.interval.get() == 0;
        self.frames = self.frames.wrapping_add(1);
        due
    }

    /// Frames counted so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Configured interval.
    pub fn interval(&self) -> NonZeroU32 {
        self.interval
    }
}

/// Counts finished captures and signals when a preventive reset is due.
#[derive(Debug, Clone)]
pub struct AutoResetPolicy {
    interval: NonZeroU32,
    captures: u32,
}

impl AutoResetPolicy {
    /// Policy with a fresh counter.
    pub fn new(interval: NonZeroU32) -> Self {
        Self { interval, captures: 0 }
    }

    /// Record one capture cycle. True when the display should be reset now.
    pub fn record_capture(&mut self) -> bool {
        self.captures = self.captures.wrapping_add(1);
        self.captures % self.interval.get() == 0
    }

    /// Captures recorded so far.
    pub fn captures(&self) -> u32 {
        self.captures
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn every(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_purpose_modes() {
        assert_eq!(Purpose::SessionStart.mode(), RefreshMode::FullInit);
        assert_eq!(Purpose::Preview.mode(), RefreshMode::FastBinary);
        assert_eq!(Purpose::Spinner.mode(), RefreshMode::FastBinary);
        assert_eq!(Purpose::Final.mode(), RefreshMode::HighQualityGrayscale);
        assert_eq!(Purpose::Gallery.mode(), RefreshMode::HighQualityGrayscale);
    }

    #[test]
    fn test_guard_clears_first_and_every_sixth() {
        let mut guard = GhostingGuard::new(every(6));
        let due: Vec<bool> = (0..13).map(|_| guard.before_frame()).collect();
        let cleared: Vec<usize> = due
            .iter()
            .enumerate()
            .filter(|(_, &d)| d)
            .map(|(i, _)| i + 1)
            .collect();
        assert_eq!(cleared, vec![1, 7, 13]);
        assert_eq!(guard.frames(), 13);
    }

    #[test]
    fn test_guard_interval_one_clears_always() {
        let mut guard = GhostingGuard::new(NonZeroU32::MIN);
        assert!((0..5).all(|_| guard.before_frame()));
    }

    #[test]
    fn test_auto_reset_every_tenth() {
        let mut policy = AutoResetPolicy::new(every(10));
        let resets: Vec<u32> = (1..=25).filter(|_| policy.record_capture()).collect();
        assert_eq!(resets, vec![10, 20]);
        assert_eq!(policy.captures(), 25);
    }
}
