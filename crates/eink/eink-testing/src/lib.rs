//! E-Ink Panel Testing Utilities
//!
//! Headless harness that runs the real [`it8951::Display`] against the
//! emulated controller and asserts on what ended up on the glass.
//!
//! # Quick start
//!
//! ```
//! use eink_testing::TestPanel;
//! use platform::{DisplayDriver, Rect, RefreshMode, BLACK, WHITE};
//!
//! let mut t = TestPanel::new(100, 100);
//! t.display(&[BLACK; 100], Rect::new(5, 5, 10, 10), RefreshMode::FastBinary)
//!     .unwrap();
//!
//! t.assert_pixel(5, 5, BLACK).unwrap();
//! t.assert_pixel(14, 14, BLACK).unwrap();
//! t.assert_pixel(0, 0, WHITE).unwrap();
//! t.assert_refresh_modes(&[RefreshMode::FullInit, RefreshMode::FastBinary]).unwrap();
//! ```
//!
//! Every assertion returns `Result<(), String>` with a descriptive message so
//! tests can `.unwrap()` them and still get a readable failure.
//!
//! # Golden screenshot testing
//!
//! ```no_run
//! # use eink_testing::TestPanel;
//! # let t = TestPanel::new(100, 100);
//! // First run: set UPDATE_GOLDEN=1 to create/update the reference file.
//! t.assert_matches_golden("tests/golden/spinner.png", 0).unwrap();
//! ```

#![warn(clippy::all)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![allow(clippy::module_name_repetitions)]

use std::path::Path;

use eink_emulator::{EmulatedIt8951, EmulatorConfig, EmulatorProbe, Framebuffer};
use eink_specs::PanelSpec;
use it8951::Display;
use platform::{DisplayDriver, Rect, RefreshMode, WHITE};

pub use eink_emulator::{EmulatorEvent, Fault};

// ─────────────────────────────────────────────────────────────────────────────
// TestPanel
// ─────────────────────────────────────────────────────────────────────────────

/// Headless panel for display and application tests.
///
/// Wraps an opened [`Display`] over an [`EmulatedIt8951`] and adds:
/// - Pixel and region assertions against the visible framebuffer
/// - Refresh-log assertions (which waveforms ran, over which rectangles)
/// - Screenshot capture and golden-file comparison
///
/// Derefs to the [`Display`], so every [`DisplayDriver`] operation is
/// available directly. Opening already ran one `FullInit` clear; that
/// refresh is in the log.
#[derive(Debug)]
pub struct TestPanel {
    inner: Display<EmulatedIt8951>,
    probe: EmulatorProbe,
}

impl TestPanel {
    /// Open a panel with exact pixel dimensions.
    ///
    /// # Panics
    ///
    /// If the emulator refuses to open, which only happens for a zero-sized panel.
    #[allow(clippy::expect_used)]
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_config(EmulatorConfig::with_size(width, height))
            .expect("emulated panel must open")
    }

    /// Open a panel sized to a catalogued spec.
    ///
    /// # Panics
    ///
    /// Never for the specs in [`eink_specs::displays`].
    #[allow(clippy::expect_used)]
    pub fn with_spec(spec: PanelSpec) -> Self {
        Self::with_config(EmulatorConfig::new(spec)).expect("emulated panel must open")
    }

    /// Open a panel with full control over the emulator.
    pub fn with_config(config: EmulatorConfig) -> Result<Self, platform::DisplayError> {
        let device = EmulatedIt8951::new(config);
        let probe = device.probe();
        Ok(Self {
            inner: Display::new(device)?,
            probe,
        })
    }

    /// Split into the display and its probe (to hand the display to an owner thread).
    pub fn into_parts(self) -> (Display<EmulatedIt8951>, EmulatorProbe) {
        (self.inner, self.probe)
    }

    // ── Framebuffer access ───────────────────────────────────────────────────

    /// Panel width in pixels.
    pub fn width(&self) -> u32 {
        self.inner.info().width
    }

    /// Panel height in pixels.
    pub fn height(&self) -> u32 {
        self.inner.info().height
    }

    /// Visible pixel at `(x, y)`, or `None` if out of bounds.
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<u8> {
        self.probe.pixel(x, y)
    }

    /// Snapshot of the visible panel.
    pub fn framebuffer(&self) -> Framebuffer {
        self.probe.framebuffer()
    }

    /// Handle on the emulated controller (events, stats, fault injection).
    pub fn probe(&self) -> &EmulatorProbe {
        &self.probe
    }

    /// Count pixels that differ from `other`'s panel. Different sizes count every pixel.
    pub fn pixel_diff_count(&self, other: &TestPanel) -> usize {
        let (a, b) = (self.framebuffer(), other.framebuffer());
        if (a.width, a.height) != (b.width, b.height) {
            return a.pixels.len().max(b.pixels.len());
        }
        a.pixels.iter().zip(&b.pixels).filter(|(p, q)| p != q).count()
    }

    // ── Pixel assertions ─────────────────────────────────────────────────────

    /// Assert that pixel `(x, y)` has the expected gray value.
    pub fn assert_pixel(&self, x: u32, y: u32, expected: u8) -> Result<(), String> {
        let actual = self
            .pixel_at(x, y)
            .ok_or_else(|| format!("Pixel ({x}, {y}) is out of bounds"))?;
        if actual != expected {
            Err(format!("assert_pixel({x}, {y}): expected {expected}, got {actual}"))
        } else {
            Ok(())
        }
    }

    /// Assert that every pixel inside `rect` has the given value.
    pub fn assert_region_uniform(&self, rect: Rect, value: u8) -> Result<(), String> {
        for y in rect.y..rect.y.saturating_add(rect.height) {
            for x in rect.x..rect.x.saturating_add(rect.width) {
                self.assert_pixel(x, y, value)
                    .map_err(|e| format!("assert_region_uniform failed in {rect}: {e}"))?;
            }
        }
        Ok(())
    }

    /// Assert that `rect` shows exactly `expected` (row-major).
    pub fn assert_region_equals(&self, rect: Rect, expected: &[u8]) -> Result<(), String> {
        if !rect.fits_within(self.width(), self.height()) {
            return Err(format!("assert_region_equals: {rect} is off panel"));
        }
        if expected.len() != rect.area() {
            return Err(format!(
                "assert_region_equals: {} expected bytes for {rect}",
                expected.len()
            ));
        }
        let actual = self.probe.region(rect);
        match actual.iter().zip(expected).position(|(a, e)| a != e) {
            None => Ok(()),
            Some(i) => {
                let (dx, dy) = (i as u32 % rect.width, i as u32 / rect.width);
                Err(format!(
                    "assert_region_equals: pixel ({}, {}) expected {}, got {}",
                    rect.x + dx,
                    rect.y + dy,
                    expected[i],
                    actual[i]
                ))
            }
        }
    }

    /// Assert that `rect` contains **at least one** pixel with the given value.
    pub fn assert_region_contains(&self, rect: Rect, value: u8) -> Result<(), String> {
        if self.pixel_count_of_value(rect, value) > 0 {
            Ok(())
        } else {
            Err(format!("assert_region_contains: no pixel with value {value} found in {rect}"))
        }
    }

    /// Count how many pixels in `rect` equal `value`.
    pub fn pixel_count_of_value(&self, rect: Rect, value: u8) -> usize {
        self.probe.region(rect).iter().filter(|&&p| p == value).count()
    }

    /// Assert that the whole panel is white.
    pub fn assert_all_white(&self) -> Result<(), String> {
        let fb = self.framebuffer();
        match fb.pixels.iter().position(|&p| p != WHITE) {
            None => Ok(()),
            Some(i) => Err(format!(
                "assert_all_white: pixel ({}, {}) is {}",
                i as u32 % fb.width,
                i as u32 / fb.width,
                fb.pixels[i]
            )),
        }
    }

    // ── Refresh log ──────────────────────────────────────────────────────────

    /// Every refresh so far, in order.
    pub fn refreshes(&self) -> Vec<(Rect, RefreshMode)> {
        self.probe.refreshes()
    }

    /// Waveforms of every refresh so far, in order.
    pub fn refresh_modes(&self) -> Vec<RefreshMode> {
        self.refreshes().into_iter().map(|(_, mode)| mode).collect()
    }

    /// Forget logged events (e.g. the opening clear).
    pub fn clear_log(&self) {
        self.probe.clear_events();
    }

    /// Assert the exact sequence of waveforms since the last [`clear_log`](Self::clear_log).
    pub fn assert_refresh_modes(&self, expected: &[RefreshMode]) -> Result<(), String> {
        let actual = self.refresh_modes();
        if actual == expected {
            Ok(())
        } else {
            Err(format!("assert_refresh_modes: expected {expected:?}, got {actual:?}"))
        }
    }

    /// Assert that nothing was staged or refreshed since the last [`clear_log`](Self::clear_log).
    pub fn assert_untouched(&self) -> Result<(), String> {
        let touched: Vec<_> = self
            .probe
            .events()
            .into_iter()
            .filter(|e| matches!(e, EmulatorEvent::Upload { .. } | EmulatorEvent::Refresh { .. }))
            .collect();
        if touched.is_empty() {
            Ok(())
        } else {
            Err(format!("assert_untouched: {} commands reached the panel: {touched:?}", touched.len()))
        }
    }

    // ── Screenshot utilities ─────────────────────────────────────────────────

    /// Save the visible panel as a PNG.
    pub fn screenshot(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        self.framebuffer().save_png(path)
    }

    /// Save the visible panel as the golden reference PNG.
    ///
    /// Parent directories are created automatically.
    pub fn save_golden(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let p = path.as_ref();
        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.screenshot(p)?;
        Ok(())
    }

    /// Assert the visible panel matches a golden reference PNG.
    ///
    /// `threshold` is the largest per-pixel gray difference still considered
    /// equal (0 = exact match).
    ///
    /// Set the `UPDATE_GOLDEN=1` environment variable to **update** the golden
    /// file instead of asserting:
    ///
    /// ```bash
    /// UPDATE_GOLDEN=1 cargo test
    /// ```
    pub fn assert_matches_golden(&self, golden_path: impl AsRef<Path>, threshold: u8) -> Result<(), String> {
        let golden_path = golden_path.as_ref();

        if std::env::var("UPDATE_GOLDEN").is_ok() {
            return self
                .save_golden(golden_path)
                .map_err(|e| format!("Failed to save golden '{}': {e}", golden_path.display()));
        }

        let current = self.framebuffer().to_gray_image();
        let golden = image::open(golden_path)
            .map_err(|e| {
                format!(
                    "Failed to open golden '{}': {e}\nRun with UPDATE_GOLDEN=1 to create it.",
                    golden_path.display()
                )
            })?
            .to_luma8();

        if current.dimensions() != golden.dimensions() {
            let (cw, ch) = current.dimensions();
            let (gw, gh) = golden.dimensions();
            return Err(format!("Dimension mismatch: screenshot is {cw}×{ch}, golden is {gw}×{gh}"));
        }

        let diff_pixels = current
            .as_raw()
            .iter()
            .zip(golden.as_raw())
            .filter(|&(&a, &b)| a.abs_diff(b) > threshold)
            .count();

        if diff_pixels > 0 {
            Err(format!(
                "{diff_pixels} pixels differ from golden '{}' (threshold={threshold})",
                golden_path.display()
            ))
        } else {
            Ok(())
        }
    }
}

impl std::ops::Deref for TestPanel {
    type Target = Display<EmulatedIt8951>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::ops::DerefMut for TestPanel {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
