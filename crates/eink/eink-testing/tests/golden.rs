//! Screenshot and golden-file comparison.

// Test file: unwrap/expect/panic acceptable in test code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use eink_specs::displays::WAVESHARE_9_7;
use eink_testing::TestPanel;
use platform::{DisplayDriver, Rect, RefreshMode, BLACK};

fn patterned() -> TestPanel {
    let mut t = TestPanel::new(64, 32);
    let gradient: Vec<u8> = (0..64 * 8).map(|i| (i % 64 * 4) as u8).collect();
    t.display(&gradient, Rect::new(0, 12, 64, 8), RefreshMode::HighQualityGrayscale)
        .unwrap();
    t
}

#[test]
fn golden_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let golden = dir.path().join("nested").join("pattern.png");

    let t = patterned();
    t.save_golden(&golden).unwrap();
    t.assert_matches_golden(&golden, 0).unwrap();
}

#[test]
fn golden_detects_changes_above_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let golden = dir.path().join("pattern.png");
    patterned().save_golden(&golden).unwrap();

    let mut t = patterned();
    t.display(&[BLACK; 4], Rect::new(0, 0, 2, 2), RefreshMode::FastBinary)
        .unwrap();
    let err = t.assert_matches_golden(&golden, 0).unwrap_err();
    assert!(err.starts_with("4 pixels differ"), "{err}");
    // 255 vs 0 is beyond any threshold short of 255.
    assert!(t.assert_matches_golden(&golden, 254).is_err());
    assert!(t.assert_matches_golden(&golden, 255).is_ok());
}

#[test]
fn golden_dimension_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let golden = dir.path().join("small.png");
    TestPanel::new(10, 10).save_golden(&golden).unwrap();

    let err = TestPanel::new(20, 10).assert_matches_golden(&golden, 0).unwrap_err();
    assert!(err.contains("Dimension mismatch"), "{err}");
}

#[test]
fn missing_golden_explains_update_flag() {
    let err = TestPanel::new(4, 4)
        .assert_matches_golden("/nonexistent/golden.png", 0)
        .unwrap_err();
    assert!(err.contains("UPDATE_GOLDEN=1"), "{err}");
}

#[test]
fn catalogued_panel_opens_white() {
    let t = TestPanel::with_spec(WAVESHARE_9_7);
    assert_eq!((t.width(), t.height()), (1200, 825));
    t.assert_all_white().unwrap();
    t.assert_refresh_modes(&[RefreshMode::FullInit]).unwrap();
}
