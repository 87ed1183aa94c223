//! Keyboard and push-button input
//!
//! Every source runs as its own task and feeds one channel of
//! [`InputEvent`]s:
//!
//! | Source | Events |
//! |--------|--------|
//! | stdin, one line at a time | `1`/space click, `g` double-click, `m`, `s`, `c`, `r`, `q` |
//! | sysfs GPIO button (active low) | click, double-click, hold |
//! | Ctrl-C | quit |

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Single click: capture, next image, pause, confirm.
    Click,
    /// Two clicks in quick succession: browse styles, previous image, cancel.
    DoubleClick,
    /// Long press: mode carousel.
    Hold,
    /// Leave the application.
    Quit,
    /// Cycle to the next style.
    NextStyle,
    /// Clear the panel and return to capture mode.
    Clear,
    /// Reset the display and return to capture mode.
    Reset,
    /// Cycle to the next mode.
    NextMode,
}

/// Keyboard binding for one key.
pub fn map_key(key: char) -> Option<InputEvent> {
    match key {
        '1' | ' ' => Some(InputEvent::Click),
        'g' => Some(InputEvent::DoubleClick),
        'm' => Some(InputEvent::NextMode),
        's' => Some(InputEvent::NextStyle),
        'c' => Some(InputEvent::Clear),
        'r' => Some(InputEvent::Reset),
        'q' => Some(InputEvent::Quit),
        _ => None,
    }
}

/// Button timing thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTiming {
    /// Shorter presses are contact bounce.
    pub debounce: Duration,
    /// Quiet time after the last release before clicks are reported.
    pub click_timeout: Duration,
    /// Press length that counts as a hold.
    pub hold: Duration,
}

impl Default for ButtonTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(50),
            click_timeout: Duration::from_millis(400),
            hold: Duration::from_millis(1500),
        }
    }
}

/// Click / double-click / hold recognizer fed with sampled button levels.
#[derive(Debug, Clone)]
pub struct ButtonMachine {
    timing: ButtonTiming,
    was_pressed: bool,
    pressed_at: Option<Instant>,
    hold_fired: bool,
    clicks: u32,
    last_release: Option<Instant>,
}

impl ButtonMachine {
    /// Machine in the released state.
    pub fn new(timing: ButtonTiming) -> Self {
        Self {
            timing,
            was_pressed: false,
            pressed_at: None,
            hold_fired: false,
            clicks: 0,
            last_release: None,
        }
    }

    /// Feed one sample. At most one event per sample.
    ///
    /// A hold fires while the button is still down and swallows the press.
    /// Clicks are counted on release and reported once the click timeout
    /// passes without another release: one as a click, more as a double-click.
    pub fn update(&mut self, pressed: bool, now: Instant) -> Option<InputEvent> {
        match (self.was_pressed, pressed) {
            (false, true) => {
                self.pressed_at = Some(now);
                self.hold_fired = false;
            }
            (true, true) => {
                let held = self.pressed_at.map_or(Duration::ZERO, |at| now.saturating_duration_since(at));
                if !self.hold_fired && held >= self.timing.hold {
                    self.hold_fired = true;
                    self.clicks = 0;
                    return Some(InputEvent::Hold);
                }
            }
            (true, false) => {
                let held = self.pressed_at.map_or(Duration::ZERO, |at| now.saturating_duration_since(at));
                if held >= self.timing.debounce && !self.hold_fired {
                    self.clicks += 1;
                    self.last_release = Some(now);
                }
            }
            (false, false) => {}
        }
        self.was_pressed = pressed;
        self.flush_clicks(now)
    }

    fn flush_clicks(&mut self, now: Instant) -> Option<InputEvent> {
        let last = self.last_release?;
        if self.clicks == 0 || now.saturating_duration_since(last) <= self.timing.click_timeout {
            return None;
        }
        let clicks = std::mem::take(&mut self.clicks);
        Some(if clicks == 1 {
            InputEvent::Click
        } else {
            InputEvent::DoubleClick
        })
    }
}

/// Push button on a sysfs GPIO line, wired to ground (reads `0` when pressed).
#[derive(Debug, Clone)]
pub struct SysfsButton {
    value: PathBuf,
}

impl SysfsButton {
    /// Export `pin` if needed and configure it as an input.
    pub fn open(pin: u32) -> std::io::Result<Self> {
        Self::open_in(Path::new("/sys/class/gpio"), pin)
    }

    fn open_in(root: &Path, pin: u32) -> std::io::Result<Self> {
        let line = root.join(format!("gpio{pin}"));
        if !line.exists() {
            std::fs::write(root.join("export"), pin.to_string())?;
        }
        std::fs::write(line.join("direction"), "in")?;
        Ok(Self {
            value: line.join("value"),
        })
    }

    /// Current level.
    pub async fn is_pressed(&self) -> std::io::Result<bool> {
        let level = tokio::fs::read_to_string(&self.value).await?;
        Ok(level.trim() == "0")
    }
}

/// Which sources to start.
#[derive(Debug, Clone)]
pub struct InputConfig {
    /// GPIO line of the push button, if any.
    pub gpio_pin: Option<u32>,
    /// Button sampling period.
    pub poll_interval: Duration,
    /// Button thresholds.
    pub timing: ButtonTiming,
}

/// Start every available source and return the merged event stream.
///
/// Sources that cannot start are logged and skipped.
pub fn spawn_sources(config: InputConfig) -> mpsc::Receiver<InputEvent> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(keyboard(tx.clone()));
    tokio::spawn(ctrl_c(tx.clone()));

    if let Some(pin) = config.gpio_pin {
        match SysfsButton::open(pin) {
            Ok(button) => {
                tracing::info!(pin, "Button ready");
                tokio::spawn(button_task(button, config.poll_interval, config.timing, tx));
            }
            Err(e) => tracing::warn!(pin, error = %e, "GPIO button unavailable"),
        }
    }
    rx
}

async fn keyboard(tx: mpsc::Sender<InputEvent>) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                for event in line.chars().filter_map(map_key) {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            Ok(None) => {
                tracing::debug!("stdin closed");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Keyboard input unavailable");
                return;
            }
        }
    }
}

async fn ctrl_c(tx: mpsc::Sender<InputEvent>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        let _ = tx.send(InputEvent::Quit).await;
    }
}

async fn button_task(button: SysfsButton, period: Duration, timing: ButtonTiming, tx: mpsc::Sender<InputEvent>) {
    let mut machine = ButtonMachine::new(timing);
    let mut ticks = tokio::time::interval(period);
    loop {
        ticks.tick().await;
        let pressed = match button.is_pressed().await {
            Ok(pressed) => pressed,
            Err(e) => {
                tracing::warn!(error = %e, "Button read failed, giving up on GPIO");
                return;
            }
        };
        if let Some(event) = machine.update(pressed, Instant::now()) {
            tracing::debug!(?event, "Button");
            if tx.send(event).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Drive the machine with (level, milliseconds-since-start) samples.
    fn run(samples: &[(bool, u64)]) -> Vec<InputEvent> {
        let start = Instant::now();
        let mut machine = ButtonMachine::new(ButtonTiming::default());
        samples
            .iter()
            .filter_map(|&(pressed, ms)| machine.update(pressed, start + Duration::from_millis(ms)))
            .collect()
    }

    #[test]
    fn test_key_map() {
        assert_eq!(map_key('1'), Some(InputEvent::Click));
        assert_eq!(map_key(' '), Some(InputEvent::Click));
        assert_eq!(map_key('g'), Some(InputEvent::DoubleClick));
        assert_eq!(map_key('q'), Some(InputEvent::Quit));
        assert_eq!(map_key('x'), None);
    }

    #[test]
    fn test_single_click_after_timeout() {
        let events = run(&[(true, 0), (false, 100), (false, 300), (false, 501)]);
        assert_eq!(events, vec![InputEvent::Click]);
    }

    #[test]
    fn test_double_click() {
        let events = run(&[
            (true, 0),
            (false, 100),
            (true, 200),
            (false, 300),
            (false, 600),
            (false, 750),
        ]);
        assert_eq!(events, vec![InputEvent::DoubleClick]);
    }

    #[test]
    fn test_bounce_is_ignored() {
        let events = run(&[(true, 0), (false, 20), (false, 1000)]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_hold_fires_once_and_swallows_click() {
        let events = run(&[
            (true, 0),
            (true, 1000),
            (true, 1500),
            (true, 2500),
            (false, 3000),
            (false, 4000),
        ]);
        assert_eq!(events, vec![InputEvent::Hold]);
    }

    #[tokio::test]
    async fn test_sysfs_button_levels() {
        let root = tempfile::tempdir().unwrap();
        let line = root.path().join("gpio17");
        std::fs::create_dir(&line).unwrap();
        std::fs::write(line.join("value"), "1\n").unwrap();

        let button = SysfsButton::open_in(root.path(), 17).unwrap();
        assert_eq!(std::fs::read_to_string(line.join("direction")).unwrap(), "in");

        assert!(!button.is_pressed().await.unwrap());
        std::fs::write(line.join("value"), "0\n").unwrap();
        assert!(button.is_pressed().await.unwrap());
    }

    #[test]
    fn test_sysfs_export_failure() {
        let root = tempfile::tempdir().unwrap();
        // Neither the line nor the export file's directory exists.
        assert!(SysfsButton::open_in(&root.path().join("missing"), 4).is_err());
    }
}
