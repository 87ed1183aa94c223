//! Property-based tests for text layout and button decoding.

#![allow(clippy::unwrap_used, clippy::cast_possible_truncation)]

use std::time::{Duration, Instant};

use dreamcam::input::{ButtonMachine, ButtonTiming, InputEvent};
use dreamcam::policy::GhostingGuard;
use dreamcam::screens::wrap_text;
use proptest::prelude::*;

proptest! {
    /// Wrapping keeps every word, in order, and only overflows for words
    /// longer than a line.
    #[test]
    fn wrap_keeps_words(words in prop::collection::vec("[a-z]{1,12}", 0..40), width in 4usize..40) {
        let text = words.join(" ");
        let lines = wrap_text(&text, width);

        let rejoined: Vec<&str> = lines.iter().flat_map(|l| l.split_whitespace()).collect();
        prop_assert_eq!(rejoined, words.iter().map(String::as_str).collect::<Vec<_>>());
        for line in &lines {
            prop_assert!(line.chars().count() <= width || !line.contains(' '), "{:?}", line);
        }
    }

    /// A press shorter than the hold threshold yields exactly one click once
    /// the click timeout has passed; a longer one yields exactly one hold.
    #[test]
    fn one_press_one_event(press_ms in 60u64..3000) {
        let timing = ButtonTiming::default();
        let mut machine = ButtonMachine::new(timing);
        let start = Instant::now();
        let mut events = Vec::new();

        let mut t = 0;
        while t <= press_ms {
            events.extend(machine.update(true, start + Duration::from_millis(t)));
            t += 10;
        }
        let release = t;
        while t <= release + 1000 {
            events.extend(machine.update(false, start + Duration::from_millis(t)));
            t += 10;
        }

        // Last sample taken with the button down.
        let last_down = Duration::from_millis(press_ms / 10 * 10);
        let expected = if last_down >= timing.hold { InputEvent::Hold } else { InputEvent::Click };
        prop_assert_eq!(events, vec![expected]);
    }

    /// Exactly one full refresh per `interval` frames, starting with the first.
    #[test]
    fn guard_clears_once_per_interval(interval in 1u32..20, frames in 1u32..200) {
        let mut guard = GhostingGuard::new(std::num::NonZeroU32::new(interval).unwrap());
        let clears: Vec<u32> = (0..frames).filter(|_| guard.before_frame()).collect();
        prop_assert_eq!(clears.len() as u32, frames.div_ceil(interval));
        prop_assert_eq!(clears.first().copied(), Some(0));
    }
}
