//! Display session recovery state.
//!
//! The controller offers no liveness signal, so a wedged panel is only ever
//! recovered by an explicit [`reset`](platform::DisplayDriver::reset): close
//! the handle, reopen the same path, re-query geometry and clear with
//! `FullInit`. Transport errors on ordinary operations never change state;
//! retrying or resetting is the caller's decision.
//!
//! ```text
//!            begin_reset()                on_reset_failed()
//!   Live ───────────────────▶ Recovering ◀──────────────┐
//!    ▲                          │    └──────────────────┘
//!    └──── on_reset_completed() ┘
//! ```

// ─── State machine ───────────────────────────────────────────────────────────

/// Session state of one display handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handle is open and geometry is current.
    Live,
    /// A reset is in progress or the last one failed. Display operations are
    /// refused until a reset succeeds.
    Recovering {
        /// Failed reset attempts since the session was last live.
        /// Saturates at 255.
        failed_attempts: u8,
    },
}

impl SessionState {
    /// A freshly opened session.
    pub fn new() -> Self {
        Self::Live
    }

    /// True when display operations may be issued.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Enter `Recovering`. Keeps the failure count when already recovering.
    pub fn begin_reset(&mut self) {
        if self.is_live() {
            *self = Self::Recovering { failed_attempts: 0 };
        }
    }

    /// Record a failed reset; the session stays `Recovering`.
    pub fn on_reset_failed(&mut self) {
        *self = Self::Recovering {
            failed_attempts: self.failed_attempts().saturating_add(1),
        };
    }

    /// Reset finished: handle reopened, geometry re-queried, panel cleared.
    pub fn on_reset_completed(&mut self) {
        *self = Self::Live;
    }

    /// Failed reset attempts, or 0 when live.
    pub fn failed_attempts(&self) -> u8 {
        match self {
            Self::Recovering { failed_attempts } => *failed_attempts,
            Self::Live => 0,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Test A ────────────────────────────────────────────────────────────────
    /// A new session is live.
    #[test]
    fn test_initial_state_is_live() {
        assert_eq!(SessionState::new(), SessionState::Live);
        assert!(SessionState::default().is_live());
    }

    // ── Test B ────────────────────────────────────────────────────────────────
    /// begin_reset() leaves Live; completion returns to it.
    #[test]
    fn test_reset_round_trip() {
        let mut state = SessionState::new();
        state.begin_reset();
        assert_eq!(state, SessionState::Recovering { failed_attempts: 0 });
        assert!(!state.is_live());

        state.on_reset_completed();
        assert_eq!(state, SessionState::Live);
    }

    // ── Test C ────────────────────────────────────────────────────────────────
    /// Failed resets keep the session recovering and are counted across retries.
    #[test]
    fn test_failed_reset_stays_recovering() {
        let mut state = SessionState::new();
        state.begin_reset();
        state.on_reset_failed();
        state.begin_reset();
        state.on_reset_failed();
        assert_eq!(state, SessionState::Recovering { failed_attempts: 2 });
        assert_eq!(state.failed_attempts(), 2);

        state.begin_reset();
        state.on_reset_completed();
        assert_eq!(state.failed_attempts(), 0);
    }

    // ── Test D ────────────────────────────────────────────────────────────────
    /// failed_attempts saturates instead of wrapping.
    #[test]
    fn test_failed_attempts_saturate() {
        let mut state = SessionState::Recovering {
            failed_attempts: u8::MAX,
        };
        state.on_reset_failed();
        assert_eq!(state.failed_attempts(), u8::MAX);
    }
}
