//! Run state machine.
//!
//! [`SessionState`] tracks one translation run's stream lifecycle.  The
//! orchestrator drives it; embedders read it via [`SharedSessionState`] to
//! render an activity indicator.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// States of a translation run.
///
/// ```text
/// Idle ──run starts──▶ Listening ──cancel / terminal event──▶ Stopping
///                          │                                     │
///                          └────────▶ Error ◀────────────────────┤
///                                                                ▼
/// Stopped / Error ──next run──▶ Listening                    Stopped
/// ```
///
/// Failures before the stream is up (device open, provider start) leave the
/// state at `Idle`: no stream existed, so there is nothing to tear down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No run in flight.
    Idle,

    /// Capture and provider stream are up; events are being pumped.
    Listening,

    /// Shutdown requested; waiting for the provider stream to release.
    Stopping,

    /// The run ended cleanly; capture and stream are released.
    Stopped,

    /// The run ended on a fault.  The next run starts from here.
    Error,
}

impl SessionState {
    /// True while a run holds the capture device or the provider stream.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Listening | SessionState::Stopping)
    }

    /// Short label for logs and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Listening => "Listening",
            SessionState::Stopping => "Stopping",
            SessionState::Stopped => "Stopped",
            SessionState::Error => "Error",
        }
    }

    /// Whether the machine allows moving to `next` from here.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Listening)
                | (Listening, Stopping)
                | (Listening, Error)
                | (Stopping, Stopped)
                | (Stopping, Error)
                | (Stopped, Listening)
                | (Error, Listening)
        )
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

// ---------------------------------------------------------------------------
// SharedSessionState
// ---------------------------------------------------------------------------

/// Thread-safe handle to the run state.
///
/// Cheap to clone.  Lock for short critical sections only; never across
/// `.await` points.
pub type SharedSessionState = Arc<Mutex<SessionState>>;

/// Construct a [`SharedSessionState`] starting at [`SessionState::Idle`].
pub fn new_shared_session_state() -> SharedSessionState {
    Arc::new(Mutex::new(SessionState::Idle))
}

/// Apply a guarded transition, logging and ignoring invalid ones.
pub fn advance(state: &SharedSessionState, next: SessionState) {
    let mut guard = state.lock().unwrap();
    if guard.can_transition_to(&next) {
        log::debug!("session state: {} -> {}", guard.label(), next.label());
        *guard = next;
    } else {
        log::warn!(
            "ignored invalid session state transition: {} -> {}",
            guard.label(),
            next.label()
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- activity ----

    #[test]
    fn listening_and_stopping_are_active() {
        assert!(SessionState::Listening.is_active());
        assert!(SessionState::Stopping.is_active());
    }

    #[test]
    fn idle_stopped_and_error_are_not_active() {
        assert!(!SessionState::Idle.is_active());
        assert!(!SessionState::Stopped.is_active());
        assert!(!SessionState::Error.is_active());
    }

    // ---- transitions ----

    #[test]
    fn a_run_walks_the_happy_path() {
        assert!(SessionState::Idle.can_transition_to(&SessionState::Listening));
        assert!(SessionState::Listening.can_transition_to(&SessionState::Stopping));
        assert!(SessionState::Stopping.can_transition_to(&SessionState::Stopped));
    }

    #[test]
    fn faults_are_reachable_only_from_an_active_run() {
        assert!(SessionState::Listening.can_transition_to(&SessionState::Error));
        assert!(SessionState::Stopping.can_transition_to(&SessionState::Error));
        assert!(!SessionState::Idle.can_transition_to(&SessionState::Error));
        assert!(!SessionState::Stopped.can_transition_to(&SessionState::Error));
    }

    #[test]
    fn finished_runs_can_start_again() {
        assert!(SessionState::Stopped.can_transition_to(&SessionState::Listening));
        assert!(SessionState::Error.can_transition_to(&SessionState::Listening));
    }

    #[test]
    fn skipping_states_is_rejected() {
        assert!(!SessionState::Idle.can_transition_to(&SessionState::Stopped));
        assert!(!SessionState::Listening.can_transition_to(&SessionState::Stopped));
        assert!(!SessionState::Stopped.can_transition_to(&SessionState::Stopping));
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    // ---- labels ----

    #[test]
    fn labels_cover_every_state() {
        assert_eq!(SessionState::Idle.label(), "Idle");
        assert_eq!(SessionState::Listening.label(), "Listening");
        assert_eq!(SessionState::Stopping.label(), "Stopping");
        assert_eq!(SessionState::Stopped.label(), "Stopped");
        assert_eq!(SessionState::Error.label(), "Error");
    }

    // ---- shared state ----

    #[test]
    fn shared_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedSessionState>();
    }

    #[test]
    fn advance_applies_valid_transitions() {
        let state = new_shared_session_state();
        advance(&state, SessionState::Listening);
        assert_eq!(*state.lock().unwrap(), SessionState::Listening);
    }

    #[test]
    fn advance_ignores_invalid_transitions() {
        let state = new_shared_session_state();
        advance(&state, SessionState::Stopped);
        assert_eq!(*state.lock().unwrap(), SessionState::Idle);
    }
}
