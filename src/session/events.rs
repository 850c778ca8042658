//! Recognition event model shared by engines, the session, and the
//! orchestrator.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CancelReason
// ---------------------------------------------------------------------------

/// Why a recognition stream ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// The caller requested the stop; normal shutdown, not an error.
    Requested,
    /// The capture device was lost or errored mid-stream.
    CaptureFailed { details: String },
    /// The recognition backend reported an error.  `details` is whatever the
    /// provider attached, if anything.
    ProviderError { details: Option<String> },
}

// ---------------------------------------------------------------------------
// RecognitionEvent
// ---------------------------------------------------------------------------

/// Provider-delivered recognition events, consumed in arrival order.
///
/// `Partial` carries an in-progress hypothesis that later partials or the
/// utterance's `Final` supersede; it must only ever reach the live status
/// line, never the caption history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecognitionEvent {
    /// The stream is up and waiting for speech.
    Listening,
    /// In-progress hypothesis for the current utterance.
    Partial { text: String },
    /// Authoritative result for a completed utterance.  `translated_text` is
    /// `None` when translation for the target language was unavailable.
    Final {
        recognized_text: String,
        recognition_language: String,
        translated_text: Option<String>,
        target_language: String,
    },
    /// No speech detected in the current segment.
    NoMatch,
    /// Stream ended; the reason distinguishes normal stop from faults.
    Canceled { reason: CancelReason },
}

impl RecognitionEvent {
    /// True for the event that terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecognitionEvent::Canceled { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
