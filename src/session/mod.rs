//! Recognition layer: the provider seam, its event model, the session
//! lifecycle, and partial-result stabilization.
//!
//! The provider sits behind [`SpeechEngine`]; everything else in the crate
//! consumes [`RecognitionEvent`]s in arrival order, so swapping the backend
//! (or testing against [`ScriptedEngine`]) changes nothing downstream.

pub mod engine;
pub mod events;
pub mod recognition;
pub mod stabilizer;

pub use engine::{EngineSession, ScriptedEngine, SessionError, SpeechEngine};
pub use events::{CancelReason, RecognitionEvent};
pub use recognition::{ActiveRecognition, RecognitionSession, CANCEL_POLL};
pub use stabilizer::{PartialStabilizer, PARTIAL_MIN_INTERVAL};
