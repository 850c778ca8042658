//! Session orchestration: provider selection, run lifecycle, and the
//! state machine operators use to follow a run.
//!
//! [`runner::TranslationOrchestrator`] is the entry point; it picks a
//! [`provider::ProviderStrategy`] from the configuration, drives one
//! recognition run at a time, and publishes progress through the
//! [`state::SessionState`] machine and the caller's sinks.

pub mod provider;
pub mod runner;
pub mod state;

pub use provider::{run_openai_stub, ProviderStrategy, STUB_PENDING_STATUS};
pub use runner::{
    StatusSink, TranslationOrchestrator, TranslationSink, AWAITING_SPEECH, TRANSLATION_FINISHED,
};
pub use state::{advance, new_shared_session_state, SessionState, SharedSessionState};
