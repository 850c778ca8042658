//! Continuous speech-to-caption translation between English and Brazilian
//! Portuguese.
//!
//! The crate captures audio from a microphone or a render-loopback source,
//! streams it to a speech-translation provider, stabilizes the stream of
//! partial hypotheses, and assembles final results into readable caption
//! blocks:
//!
//! ```text
//! audio::spawn_capture ──▶ session::RecognitionSession ──▶ captions::CaptionHistory
//!       (PCM chunks)            (recognition events)           (merged blocks)
//!                └────────── orchestrator::TranslationOrchestrator ──────────┘
//! ```
//!
//! # Quick start
//!
//! Build a [`config::TranslationConfig`] from the environment, pick a source
//! from [`audio::AudioDeviceCatalog::enumerate`], and hand both to an
//! [`orchestrator::TranslationOrchestrator`] together with a
//! [`session::SpeechEngine`] for your provider's streaming transport.  The
//! orchestrator runs until its cancellation flag is set and reports progress
//! through caller-supplied sinks.

pub mod audio;
pub mod captions;
pub mod config;
pub mod orchestrator;
pub mod session;
