//! Recognition session lifecycle.
//!
//! [`RecognitionSession`] validates the provider configuration once and is
//! then reused across runs; each [`RecognitionSession::start`] opens one
//! provider stream for a language pair.  [`ActiveRecognition`] wraps the
//! in-flight stream and folds the shared cancellation flag into the event
//! sequence, so its consumer sees a single uniform terminal event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::engine::{EngineSession, SessionError, SpeechEngine};
use super::events::{CancelReason, RecognitionEvent};
use crate::audio::PcmChunk;
use crate::config::{ProviderKind, TranslationConfig, TranslationMode};

/// Cancellation-check interval while idle-waiting on provider events.
pub const CANCEL_POLL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// RecognitionSession
// ---------------------------------------------------------------------------

/// Reusable entry point to the provider: validated once, started per run.
///
/// The language pair and audio source may change between runs; the provider
/// configuration behind `engine` is created once and shared.  Cloning shares
/// the same engine.
#[derive(Clone)]
pub struct RecognitionSession {
    engine: Arc<dyn SpeechEngine>,
}

impl RecognitionSession {
    /// Validate the provider configuration and bind the engine.
    ///
    /// # Errors
    ///
    /// [`SessionError::MissingRegion`] when an Azure-style provider has no
    /// usable region.  Surfaced here so it fails before any capture starts.
    pub fn new(
        config: &TranslationConfig,
        engine: Arc<dyn SpeechEngine>,
    ) -> Result<Self, SessionError> {
        if config.provider == ProviderKind::AzureSpeech {
            let region_ok = config
                .region
                .as_deref()
                .map(|r| !r.trim().is_empty())
                .unwrap_or(false);
            if !region_ok {
                return Err(SessionError::MissingRegion);
            }
        }
        Ok(Self { engine })
    }

    /// Open one provider stream for `mode`, consuming `pcm` as audio input.
    ///
    /// # Errors
    ///
    /// Propagates the engine's start failure.
    pub async fn start(
        &self,
        mode: TranslationMode,
        pcm: mpsc::Receiver<PcmChunk>,
    ) -> Result<ActiveRecognition, SessionError> {
        let inner = self
            .engine
            .start(mode.recognition_language(), mode.target_language(), pcm)
            .await?;
        log::info!(
            "recognition started via {} ({} -> {})",
            self.engine.name(),
            mode.recognition_language(),
            mode.target_language()
        );
        Ok(ActiveRecognition { inner })
    }
}

// ---------------------------------------------------------------------------
// ActiveRecognition
// ---------------------------------------------------------------------------

/// One in-flight recognition stream.
pub struct ActiveRecognition {
    inner: Box<dyn EngineSession>,
}

impl ActiveRecognition {
    /// Wait for the next provider event, checking `cancel` at bounded
    /// intervals while idle.
    ///
    /// A set flag yields a synthetic `Canceled { reason: Requested }` even
    /// if the provider never reports its own cancellation.  `None` means the
    /// provider closed the stream without a terminal event.
    pub async fn next_event(&mut self, cancel: &AtomicBool) -> Option<RecognitionEvent> {
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Some(RecognitionEvent::Canceled {
                    reason: CancelReason::Requested,
                });
            }
            tokio::select! {
                event = self.inner.next_event() => return event,
                _ = tokio::time::sleep(CANCEL_POLL) => {}
            }
        }
    }

    /// End the stream gracefully and wait for the provider side to release.
    ///
    /// Consumes the stream, so stop happens exactly once per start.
    ///
    /// # Errors
    ///
    /// Propagates the engine's shutdown failure.
    pub async fn stop(self) -> Result<(), SessionError> {
        self.inner.stop().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
