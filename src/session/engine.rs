//! Provider engine seam: continuous recognition-and-translation behind an
//! object-safe async trait.
//!
//! The concrete streaming transport (a speech-SDK binding with its own
//! network stack) is supplied by the embedding application.  This crate
//! ships [`ScriptedEngine`], which replays a programmed event sequence; it
//! doubles as the fallback engine when no real provider is linked in.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::events::RecognitionEvent;
use crate::audio::PcmChunk;

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors from configuring or running a provider stream.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Azure-style providers cannot configure a stream without a region.
    #[error("Região Azure não configurada.")]
    MissingRegion,

    /// The provider backend rejected or aborted the stream.
    #[error("provider error: {0}")]
    Provider(String),
}

// ---------------------------------------------------------------------------
// SpeechEngine / EngineSession
// ---------------------------------------------------------------------------

/// Continuous recognition-and-translation provider.
///
/// One engine instance may serve many runs; each `start` opens an
/// independent stream for one language pair.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Open a continuous stream, consuming `pcm` as the audio input.
    ///
    /// `recognition_language` and `target_language` are BCP-47 style tags
    /// (`en-US`, `pt-BR`, `en`).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Provider`] when the backend rejects the
    /// stream configuration.
    async fn start(
        &self,
        recognition_language: &str,
        target_language: &str,
        pcm: mpsc::Receiver<PcmChunk>,
    ) -> Result<Box<dyn EngineSession>, SessionError>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

/// One in-flight provider stream.
#[async_trait]
pub trait EngineSession: Send {
    /// Next event in arrival order, or `None` if the provider closed the
    /// stream without a terminal `Canceled` event.
    ///
    /// Must be cancel-safe: dropping the returned future before it completes
    /// must not lose an event (`tokio::sync::mpsc::Receiver::recv` has this
    /// property).
    async fn next_event(&mut self) -> Option<RecognitionEvent>;

    /// End the stream gracefully and wait for the provider side to release.
    ///
    /// Consumes the session, so a stream is stopped at most once.
    async fn stop(self: Box<Self>) -> Result<(), SessionError>;
}

// Compile-time checks that the seams stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechEngine>) {}
};
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn EngineSession>) {}
};

// ---------------------------------------------------------------------------
// ScriptedEngine
// ---------------------------------------------------------------------------

/// Engine that replays a programmed event sequence.
///
/// After the script runs out the stream stays open, discarding audio, until
/// stopped.  Built with [`ScriptedEngine::closing`] instead, an exhausted
/// script closes the stream (`next_event` returns `None`).
///
/// Each `start` consumes one queued script, so one engine can serve
/// repeated runs when more are queued with [`ScriptedEngine::queue_run`].
pub struct ScriptedEngine {
    scripts: Mutex<VecDeque<VecDeque<RecognitionEvent>>>,
    close_after_script: bool,
    fail_start: Option<String>,
    started_with: Mutex<Option<(String, String)>>,
}

impl ScriptedEngine {
    /// Engine that replays `events`, then idles until stopped.
    pub fn new(events: Vec<RecognitionEvent>) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::from([events.into()])),
            close_after_script: false,
            fail_start: None,
            started_with: Mutex::new(None),
        }
    }

    /// Queue a script for a later `start`.
    pub fn queue_run(&self, events: Vec<RecognitionEvent>) {
        self.scripts.lock().unwrap().push_back(events.into());
    }

    /// Engine with no events: the stream stays open until stopped.
    pub fn idle() -> Self {
        Self::new(Vec::new())
    }

    /// Engine that replays `events`, then closes the stream without a
    /// terminal event.
    pub fn closing(events: Vec<RecognitionEvent>) -> Self {
        let mut engine = Self::new(events);
        engine.close_after_script = true;
        engine
    }

    /// Engine whose `start` fails with a provider error.
    pub fn failing(message: &str) -> Self {
        let mut engine = Self::new(Vec::new());
        engine.fail_start = Some(message.to_string());
        engine
    }

    /// Language pair the most recent `start` received, for assertions.
    pub fn started_with(&self) -> Option<(String, String)> {
        self.started_with.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechEngine for ScriptedEngine {
    async fn start(
        &self,
        recognition_language: &str,
        target_language: &str,
        pcm: mpsc::Receiver<PcmChunk>,
    ) -> Result<Box<dyn EngineSession>, SessionError> {
        if let Some(message) = &self.fail_start {
            return Err(SessionError::Provider(message.clone()));
        }
        *self.started_with.lock().unwrap() = Some((
            recognition_language.to_string(),
            target_language.to_string(),
        ));
        let events = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Box::new(ScriptedSession {
            events,
            close_after_script: self.close_after_script,
            pcm,
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedSession {
    events: VecDeque<RecognitionEvent>,
    close_after_script: bool,
    pcm: mpsc::Receiver<PcmChunk>,
}

#[async_trait]
impl EngineSession for ScriptedSession {
    async fn next_event(&mut self) -> Option<RecognitionEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        if self.close_after_script {
            return None;
        }
        // Script exhausted: keep the stream open and drain audio until the
        // capture side closes, then wait for stop.
        while self.pcm.recv().await.is_some() {}
        std::future::pending().await
    }

    async fn stop(self: Box<Self>) -> Result<(), SessionError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
