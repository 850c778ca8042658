//! Translation orchestrator: feeds captured audio through recognition and
//! into the caption history, one run at a time.
//!
//! # Run flow
//!
//! ```text
//! run(mode, descriptor, …)
//!   └─▶ spawn_capture(descriptor)            [device thread, mono PCM out]
//!         └─▶ RecognitionSession::start      [provider stream]   (Listening)
//!               └─▶ event pump:
//!                     Partial  → PartialStabilizer → status sink
//!                     Final    → resolve_entry → CaptionHistory → translation sink
//!                     NoMatch  → reset partial display
//!                     Canceled → break
//!               cancel flag / capture failure fold into the same loop
//!         └─▶ graceful stop                  (Stopping → Stopped | Error)
//! ```
//!
//! Every fault is converted to a status line at this boundary; `run` never
//! panics the caller and never returns an error.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::mpsc;

use super::provider::{run_openai_stub, ProviderStrategy};
use super::state::{advance, new_shared_session_state, SessionState, SharedSessionState};
use crate::audio::{spawn_capture, AudioDeviceDescriptor, CaptureHandle, PcmChunk};
use crate::captions::{resolve_entry, CaptionHistory};
use crate::config::{TranslationConfig, TranslationMode};
use crate::session::{
    CancelReason, PartialStabilizer, RecognitionEvent, RecognitionSession, SessionError,
    SpeechEngine, CANCEL_POLL,
};

/// Status line once a run is up, or after an utterance completes.
pub const AWAITING_SPEECH: &str = "Aguardando fala...";

/// Terminal status of a cleanly finished run.
pub const TRANSLATION_FINISHED: &str = "Tradução finalizada.";

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Consumer of operator-facing status lines.
///
/// May be called from the run's async context at any point of the lifecycle;
/// implementations must tolerate calls after their display is gone (no-op,
/// not an error).
pub type StatusSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Consumer of resolved translations, called once per translated final
/// result with `(recognition language, recognized text, target language,
/// translated text)`.
pub type TranslationSink = Arc<dyn Fn(&str, &str, &str, &str) + Send + Sync>;

// ---------------------------------------------------------------------------
// TranslationOrchestrator
// ---------------------------------------------------------------------------

/// Owns the provider strategy and the caption history across runs.
///
/// One orchestrator serves repeated runs (the operator may switch mode or
/// source between them); each run gets a fresh capture, provider stream, and
/// partial stabilizer, while history accumulates until
/// [`clear_history`](Self::clear_history).
///
/// ```rust,no_run
/// use std::sync::atomic::AtomicBool;
/// use std::sync::Arc;
/// use live_captions::audio::AudioDeviceDescriptor;
/// use live_captions::config::{TranslationConfig, TranslationMode};
/// use live_captions::orchestrator::TranslationOrchestrator;
/// use live_captions::session::ScriptedEngine;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = TranslationConfig::from_env()?;
/// let engine = Arc::new(ScriptedEngine::idle());
/// let mut orchestrator = TranslationOrchestrator::new(&config, engine)?;
///
/// let cancel = Arc::new(AtomicBool::new(false));
/// orchestrator
///     .run(
///         TranslationMode::EnglishToPortuguese,
///         &AudioDeviceDescriptor::default_input(),
///         Arc::new(|status| println!("{status}")),
///         Arc::new(|_, recognized, _, translated| println!("{recognized} = {translated}")),
///         cancel,
///     )
///     .await;
/// # Ok(())
/// # }
/// ```
pub struct TranslationOrchestrator {
    strategy: ProviderStrategy,
    history: CaptionHistory,
    state: SharedSessionState,
}

impl TranslationOrchestrator {
    /// Select the provider strategy and prepare an empty history.
    ///
    /// # Errors
    ///
    /// Propagates provider configuration validation (a missing Azure region,
    /// for one); surfaced here so a bad setup fails before any capture.
    pub fn new(
        config: &TranslationConfig,
        engine: Arc<dyn SpeechEngine>,
    ) -> Result<Self, SessionError> {
        let strategy = ProviderStrategy::from_config(config, engine)?;
        Ok(Self {
            strategy,
            history: CaptionHistory::new(config.merge),
            state: new_shared_session_state(),
        })
    }

    /// Shared handle to the run state, for activity indicators.
    pub fn state(&self) -> SharedSessionState {
        Arc::clone(&self.state)
    }

    /// Caption history accumulated so far.
    pub fn history(&self) -> &CaptionHistory {
        &self.history
    }

    /// Linear transcript of the history for downstream analysis.
    pub fn analysis_lines(&self) -> Vec<String> {
        self.history.analysis_lines()
    }

    /// Drop all accumulated caption blocks.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // -----------------------------------------------------------------------
    // Run entry points
    // -----------------------------------------------------------------------

    /// Run one translation session until cancelled or terminally failed.
    ///
    /// Opens the capture source described by `descriptor`, then delegates to
    /// [`run_with_audio`](Self::run_with_audio).  A source that cannot be
    /// opened is reported through `status` and ends the run; it never
    /// crashes the caller.
    pub async fn run(
        &mut self,
        mode: TranslationMode,
        descriptor: &AudioDeviceDescriptor,
        status: StatusSink,
        translations: TranslationSink,
        cancel: Arc<AtomicBool>,
    ) {
        // The stub never opens a capture source.
        if let ProviderStrategy::OpenAiStub { endpoint } = &self.strategy {
            log::info!("translation run starting: provider={}", self.strategy.name());
            run_openai_stub(endpoint.clone(), status, cancel).await;
            return;
        }

        let thread_descriptor = descriptor.clone();
        let opened =
            tokio::task::spawn_blocking(move || spawn_capture(&thread_descriptor)).await;
        let (capture, pcm) = match opened {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                log::error!("could not open capture source '{}': {e}", descriptor.label);
                status(&format!("Erro na tradução: {e}"));
                return;
            }
            Err(e) => {
                log::error!("capture setup task failed: {e}");
                status(&format!("Erro na tradução: {e}"));
                return;
            }
        };

        let source_label = descriptor.source_label().to_string();
        self.run_with_audio(mode, Some(capture), pcm, &source_label, status, translations, cancel)
            .await;
    }

    /// Run one translation session over an already-open PCM stream.
    ///
    /// For embedders that manage their own capture; `capture`, when present,
    /// is watched for mid-stream failure and released on shutdown.
    /// `source_label` appears in the initial status line.
    pub async fn run_with_audio(
        &mut self,
        mode: TranslationMode,
        capture: Option<CaptureHandle>,
        pcm: mpsc::Receiver<PcmChunk>,
        source_label: &str,
        status: StatusSink,
        translations: TranslationSink,
        cancel: Arc<AtomicBool>,
    ) {
        let session = match &self.strategy {
            ProviderStrategy::OpenAiStub { endpoint } => {
                run_openai_stub(endpoint.clone(), status, cancel).await;
                return;
            }
            ProviderStrategy::Streaming(session) => session.clone(),
        };

        log::info!(
            "translation run starting: provider={}, source='{source_label}'",
            self.strategy.name()
        );

        let outcome = self
            .stream_run(&session, mode, capture, pcm, source_label, &status, &translations, &cancel)
            .await;

        if let Err(e) = outcome {
            log::error!("translation run failed: {e:#}");
            // Failures before the stream was up never left Idle; there is no
            // state to tear down for them.
            if self.state.lock().unwrap().is_active() {
                advance(&self.state, SessionState::Error);
            }
            status(&format!("Erro na tradução: {e}"));
        }
    }

    // -----------------------------------------------------------------------
    // Streaming pipeline
    // -----------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    async fn stream_run(
        &mut self,
        session: &RecognitionSession,
        mode: TranslationMode,
        mut capture: Option<CaptureHandle>,
        pcm: mpsc::Receiver<PcmChunk>,
        source_label: &str,
        status: &StatusSink,
        translations: &TranslationSink,
        cancel: &Arc<AtomicBool>,
    ) -> Result<()> {
        // ── 1. Provider stream ───────────────────────────────────────────
        // The source-labelled status paints as soon as the capture is open,
        // before the provider stream is up.
        let awaiting_here = format!("{AWAITING_SPEECH} (fonte: {source_label})");
        status(&awaiting_here);

        let mut active = match session.start(mode, pcm).await {
            Ok(active) => active,
            Err(e) => {
                release_capture(capture.take()).await;
                return Err(e.into());
            }
        };

        advance(&self.state, SessionState::Listening);

        // ── 2. Event pump ────────────────────────────────────────────────
        let mut stabilizer = PartialStabilizer::new();
        let listening_tag = language_tag(mode.recognition_language());
        let mut faulted = false;

        loop {
            let event = loop {
                // Device loss surfaces as a capture-failed terminal event.
                if let Some(details) = capture.as_ref().and_then(|c| c.failure()) {
                    break Some(RecognitionEvent::Canceled {
                        reason: CancelReason::CaptureFailed { details },
                    });
                }
                tokio::select! {
                    event = active.next_event(cancel) => break event,
                    _ = tokio::time::sleep(CANCEL_POLL) => {}
                }
            };

            match event {
                Some(RecognitionEvent::Listening) => {
                    status(&awaiting_here);
                }
                Some(RecognitionEvent::Partial { text }) => {
                    if stabilizer.accept(&text, Instant::now()) {
                        status(&format!("Ouvindo ({listening_tag}): {text}"));
                    }
                }
                Some(RecognitionEvent::Final {
                    recognized_text,
                    recognition_language,
                    translated_text,
                    target_language,
                }) => {
                    stabilizer.reset();
                    match translated_text.as_deref().filter(|t| !t.trim().is_empty()) {
                        Some(translated) => {
                            let entry = resolve_entry(
                                &recognition_language,
                                &recognized_text,
                                &target_language,
                                Some(translated),
                            );
                            let merged = self.history.add_or_merge(entry, Instant::now());
                            log::debug!(
                                "final {}: {} chars recognized",
                                if merged { "merged" } else { "appended" },
                                recognized_text.chars().count()
                            );
                            translations(
                                &recognition_language,
                                &recognized_text,
                                &target_language,
                                translated,
                            );
                            // The completed sentence holds the live line
                            // until the next partial replaces it.
                            status(translated);
                        }
                        // An untranslated final never reaches the history.
                        None => {
                            log::debug!("final without translation dropped");
                            status(AWAITING_SPEECH);
                        }
                    }
                }
                Some(RecognitionEvent::NoMatch) => {
                    stabilizer.reset();
                    status(AWAITING_SPEECH);
                }
                Some(RecognitionEvent::Canceled { reason }) => {
                    match reason {
                        CancelReason::Requested => {
                            log::info!("translation run cancelled by request");
                        }
                        CancelReason::CaptureFailed { details } => {
                            faulted = true;
                            log::error!("capture failed mid-stream: {details}");
                            status(&format!("Erro na tradução: {details}"));
                        }
                        CancelReason::ProviderError { details } => {
                            faulted = true;
                            match details {
                                Some(details) => {
                                    log::error!("recognition error: {details}");
                                    status(&format!("Erro no reconhecimento: {details}"));
                                }
                                None => {
                                    log::error!("recognition error without details");
                                    status("Erro no reconhecimento.");
                                }
                            }
                        }
                    }
                    break;
                }
                None => {
                    faulted = true;
                    log::error!("provider stream closed without a terminal event");
                    status("Erro no reconhecimento.");
                    break;
                }
            }
        }

        // ── 3. Graceful shutdown ─────────────────────────────────────────
        advance(&self.state, SessionState::Stopping);
        if let Err(e) = active.stop().await {
            log::warn!("session stop reported: {e}");
        }
        release_capture(capture.take()).await;

        if faulted {
            advance(&self.state, SessionState::Error);
        } else {
            advance(&self.state, SessionState::Stopped);
            status(TRANSLATION_FINISHED);
        }
        Ok(())
    }
}

/// Join the capture thread without blocking the async workers.
async fn release_capture(capture: Option<CaptureHandle>) {
    let Some(mut capture) = capture else {
        return;
    };
    if let Err(e) = tokio::task::spawn_blocking(move || capture.stop()).await {
        log::warn!("capture release task failed: {e}");
    }
}

/// Uppercase two-letter tag for the live-caption prefix (`en-US` → `EN`).
fn language_tag(language: &str) -> String {
    language.get(..2).unwrap_or(language).to_uppercase()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MergeTuning, ProviderKind};
    use crate::session::ScriptedEngine;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn azure_config() -> TranslationConfig {
        TranslationConfig {
            provider: ProviderKind::AzureSpeech,
            api_key: "key".into(),
            region: Some("brazilsouth".into()),
            endpoint: None,
            merge: MergeTuning::default(),
        }
    }

    fn openai_config() -> TranslationConfig {
        TranslationConfig {
            provider: ProviderKind::OpenAi,
            api_key: "key".into(),
            region: None,
            endpoint: Some("https://example.test/v1".into()),
            merge: MergeTuning::default(),
        }
    }

    fn status_sink() -> (StatusSink, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::clone(&lines);
        let sink: StatusSink = Arc::new(move |text: &str| {
            writer.lock().unwrap().push(text.to_string());
        });
        (sink, lines)
    }

    type TranslationRecord = (String, String, String, String);

    fn translation_sink() -> (TranslationSink, Arc<Mutex<Vec<TranslationRecord>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::clone(&records);
        let sink: TranslationSink =
            Arc::new(move |rec_lang: &str, rec: &str, tgt_lang: &str, translated: &str| {
                writer.lock().unwrap().push((
                    rec_lang.to_string(),
                    rec.to_string(),
                    tgt_lang.to_string(),
                    translated.to_string(),
                ));
            });
        (sink, records)
    }

    fn translated_final(recognized: &str, translated: &str) -> RecognitionEvent {
        RecognitionEvent::Final {
            recognized_text: recognized.to_string(),
            recognition_language: "en-US".to_string(),
            translated_text: Some(translated.to_string()),
            target_language: "pt-BR".to_string(),
        }
    }

    fn cancelled() -> RecognitionEvent {
        RecognitionEvent::Canceled {
            reason: CancelReason::Requested,
        }
    }

    async fn run_script(
        orchestrator: &mut TranslationOrchestrator,
        status: StatusSink,
        translations: TranslationSink,
    ) {
        let (_pcm_tx, pcm_rx) = mpsc::channel(8);
        orchestrator
            .run_with_audio(
                TranslationMode::EnglishToPortuguese,
                None,
                pcm_rx,
                "entrada padrão",
                status,
                translations,
                Arc::new(AtomicBool::new(false)),
            )
            .await;
    }

    fn orchestrator_with(engine: ScriptedEngine) -> TranslationOrchestrator {
        TranslationOrchestrator::new(&azure_config(), Arc::new(engine)).unwrap()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// A translated final lands in the history, reaches the translation
    /// sink, and its translation takes over the live status line; the run
    /// closes with the finished status.
    #[tokio::test]
    async fn translated_finals_reach_history_and_sink() {
        let engine = ScriptedEngine::new(vec![
            RecognitionEvent::Listening,
            translated_final("good morning", "bom dia"),
            cancelled(),
        ]);
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, records) = translation_sink();

        run_script(&mut orchestrator, status, translations).await;

        assert_eq!(orchestrator.history().len(), 1);
        assert_eq!(orchestrator.history().entries()[0].english, "good morning");
        assert_eq!(orchestrator.history().entries()[0].portuguese, "bom dia");

        let records = records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0],
            (
                "en-US".to_string(),
                "good morning".to_string(),
                "pt-BR".to_string(),
                "bom dia".to_string()
            )
        );

        let lines = lines.lock().unwrap();
        assert_eq!(lines[0], "Aguardando fala... (fonte: entrada padrão)");
        assert!(lines.iter().any(|l| l == "bom dia"));
        assert!(!lines.iter().any(|l| l == AWAITING_SPEECH));
        assert_eq!(lines.last().map(String::as_str), Some(TRANSLATION_FINISHED));
        assert_eq!(*orchestrator.state().lock().unwrap(), SessionState::Stopped);
    }

    /// Partials pass through the stabilizer: the first paints, an immediate
    /// follow-up inside the rate-limit window is suppressed.
    #[tokio::test]
    async fn partials_paint_through_the_stabilizer() {
        let engine = ScriptedEngine::new(vec![
            RecognitionEvent::Partial {
                text: "Hello".into(),
            },
            RecognitionEvent::Partial {
                text: "Hello there".into(),
            },
            cancelled(),
        ]);
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, _) = translation_sink();

        run_script(&mut orchestrator, status, translations).await;

        let lines = lines.lock().unwrap();
        let painted: Vec<&String> =
            lines.iter().filter(|l| l.starts_with("Ouvindo")).collect();
        assert_eq!(painted.len(), 1);
        assert_eq!(painted[0], "Ouvindo (EN): Hello");
    }

    /// A final without a translation is dropped: status only, nothing in
    /// history, nothing on the translation sink.
    #[tokio::test]
    async fn final_without_translation_is_dropped() {
        let engine = ScriptedEngine::new(vec![
            RecognitionEvent::Final {
                recognized_text: "good morning".into(),
                recognition_language: "en-US".into(),
                translated_text: None,
                target_language: "pt-BR".into(),
            },
            cancelled(),
        ]);
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, records) = translation_sink();

        run_script(&mut orchestrator, status, translations).await;

        assert!(orchestrator.history().is_empty());
        assert!(records.lock().unwrap().is_empty());
        assert!(lines
            .lock()
            .unwrap()
            .iter()
            .any(|l| l == AWAITING_SPEECH));
    }

    /// Back-to-back translated finals merge into one caption block while
    /// the sink still sees each translation individually.
    #[tokio::test]
    async fn consecutive_finals_merge_into_one_block() {
        let engine = ScriptedEngine::new(vec![
            RecognitionEvent::Final {
                recognized_text: "I think".into(),
                recognition_language: "en-US".into(),
                translated_text: Some("Eu acho".into()),
                target_language: "pt-BR".into(),
            },
            RecognitionEvent::Final {
                recognized_text: "that it works.".into(),
                recognition_language: "en-US".into(),
                translated_text: Some("que funciona.".into()),
                target_language: "pt-BR".into(),
            },
            cancelled(),
        ]);
        let mut orchestrator = orchestrator_with(engine);
        let (status, _) = status_sink();
        let (translations, records) = translation_sink();

        run_script(&mut orchestrator, status, translations).await;

        assert_eq!(orchestrator.history().len(), 1);
        assert_eq!(
            orchestrator.history().entries()[0].portuguese,
            "Eu acho que funciona."
        );
        assert_eq!(records.lock().unwrap().len(), 2);
    }

    /// NoMatch resets the live caption back to the idle line.
    #[tokio::test]
    async fn no_match_resets_the_status_line() {
        let engine = ScriptedEngine::new(vec![RecognitionEvent::NoMatch, cancelled()]);
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, _) = translation_sink();

        run_script(&mut orchestrator, status, translations).await;

        assert!(lines.lock().unwrap().iter().any(|l| l == AWAITING_SPEECH));
    }

    /// A provider-side error cancel reports the recognition error, ends in
    /// the Error state, and never claims the run finished cleanly.
    #[tokio::test]
    async fn provider_error_reports_and_ends_in_error_state() {
        let engine = ScriptedEngine::new(vec![RecognitionEvent::Canceled {
            reason: CancelReason::ProviderError {
                details: Some("quota exceeded".into()),
            },
        }]);
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, _) = translation_sink();

        run_script(&mut orchestrator, status, translations).await;

        let lines = lines.lock().unwrap();
        assert!(lines
            .iter()
            .any(|l| l == "Erro no reconhecimento: quota exceeded"));
        assert!(!lines.iter().any(|l| l == TRANSLATION_FINISHED));
        assert_eq!(*orchestrator.state().lock().unwrap(), SessionState::Error);
    }

    /// A stream that closes without a terminal event is a provider fault.
    #[tokio::test]
    async fn closed_stream_is_a_recognition_error() {
        let engine = ScriptedEngine::closing(Vec::new());
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, _) = translation_sink();

        run_script(&mut orchestrator, status, translations).await;

        assert!(lines
            .lock()
            .unwrap()
            .iter()
            .any(|l| l == "Erro no reconhecimento."));
        assert_eq!(*orchestrator.state().lock().unwrap(), SessionState::Error);
    }

    /// A failing engine start is caught and converted to a status line; the
    /// source-labelled status has already painted by then, and the state
    /// machine never leaves Idle.
    #[tokio::test]
    async fn engine_start_failure_becomes_a_status_line() {
        let engine = ScriptedEngine::failing("bad credentials");
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, _) = translation_sink();

        run_script(&mut orchestrator, status, translations).await;

        let lines = lines.lock().unwrap();
        assert_eq!(lines[0], "Aguardando fala... (fonte: entrada padrão)");
        assert!(lines.iter().any(|l| l.starts_with("Erro na tradução:")));
        assert_eq!(*orchestrator.state().lock().unwrap(), SessionState::Idle);
    }

    /// A cancellation requested before the run even starts still walks the
    /// full graceful shutdown.
    #[tokio::test]
    async fn preset_cancellation_stops_cleanly() {
        let engine = ScriptedEngine::idle();
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, _) = translation_sink();

        let (_pcm_tx, pcm_rx) = mpsc::channel(8);
        orchestrator
            .run_with_audio(
                TranslationMode::EnglishToPortuguese,
                None,
                pcm_rx,
                "entrada padrão",
                status,
                translations,
                Arc::new(AtomicBool::new(true)),
            )
            .await;

        assert_eq!(
            lines.lock().unwrap().last().map(String::as_str),
            Some(TRANSLATION_FINISHED)
        );
        assert_eq!(*orchestrator.state().lock().unwrap(), SessionState::Stopped);
    }

    /// History persists across runs on the same orchestrator until cleared.
    #[tokio::test]
    async fn history_persists_across_runs() {
        let engine = ScriptedEngine::new(vec![
            translated_final("First sentence.", "Primeira frase."),
            cancelled(),
        ]);
        engine.queue_run(vec![
            translated_final("Second sentence.", "Segunda frase."),
            cancelled(),
        ]);
        let mut orchestrator = orchestrator_with(engine);

        for _ in 0..2 {
            let (status, _) = status_sink();
            let (translations, _) = translation_sink();
            run_script(&mut orchestrator, status, translations).await;
        }

        assert_eq!(orchestrator.history().len(), 2);
        assert_eq!(
            orchestrator.analysis_lines(),
            vec!["Primeira frase.", "Segunda frase."]
        );

        orchestrator.clear_history();
        assert!(orchestrator.history().is_empty());
    }

    /// A source that cannot be opened is reported through the status sink
    /// and leaves the state machine at Idle.
    #[tokio::test]
    async fn unopenable_source_becomes_a_status_line() {
        let engine = ScriptedEngine::idle();
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, _) = translation_sink();

        let descriptor = AudioDeviceDescriptor::capture("live-captions-missing-device-7f3a");
        orchestrator
            .run(
                TranslationMode::EnglishToPortuguese,
                &descriptor,
                status,
                translations,
                Arc::new(AtomicBool::new(false)),
            )
            .await;

        let lines = lines.lock().unwrap();
        assert!(lines.iter().any(|l| l.starts_with("Erro na tradução:")));
        assert_eq!(*orchestrator.state().lock().unwrap(), SessionState::Idle);
    }

    /// The stub strategy reports its two statuses and never touches the
    /// caption history.
    #[tokio::test]
    async fn stub_strategy_never_touches_history() {
        let engine = Arc::new(ScriptedEngine::idle());
        let mut orchestrator =
            TranslationOrchestrator::new(&openai_config(), engine).unwrap();
        let (status, lines) = status_sink();
        let (translations, records) = translation_sink();

        let (_pcm_tx, pcm_rx) = mpsc::channel(8);
        orchestrator
            .run_with_audio(
                TranslationMode::EnglishToPortuguese,
                None,
                pcm_rx,
                "entrada padrão",
                status,
                translations,
                Arc::new(AtomicBool::new(true)),
            )
            .await;

        assert_eq!(lines.lock().unwrap().len(), 2);
        assert!(orchestrator.history().is_empty());
        assert!(records.lock().unwrap().is_empty());
    }

    // ---- capture handle wiring ----

    /// A run holding a live capture handle joins its thread on shutdown.
    #[tokio::test]
    async fn clean_shutdown_releases_the_capture_thread() {
        let engine = ScriptedEngine::new(vec![cancelled()]);
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, _) = translation_sink();

        let capture = CaptureHandle::without_device(48_000);
        let (_pcm_tx, pcm_rx) = mpsc::channel(8);
        let run = orchestrator.run_with_audio(
            TranslationMode::EnglishToPortuguese,
            Some(capture),
            pcm_rx,
            "entrada padrão",
            status,
            translations,
            Arc::new(AtomicBool::new(false)),
        );
        tokio::time::timeout(std::time::Duration::from_secs(5), run)
            .await
            .expect("shutdown should join the capture thread");

        assert_eq!(
            lines.lock().unwrap().last().map(String::as_str),
            Some(TRANSLATION_FINISHED)
        );
        assert_eq!(*orchestrator.state().lock().unwrap(), SessionState::Stopped);
    }

    /// The capture thread is joined even when the engine start fails.
    #[tokio::test]
    async fn engine_start_failure_releases_the_capture_thread() {
        let engine = ScriptedEngine::failing("bad credentials");
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, _) = translation_sink();

        let capture = CaptureHandle::without_device(48_000);
        let (_pcm_tx, pcm_rx) = mpsc::channel(8);
        let run = orchestrator.run_with_audio(
            TranslationMode::EnglishToPortuguese,
            Some(capture),
            pcm_rx,
            "entrada padrão",
            status,
            translations,
            Arc::new(AtomicBool::new(false)),
        );
        tokio::time::timeout(std::time::Duration::from_secs(5), run)
            .await
            .expect("start failure should still join the capture thread");

        assert!(lines
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.starts_with("Erro na tradução:")));
        assert_eq!(*orchestrator.state().lock().unwrap(), SessionState::Idle);
    }

    /// A stream error on the capture thread surfaces as a capture failure
    /// and ends the run in the Error state.
    #[tokio::test]
    async fn capture_failure_ends_the_run() {
        let engine = ScriptedEngine::idle();
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, _) = translation_sink();

        let capture = CaptureHandle::without_device(48_000);
        capture.inject_failure("device unplugged");
        let (_pcm_tx, pcm_rx) = mpsc::channel(8);
        let run = orchestrator.run_with_audio(
            TranslationMode::EnglishToPortuguese,
            Some(capture),
            pcm_rx,
            "entrada padrão",
            status,
            translations,
            Arc::new(AtomicBool::new(false)),
        );
        tokio::time::timeout(std::time::Duration::from_secs(5), run)
            .await
            .expect("capture failure should end the run");

        let lines = lines.lock().unwrap();
        assert!(lines
            .iter()
            .any(|l| l == "Erro na tradução: device unplugged"));
        assert_eq!(*orchestrator.state().lock().unwrap(), SessionState::Error);
    }

    // ---- language_tag ----

    #[test]
    fn language_tag_uppercases_the_prefix() {
        assert_eq!(language_tag("en-US"), "EN");
        assert_eq!(language_tag("pt-BR"), "PT");
        assert_eq!(language_tag("en"), "EN");
    }

    /// Cancellation flag set mid-run is observed within the poll interval.
    #[tokio::test]
    async fn midstream_cancellation_is_observed() {
        let engine = ScriptedEngine::idle();
        let mut orchestrator = orchestrator_with(engine);
        let (status, lines) = status_sink();
        let (translations, _) = translation_sink();

        let cancel = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&cancel);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            setter.store(true, Ordering::Relaxed);
        });

        let (_pcm_tx, pcm_rx) = mpsc::channel(8);
        let run = orchestrator.run_with_audio(
            TranslationMode::EnglishToPortuguese,
            None,
            pcm_rx,
            "entrada padrão",
            status,
            translations,
            cancel,
        );
        tokio::time::timeout(std::time::Duration::from_secs(5), run)
            .await
            .expect("run should end once cancelled");

        assert_eq!(
            lines.lock().unwrap().last().map(String::as_str),
            Some(TRANSLATION_FINISHED)
        );
    }
}
