//! Provider strategy selection.
//!
//! Exactly one strategy is active per run: the streaming recognition path,
//! or the OpenAI stub that only reports its pending status until cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::runner::StatusSink;
use crate::config::{ProviderKind, TranslationConfig};
use crate::session::{RecognitionSession, SessionError, SpeechEngine};

/// How often the stub checks for cancellation while idling.
const STUB_POLL: Duration = Duration::from_millis(250);

/// Status the stub reports on start.
pub const STUB_PENDING_STATUS: &str =
    "Provider OpenAI selecionado. Implementação de streaming ainda não concluída.";

/// Operator-facing text for a provider kind with no strategy.  Every
/// current [`ProviderKind`] maps to a strategy, so nothing returns it yet.
pub const UNSUPPORTED_PROVIDER_MESSAGE: &str = "Provedor de tradução não suportado.";

// ---------------------------------------------------------------------------
// ProviderStrategy
// ---------------------------------------------------------------------------

/// The two provider strategies a run can use.
pub enum ProviderStrategy {
    /// Full streaming recognition-and-translation through the engine seam.
    Streaming(RecognitionSession),
    /// Stub: reports a pending status, idles until cancelled, never emits
    /// translations and never opens a capture.
    OpenAiStub { endpoint: String },
}

impl ProviderStrategy {
    /// Select the strategy for the configured provider.
    ///
    /// # Errors
    ///
    /// Propagates the session's configuration validation (a missing Azure
    /// region, for one).
    pub fn from_config(
        config: &TranslationConfig,
        engine: Arc<dyn SpeechEngine>,
    ) -> Result<Self, SessionError> {
        match config.provider {
            ProviderKind::AzureSpeech => {
                Ok(Self::Streaming(RecognitionSession::new(config, engine)?))
            }
            ProviderKind::OpenAi => Ok(Self::OpenAiStub {
                endpoint: config.endpoint_or_default().to_string(),
            }),
        }
    }

    /// Short strategy name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderStrategy::Streaming(_) => "azure-speech",
            ProviderStrategy::OpenAiStub { .. } => "openai-stub",
        }
    }
}

// ---------------------------------------------------------------------------
// run_openai_stub
// ---------------------------------------------------------------------------

/// Run the stub provider to completion.
///
/// Reports the pending status, idles at a 250 ms cadence until `cancel` is
/// set, then reports the configured endpoint in its terminal status.
pub async fn run_openai_stub(endpoint: String, status: StatusSink, cancel: Arc<AtomicBool>) {
    status(STUB_PENDING_STATUS);
    log::info!("openai stub provider selected; idling until cancelled");

    while !cancel.load(Ordering::Relaxed) {
        tokio::time::sleep(STUB_POLL).await;
    }

    status(&format!(
        "Tradução finalizada. Endpoint configurado: {endpoint}"
    ));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
