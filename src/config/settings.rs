//! Translation run configuration: provider selection, credentials, thresholds.
//!
//! All values come from the process environment. Loading a `.env` file into
//! that environment is the embedding application's job; this module only reads
//! variables that are already set. [`TranslationConfig::from_env`] resolves
//! the provider and its credentials, [`MergeTuning::from_env`] resolves the
//! caption merge thresholds with silent fallback to defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Endpoint used for the OpenAI provider when `OPENAI_ENDPOINT` is unset.
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";

// ---------------------------------------------------------------------------
// TranslationMode
// ---------------------------------------------------------------------------

/// Direction of a translation run.
///
/// | Variant              | Recognizes | Translates to |
/// |----------------------|------------|---------------|
/// | EnglishToPortuguese  | `en-US`    | `pt-BR`       |
/// | PortugueseToEnglish  | `pt-BR`    | `en`          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationMode {
    /// Recognize English speech and translate it to Brazilian Portuguese.
    EnglishToPortuguese,
    /// Recognize Brazilian Portuguese speech and translate it to English.
    PortugueseToEnglish,
}

impl TranslationMode {
    /// BCP-47 tag the provider should recognize speech in.
    pub fn recognition_language(&self) -> &'static str {
        match self {
            TranslationMode::EnglishToPortuguese => "en-US",
            TranslationMode::PortugueseToEnglish => "pt-BR",
        }
    }

    /// Language tag the provider should translate into.
    pub fn target_language(&self) -> &'static str {
        match self {
            TranslationMode::EnglishToPortuguese => "pt-BR",
            TranslationMode::PortugueseToEnglish => "en",
        }
    }
}

impl Default for TranslationMode {
    fn default() -> Self {
        Self::EnglishToPortuguese
    }
}

// ---------------------------------------------------------------------------
// ProviderKind
// ---------------------------------------------------------------------------

/// Selects which speech-translation backend handles the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Azure Cognitive Services continuous speech translation.
    AzureSpeech,
    /// OpenAI realtime endpoint. Streaming support is not finished; the
    /// orchestrator runs it as a stub that idles until cancelled.
    OpenAi,
}

impl Default for ProviderKind {
    fn default() -> Self {
        Self::AzureSpeech
    }
}

/// Parse the `TRANSLATION_PROVIDER` value.
///
/// Accepts `openai` or `open-ai` (case-insensitive) for [`ProviderKind::OpenAi`];
/// anything else, including the empty string, selects Azure.
pub fn parse_provider(raw: &str) -> ProviderKind {
    if raw.eq_ignore_ascii_case("openai") || raw.eq_ignore_ascii_case("open-ai") {
        ProviderKind::OpenAi
    } else {
        ProviderKind::AzureSpeech
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Fatal configuration problems, surfaced before any capture starts.
///
/// Messages are operator-facing and localized to match the rest of the
/// product's status output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The Azure provider is selected but key or region is missing.
    #[error(
        "Para TRANSLATION_PROVIDER=azure, configure AZURE_SPEECH_KEY (ou SPEECH_KEY) \
         e AZURE_SPEECH_REGION (ou SPEECH_REGION)."
    )]
    MissingAzureCredentials,

    /// The OpenAI provider is selected but no API key is set.
    #[error("Para TRANSLATION_PROVIDER=openai, configure OPENAI_API_KEY.")]
    MissingOpenAiKey,
}

// ---------------------------------------------------------------------------
// MergeTuning
// ---------------------------------------------------------------------------

/// Millisecond thresholds for the caption merge heuristics.
///
/// Overridable via `MERGE_QUICK_PAUSE_MS` and `NEW_BLOCK_PAUSE_MS`; unset,
/// unparsable, or non-positive values fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeTuning {
    /// Gaps at or below this always merge into the previous block.
    pub quick_pause_ms: u64,
    /// Gaps at or above this always start a new block.
    pub new_block_pause_ms: u64,
}

impl Default for MergeTuning {
    fn default() -> Self {
        Self {
            quick_pause_ms: 1_000,
            new_block_pause_ms: 1_500,
        }
    }
}

impl MergeTuning {
    /// Read both thresholds from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read thresholds from an explicit variable lookup (useful for tests).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            quick_pause_ms: parse_pause_ms(
                "MERGE_QUICK_PAUSE_MS",
                lookup("MERGE_QUICK_PAUSE_MS"),
                defaults.quick_pause_ms,
            ),
            new_block_pause_ms: parse_pause_ms(
                "NEW_BLOCK_PAUSE_MS",
                lookup("NEW_BLOCK_PAUSE_MS"),
                defaults.new_block_pause_ms,
            ),
        }
    }
}

/// Parse one millisecond threshold. Only positive integers are accepted.
fn parse_pause_ms(name: &str, raw: Option<String>, default: u64) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => value as u64,
        _ => {
            log::warn!("{name}={raw:?} is not a positive integer; using {default}");
            default
        }
    }
}

// ---------------------------------------------------------------------------
// TranslationConfig
// ---------------------------------------------------------------------------

/// Resolved provider configuration for one process.
///
/// # Example
///
/// ```rust,no_run
/// use live_captions::config::TranslationConfig;
///
/// let config = TranslationConfig::from_env()?;
/// println!("provider: {:?}", config.provider);
/// # Ok::<(), live_captions::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Selected backend.
    pub provider: ProviderKind,
    /// Subscription or API key for the selected backend.
    pub api_key: String,
    /// Azure service region. `None` for non-Azure providers.
    pub region: Option<String>,
    /// OpenAI endpoint base URL. `None` for non-OpenAI providers.
    pub endpoint: Option<String>,
    /// Caption merge thresholds.
    pub merge: MergeTuning,
}

impl TranslationConfig {
    /// Resolve the configuration from the process environment.
    ///
    /// Variable resolution order:
    /// * provider: `TRANSLATION_PROVIDER` (`azure` default, `openai`/`open-ai`)
    /// * Azure key: `AZURE_SPEECH_KEY`, `SPEECH_KEY`, `AZURE_SUBSCRIPTION_KEY`
    /// * Azure region: `AZURE_SPEECH_REGION`, `SPEECH_REGION`
    /// * OpenAI key: `OPENAI_API_KEY`, `API_KEY`
    /// * OpenAI endpoint: `OPENAI_ENDPOINT` (default
    ///   [`DEFAULT_OPENAI_ENDPOINT`])
    ///
    /// Whitespace-only values count as unset.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingAzureCredentials`] or
    /// [`ConfigError::MissingOpenAiKey`] when the selected provider lacks its
    /// required variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve from an explicit variable lookup (useful for tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider_raw = lookup("TRANSLATION_PROVIDER").unwrap_or_default();
        let provider = parse_provider(&provider_raw);

        match provider {
            ProviderKind::AzureSpeech => {
                let api_key = first_non_empty(
                    &lookup,
                    &["AZURE_SPEECH_KEY", "SPEECH_KEY", "AZURE_SUBSCRIPTION_KEY"],
                );
                let region = first_non_empty(&lookup, &["AZURE_SPEECH_REGION", "SPEECH_REGION"]);

                match (api_key, region) {
                    (Some(api_key), Some(region)) => Ok(Self {
                        provider,
                        api_key,
                        region: Some(region),
                        endpoint: None,
                        merge: MergeTuning::from_lookup(&lookup),
                    }),
                    _ => Err(ConfigError::MissingAzureCredentials),
                }
            }
            ProviderKind::OpenAi => {
                let api_key = first_non_empty(&lookup, &["OPENAI_API_KEY", "API_KEY"])
                    .ok_or(ConfigError::MissingOpenAiKey)?;
                let endpoint = first_non_empty(&lookup, &["OPENAI_ENDPOINT"])
                    .unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string());

                Ok(Self {
                    provider,
                    api_key,
                    region: None,
                    endpoint: Some(endpoint),
                    merge: MergeTuning::from_lookup(&lookup),
                })
            }
        }
    }

    /// OpenAI endpoint, falling back to [`DEFAULT_OPENAI_ENDPOINT`].
    pub fn endpoint_or_default(&self) -> &str {
        match self.endpoint.as_deref() {
            Some(endpoint) if !endpoint.trim().is_empty() => endpoint,
            _ => DEFAULT_OPENAI_ENDPOINT,
        }
    }
}

/// First variable in `names` whose value is non-empty after trimming.
fn first_non_empty<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names.iter().find_map(|name| {
        lookup(name).filter(|value| !value.trim().is_empty())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
