//! Configuration module for the live caption pipeline.
//!
//! Provides `TranslationConfig` (provider and credentials resolved from the
//! process environment), `TranslationMode` (run direction and its language
//! pair), and `MergeTuning` (caption merge thresholds with env overrides).

pub mod settings;

pub use settings::{
    parse_provider, ConfigError, MergeTuning, ProviderKind, TranslationConfig, TranslationMode,
    DEFAULT_OPENAI_ENDPOINT,
};
