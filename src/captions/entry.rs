//! Caption entries and language-pair resolution.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TranslationEntry
// ---------------------------------------------------------------------------

/// One caption block: the same utterance on both sides of the language pair.
///
/// Either side may be empty when the provider could not populate it; the
/// resolver back-fills best-effort, so a fully empty entry only occurs for a
/// fully empty result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub english: String,
    pub portuguese: String,
}

impl TranslationEntry {
    pub fn new(english: &str, portuguese: &str) -> Self {
        Self {
            english: english.to_string(),
            portuguese: portuguese.to_string(),
        }
    }

    /// Text for linear transcripts: Portuguese preferred, English as
    /// fallback, `None` when both sides are blank.
    pub fn analysis_text(&self) -> Option<&str> {
        if !self.portuguese.trim().is_empty() {
            Some(self.portuguese.as_str())
        } else if !self.english.trim().is_empty() {
            Some(self.english.as_str())
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// resolve_entry
// ---------------------------------------------------------------------------

/// Build a [`TranslationEntry`] from a final recognition result.
///
/// The recognized text lands on whichever side matches the recognition
/// language's two-letter prefix (`en`/`pt`, case-insensitive), the translated
/// text on whichever side matches the target language.  A side left empty is
/// back-filled from whatever text is available (translated text preferred
/// for English, recognized text preferred for Portuguese) so both sides are
/// populated best-effort.
pub fn resolve_entry(
    recognition_language: &str,
    recognized_text: &str,
    target_language: &str,
    translated_text: Option<&str>,
) -> TranslationEntry {
    let translated = translated_text.unwrap_or("");
    let mut english = "";
    let mut portuguese = "";

    if has_language_prefix(recognition_language, "en") {
        english = recognized_text;
    } else if has_language_prefix(recognition_language, "pt") {
        portuguese = recognized_text;
    }
    if has_language_prefix(target_language, "en") {
        english = translated;
    } else if has_language_prefix(target_language, "pt") {
        portuguese = translated;
    }

    if english.trim().is_empty() {
        english = if !translated.trim().is_empty() {
            translated
        } else {
            recognized_text
        };
    }
    if portuguese.trim().is_empty() {
        portuguese = if !recognized_text.trim().is_empty() {
            recognized_text
        } else {
            translated
        };
    }

    TranslationEntry::new(english, portuguese)
}

fn has_language_prefix(tag: &str, prefix: &str) -> bool {
    tag.get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- tag resolution ----

    #[test]
    fn english_recognition_portuguese_target() {
        let entry = resolve_entry("en-US", "good morning", "pt-BR", Some("bom dia"));
        assert_eq!(entry.english, "good morning");
        assert_eq!(entry.portuguese, "bom dia");
    }

    #[test]
    fn portuguese_recognition_english_target() {
        let entry = resolve_entry("pt-BR", "bom dia", "en", Some("good morning"));
        assert_eq!(entry.english, "good morning");
        assert_eq!(entry.portuguese, "bom dia");
    }

    #[test]
    fn tag_matching_ignores_case() {
        let entry = resolve_entry("EN-us", "hello", "PT-br", Some("olá"));
        assert_eq!(entry.english, "hello");
        assert_eq!(entry.portuguese, "olá");
    }

    // ---- back-fill ----

    /// An untranslated final still yields a two-sided entry: the recognized
    /// text stands in for the missing side.
    #[test]
    fn missing_translation_backfills_from_recognized() {
        let entry = resolve_entry("en-US", "good morning", "pt-BR", None);
        assert_eq!(entry.english, "good morning");
        assert_eq!(entry.portuguese, "good morning");
    }

    #[test]
    fn unknown_tags_still_populate_both_sides() {
        let entry = resolve_entry("es-ES", "hola", "fr", Some("bonjour"));
        assert_eq!(entry.english, "bonjour");
        assert_eq!(entry.portuguese, "hola");
    }

    #[test]
    fn blank_texts_produce_an_empty_entry() {
        let entry = resolve_entry("en-US", "  ", "pt-BR", Some(""));
        assert!(entry.analysis_text().is_none());
    }

    // ---- analysis projection ----

    #[test]
    fn analysis_text_prefers_portuguese() {
        let entry = TranslationEntry::new("hello", "olá");
        assert_eq!(entry.analysis_text(), Some("olá"));
    }

    #[test]
    fn analysis_text_falls_back_to_english() {
        let entry = TranslationEntry::new("hello", "   ");
        assert_eq!(entry.analysis_text(), Some("hello"));
    }
}
