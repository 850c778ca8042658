//! Caption merge engine.
//!
//! Providers finalize utterances at breath pauses, which chops sentences
//! into fragments.  The merge heuristics glue a fragment onto the previous
//! caption block when timing and text shape say it continues the same
//! thought, and [`CaptionHistory`] keeps the bounded block list the display
//! renders.

use std::time::{Duration, Instant};

use super::entry::TranslationEntry;
use crate::config::MergeTuning;

/// History entries kept for display; older blocks are evicted.
pub const HISTORY_DISPLAY_LIMIT: usize = 6;

/// A continuation at most this long (in characters) is treated as a fragment
/// of the previous sentence.
const MAX_MERGE_CHARS: usize = 45;

/// A block ending in one of these never receives a continuation.
const TERMINAL_PUNCTUATION: [char; 5] = ['.', '?', '!', ':', ';'];

/// Leading words that signal a sentence continuation.
const CONNECTOR_WORDS: [&str; 14] = [
    "e", "mas", "ou", "que", "porque", "entao", "então", "de", "do", "da", "dos", "das",
    "com", "para",
];

// ---------------------------------------------------------------------------
// should_merge / merge_phrase
// ---------------------------------------------------------------------------

/// Decide whether `current` continues `previous`, given the time between
/// them.
///
/// Pure function; the checks run in a fixed order and the first conclusive
/// one wins:
/// 1. a blank side never merges;
/// 2. terminal punctuation on `previous` never merges;
/// 3. a pause of `new_block_pause_ms` or more never merges;
/// 4. a pause within `quick_pause_ms` always merges;
/// 5. a short continuation (≤ 45 chars) merges;
/// 6. a leading connector word merges;
/// 7. a lowercase first character merges;
/// 8. otherwise a new block starts.
pub fn should_merge(
    previous: &str,
    current: &str,
    elapsed: Duration,
    tuning: &MergeTuning,
) -> bool {
    let prev = previous.trim();
    let cur = current.trim();
    if prev.is_empty() || cur.is_empty() {
        return false;
    }
    if prev.ends_with(TERMINAL_PUNCTUATION) {
        return false;
    }

    let elapsed_ms = elapsed.as_millis();
    if elapsed_ms >= u128::from(tuning.new_block_pause_ms) {
        return false;
    }
    if elapsed_ms <= u128::from(tuning.quick_pause_ms) {
        return true;
    }

    if cur.chars().count() <= MAX_MERGE_CHARS {
        return true;
    }
    if let Some(first_word) = cur.split_whitespace().next() {
        let lowered = first_word.to_lowercase();
        if CONNECTOR_WORDS.contains(&lowered.as_str()) {
            return true;
        }
    }
    if cur.chars().next().map(char::is_lowercase).unwrap_or(false) {
        return true;
    }

    false
}

/// Join a continuation onto the previous text.
///
/// A trailing hyphen concatenates directly (a word split across utterances);
/// anything else joins with a single space.  A blank side yields the other
/// side verbatim, trimmed.
pub fn merge_phrase(previous: &str, current: &str) -> String {
    let prev = previous.trim();
    let cur = current.trim();
    if prev.is_empty() {
        return cur.to_string();
    }
    if cur.is_empty() {
        return prev.to_string();
    }
    if prev.ends_with('-') {
        format!("{prev}{cur}")
    } else {
        format!("{prev} {cur}")
    }
}

// ---------------------------------------------------------------------------
// CaptionHistory
// ---------------------------------------------------------------------------

/// Ordered caption blocks plus their arrival timestamps, bounded to the last
/// [`HISTORY_DISPLAY_LIMIT`] entries.
///
/// Mutated by exactly one owner (the orchestrator's event loop); the merge
/// decision always runs against the Portuguese side, and a merge touches
/// both language sides plus the timestamp of the newest block.
pub struct CaptionHistory {
    entries: Vec<TranslationEntry>,
    timestamps: Vec<Instant>,
    tuning: MergeTuning,
}

impl CaptionHistory {
    pub fn new(tuning: MergeTuning) -> Self {
        Self {
            entries: Vec::new(),
            timestamps: Vec::new(),
            tuning,
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Append `entry` observed at `now`, or merge it into the newest block.
    ///
    /// Returns `true` when the entry was merged.
    pub fn add_or_merge(&mut self, entry: TranslationEntry, now: Instant) -> bool {
        let merge = match (self.entries.last(), self.timestamps.last()) {
            (Some(prev), Some(&prev_at)) => should_merge(
                &prev.portuguese,
                &entry.portuguese,
                now.duration_since(prev_at),
                &self.tuning,
            ),
            _ => false,
        };

        if merge {
            if let (Some(last), Some(last_at)) =
                (self.entries.last_mut(), self.timestamps.last_mut())
            {
                last.english = merge_phrase(&last.english, &entry.english);
                last.portuguese = merge_phrase(&last.portuguese, &entry.portuguese);
                *last_at = now;
                log::debug!("caption merged into previous block");
                return true;
            }
        }

        self.entries.push(entry);
        self.timestamps.push(now);
        while self.entries.len() > HISTORY_DISPLAY_LIMIT {
            self.entries.remove(0);
            self.timestamps.remove(0);
        }
        false
    }

    /// Drop every block, e.g. when the operator clears the display.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.timestamps.clear();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Blocks in arrival order, oldest first.
    pub fn entries(&self) -> &[TranslationEntry] {
        &self.entries
    }

    /// Linear transcript for downstream analysis: one line per block,
    /// Portuguese preferred, English as fallback, empty blocks excluded.
    pub fn analysis_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|entry| entry.analysis_text().map(str::to_string))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
