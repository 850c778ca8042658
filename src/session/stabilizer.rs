//! Partial-result stabilizer.
//!
//! Speech providers rewrite the in-progress hypothesis many times per
//! second, and successive hypotheses can shrink or flip wording entirely.
//! Painting those straight onto a caption line produces flicker.  The
//! stabilizer lets a partial through only when it extends what is already
//! shown and enough time has passed since the last repaint.

use std::time::{Duration, Instant};

/// Minimum interval between two accepted partials.
pub const PARTIAL_MIN_INTERVAL: Duration = Duration::from_millis(450);

// ---------------------------------------------------------------------------
// PartialStabilizer
// ---------------------------------------------------------------------------

/// Filters a noisy partial stream down to display-safe updates.
///
/// One instance per recognition run; state never leaks between runs.  All
/// decisions take the caller's clock, so tests construct instants instead of
/// sleeping.
pub struct PartialStabilizer {
    min_interval: Duration,
    last: String,
    last_at: Option<Instant>,
}

impl PartialStabilizer {
    pub fn new() -> Self {
        Self {
            min_interval: PARTIAL_MIN_INTERVAL,
            last: String::new(),
            last_at: None,
        }
    }

    /// Decide whether `partial` should replace the live caption text.
    ///
    /// Rules, in order: non-blank; at least the minimum interval since the
    /// last accepted partial; not identical to it; extends it as a
    /// case-insensitive prefix; strictly longer.  Accepting records
    /// `partial` and `now` for the next decision.
    pub fn accept(&mut self, partial: &str, now: Instant) -> bool {
        if partial.trim().is_empty() {
            return false;
        }
        if let Some(last_at) = self.last_at {
            if now.duration_since(last_at) < self.min_interval {
                return false;
            }
        }
        if partial == self.last {
            return false;
        }
        if !self.last.is_empty() {
            if !starts_with_ignore_case(partial, &self.last) {
                return false;
            }
            if partial.chars().count() <= self.last.chars().count() {
                return false;
            }
        }

        log::debug!("partial accepted ({} chars)", partial.chars().count());
        self.last = partial.to_string();
        self.last_at = Some(now);
        true
    }

    /// Forget the current utterance so the next one starts fresh.
    ///
    /// The rate-limit clock is kept: a partial burst right after a final is
    /// still throttled.
    pub fn reset(&mut self) {
        self.last.clear();
    }

    /// The most recently accepted partial, empty between utterances.
    pub fn last(&self) -> &str {
        &self.last
    }
}

impl Default for PartialStabilizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Case-insensitive (Unicode simple folding) prefix test that never slices
/// inside a multi-byte character.
fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    let mut chars = text.chars();
    for expected in prefix.chars() {
        match chars.next() {
            Some(actual) if actual.to_lowercase().eq(expected.to_lowercase()) => {}
            _ => return false,
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
