//! Caption layer: bilingual entries plus the merge heuristics that assemble
//! them into a bounded display history.

pub mod entry;
pub mod merger;

pub use entry::{resolve_entry, TranslationEntry};
pub use merger::{
    merge_phrase, should_merge, CaptionHistory, HISTORY_DISPLAY_LIMIT,
};
