//! Deterministic post-processing passes for canonical content.
//!
//! None of these can fail. Each is safe to run again on its own output.

pub mod consistency;
pub mod density;
pub mod length;
pub mod links;
mod text;
pub mod title;

pub use consistency::{correct_consistency, expected_keyword, CorrectionReport, TopicLedger};
pub use density::{enforce_density, keyword_occurrences, DEFAULT_MIN_OCCURRENCES};
pub use length::{
    classify_word_count, validate_length, LengthStatus, LengthVerdict, DEFAULT_MAX_WORDS,
    DEFAULT_MIN_WORDS,
};
pub use links::{ensure_external_link, fallback_external_link};
pub use text::{count_occurrences, strip_trailing_phrase};
pub use title::{is_shaped, shape_title, MAX_TITLE_CHARS};
