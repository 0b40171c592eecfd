//! Word-count band check over the canonical body sections.

use crate::content::CanonicalContent;
use crate::result::ValidationWarning;
use serde::Serialize;

pub const DEFAULT_MIN_WORDS: usize = 400;
pub const DEFAULT_MAX_WORDS: usize = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LengthStatus {
    Valid,
    TooShort,
    TooLong,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthVerdict {
    pub valid: bool,
    pub status: LengthStatus,
    pub word_count: usize,
    pub min: usize,
    pub max: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LengthVerdict {
    pub fn into_warning(self) -> Option<ValidationWarning> {
        if self.valid {
            return None;
        }
        let message = self.message.clone().unwrap_or_default();
        Some(ValidationWarning::length(message, self.word_count, self.min, self.max))
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn classify_word_count(count: usize, min: usize, max: usize) -> LengthVerdict {
    let (status, message) = if count < min {
        (
            LengthStatus::TooShort,
            Some(format!(
                "Body has {} words; at least {} are expected.",
                count, min
            )),
        )
    } else if count > max {
        (
            LengthStatus::TooLong,
            Some(format!(
                "Body has {} words; at most {} are expected.",
                count, max
            )),
        )
    } else {
        (LengthStatus::Valid, None)
    };
    LengthVerdict {
        valid: status == LengthStatus::Valid,
        status,
        word_count: count,
        min,
        max,
        message,
    }
}

pub fn validate_length(content: &CanonicalContent, min: usize, max: usize) -> LengthVerdict {
    classify_word_count(word_count(&content.content.body_text()), min, max)
}
