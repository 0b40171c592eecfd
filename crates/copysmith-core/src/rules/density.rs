//! Keyword density enforcement over the canonical body sections.

use super::text::{capitalize_first, count_occurrences};
use crate::content::{BodyField, CanonicalContent};

pub const DEFAULT_MIN_OCCURRENCES: usize = 6;

/// Section that receives synthesized sentences.
pub const ADVICE_FIELD: BodyField = BodyField::Advice;

/// Filler sentences. Each mentions the keyword exactly once.
const FILLER_SENTENCES: [&str; 6] = [
    "{keyword} takes the worry out of planning your event.",
    "Book your {keyword} early to secure the dates you need.",
    "With {keyword} you only pay for what you actually use.",
    "Our team delivers and collects everything, so {keyword} stays effortless.",
    "Ask about combining {keyword} with our other event essentials.",
    "Choosing {keyword} means spotless items without the cleanup afterwards.",
];

pub fn keyword_occurrences(content: &CanonicalContent, keyword: &str) -> usize {
    count_occurrences(&content.content.body_text(), keyword)
}

/// Append filler sentences until the body mentions `keyword` at least
/// `min_occurrences` times. Returns the number of sentences added.
pub fn enforce_density(content: &mut CanonicalContent, keyword: &str, min_occurrences: usize) -> usize {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return 0;
    }
    let current = keyword_occurrences(content, keyword);
    if current >= min_occurrences {
        return 0;
    }

    let missing = min_occurrences - current;
    let sentences: Vec<String> = (0..missing)
        .map(|i| filler_sentence(i, keyword))
        .collect();

    let advice = content.content.field_mut(ADVICE_FIELD);
    let addition = sentences.join(" ");
    if advice.trim().is_empty() {
        *advice = addition;
    } else {
        *advice = format!("{} {}", advice.trim_end(), addition);
    }
    missing
}

fn filler_sentence(index: usize, keyword: &str) -> String {
    let template = FILLER_SENTENCES[index % FILLER_SENTENCES.len()];
    if template.starts_with("{keyword}") {
        template.replace("{keyword}", &capitalize_first(keyword))
    } else {
        template.replace("{keyword}", keyword)
    }
}
