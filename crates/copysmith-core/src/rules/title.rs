//! SEO title shaping.
//!
//! A shaped title starts with the focus keyword, carries a qualifier word
//! and a numeral, and fits in [`MAX_TITLE_CHARS`]. Shaping a shaped title
//! returns it unchanged, so the pass can run after every model call.

use super::text::{capitalize_first, char_len, collapse_whitespace, contains_phrase, replace_phrase};

pub const MAX_TITLE_CHARS: usize = 60;

/// Words that count as a qualifier. Matching is whole-word and case-insensitive.
pub const QUALIFIER_WORDS: [&str; 8] = [
    "Top",
    "Best",
    "Fast",
    "Easy",
    "Local",
    "Cheap",
    "Reliable",
    "Affordable",
];

/// Numeral tokens appended when the title carries no digit.
pub const NUMERAL_TOKENS: [&str; 4] = ["24h", "100+", "24/7", "1 day"];

const ELLIPSIS: char = '\u{2026}';
const KEYWORD_SEPARATOR: &str = " | ";

pub fn shape_title(title: &str, keyword: &str, region: Option<&str>) -> String {
    let title = collapse_whitespace(title);
    let keyword = collapse_whitespace(keyword);
    if is_shaped(&title, &keyword) {
        return title;
    }

    let mut head = lead_with_keyword(&title, &keyword);
    if let Some(region) = region.map(collapse_whitespace).filter(|r| !r.is_empty()) {
        if !contains_phrase(&head, &region) {
            head = format!("{} {}", head, region);
        }
    }

    let needs_qualifier = !has_qualifier(&head);
    let needs_numeral = !has_digit(&head);
    let numeral_reserve = if needs_numeral {
        1 + shortest(&NUMERAL_TOKENS).map(char_len).unwrap_or(0)
    } else {
        0
    };

    let mut shaped = head.clone();
    if needs_qualifier {
        let budget = MAX_TITLE_CHARS.saturating_sub(char_len(&shaped) + 1 + numeral_reserve);
        if let Some(word) = pick_fitting(&QUALIFIER_WORDS, budget) {
            shaped = format!("{} {}", shaped, word);
        }
    }
    if needs_numeral {
        let budget = MAX_TITLE_CHARS.saturating_sub(char_len(&shaped) + 1);
        if let Some(token) = pick_fitting(&NUMERAL_TOKENS, budget) {
            shaped = format!("{} {}", shaped, token);
        }
    }

    if char_len(&shaped) <= MAX_TITLE_CHARS {
        return shaped.trim().to_string();
    }
    truncate_keeping_tail(&head)
}

/// Whether `title` already satisfies every shaping rule.
pub fn is_shaped(title: &str, keyword: &str) -> bool {
    starts_with_keyword(title, keyword)
        && has_qualifier(title)
        && has_digit(title)
        && char_len(title) <= MAX_TITLE_CHARS
}

fn starts_with_keyword(title: &str, keyword: &str) -> bool {
    title.to_lowercase().starts_with(&keyword.to_lowercase())
}

fn has_qualifier(title: &str) -> bool {
    QUALIFIER_WORDS
        .iter()
        .any(|word| contains_phrase(title, word))
}

fn has_digit(title: &str) -> bool {
    title.chars().any(|c| c.is_ascii_digit())
}

/// Put the keyword first. A keyword buried later in the title is lifted out
/// instead of repeated.
fn lead_with_keyword(title: &str, keyword: &str) -> String {
    if keyword.is_empty() || starts_with_keyword(title, keyword) {
        return title.to_string();
    }
    let (without, _) = replace_phrase(title, keyword, "");
    let rest = collapse_whitespace(&without);
    let rest = rest.trim_matches(|c: char| c.is_whitespace() || "-|:,\u{2013}\u{2014}".contains(c));
    if rest.is_empty() {
        capitalize_first(keyword)
    } else {
        format!("{}{}{}", capitalize_first(keyword), KEYWORD_SEPARATOR, rest)
    }
}

fn shortest<'a>(vocabulary: &[&'a str]) -> Option<&'a str> {
    vocabulary.iter().copied().min_by_key(|w| char_len(w))
}

/// Shortest entry that fits `budget` characters, or the shortest overall.
fn pick_fitting<'a>(vocabulary: &[&'a str], budget: usize) -> Option<&'a str> {
    let mut candidates: Vec<&str> = vocabulary.to_vec();
    candidates.sort_by_key(|w| char_len(w));
    candidates
        .iter()
        .copied()
        .find(|w| char_len(w) <= budget)
        .or_else(|| shortest(vocabulary))
}

/// Cut the leading segment and keep a full qualifier+numeral tail.
fn truncate_keeping_tail(head: &str) -> String {
    let tail = match (shortest(&QUALIFIER_WORDS), shortest(&NUMERAL_TOKENS)) {
        (Some(q), Some(n)) => format!("{} {}", q, n),
        _ => String::new(),
    };
    let available = MAX_TITLE_CHARS.saturating_sub(char_len(&tail) + 2);
    let cut: String = head.chars().take(available).collect();
    format!("{}{} {}", cut.trim_end(), ELLIPSIS, tail)
}
