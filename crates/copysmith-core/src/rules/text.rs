use regex::{Captures, Regex};

/// Case-insensitive, word-bounded matcher for a (possibly multi-word) phrase.
/// Words may be separated by whitespace or hyphens so slugs match too.
pub(crate) fn phrase_pattern(phrase: &str) -> Option<Regex> {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b{}\b", words.join(r"[\s\-]+"))).ok()
}

/// Whole-word, case-insensitive occurrences of `phrase` in `text`.
pub fn count_occurrences(text: &str, phrase: &str) -> usize {
    phrase_pattern(phrase)
        .map(|re| re.find_iter(text).count())
        .unwrap_or(0)
}

/// `text` without a trailing whole-word `phrase`, matched case-insensitively.
/// `None` when the text does not end with the phrase.
pub fn strip_trailing_phrase(text: &str, phrase: &str) -> Option<String> {
    let re = phrase_pattern(phrase)?;
    let text = text.trim_end();
    let found = re.find_iter(text).last()?;
    if found.end() != text.len() {
        return None;
    }
    Some(text[..found.start()].trim_end().to_string())
}

pub(crate) fn contains_phrase(text: &str, phrase: &str) -> bool {
    phrase_pattern(phrase)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Replace every whole-word occurrence of `from` with `to`, keeping a
/// leading capital when the replaced token had one.
pub(crate) fn replace_phrase(text: &str, from: &str, to: &str) -> (String, usize) {
    let Some(re) = phrase_pattern(from) else {
        return (text.to_string(), 0);
    };
    let mut count = 0usize;
    let replaced = re.replace_all(text, |caps: &Captures| {
        count += 1;
        let matched = &caps[0];
        if matched.chars().next().is_some_and(char::is_uppercase) {
            capitalize_first(to)
        } else {
            to.to_string()
        }
    });
    (replaced.into_owned(), count)
}

pub(crate) fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn slugify(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
