//! Salvage a single JSON object out of free-form model output.

use copysmith_core::ParseError;
use serde_json::{Map, Value};

/// Upper bound on balanced fragments tried per response.
const MAX_CANDIDATES: usize = 8;

fn push_unique_candidate(candidates: &mut Vec<String>, candidate: impl Into<String>) {
    let candidate = candidate.into();
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return;
    }
    if !candidates.iter().any(|existing| existing == trimmed) {
        candidates.push(trimmed.to_string());
    }
}

fn strip_markdown_fences(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    let without_open = trimmed.strip_prefix("```")?;
    let after_header = match without_open.find('\n') {
        Some(newline_idx) => &without_open[newline_idx + 1..],
        None => without_open,
    };
    let end_idx = after_header.rfind("```")?;
    Some(after_header[..end_idx].trim())
}

/// Slice from the first `{` to the last `}`.
fn outermost_braces(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

/// Balanced `{...}` starting at byte `start`, ignoring braces inside strings.
fn balanced_object_from(content: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&content[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

fn balanced_candidates(content: &str, max_candidates: usize) -> Vec<String> {
    let mut out = Vec::new();
    for (idx, _) in content.match_indices('{') {
        if let Some(candidate) = balanced_object_from(content, idx) {
            push_unique_candidate(&mut out, candidate);
            if out.len() >= max_candidates {
                break;
            }
        }
    }
    out
}

/// Repair the mistakes models make most often in otherwise valid JSON.
fn fix_json_issues(json: &str) -> String {
    let mut fixed = json.to_string();

    for (from, to) in [(",]", "]"), (",}", "}"), (", ]", "]"), (", }", "}"), (",\n]", "]"), (",\n}", "}")] {
        fixed = fixed.replace(from, to);
    }

    fixed = fixed.replace(['\u{201C}', '\u{201D}'], "\"");
    fixed = fixed.replace(['\u{2018}', '\u{2019}'], "'");
    fixed
}

/// Extract one structured object from raw backend text.
///
/// Tolerates surrounding prose and code fences. Fails with
/// [`ParseError::NoObject`] when the text holds no `{`, and with
/// [`ParseError::Invalid`] when no candidate parses.
pub fn extract_object(raw: &str) -> Result<Map<String, Value>, ParseError> {
    if !raw.contains('{') {
        return Err(ParseError::NoObject);
    }

    let mut candidates = Vec::new();
    let body = strip_markdown_fences(raw).unwrap_or(raw);
    if let Some(slice) = outermost_braces(body) {
        push_unique_candidate(&mut candidates, slice);
    }
    for candidate in balanced_candidates(body, MAX_CANDIDATES) {
        push_unique_candidate(&mut candidates, candidate);
    }
    if candidates.is_empty() {
        return Err(ParseError::NoObject);
    }

    let mut last_err: Option<ParseError> = None;
    for candidate in &candidates {
        let parsed = serde_json::from_str::<Value>(candidate)
            .or_else(|_| serde_json::from_str::<Value>(&fix_json_issues(candidate)));
        match parsed {
            Ok(Value::Object(map)) => return Ok(map),
            Ok(_) => last_err = Some(ParseError::NotAnObject),
            Err(err) => {
                if last_err.is_none() {
                    last_err = Some(ParseError::Invalid(err.to_string()));
                }
            }
        }
    }
    Err(last_err.unwrap_or(ParseError::NoObject))
}

/// [`extract_object`] wrapped back into a [`Value`].
pub fn extract(raw: &str) -> Result<Value, ParseError> {
    extract_object(raw).map(Value::Object)
}
