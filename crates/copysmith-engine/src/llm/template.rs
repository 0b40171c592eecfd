//! `{{name}}` placeholder substitution.

use std::collections::BTreeMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Substitute every recognized `{{name}}` with its value.
///
/// Single pass over the template: substituted values are never re-scanned,
/// and placeholders without a value are left exactly as written.
pub fn render(template: &str, fields: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = after_open[..end].trim();
        match fields.get(name) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + OPEN.len() + end + CLOSE.len()]),
        }
        rest = &after_open[end + CLOSE.len()..];
    }
    out.push_str(rest);
    out
}
