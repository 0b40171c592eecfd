use crate::content::{CanonicalContent, ExternalLink};

/// Reference inserted when a draft arrives without any outbound link.
pub fn fallback_external_link() -> ExternalLink {
    ExternalLink {
        anchor: "Event planning checklist".to_string(),
        url: "https://en.wikipedia.org/wiki/Event_planning".to_string(),
        category: "reference".to_string(),
        reason: "A neutral overview of event planning gives readers context beyond our own offer."
            .to_string(),
    }
}

/// Returns true when the fallback was inserted.
pub fn ensure_external_link(content: &mut CanonicalContent) -> bool {
    if !content.links.external_links.is_empty() {
        return false;
    }
    content.links.external_links.push(fallback_external_link());
    true
}
