//! Refine Stage: one quality rewrite of the normalized draft, raced against a ceiling.

use crate::llm::{extract, prompts, render, run_with_retry, BackendRegistry, RetryPolicy};
use copysmith_core::{BackendCredentials, CanonicalContent, ValidationWarning};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RefineOutcome {
    Refined(Value),
    /// The caller keeps the pre-refine draft and reports the warning.
    Degraded(ValidationWarning),
}

pub struct RefineRequest<'a> {
    pub registry: &'a BackendRegistry,
    pub credentials: &'a BackendCredentials,
    pub policy: RetryPolicy,
    pub ceiling: Duration,
    pub focus_keyword: &'a str,
    pub word_band: (usize, usize),
}

fn refine_fields(content: &CanonicalContent, focus_keyword: &str, word_band: (usize, usize)) -> BTreeMap<String, String> {
    let payload = serde_json::to_string_pretty(content).unwrap_or_else(|_| "{}".to_string());
    BTreeMap::from([
        ("content".to_string(), payload),
        ("focusKeyword".to_string(), focus_keyword.to_string()),
        ("minWords".to_string(), word_band.0.to_string()),
        ("maxWords".to_string(), word_band.1.to_string()),
    ])
}

/// Never fails: exhaustion, parse failure and the ceiling all degrade.
///
/// Waiting stops at the ceiling; the in-flight request is dropped with the
/// future rather than awaited.
pub async fn run_refine(req: &RefineRequest<'_>, content: &CanonicalContent) -> RefineOutcome {
    let system = prompts::refine_system();
    let system = system.as_str();
    let user = render(
        prompts::REFINE_USER,
        &refine_fields(content, req.focus_keyword, req.word_band),
    );
    let user = user.as_str();
    let registry = req.registry;
    let credentials = req.credentials;

    let attempt = run_with_retry("refine", req.policy, |_| async move {
        let raw = registry.call(system, user, credentials).await?;
        Ok(extract(&raw)?)
    });

    match tokio::time::timeout(req.ceiling, attempt).await {
        Ok(Ok(refined)) => RefineOutcome::Refined(refined),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "refine pass failed, keeping the draft");
            RefineOutcome::Degraded(ValidationWarning::degraded_refine(format!(
                "Refine pass failed ({}); the unrefined draft was returned.",
                err
            )))
        }
        Err(_) => {
            tracing::warn!(ceiling_ms = req.ceiling.as_millis() as u64, "refine pass timed out, keeping the draft");
            RefineOutcome::Degraded(ValidationWarning::degraded_refine(format!(
                "Refine pass timed out after {}s; the unrefined draft was returned.",
                req.ceiling.as_secs()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refine_payload_carries_the_full_draft() {
        let mut content = CanonicalContent::default();
        content.seo.focus_keyword = "glassware rental".to_string();
        content.content.intro = "Intro text".to_string();
        let fields = refine_fields(&content, "glassware rental", (400, 600));
        let payload: Value = serde_json::from_str(&fields["content"]).unwrap();
        assert_eq!(payload["seo"]["focusKeyword"], "glassware rental");
        assert_eq!(payload["content"]["intro"], "Intro text");
        assert_eq!(fields["maxWords"], "600");
    }
}
