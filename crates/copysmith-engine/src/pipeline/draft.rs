//! Draft Stage: render the content-type template and get one structured draft.

use crate::llm::{extract, prompts, render, run_with_retry, BackendRegistry, RetryPolicy};
use copysmith_core::{BackendCredentials, EnrichmentResult, GenerationRequest, StageError};
use serde_json::Value;
use std::collections::BTreeMap;

/// Placeholder values for the draft template.
///
/// Enrichment output goes in first so a caller-supplied field of the same
/// name wins. The focus keyword is always the derived one.
pub fn draft_fields(
    request: &GenerationRequest,
    enrichment: &EnrichmentResult,
    focus_keyword: &str,
    word_band: (usize, usize),
) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("scenarios".to_string(), enrichment.scenarios.join(", "));
    fields.insert(
        "internalLinks".to_string(),
        enrichment
            .internal_links
            .iter()
            .map(|link| format!("{} ({})", link.anchor, link.path))
            .collect::<Vec<_>>()
            .join("; "),
    );
    fields.insert(
        "secondaryKeywords".to_string(),
        enrichment.secondary_keywords.join(", "),
    );
    fields.insert("minWords".to_string(), word_band.0.to_string());
    fields.insert("maxWords".to_string(), word_band.1.to_string());

    for (key, value) in &request.fields {
        if !value.trim().is_empty() {
            fields.insert(key.clone(), value.trim().to_string());
        }
    }
    if !focus_keyword.is_empty() {
        fields.insert("focusKeyword".to_string(), focus_keyword.to_string());
    }
    fields
}

/// Any error returned here ends the run.
pub async fn run_draft(
    registry: &BackendRegistry,
    credentials: &BackendCredentials,
    policy: RetryPolicy,
    template: &str,
    fields: &BTreeMap<String, String>,
) -> Result<Value, StageError> {
    let system = prompts::draft_system();
    let system = system.as_str();
    let user = render(template, fields);
    let user = user.as_str();
    run_with_retry("draft", policy, |attempt| async move {
        tracing::debug!(attempt, "requesting draft");
        let raw = registry.call(system, user, credentials).await?;
        Ok(extract(&raw)?)
    })
    .await
}
