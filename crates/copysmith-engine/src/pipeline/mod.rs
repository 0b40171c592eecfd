//! Pipeline orchestrator.
//!
//! One [`Pipeline`] is shared by every run in the process; it only holds
//! read-only configuration. Each call to [`Pipeline::run`] walks
//!
//! ```text
//! Enriching → Drafting → Normalizing → CorrectingPre → Refining → CorrectingPost → Validating → Done
//!                                                          └──→ Skipped ───────────┘
//! ```
//!
//! and ends in `Done` or `Failed`. Non-canonical content types stop after
//! `Normalizing`; refine-mode requests start there.

pub mod credentials;
pub mod draft;
pub mod enrichment;
pub mod refine;

#[cfg(test)]
mod tests;

use crate::llm::BackendRegistry;
use copysmith_adapters::{Config, FileTemplateStore};
use copysmith_core::normalize::normalize_value;
use copysmith_core::rules::{
    correct_consistency, enforce_density, ensure_external_link, expected_keyword, shape_title,
    validate_length, TopicLedger,
};
use copysmith_core::{
    CanonicalContent, ConfigurationError, CredentialSource, EnrichmentResult, GenerationError,
    GenerationRequest, GenerationResult, Mode, Payload, PipelineState, TemplateSource,
    ValidationWarning,
};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

pub use credentials::{resolve_credentials, DefaultCredentials};
pub use enrichment::{enrich, EnrichmentContext};
pub use refine::RefineOutcome;

pub struct Pipeline {
    config: Arc<Config>,
    registry: BackendRegistry,
    templates: Arc<dyn TemplateSource>,
    tenant_credentials: Option<Arc<dyn CredentialSource>>,
    defaults: DefaultCredentials,
}

/// States visited so far by one run.
#[derive(Debug, Default)]
struct Trail {
    path: Vec<PipelineState>,
}

impl Trail {
    fn enter(&mut self, state: PipelineState) {
        tracing::debug!(state = ?state, "pipeline state");
        self.path.push(state);
    }
}

/// Per-run inputs of the deterministic correction passes.
struct PassInputs<'a> {
    topic: &'a str,
    region: Option<&'a str>,
    enforce_density: bool,
}

impl Pipeline {
    pub fn new(config: Config, registry: BackendRegistry) -> Self {
        let templates = Arc::new(FileTemplateStore::new(config.templates_dir.clone()));
        let defaults = DefaultCredentials::from_config(&config, Default::default());
        Self {
            config: Arc::new(config),
            registry,
            templates,
            tenant_credentials: None,
            defaults,
        }
    }

    pub fn with_templates(mut self, templates: Arc<dyn TemplateSource>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_tenant_credentials(mut self, store: Arc<dyn CredentialSource>) -> Self {
        self.tenant_credentials = Some(store);
        self
    }

    pub fn with_default_credentials(mut self, defaults: DefaultCredentials) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one request to completion.
    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationResult, GenerationError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "generation",
            %run_id,
            content_type = %request.content_type,
            mode = ?request.mode,
        );
        async {
            let mut trail = Trail::default();
            match self.execute(request, &mut trail).await {
                Ok(mut result) => {
                    trail.enter(PipelineState::Done);
                    result.path = trail.path;
                    tracing::info!(
                        warnings = result.warnings.len(),
                        path = ?result.path,
                        "generation finished"
                    );
                    Ok(result)
                }
                Err(err) => {
                    trail.enter(PipelineState::Failed);
                    tracing::warn!(
                        error = %err,
                        transient = err.is_transient(),
                        path = ?trail.path,
                        "generation failed"
                    );
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        request: &GenerationRequest,
        trail: &mut Trail,
    ) -> Result<GenerationResult, GenerationError> {
        let credentials =
            resolve_credentials(request, &self.defaults, self.tenant_credentials.as_deref())?;
        tracing::debug!(provider = %credentials.provider, model = %credentials.model, "resolved credentials");

        let settings = &self.config.pipeline;
        let suffix = self.config.keyword_suffix.as_str();
        let band = (settings.min_words, settings.max_words);
        let topic = request.topic();
        let focus_keyword = if topic.is_empty() {
            String::new()
        } else {
            expected_keyword(topic, suffix)
        };

        let (draft, enrichment) = match request.mode {
            Mode::Generate => {
                let template = self
                    .templates
                    .template(request.tenant_id.as_deref(), request.content_type)?;

                trail.enter(PipelineState::Enriching);
                let enrichment = enrich(&EnrichmentContext {
                    registry: &self.registry,
                    credentials: &credentials,
                    policy: settings.enrichment_retry.into(),
                    request,
                    focus_keyword: &focus_keyword,
                    keyword_suffix: suffix,
                    pages: &self.config.internal_pages,
                })
                .await;

                trail.enter(PipelineState::Drafting);
                let fields = draft::draft_fields(request, &enrichment, &focus_keyword, band);
                let draft = draft::run_draft(
                    &self.registry,
                    &credentials,
                    settings.draft_retry.into(),
                    &template,
                    &fields,
                )
                .await
                .map_err(GenerationError::Draft)?;
                (draft, enrichment)
            }
            Mode::Refine => {
                if !request.content_type.is_canonical() {
                    return Err(ConfigurationError::Invalid(format!(
                        "refine mode is not available for '{}'",
                        request.content_type
                    ))
                    .into());
                }
                let existing = request
                    .existing
                    .clone()
                    .filter(|value| value.is_object())
                    .ok_or(ConfigurationError::MissingExistingContent)?;
                (existing, EnrichmentResult::default())
            }
        };

        trail.enter(PipelineState::Normalizing);
        if !request.content_type.is_canonical() {
            return Ok(GenerationResult {
                payload: Payload::Draft(draft),
                warnings: Vec::new(),
                path: Vec::new(),
            });
        }
        let mut content = normalize_value(draft);
        fill_gaps(&mut content, &enrichment);

        // Content arriving for refinement already had its density pass.
        let inputs = PassInputs {
            topic,
            region: request.primary_region(),
            enforce_density: request.mode == Mode::Generate,
        };
        let mut ledger = TopicLedger::new(&self.config.known_topics);
        let mut warnings = Vec::new();

        trail.enter(PipelineState::CorrectingPre);
        self.correct(&mut content, &mut ledger, &inputs);

        trail.enter(PipelineState::Refining);
        let outcome = refine::run_refine(
            &refine::RefineRequest {
                registry: &self.registry,
                credentials: &credentials,
                policy: settings.refine_retry.into(),
                ceiling: settings.refine_timeout(),
                focus_keyword: &content.seo.focus_keyword,
                word_band: band,
            },
            &content,
        )
        .await;
        let refined = match outcome {
            RefineOutcome::Refined(value) => {
                let refined = normalize_value(value);
                if refined.content.body_text().trim().is_empty() {
                    tracing::warn!("refine pass returned no body text, keeping the draft");
                    Err(ValidationWarning::degraded_refine(
                        "Refine pass returned no usable content; the unrefined draft was returned.",
                    ))
                } else {
                    Ok(refined)
                }
            }
            RefineOutcome::Degraded(warning) => Err(warning),
        };
        match refined {
            Ok(refined) => {
                content = refined;
                fill_gaps(&mut content, &enrichment);
                trail.enter(PipelineState::CorrectingPost);
                // Density is not re-enforced after refinement.
                let post = PassInputs {
                    enforce_density: false,
                    ..inputs
                };
                self.correct(&mut content, &mut ledger, &post);
            }
            Err(warning) => {
                warnings.push(warning);
                trail.enter(PipelineState::Skipped);
            }
        }

        trail.enter(PipelineState::Validating);
        let verdict = validate_length(&content, band.0, band.1);
        tracing::debug!(words = verdict.word_count, status = ?verdict.status, "length verdict");
        if let Some(warning) = verdict.into_warning() {
            warnings.push(warning);
        }

        Ok(GenerationResult {
            payload: Payload::Canonical(Box::new(content)),
            warnings,
            path: Vec::new(),
        })
    }

    /// Consistency, title, density and external-link passes, in that order.
    fn correct(&self, content: &mut CanonicalContent, ledger: &mut TopicLedger, inputs: &PassInputs<'_>) {
        let report = correct_consistency(content, inputs.topic, &self.config.keyword_suffix, ledger);
        if report.changed() {
            tracing::info!(
                previous_keyword = %report.previous_keyword,
                replacements = report.replacements.len(),
                "corrected topic drift"
            );
        }

        let keyword = content.seo.focus_keyword.clone();
        content.seo.seo_title = shape_title(&content.seo.seo_title, &keyword, inputs.region);

        if inputs.enforce_density {
            let added = enforce_density(
                content,
                &keyword,
                self.config.pipeline.min_keyword_occurrences,
            );
            if added > 0 {
                tracing::debug!(added, "appended keyword sentences");
            }
        }

        if ensure_external_link(content) {
            tracing::debug!("inserted fallback external link");
        }
    }
}

/// Fill empty keyword and internal-link lists from enrichment output.
fn fill_gaps(content: &mut CanonicalContent, enrichment: &EnrichmentResult) {
    if content.seo.secondary_keywords.is_empty() {
        content.seo.secondary_keywords = enrichment.secondary_keywords.clone();
    }
    if content.links.internal_links.is_empty() {
        content.links.internal_links = enrichment.internal_links.clone();
    }
}
