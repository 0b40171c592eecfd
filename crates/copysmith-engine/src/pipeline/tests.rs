use super::*;
use copysmith_core::rules::{is_shaped, keyword_occurrences, DEFAULT_MIN_OCCURRENCES};
use copysmith_core::{
    Backend, BackendCredentials, BackendError, BackendFuture, ContentType, CredentialOverride,
    ProviderTag, StageError, WarningKind,
};
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
//  Scripted backend
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Scenarios,
    Links,
    Keywords,
    Draft,
    Refine,
}

impl Call {
    fn of(system: &str) -> Call {
        if system.contains("You pick the occasions") {
            Call::Scenarios
        } else if system.contains("You choose internal links") {
            Call::Links
        } else if system.contains("You generate secondary SEO keywords") {
            Call::Keywords
        } else if system.contains("You are an editor") {
            Call::Refine
        } else {
            Call::Draft
        }
    }
}

enum Reply {
    Text(String),
    Fail(BackendError),
    Hang,
}

fn text(value: Value) -> Reply {
    Reply::Text(value.to_string())
}

#[derive(Debug, Clone)]
struct Recorded {
    call: Call,
    api_key: String,
    user: String,
}

type Script = Box<dyn Fn(Call, &str) -> Reply + Send + Sync>;

struct ScriptedBackend {
    script: Script,
    calls: Mutex<Vec<Recorded>>,
}

impl ScriptedBackend {
    fn new(script: impl Fn(Call, &str) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: Call) -> usize {
        self.calls().iter().filter(|r| r.call == call).count()
    }

    fn user_prompt(&self, call: Call) -> String {
        self.calls()
            .into_iter()
            .find(|r| r.call == call)
            .map(|r| r.user)
            .unwrap_or_default()
    }
}

impl Backend for ScriptedBackend {
    fn invoke<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        credentials: &'a BackendCredentials,
    ) -> BackendFuture<'a> {
        let call = Call::of(system);
        self.calls.lock().unwrap().push(Recorded {
            call,
            api_key: credentials.api_key.clone(),
            user: user.to_string(),
        });
        let reply = (self.script)(call, user);
        Box::pin(async move {
            // Let concurrent runs interleave.
            tokio::task::yield_now().await;
            match reply {
                Reply::Text(text) => Ok(text),
                Reply::Fail(err) => Err(err),
                Reply::Hang => std::future::pending().await,
            }
        })
    }
}

fn pipeline_with(backend: Arc<ScriptedBackend>, defaults: DefaultCredentials) -> Pipeline {
    let config = Config::default();
    let registry = BackendRegistry::uniform(backend, config.pipeline.call_timeout());
    Pipeline::new(config, registry).with_default_credentials(defaults)
}

fn pipeline(backend: Arc<ScriptedBackend>) -> Pipeline {
    pipeline_with(
        backend,
        DefaultCredentials::new(ProviderTag::OpenAi).with_key(ProviderTag::OpenAi, "sk-default"),
    )
}

fn landing_page(topic: &str) -> GenerationRequest {
    GenerationRequest::new(ContentType::LandingPage)
        .with_field("topic", topic)
        .with_field("region1", "Amsterdam")
}

fn canonical(result: &GenerationResult) -> &CanonicalContent {
    result.payload.as_canonical().expect("canonical payload")
}

/// Flat draft that drifted to tableware.
fn drifted_draft() -> Value {
    json!({
        "seoTitle": "Tableware rental Amsterdam | Book today",
        "metaDescription": "Rent tableware for weddings and parties in Amsterdam.",
        "focusKeyword": "tableware rental",
        "urlSlug": "tableware-rental-amsterdam",
        "h1": "Tableware rental in Amsterdam",
        "intro": "Planning a dinner? Our tableware rental covers every guest."
    })
}

/// Nested draft that stays on topic.
fn glassware_draft() -> Value {
    json!({
        "seo": {
            "seoTitle": "Glassware rental Amsterdam",
            "metaDescription": "Rent wine and champagne glasses in Amsterdam.",
            "focusKeyword": "glassware rental",
            "urlSlug": "glassware-rental-amsterdam"
        },
        "content": {
            "h1": "Glassware rental in Amsterdam",
            "intro": "Glassware rental makes hosting simple.",
            "benefits": "Clean glasses, delivered and collected.",
            "closing": "Order today."
        },
        "faq": {"title": "Questions", "items": [
            {"question": "Do you deliver?", "answer": "Yes, across the region."}
        ]},
        "links": {"externalLinks": [{
            "anchor": "Glass care",
            "url": "https://example.org/glass-care",
            "category": "guide",
            "reason": "Handling tips."
        }]}
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Generate path
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn drifted_draft_is_pulled_back_to_the_requested_topic() {
    let backend = ScriptedBackend::new(|_, _| text(drifted_draft()));
    let result = pipeline(backend.clone())
        .run(&landing_page("glassware"))
        .await
        .unwrap();

    let content = canonical(&result);
    assert_eq!(content.seo.focus_keyword, "glassware rental");
    let title = content.seo.seo_title.to_lowercase();
    assert!(title.contains("glassware"), "title: {}", content.seo.seo_title);
    assert!(!title.contains("tableware"), "title: {}", content.seo.seo_title);
    assert!(is_shaped(&content.seo.seo_title, "glassware rental"));
    assert!(!content.seo.meta_description.to_lowercase().contains("tableware"));
    assert_eq!(content.links.external_links.len(), 1);

    assert_eq!(
        result.path,
        vec![
            PipelineState::Enriching,
            PipelineState::Drafting,
            PipelineState::Normalizing,
            PipelineState::CorrectingPre,
            PipelineState::Refining,
            PipelineState::CorrectingPost,
            PipelineState::Validating,
            PipelineState::Done,
        ]
    );
    // Far below the word band.
    assert_eq!(result.warnings_of(WarningKind::Length).count(), 1);
    assert_eq!(result.warnings_of(WarningKind::DegradedRefine).count(), 0);
    assert_eq!(backend.count(Call::Draft), 1);
    assert_eq!(backend.count(Call::Refine), 1);
}

#[tokio::test(start_paused = true)]
async fn draft_prompt_carries_enrichment_and_gaps_are_filled() {
    let backend = ScriptedBackend::new(|call, _| match call {
        Call::Scenarios => text(json!({
            "scenarios": ["festival", "wedding", "conference", "trade fair", "rave"]
        })),
        Call::Links => text(json!({"links": [{"anchor": "Tableware", "path": "/tableware"}]})),
        Call::Keywords => text(json!({
            "keywords": ["wine glass hire", "champagne flute rental"]
        })),
        Call::Draft | Call::Refine => text(glassware_draft()),
    });
    let result = pipeline(backend.clone())
        .run(&landing_page("glassware"))
        .await
        .unwrap();

    let draft_prompt = backend.user_prompt(Call::Draft);
    assert!(draft_prompt.contains("festival, wedding, conference, trade fair"));
    assert!(draft_prompt.contains("Focus keyword: glassware rental"));
    assert!(draft_prompt.contains("Tableware (/tableware)"));

    let content = canonical(&result);
    assert_eq!(
        content.seo.secondary_keywords,
        vec!["wine glass hire", "champagne flute rental"]
    );
    assert_eq!(content.links.internal_links.len(), 1);
    assert_eq!(content.links.internal_links[0].path, "/tableware");
    assert_eq!(content.links.external_links[0].anchor, "Glass care");
}

#[tokio::test(start_paused = true)]
async fn failed_enrichment_falls_back_without_failing_the_run() {
    let backend = ScriptedBackend::new(|call, _| match call {
        Call::Scenarios | Call::Links | Call::Keywords => {
            Reply::Fail(BackendError::status(500, "upstream down"))
        }
        Call::Draft | Call::Refine => text(glassware_draft()),
    });
    let result = pipeline(backend.clone())
        .run(&landing_page("glassware"))
        .await
        .unwrap();

    let draft_prompt = backend.user_prompt(Call::Draft);
    assert!(draft_prompt.contains("wedding, corporate event, birthday party, garden party"));
    // Enrichment budget is a single attempt.
    assert_eq!(backend.count(Call::Scenarios), 1);
    assert!(canonical(&result).seo.secondary_keywords.is_empty());
    assert_eq!(result.warnings_of(WarningKind::DegradedRefine).count(), 0);
}

#[tokio::test(start_paused = true)]
async fn hanging_refine_returns_the_corrected_draft_with_one_warning() {
    let backend = ScriptedBackend::new(|call, _| match call {
        Call::Refine => Reply::Hang,
        _ => text(glassware_draft()),
    });
    let pipeline = pipeline(backend.clone());

    let started = tokio::time::Instant::now();
    let result = pipeline.run(&landing_page("glassware")).await.unwrap();
    let elapsed = started.elapsed();

    let ceiling = pipeline.config().pipeline.refine_timeout();
    assert!(elapsed >= ceiling, "returned after {:?}", elapsed);
    assert!(elapsed < ceiling + Duration::from_secs(1), "returned after {:?}", elapsed);

    let degraded: Vec<_> = result.warnings_of(WarningKind::DegradedRefine).collect();
    assert_eq!(degraded.len(), 1);
    assert!(degraded[0].message.contains("timed out"));

    assert!(result.path.contains(&PipelineState::Skipped));
    assert!(!result.path.contains(&PipelineState::CorrectingPost));

    // The payload is exactly what was handed to the refine pass.
    let sent = crate::llm::extract(&backend.user_prompt(Call::Refine)).unwrap();
    assert_eq!(result.payload.to_value(), sent);

    let content = canonical(&result);
    assert!(keyword_occurrences(content, "glassware rental") >= DEFAULT_MIN_OCCURRENCES);
}

#[tokio::test(start_paused = true)]
async fn failing_refine_degrades_after_its_retries() {
    let backend = ScriptedBackend::new(|call, _| match call {
        Call::Refine => Reply::Fail(BackendError::status(503, "overloaded")),
        _ => text(glassware_draft()),
    });
    let result = pipeline(backend.clone())
        .run(&landing_page("glassware"))
        .await
        .unwrap();

    assert_eq!(backend.count(Call::Refine), 2);
    let degraded: Vec<_> = result.warnings_of(WarningKind::DegradedRefine).collect();
    assert_eq!(degraded.len(), 1);
    assert!(degraded[0].message.contains("failed"));
    assert!(result.path.contains(&PipelineState::Skipped));
}

#[tokio::test(start_paused = true)]
async fn empty_refine_reply_keeps_the_corrected_draft() {
    let backend = ScriptedBackend::new(|call, _| match call {
        Call::Refine => text(json!({"seo": {"seoTitle": "Glassware rental"}})),
        _ => text(glassware_draft()),
    });
    let result = pipeline(backend.clone())
        .run(&landing_page("glassware"))
        .await
        .unwrap();

    let degraded: Vec<_> = result.warnings_of(WarningKind::DegradedRefine).collect();
    assert_eq!(degraded.len(), 1);
    assert!(degraded[0].message.contains("no usable content"));
    assert!(result.path.contains(&PipelineState::Skipped));
    assert!(!result.path.contains(&PipelineState::CorrectingPost));

    let sent = crate::llm::extract(&backend.user_prompt(Call::Refine)).unwrap();
    assert_eq!(result.payload.to_value(), sent);
    assert_eq!(
        canonical(&result).content.intro,
        "Glassware rental makes hosting simple."
    );
}

#[tokio::test(start_paused = true)]
async fn bare_object_refine_reply_is_degraded() {
    let backend = ScriptedBackend::new(|call, _| match call {
        Call::Refine => text(json!({})),
        _ => text(glassware_draft()),
    });
    let result = pipeline(backend.clone())
        .run(&landing_page("glassware"))
        .await
        .unwrap();

    assert_eq!(backend.count(Call::Refine), 1);
    assert_eq!(result.warnings_of(WarningKind::DegradedRefine).count(), 1);
    assert!(!canonical(&result).content.body_text().trim().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_draft_fails_immediately() {
    let backend = ScriptedBackend::new(|call, _| match call {
        Call::Draft => Reply::Fail(BackendError::status(401, "invalid api key")),
        _ => text(json!({})),
    });
    let err = pipeline(backend.clone())
        .run(&landing_page("glassware"))
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Draft(StageError::Backend(_))));
    assert!(!err.is_transient());
    assert!(!err.user_message().contains("try again"));
    assert_eq!(backend.count(Call::Draft), 1);
    assert_eq!(backend.count(Call::Refine), 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_draft_retries_surface_as_transient() {
    let backend = ScriptedBackend::new(|call, _| match call {
        Call::Draft => Reply::Fail(BackendError::status(503, "overloaded")),
        _ => text(json!({})),
    });
    let err = pipeline(backend.clone())
        .run(&landing_page("glassware"))
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert!(err.user_message().contains("try again"));
    assert_eq!(backend.count(Call::Draft), 3);
}

#[tokio::test(start_paused = true)]
async fn prose_only_draft_is_a_parse_failure() {
    let backend = ScriptedBackend::new(|call, _| match call {
        Call::Draft => Reply::Text("I'm sorry, I can't help with that.".to_string()),
        _ => text(json!({})),
    });
    let err = pipeline(backend.clone())
        .run(&landing_page("glassware"))
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Draft(StageError::Parse(_))));
    assert_eq!(backend.count(Call::Draft), 1);
}

#[tokio::test(start_paused = true)]
async fn non_canonical_drafts_pass_through_unchanged() {
    let draft = json!({"title": "Five glassware tips", "body": "...", "tags": ["events"]});
    let reply = draft.clone();
    let backend = ScriptedBackend::new(move |_, _| text(reply.clone()));
    let request = GenerationRequest::new(ContentType::BlogPost).with_field("topic", "glassware");
    let result = pipeline(backend.clone()).run(&request).await.unwrap();

    assert_eq!(result.payload, Payload::Draft(draft));
    assert!(result.warnings.is_empty());
    assert_eq!(
        result.path,
        vec![
            PipelineState::Enriching,
            PipelineState::Drafting,
            PipelineState::Normalizing,
            PipelineState::Done,
        ]
    );
    assert_eq!(backend.count(Call::Refine), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Refine mode
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn refine_mode_skips_generation_and_density() {
    let backend = ScriptedBackend::new(|_, _| text(drifted_draft()));
    let mut request = landing_page("glassware");
    request.mode = Mode::Refine;
    request.existing = Some(glassware_draft());

    let result = pipeline(backend.clone()).run(&request).await.unwrap();

    assert_eq!(backend.count(Call::Refine), 1);
    assert_eq!(backend.calls().len(), 1);
    assert_eq!(
        result.path,
        vec![
            PipelineState::Normalizing,
            PipelineState::CorrectingPre,
            PipelineState::Refining,
            PipelineState::CorrectingPost,
            PipelineState::Validating,
            PipelineState::Done,
        ]
    );

    let content = canonical(&result);
    assert_eq!(content.seo.focus_keyword, "glassware rental");
    assert!(keyword_occurrences(content, "glassware rental") < DEFAULT_MIN_OCCURRENCES);
    assert!(!backend
        .user_prompt(Call::Refine)
        .contains("takes the worry out of planning"));
}

#[tokio::test]
async fn refine_mode_needs_existing_content() {
    let backend = ScriptedBackend::new(|_, _| text(json!({})));
    let mut request = landing_page("glassware");
    request.mode = Mode::Refine;

    let err = pipeline(backend.clone()).run(&request).await.unwrap_err();
    assert!(matches!(
        err,
        GenerationError::Configuration(ConfigurationError::MissingExistingContent)
    ));

    request.existing = Some(json!("just a string"));
    let err = pipeline(backend.clone()).run(&request).await.unwrap_err();
    assert!(matches!(
        err,
        GenerationError::Configuration(ConfigurationError::MissingExistingContent)
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn refine_mode_rejects_non_canonical_types() {
    let backend = ScriptedBackend::new(|_, _| text(json!({})));
    let mut request = GenerationRequest::new(ContentType::Newsletter).with_field("topic", "linen");
    request.mode = Mode::Refine;
    request.existing = Some(json!({"title": "x"}));

    let err = pipeline(backend.clone()).run(&request).await.unwrap_err();
    assert!(matches!(err, GenerationError::Configuration(ConfigurationError::Invalid(_))));
    assert!(backend.calls().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Configuration and credentials
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn missing_credential_fails_before_any_call() {
    let backend = ScriptedBackend::new(|_, _| text(glassware_draft()));
    let pipeline = pipeline_with(backend.clone(), DefaultCredentials::new(ProviderTag::OpenAi));

    let err = pipeline.run(&landing_page("glassware")).await.unwrap_err();
    assert!(matches!(
        err,
        GenerationError::Configuration(ConfigurationError::MissingCredential { .. })
    ));
    assert!(!err.is_transient());
    assert!(backend.calls().is_empty());
}

struct NoTemplates;

impl TemplateSource for NoTemplates {
    fn template(
        &self,
        _tenant_id: Option<&str>,
        content_type: ContentType,
    ) -> Result<String, ConfigurationError> {
        Err(ConfigurationError::MissingTemplate(content_type.to_string()))
    }
}

#[tokio::test]
async fn missing_template_fails_before_any_call() {
    let backend = ScriptedBackend::new(|_, _| text(glassware_draft()));
    let pipeline = pipeline(backend.clone()).with_templates(Arc::new(NoTemplates));

    let err = pipeline.run(&landing_page("glassware")).await.unwrap_err();
    assert!(matches!(
        err,
        GenerationError::Configuration(ConfigurationError::MissingTemplate(_))
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_runs_keep_their_own_credentials() {
    let backend = ScriptedBackend::new(|_, _| {
        text(json!({"seoTitle": "Rentals for your event", "intro": "We deliver."}))
    });
    let pipeline = pipeline(backend.clone());

    let with_key = |topic: &str, key: &str| {
        let mut request = landing_page(topic);
        request.credential_override = Some(CredentialOverride {
            api_key: Some(key.to_string()),
            ..CredentialOverride::default()
        });
        request
    };
    let glassware = with_key("glassware", "sk-a");
    let linen = with_key("linen", "sk-b");

    let (a, b) = futures::join!(pipeline.run(&glassware), pipeline.run(&linen));
    assert_eq!(canonical(&a.unwrap()).seo.focus_keyword, "glassware rental");
    assert_eq!(canonical(&b.unwrap()).seo.focus_keyword, "linen rental");

    let calls = backend.calls();
    // Three enrichment calls, one draft and one refine per run.
    assert_eq!(calls.len(), 10);
    for recorded in calls {
        let expected = if recorded.user.contains("glassware") {
            "sk-a"
        } else {
            assert!(recorded.user.contains("linen"), "{:?}", recorded);
            "sk-b"
        };
        assert_eq!(recorded.api_key, expected, "{:?}", recorded.call);
    }
}

#[tokio::test]
async fn tenant_store_supplies_the_key() {
    struct Acme;

    impl CredentialSource for Acme {
        fn lookup(
            &self,
            tenant_id: &str,
            _provider: ProviderTag,
        ) -> Option<copysmith_core::StoredCredential> {
            (tenant_id == "acme").then(|| copysmith_core::StoredCredential {
                api_key: "sk-acme".to_string(),
                model: None,
            })
        }
    }

    let backend = ScriptedBackend::new(|_, _| text(glassware_draft()));
    let pipeline = pipeline(backend.clone()).with_tenant_credentials(Arc::new(Acme));
    let mut request = landing_page("glassware");
    request.tenant_id = Some("acme".to_string());

    pipeline.run(&request).await.unwrap();
    assert!(backend.calls().iter().all(|r| r.api_key == "sk-acme"));
}
