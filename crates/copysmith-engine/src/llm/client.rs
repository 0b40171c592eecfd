//! HTTP backend adapters, one per provider wire family.
//!
//! Adapters make exactly one request per `invoke`. Retry and the per-call
//! wall-clock bound live in [`super::retry`] and [`super::registry`].

use copysmith_core::util::truncate_str;
use copysmith_core::{
    Backend, BackendCredentials, BackendError, BackendErrorKind, BackendFuture, ProviderTag,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub(crate) const OPENAI_BASE: &str = "https://api.openai.com/v1/";
pub(crate) const OPENROUTER_BASE: &str = "https://openrouter.ai/api/v1/";
pub(crate) const GROQ_BASE: &str = "https://api.groq.com/openai/v1/";
pub(crate) const ANTHROPIC_BASE: &str = "https://api.anthropic.com/v1/";
pub(crate) const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Maximum length for error content in error messages
const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Sanitize API response content for error messages to prevent credential leakage.
pub(crate) fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "api_key",
        "apikey",
        "secret",
        "password",
        "credential",
        "bearer",
        "sk-",
    ];

    let truncated = truncate_str(content, MAX_ERROR_CONTENT_LEN);
    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        return "(response details redacted - may contain sensitive data)".to_string();
    }
    truncated.to_string()
}

pub(crate) fn create_http_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Resolve `path` against a base URL, tolerating a missing trailing slash.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url, BackendError> {
    let mut base = base.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base)
        .and_then(|url| url.join(path))
        .map_err(|e| {
            BackendError::fatal(
                BackendErrorKind::UnsupportedProvider,
                format!("Invalid endpoint '{}': {}", base, e),
            )
        })
}

fn map_send_error(provider: ProviderTag, err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError {
            kind: BackendErrorKind::Timeout,
            transient: true,
            status: None,
            message: format!("{} request timed out.", provider),
        }
    } else if err.is_connect() {
        BackendError::network(format!(
            "Could not connect to {}. Check your network and try again.",
            provider
        ))
    } else if err.is_request() || err.is_body() {
        BackendError::network(format!("{} request failed: {}", provider, err))
    } else {
        BackendError::fatal(
            BackendErrorKind::Network,
            format!("{} request failed: {}", provider, err),
        )
    }
}

fn status_error(provider: ProviderTag, status: u16, body: &str) -> BackendError {
    let message = match status {
        401 | 403 => format!("{} rejected the API key ({}).", provider, status),
        408 => format!("{} timed out on its side (408).", provider),
        429 => format!("Rate limited by {}.", provider),
        500..=599 => format!(
            "{} server error ({}). The service may be temporarily unavailable.",
            provider, status
        ),
        _ => format!(
            "{} API error {}: {}",
            provider,
            status,
            sanitize_api_response(body)
        ),
    };
    BackendError::status(status, message)
}

/// Send a prepared request and return the raw body of a 2xx response.
async fn send(provider: ProviderTag, request: reqwest::RequestBuilder) -> Result<String, BackendError> {
    let response = request
        .send()
        .await
        .map_err(|err| map_send_error(provider, err))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|err| map_send_error(provider, err))?;
    if !status.is_success() {
        return Err(status_error(provider, status.as_u16(), &text));
    }
    Ok(text)
}

fn decode<T: for<'de> Deserialize<'de>>(provider: ProviderTag, body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| {
        BackendError::fatal(
            BackendErrorKind::Decode,
            format!(
                "Unexpected {} response ({}): {}",
                provider,
                e,
                sanitize_api_response(body)
            ),
        )
    })
}

fn non_empty(provider: ProviderTag, text: Option<String>) -> Result<String, BackendError> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(BackendError::fatal(
            BackendErrorKind::Empty,
            format!("{} returned no content.", provider),
        )),
    }
}

fn refused(provider: ProviderTag, reason: &str) -> BackendError {
    BackendError::fatal(
        BackendErrorKind::Refused,
        format!(
            "{} refused the request: {}",
            provider,
            truncate_str(reason, MAX_ERROR_CONTENT_LEN)
        ),
    )
}

// ═══════════════════════════════════════════════════════════════════════════
//  OPENAI-COMPATIBLE CHAT COMPLETIONS (openai, openrouter, groq)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    /// Content can be null when the model refuses.
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Error object some gateways return with a 200 status.
#[derive(Deserialize)]
struct EmbeddedError {
    error: EmbeddedErrorDetail,
}

#[derive(Deserialize)]
struct EmbeddedErrorDetail {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

fn embedded_error(provider: ProviderTag, body: &str) -> Option<BackendError> {
    let parsed: EmbeddedError = serde_json::from_str(body).ok()?;
    let message = format!(
        "{} error: {}",
        provider,
        truncate_str(&parsed.error.message, MAX_ERROR_CONTENT_LEN)
    );
    Some(match parsed.error.code {
        Some(code) => BackendError::status(code, message),
        // No code: an upstream hiccup, worth another attempt.
        None => BackendError {
            kind: BackendErrorKind::Status,
            transient: true,
            status: None,
            message,
        },
    })
}

pub(crate) fn parse_chat_response(provider: ProviderTag, body: &str) -> Result<String, BackendError> {
    if let Some(err) = embedded_error(provider, body) {
        return Err(err);
    }
    let parsed: ChatResponse = decode(provider, body)?;
    let Some(choice) = parsed.choices.into_iter().next() else {
        return Err(BackendError::fatal(
            BackendErrorKind::Empty,
            format!("{} returned no choices.", provider),
        ));
    };
    if let Some(reason) = choice.message.refusal.filter(|r| !r.trim().is_empty()) {
        return Err(refused(provider, &reason));
    }
    non_empty(provider, choice.message.content)
}

pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    provider: ProviderTag,
    url: Url,
}

impl OpenAiCompatibleBackend {
    pub fn new(client: reqwest::Client, provider: ProviderTag, base: &str) -> Result<Self, BackendError> {
        Ok(Self {
            client,
            provider,
            url: endpoint(base, "chat/completions")?,
        })
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        credentials: &BackendCredentials,
    ) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &credentials.model,
            messages: [
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: MAX_OUTPUT_TOKENS,
            stream: false,
        };
        let mut request = self
            .client
            .post(self.url.clone())
            .bearer_auth(&credentials.api_key)
            .json(&body);
        if self.provider == ProviderTag::OpenRouter {
            request = request.header("X-Title", "copysmith");
        }
        let text = send(self.provider, request).await?;
        parse_chat_response(self.provider, &text)
    }
}

impl Backend for OpenAiCompatibleBackend {
    fn invoke<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        credentials: &'a BackendCredentials,
    ) -> BackendFuture<'a> {
        Box::pin(self.complete(system, user, credentials))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ANTHROPIC MESSAGES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

pub(crate) fn parse_messages_response(body: &str) -> Result<String, BackendError> {
    let provider = ProviderTag::Anthropic;
    let parsed: MessagesResponse = decode(provider, body)?;
    if parsed.stop_reason.as_deref() == Some("refusal") {
        return Err(refused(provider, "stop_reason=refusal"));
    }
    let text: String = parsed
        .content
        .into_iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");
    non_empty(provider, Some(text))
}

pub struct AnthropicBackend {
    client: reqwest::Client,
    url: Url,
}

impl AnthropicBackend {
    pub fn new(client: reqwest::Client, base: &str) -> Result<Self, BackendError> {
        Ok(Self {
            client,
            url: endpoint(base, "messages")?,
        })
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        credentials: &BackendCredentials,
    ) -> Result<String, BackendError> {
        let body = MessagesRequest {
            model: &credentials.model,
            max_tokens: MAX_OUTPUT_TOKENS,
            system,
            messages: [Message {
                role: "user",
                content: user,
            }],
        };
        let request = self
            .client
            .post(self.url.clone())
            .header("x-api-key", &credentials.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let text = send(ProviderTag::Anthropic, request).await?;
        parse_messages_response(&text)
    }
}

impl Backend for AnthropicBackend {
    fn invoke<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        credentials: &'a BackendCredentials,
    ) -> BackendFuture<'a> {
        Box::pin(self.complete(system, user, credentials))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  GEMINI GENERATE CONTENT
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: [GeminiContent<'a>; 1],
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

pub(crate) fn parse_generate_response(body: &str) -> Result<String, BackendError> {
    let provider = ProviderTag::Gemini;
    let parsed: GenerateResponse = decode(provider, body)?;
    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(refused(provider, &reason));
    }
    let Some(candidate) = parsed.candidates.into_iter().next() else {
        return Err(BackendError::fatal(
            BackendErrorKind::Empty,
            format!("{} returned no candidates.", provider),
        ));
    };
    if matches!(
        candidate.finish_reason.as_deref(),
        Some("SAFETY") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST")
    ) {
        let reason = candidate.finish_reason.unwrap_or_default();
        return Err(refused(provider, &reason));
    }
    let text = candidate.content.map(|content| {
        content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("")
    });
    non_empty(provider, text)
}

pub struct GeminiBackend {
    client: reqwest::Client,
    base: Url,
}

impl GeminiBackend {
    pub fn new(client: reqwest::Client, base: &str) -> Result<Self, BackendError> {
        Ok(Self {
            client,
            base: endpoint(base, "models/")?,
        })
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        credentials: &BackendCredentials,
    ) -> Result<String, BackendError> {
        let url = self
            .base
            // "./" keeps a model id like "gemini-1.5-flash:..." from parsing as a scheme.
            .join(&format!("./{}:generateContent", credentials.model.trim()))
            .map_err(|e| {
                BackendError::fatal(
                    BackendErrorKind::UnsupportedProvider,
                    format!("Invalid Gemini model '{}': {}", credentials.model, e),
                )
            })?;
        let body = GenerateRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: [GeminiPart { text: system }],
            },
            contents: [GeminiContent {
                role: Some("user"),
                parts: [GeminiPart { text: user }],
            }],
        };
        let request = self
            .client
            .post(url)
            .header("x-goog-api-key", &credentials.api_key)
            .json(&body);
        let text = send(ProviderTag::Gemini, request).await?;
        parse_generate_response(&text)
    }
}

impl Backend for GeminiBackend {
    fn invoke<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        credentials: &'a BackendCredentials,
    ) -> BackendFuture<'a> {
        Box::pin(self.complete(system, user, credentials))
    }
}
