use crate::error::{BackendError, ConfigurationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

/// Content families a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    LandingPage,
    BlogPost,
    ProductDescription,
    SocialPost,
    Newsletter,
    FaqPage,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        ContentType::LandingPage,
        ContentType::BlogPost,
        ContentType::ProductDescription,
        ContentType::SocialPost,
        ContentType::Newsletter,
        ContentType::FaqPage,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ContentType::LandingPage => "landing-page",
            ContentType::BlogPost => "blog-post",
            ContentType::ProductDescription => "product-description",
            ContentType::SocialPost => "social-post",
            ContentType::Newsletter => "newsletter",
            ContentType::FaqPage => "faq-page",
        }
    }

    /// Whether drafts of this family are normalized into [`crate::CanonicalContent`].
    pub fn is_canonical(&self) -> bool {
        matches!(self, ContentType::LandingPage)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ContentType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ContentType::ALL
            .into_iter()
            .find(|ct| ct.tag() == wanted)
            .ok_or_else(|| ConfigurationError::Invalid(format!("unknown content type '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Generate,
    Refine,
}

/// Provider families a backend adapter exists for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    OpenAi,
    OpenRouter,
    Groq,
    Anthropic,
    Gemini,
}

impl ProviderTag {
    pub const ALL: [ProviderTag; 5] = [
        ProviderTag::OpenAi,
        ProviderTag::OpenRouter,
        ProviderTag::Groq,
        ProviderTag::Anthropic,
        ProviderTag::Gemini,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ProviderTag::OpenAi => "openai",
            ProviderTag::OpenRouter => "openrouter",
            ProviderTag::Groq => "groq",
            ProviderTag::Anthropic => "anthropic",
            ProviderTag::Gemini => "gemini",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderTag::OpenAi => "gpt-4o-mini",
            ProviderTag::OpenRouter => "openai/gpt-4o-mini",
            ProviderTag::Groq => "llama-3.3-70b-versatile",
            ProviderTag::Anthropic => "claude-3-5-haiku-latest",
            ProviderTag::Gemini => "gemini-1.5-flash",
        }
    }

    /// Environment variable consulted for a process-wide key.
    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderTag::OpenAi => "OPENAI_API_KEY",
            ProviderTag::OpenRouter => "OPENROUTER_API_KEY",
            ProviderTag::Groq => "GROQ_API_KEY",
            ProviderTag::Anthropic => "ANTHROPIC_API_KEY",
            ProviderTag::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ProviderTag {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ProviderTag::ALL
            .into_iter()
            .find(|p| p.tag() == wanted)
            .ok_or_else(|| ConfigurationError::UnknownProvider(s.to_string()))
    }
}

/// Per-request backend override. Any part may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialOverride {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Credential used by every backend call of one run.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendCredentials {
    pub provider: ProviderTag,
    pub model: String,
    pub api_key: String,
}

impl fmt::Debug for BackendCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCredentials")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Tenant-scoped credential as held by a credential store.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Inbound request, immutable for the lifetime of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(default)]
    pub mode: Mode,
    pub content_type: ContentType,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub credential_override: Option<CredentialOverride>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Content to rewrite when `mode` is `refine`.
    #[serde(default)]
    pub existing: Option<Value>,
}

impl GenerationRequest {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            mode: Mode::Generate,
            content_type,
            fields: BTreeMap::new(),
            credential_override: None,
            tenant_id: None,
            existing: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn topic(&self) -> &str {
        self.field("topic").unwrap_or("")
    }

    /// First region hint, used as the title's region token.
    pub fn primary_region(&self) -> Option<&str> {
        self.field("region1").or_else(|| self.field("region"))
    }
}

pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>>;

/// Uniform call contract to a generative-text provider.
pub trait Backend: Send + Sync {
    fn invoke<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
        credentials: &'a BackendCredentials,
    ) -> BackendFuture<'a>;
}

/// Read-only lookup of tenant credentials.
pub trait CredentialSource: Send + Sync {
    fn lookup(&self, tenant_id: &str, provider: ProviderTag) -> Option<StoredCredential>;
}

/// Read-only lookup of content-type templates.
pub trait TemplateSource: Send + Sync {
    fn template(
        &self,
        tenant_id: Option<&str>,
        content_type: ContentType,
    ) -> Result<String, ConfigurationError>;
}
