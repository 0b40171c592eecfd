use super::client::{
    create_http_client, AnthropicBackend, GeminiBackend, OpenAiCompatibleBackend, ANTHROPIC_BASE,
    GEMINI_BASE, GROQ_BASE, OPENAI_BASE, OPENROUTER_BASE,
};
use copysmith_adapters::Config;
use copysmith_core::{Backend, BackendCredentials, BackendError, BackendErrorKind, ProviderTag};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Provider tag to adapter map, plus the per-call wall-clock bound.
///
/// Shared read-only between concurrent runs.
#[derive(Clone)]
pub struct BackendRegistry {
    backends: BTreeMap<ProviderTag, Arc<dyn Backend>>,
    call_timeout: Duration,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("providers", &self.backends.keys().collect::<Vec<_>>())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl BackendRegistry {
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            backends: BTreeMap::new(),
            call_timeout,
        }
    }

    pub fn with_backend(mut self, provider: ProviderTag, backend: Arc<dyn Backend>) -> Self {
        self.backends.insert(provider, backend);
        self
    }

    /// One adapter answering for every provider tag.
    pub fn uniform(backend: Arc<dyn Backend>, call_timeout: Duration) -> Self {
        ProviderTag::ALL
            .into_iter()
            .fold(Self::new(call_timeout), |registry, provider| {
                registry.with_backend(provider, backend.clone())
            })
    }

    /// HTTP adapters for every supported provider, sharing one client.
    pub fn http(config: &Config) -> Result<Self, BackendError> {
        let call_timeout = config.pipeline.call_timeout();
        let client = create_http_client(call_timeout)?;
        let base = |provider: ProviderTag, default: &'static str| -> String {
            config
                .endpoint_for(provider)
                .map(str::to_string)
                .unwrap_or_else(|| default.to_string())
        };

        let mut registry = Self::new(call_timeout);
        for (provider, default) in [
            (ProviderTag::OpenAi, OPENAI_BASE),
            (ProviderTag::OpenRouter, OPENROUTER_BASE),
            (ProviderTag::Groq, GROQ_BASE),
        ] {
            let backend =
                OpenAiCompatibleBackend::new(client.clone(), provider, &base(provider, default))?;
            registry = registry.with_backend(provider, Arc::new(backend));
        }
        let anthropic = AnthropicBackend::new(
            client.clone(),
            &base(ProviderTag::Anthropic, ANTHROPIC_BASE),
        )?;
        let gemini = GeminiBackend::new(client, &base(ProviderTag::Gemini, GEMINI_BASE))?;
        Ok(registry
            .with_backend(ProviderTag::Anthropic, Arc::new(anthropic))
            .with_backend(ProviderTag::Gemini, Arc::new(gemini)))
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn supports(&self, provider: ProviderTag) -> bool {
        self.backends.contains_key(&provider)
    }

    /// Invoke the adapter for `credentials.provider`, bounded by the call timeout.
    pub async fn call(
        &self,
        system: &str,
        user: &str,
        credentials: &BackendCredentials,
    ) -> Result<String, BackendError> {
        let backend = self.backends.get(&credentials.provider).ok_or_else(|| {
            BackendError::fatal(
                BackendErrorKind::UnsupportedProvider,
                format!("No backend registered for provider '{}'", credentials.provider),
            )
        })?;
        match tokio::time::timeout(self.call_timeout, backend.invoke(system, user, credentials)).await
        {
            Ok(result) => result,
            Err(_) => Err(BackendError::timeout(self.call_timeout.as_millis() as u64)),
        }
    }
}
