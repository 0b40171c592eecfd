//! Per-run credential resolution.
//!
//! The resolved [`BackendCredentials`] value is passed explicitly to every
//! backend call of the run; nothing here is stored process-wide.

use copysmith_adapters::Config;
use copysmith_core::{
    BackendCredentials, ConfigurationError, CredentialSource, GenerationRequest, ProviderTag,
};
use std::collections::BTreeMap;
use std::fmt;

/// Process-wide fallback credentials, resolved once at startup.
#[derive(Clone, Default)]
pub struct DefaultCredentials {
    pub provider: Option<ProviderTag>,
    pub model: Option<String>,
    keys: BTreeMap<ProviderTag, String>,
}

impl fmt::Debug for DefaultCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultCredentials")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("keys_for", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DefaultCredentials {
    pub fn new(provider: ProviderTag) -> Self {
        Self {
            provider: Some(provider),
            model: None,
            keys: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &Config, keys: BTreeMap<ProviderTag, String>) -> Self {
        Self {
            provider: Some(config.default_provider),
            model: config.default_model.clone(),
            keys,
        }
    }

    pub fn with_key(mut self, provider: ProviderTag, key: impl Into<String>) -> Self {
        self.keys.insert(provider, key.into());
        self
    }

    pub fn key_for(&self, provider: ProviderTag) -> Option<&str> {
        self.keys
            .get(&provider)
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
    }

    /// Configured model for the default provider, otherwise the provider's own default.
    pub fn model_for(&self, provider: ProviderTag) -> String {
        match &self.model {
            Some(model) if Some(provider) == self.provider => model.clone(),
            _ => provider.default_model().to_string(),
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Resolve the credential for one run: explicit override, then tenant
/// store, then process default.
pub fn resolve_credentials(
    request: &GenerationRequest,
    defaults: &DefaultCredentials,
    tenant_store: Option<&dyn CredentialSource>,
) -> Result<BackendCredentials, ConfigurationError> {
    let overrides = request.credential_override.as_ref();
    let provider = match overrides.and_then(|o| non_blank(o.provider.as_ref())) {
        Some(tag) => tag.parse::<ProviderTag>()?,
        None => defaults.provider.unwrap_or(ProviderTag::OpenAi),
    };
    let override_model = overrides.and_then(|o| non_blank(o.model.as_ref()));

    if let Some(api_key) = overrides.and_then(|o| non_blank(o.api_key.as_ref())) {
        return Ok(BackendCredentials {
            provider,
            model: override_model
                .map(str::to_string)
                .unwrap_or_else(|| defaults.model_for(provider)),
            api_key: api_key.to_string(),
        });
    }

    let tenant = request
        .tenant_id
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let (Some(tenant), Some(store)) = (tenant, tenant_store) {
        if let Some(stored) = store.lookup(tenant, provider) {
            let model = override_model
                .or_else(|| non_blank(stored.model.as_ref()))
                .map(str::to_string)
                .unwrap_or_else(|| defaults.model_for(provider));
            return Ok(BackendCredentials {
                provider,
                model,
                api_key: stored.api_key.trim().to_string(),
            });
        }
    }

    if let Some(api_key) = defaults.key_for(provider) {
        return Ok(BackendCredentials {
            provider,
            model: override_model
                .map(str::to_string)
                .unwrap_or_else(|| defaults.model_for(provider)),
            api_key: api_key.to_string(),
        });
    }

    Err(ConfigurationError::MissingCredential {
        provider: provider.tag().to_string(),
    })
}
