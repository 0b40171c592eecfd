//! Configuration management for copysmith
//!
//! Stores settings in ~/.config/copysmith/config.toml (or `$COPYSMITH_CONFIG`).

use crate::keyring;
use copysmith_core::ProviderTag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_ENV: &str = "COPYSMITH_CONFIG";

/// Bounded attempts with exponential backoff for one kind of backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBudget {
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryBudget {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Timing and threshold knobs of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Wall-clock bound of a single backend call.
    pub call_timeout_ms: u64,
    /// Hard ceiling of the whole refine stage, retries included.
    pub refine_timeout_ms: u64,
    pub draft_retry: RetryBudget,
    pub refine_retry: RetryBudget,
    pub enrichment_retry: RetryBudget,
    pub min_keyword_occurrences: usize,
    pub min_words: usize,
    pub max_words: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            call_timeout_ms: 120_000,
            refine_timeout_ms: 60_000,
            draft_retry: RetryBudget {
                attempts: 3,
                base_delay_ms: 2_000,
            },
            refine_retry: RetryBudget {
                attempts: 2,
                base_delay_ms: 2_000,
            },
            enrichment_retry: RetryBudget {
                attempts: 1,
                base_delay_ms: 500,
            },
            min_keyword_occurrences: copysmith_core::rules::DEFAULT_MIN_OCCURRENCES,
            min_words: copysmith_core::rules::DEFAULT_MIN_WORDS,
            max_words: copysmith_core::rules::DEFAULT_MAX_WORDS,
        }
    }
}

impl PipelineSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn refine_timeout(&self) -> Duration {
        Duration::from_millis(self.refine_timeout_ms)
    }

    fn sanitize(&mut self) {
        for budget in [
            &mut self.draft_retry,
            &mut self.refine_retry,
            &mut self.enrichment_retry,
        ] {
            budget.attempts = budget.attempts.max(1);
        }
        if self.max_words < self.min_words {
            self.max_words = self.min_words;
        }
    }
}

/// A page of the site that link selection may point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitePage {
    pub path: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_provider: ProviderTag,
    /// Falls back to the provider's own default model when unset.
    pub default_model: Option<String>,
    /// Word appended to the topic to form the focus keyword.
    pub keyword_suffix: String,
    /// Sibling topics the corrector treats as wrong when the keyword drifted.
    pub known_topics: Vec<String>,
    pub internal_pages: Vec<SitePage>,
    pub templates_dir: Option<PathBuf>,
    pub tenant_credentials_path: Option<PathBuf>,
    /// Base URL overrides keyed by provider tag.
    pub endpoints: BTreeMap<String, String>,
    pub pipeline: PipelineSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: ProviderTag::OpenAi,
            default_model: None,
            keyword_suffix: "rental".to_string(),
            known_topics: [
                "glassware",
                "tableware",
                "cutlery",
                "linen",
                "furniture",
                "party tent",
                "catering equipment",
                "decoration",
            ]
            .iter()
            .map(|t| t.to_string())
            .collect(),
            internal_pages: Vec::new(),
            templates_dir: None,
            tenant_credentials_path: None,
            endpoints: BTreeMap::new(),
            pipeline: PipelineSettings::default(),
        }
    }
}

impl Config {
    fn sanitize(&mut self) {
        self.keyword_suffix = self.keyword_suffix.trim().to_lowercase();
        if self.keyword_suffix.is_empty() {
            self.keyword_suffix = "rental".to_string();
        }
        self.known_topics.retain(|t| !t.trim().is_empty());
        if let Some(model) = &self.default_model {
            if model.trim().is_empty() {
                self.default_model = None;
            }
        }
        self.pipeline.sanitize();
    }

    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("copysmith"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path. A file that fails to parse is moved aside
    /// and defaults are used.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str::<Config>(&content) {
            Ok(mut config) => {
                config.sanitize();
                config
            }
            Err(err) => {
                preserve_corrupt_config(path, &content);
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "config file was corrupted; a backup was saved and defaults were loaded"
                );
                Self::default()
            }
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<(), String> {
        let path =
            Self::config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        let mut sanitized = self.clone();
        sanitized.sanitize();

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
                    tracing::debug!(error = %e, "failed to set config directory permissions");
                }
            }
        }

        let content = toml::to_string_pretty(&sanitized)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        #[cfg(unix)]
        {
            write_config_atomic(path, &content)
                .map_err(|e| format!("Failed to write config: {}", e))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;
        }

        Ok(())
    }

    /// Model used when neither the request nor the tenant store names one.
    pub fn model_for(&self, provider: ProviderTag) -> String {
        match &self.default_model {
            Some(model) if provider == self.default_provider => model.clone(),
            _ => provider.default_model().to_string(),
        }
    }

    pub fn endpoint_for(&self, provider: ProviderTag) -> Option<&str> {
        self.endpoints
            .get(provider.tag())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Process-wide API key for a provider (keyring first, environment fallback).
    pub fn api_key_for(&self, provider: ProviderTag) -> Option<String> {
        match keyring::get_api_key(provider) {
            Ok(Some(key)) => return Some(key),
            Ok(None) => {}
            Err(err) => {
                keyring::warn_keychain_error_once("API key", &err);
            }
        }
        std::env::var(provider.env_key())
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// Every provider key reachable at startup, resolved once.
    pub fn default_api_keys(&self) -> BTreeMap<ProviderTag, String> {
        ProviderTag::ALL
            .into_iter()
            .filter_map(|provider| self.api_key_for(provider).map(|key| (provider, key)))
            .collect()
    }

    /// Store a default key and verify it reads back.
    pub fn set_api_key(&self, provider: ProviderTag, key: &str) -> Result<(), String> {
        keyring::set_api_key(provider, key).map_err(|e| {
            format!(
                "Failed to store API key in {}: {}. \
                 You can set the {} environment variable instead.",
                keyring::credentials_store_label(),
                e,
                provider.env_key()
            )
        })?;

        match keyring::get_api_key(provider) {
            Ok(Some(stored_key)) if stored_key == key => Ok(()),
            Ok(_) => Err(format!(
                "API key verification failed: key was not persisted to {}. \
                 You can set the {} environment variable instead.",
                keyring::credentials_store_label(),
                provider.env_key()
            )),
            Err(read_err) => Err(format!(
                "API key verification failed: couldn't read back from {} ({}).",
                keyring::credentials_store_label(),
                read_err
            )),
        }
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/copysmith/config.toml".to_string())
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("toml.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

#[cfg(unix)]
fn write_config_atomic(path: &Path, content: &str) -> Result<(), String> {
    use std::fs::OpenOptions;
    use std::os::unix::fs::PermissionsExt;

    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)
        .map_err(|e| e.to_string())?;

    if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
        tracing::debug!(error = %e, "failed to set temp config file permissions");
    }

    file.write_all(content.as_bytes())
        .map_err(|e| e.to_string())?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.to_string());
    }
    Ok(())
}
