//! Keyring storage for default provider keys
//!
//! Every provider key lives in a single keychain entry as a JSON map, so a
//! fresh process triggers at most one keychain prompt. When the keychain is
//! unavailable or disabled, a local credentials file is used instead.

use copysmith_core::ProviderTag;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

const KEYRING_SERVICE: &str = "copysmith-credentials";
const KEYRING_USERNAME: &str = "default";

/// All default keys, keyed by provider tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredKeys {
    #[serde(default)]
    api_keys: BTreeMap<String, String>,
}

type KeyringResult<T> = Result<T, String>;

static KEYS_CACHE: OnceLock<Mutex<Option<StoredKeys>>> = OnceLock::new();
static KEYRING_ERROR_WARNED: AtomicBool = AtomicBool::new(false);

fn keys_cache() -> &'static Mutex<Option<StoredKeys>> {
    KEYS_CACHE.get_or_init(|| Mutex::new(None))
}

fn keyring_disabled() -> bool {
    if cfg!(test) {
        return true;
    }

    let disabled_by_env = matches!(
        std::env::var("COPYSMITH_DISABLE_KEYRING")
            .unwrap_or_default()
            .to_lowercase()
            .as_str(),
        "1" | "true" | "yes"
    );
    if disabled_by_env {
        return true;
    }

    // A populated local file wins over the keychain to avoid prompts.
    matches!(read_fallback_keys(), Ok(keys) if !keys.api_keys.is_empty())
}

/// Human-friendly credential backend label used in CLI messages.
pub fn credentials_store_label() -> &'static str {
    if keyring_disabled() {
        "local credentials file"
    } else {
        "system keychain"
    }
}

fn fallback_keys_path() -> KeyringResult<PathBuf> {
    if let Ok(path) = std::env::var("COPYSMITH_CREDENTIALS_FILE") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    if cfg!(test) {
        return Ok(std::env::temp_dir().join("copysmith-test-credentials.json"));
    }

    dirs::config_dir()
        .map(|p| p.join("copysmith").join("credentials.json"))
        .ok_or_else(|| "Could not determine credentials file path".to_string())
}

fn read_fallback_keys() -> KeyringResult<StoredKeys> {
    let path = fallback_keys_path()?;
    if !path.exists() {
        return Ok(StoredKeys::default());
    }
    let json = fs::read_to_string(&path).map_err(|e| {
        format!(
            "Failed to read credentials file '{}': {}",
            path.display(),
            e
        )
    })?;
    serde_json::from_str(&json).map_err(|e| {
        format!(
            "Failed to parse credentials file '{}': {}",
            path.display(),
            e
        )
    })
}

fn write_fallback_keys(keys: &StoredKeys) -> KeyringResult<()> {
    let path = fallback_keys_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            format!(
                "Failed to create credentials directory '{}': {}",
                parent.display(),
                e
            )
        })?;
    }

    let content = serde_json::to_string(keys)
        .map_err(|e| format!("Failed to serialize credentials: {}", e))?;

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let tmp_path = path.with_extension("json.tmp");
        let mut tmp_file = fs::File::create(&tmp_path).map_err(|e| {
            format!(
                "Failed to create temp credentials file '{}': {}",
                tmp_path.display(),
                e
            )
        })?;
        let _ = tmp_file.set_permissions(fs::Permissions::from_mode(0o600));
        tmp_file
            .write_all(content.as_bytes())
            .map_err(|e| format!("Failed to write credentials file: {}", e))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            format!(
                "Failed to finalize credentials file '{}': {}",
                path.display(),
                e
            )
        })?;
    }

    #[cfg(not(unix))]
    {
        fs::write(&path, content).map_err(|e| {
            format!(
                "Failed to write credentials file '{}': {}",
                path.display(),
                e
            )
        })?;
    }
    Ok(())
}

/// Warn about keychain errors only once per process.
pub fn warn_keychain_error_once(context: &str, err: &str) {
    if KEYRING_ERROR_WARNED.swap(true, Ordering::Relaxed) {
        return;
    }
    tracing::warn!(
        context,
        error = err,
        "couldn't access system keychain; set COPYSMITH_DISABLE_KEYRING=1 or use provider env vars"
    );
}

fn read_keys_uncached() -> KeyringResult<StoredKeys> {
    if keyring_disabled() {
        return read_fallback_keys();
    }
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USERNAME).map_err(|e| e.to_string())?;
    match entry.get_password() {
        Ok(json) => serde_json::from_str(&json).map_err(|e| format!("Failed to parse credentials: {}", e)),
        Err(keyring::Error::NoEntry) => Ok(StoredKeys::default()),
        Err(err) => Err(err.to_string()),
    }
}

fn write_keys(keys: &StoredKeys) -> KeyringResult<()> {
    if keyring_disabled() {
        return write_fallback_keys(keys);
    }
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_USERNAME).map_err(|e| e.to_string())?;
    let json = serde_json::to_string(keys)
        .map_err(|e| format!("Failed to serialize credentials: {}", e))?;
    entry.set_password(&json).map_err(|e| e.to_string())
}

fn read_keys_cached() -> KeyringResult<StoredKeys> {
    let mut guard = match keys_cache().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(keys) = guard.as_ref() {
        return Ok(keys.clone());
    }
    let keys = read_keys_uncached()?;
    *guard = Some(keys.clone());
    Ok(keys)
}

fn update_cache(keys: StoredKeys) {
    let mut guard = match keys_cache().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = Some(keys);
}

#[cfg(test)]
fn reset_for_tests() {
    let mut guard = match keys_cache().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = None;
    KEYRING_ERROR_WARNED.store(false, Ordering::Relaxed);
}

/// Get the default key for a provider.
pub fn get_api_key(provider: ProviderTag) -> KeyringResult<Option<String>> {
    let keys = read_keys_cached()?;
    Ok(keys.api_keys.get(provider.tag()).cloned())
}

/// Set the default key for a provider.
pub fn set_api_key(provider: ProviderTag, key: &str) -> KeyringResult<()> {
    let mut keys = read_keys_cached().unwrap_or_default();
    keys.api_keys
        .insert(provider.tag().to_string(), key.trim().to_string());
    write_keys(&keys)?;
    update_cache(keys);
    Ok(())
}
