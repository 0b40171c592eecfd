//! Tenant-scoped credential store backed by a JSON document.
//!
//! ```json
//! { "acme": { "openai": { "apiKey": "sk-...", "model": "gpt-4o" } } }
//! ```

use copysmith_core::{CredentialSource, ProviderTag, StoredCredential};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

type TenantTable = BTreeMap<String, BTreeMap<String, StoredCredential>>;

/// Read-only snapshot of the tenant credential file.
#[derive(Debug, Clone, Default)]
pub struct FileCredentialStore {
    tenants: TenantTable,
}

impl FileCredentialStore {
    pub fn load(path: &Path) -> Result<Self, String> {
        let json = fs::read_to_string(path).map_err(|e| {
            format!(
                "Failed to read tenant credentials '{}': {}",
                path.display(),
                e
            )
        })?;
        Self::from_json(&json).map_err(|e| {
            format!(
                "Failed to parse tenant credentials '{}': {}",
                path.display(),
                e
            )
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tenants: TenantTable = serde_json::from_str(json)?;
        Ok(Self { tenants })
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }
}

impl CredentialSource for FileCredentialStore {
    fn lookup(&self, tenant_id: &str, provider: ProviderTag) -> Option<StoredCredential> {
        self.tenants
            .get(tenant_id.trim())?
            .get(provider.tag())
            .filter(|cred| !cred.api_key.trim().is_empty())
            .cloned()
    }
}
