//! Runtime adapters for copysmith (config, key storage, tenant credentials, templates).

pub mod config;
pub mod credentials;
pub mod keyring;
pub mod templates;

pub use config::{Config, PipelineSettings, RetryBudget, SitePage};
pub use credentials::FileCredentialStore;
pub use templates::FileTemplateStore;
