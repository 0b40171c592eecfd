//! Generation engine: backend adapters, retry, stages and the run orchestrator.

pub mod llm;
pub mod pipeline;

pub use llm::{BackendRegistry, RetryPolicy};
pub use pipeline::{resolve_credentials, DefaultCredentials, Pipeline};
