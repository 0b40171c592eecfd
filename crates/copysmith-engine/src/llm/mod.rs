pub mod client;
pub mod parse;
pub mod prompts;
pub mod registry;
pub mod retry;
pub mod template;

pub use client::{AnthropicBackend, GeminiBackend, OpenAiCompatibleBackend};
pub use parse::{extract, extract_object};
pub use registry::BackendRegistry;
pub use retry::{run_with_retry, RetryPolicy};
pub use template::render;
