//! Core domain model and contracts for copysmith.

pub mod content;
pub mod error;
pub mod normalize;
pub mod protocol;
pub mod result;
pub mod rules;
pub mod util;

pub use content::{CanonicalContent, DraftShape, EnrichmentResult, InternalLink};
pub use error::{
    BackendError, BackendErrorKind, ConfigurationError, GenerationError, ParseError, StageError,
};
pub use protocol::*;
pub use result::{GenerationResult, Payload, PipelineState, ValidationWarning, WarningKind};
