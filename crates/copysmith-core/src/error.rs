//! Error taxonomy shared by every crate in the workspace.
//!
//! Only two classes ever abort a run: [`ConfigurationError`] and a failed
//! Draft Stage ([`StageError`]). Everything else is absorbed where it
//! happens and surfaces as a [`crate::ValidationWarning`] or a log line.

use thiserror::Error;

/// Failure class of a single backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// The call exceeded its wall-clock bound.
    Timeout,
    /// Connection could not be established or was dropped.
    Network,
    /// Provider answered with a non-success status.
    Status,
    /// Provider refused to answer (content moderation).
    Refused,
    /// Provider answered without any text.
    Empty,
    /// Provider response envelope could not be decoded.
    Decode,
    /// No adapter registered for the requested provider tag.
    UnsupportedProvider,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub transient: bool,
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn timeout(after_ms: u64) -> Self {
        Self {
            kind: BackendErrorKind::Timeout,
            transient: true,
            status: None,
            message: format!("Timed out after {}ms.", after_ms),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Network,
            transient: true,
            status: None,
            message: message.into(),
        }
    }

    /// Classify an HTTP status: 408, 429 and 5xx are worth another attempt.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: BackendErrorKind::Status,
            transient: status == 408 || status == 429 || (500..=599).contains(&status),
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn fatal(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            transient: false,
            status: None,
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == BackendErrorKind::Timeout
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no structured object found in response")]
    NoObject,
    #[error("structured object is not valid JSON: {0}")]
    Invalid(String),
    #[error("response parsed but is not an object")]
    NotAnObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no API key available for provider '{provider}'")]
    MissingCredential { provider: String },
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("no template available for content type '{0}'")]
    MissingTemplate(String),
    #[error("refine requests need an existing content object")]
    MissingExistingContent,
    #[error("{0}")]
    Invalid(String),
}

/// Error of one pipeline stage that talks to a backend.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("backend: {0}")]
    Backend(#[from] BackendError),
    #[error("parse: {0}")]
    Parse(#[from] ParseError),
}

impl StageError {
    /// Only transient backend failures are eligible for retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, StageError::Backend(err) if err.transient)
    }
}

/// Terminal failure of a whole run.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("draft generation failed: {0}")]
    Draft(StageError),
}

impl GenerationError {
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationError::Configuration(_) => false,
            GenerationError::Draft(err) => err.is_transient(),
        }
    }

    /// Single line shown to the caller, with a retry hint when retrying can help.
    pub fn user_message(&self) -> String {
        if self.is_transient() {
            format!(
                "{}. The provider is temporarily unavailable; try again in a minute.",
                self
            )
        } else {
            self.to_string()
        }
    }
}
