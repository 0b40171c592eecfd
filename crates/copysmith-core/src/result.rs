use crate::content::CanonicalContent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    Length,
    DegradedRefine,
}

/// Non-fatal finding attached to a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
    pub kind: WarningKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}

impl ValidationWarning {
    pub fn length(message: impl Into<String>, word_count: usize, min: usize, max: usize) -> Self {
        Self {
            kind: WarningKind::Length,
            message: message.into(),
            word_count: Some(word_count),
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn degraded_refine(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::DegradedRefine,
            message: message.into(),
            word_count: None,
            min: None,
            max: None,
        }
    }
}

/// States of one pipeline run, in the order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineState {
    Enriching,
    Drafting,
    Normalizing,
    CorrectingPre,
    Refining,
    Skipped,
    CorrectingPost,
    Validating,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Canonical(Box<CanonicalContent>),
    Draft(Value),
}

impl Payload {
    pub fn as_canonical(&self) -> Option<&CanonicalContent> {
        match self {
            Payload::Canonical(content) => Some(content),
            Payload::Draft(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Payload::Canonical(content) => {
                serde_json::to_value(content.as_ref()).unwrap_or(Value::Null)
            }
            Payload::Draft(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub payload: Payload,
    pub warnings: Vec<ValidationWarning>,
    /// States visited by the run, ending in `Done`.
    pub path: Vec<PipelineState>,
}

impl GenerationResult {
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &ValidationWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    /// Outbound JSON: the payload object with a `_warnings` side-channel when
    /// there is anything to report.
    pub fn into_json(self) -> Value {
        let mut value = self.payload.to_value();
        if !self.warnings.is_empty() {
            if let Value::Object(map) = &mut value {
                let warnings = serde_json::to_value(&self.warnings).unwrap_or(Value::Null);
                map.insert("_warnings".to_string(), warnings);
            }
        }
        value
    }
}
