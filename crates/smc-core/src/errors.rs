//! Structured error types shared across SMC crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SmcError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (chain id, stage index, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the SMC sampler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SmcError {
    /// Invalid option or option combination.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// The external model evaluator failed or produced no usable values.
    #[error("model evaluation error: {0}")]
    ModelEvaluation(ErrorInfo),
    /// Importance weights collapsed so the population cannot be reweighted.
    #[error("degenerate weights: {0}")]
    DegenerateWeights(ErrorInfo),
    /// A parallel worker crashed or was cancelled.
    #[error("worker failure: {0}")]
    WorkerFailure(ErrorInfo),
    /// Serialization, schema and file IO errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SmcError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SmcError::Configuration(info)
            | SmcError::ModelEvaluation(info)
            | SmcError::DegenerateWeights(info)
            | SmcError::WorkerFailure(info)
            | SmcError::Serde(info) => info,
        }
    }

    fn info_mut(&mut self) -> &mut ErrorInfo {
        match self {
            SmcError::Configuration(info)
            | SmcError::ModelEvaluation(info)
            | SmcError::DegenerateWeights(info)
            | SmcError::WorkerFailure(info)
            | SmcError::Serde(info) => info,
        }
    }

    /// Attaches a context entry while the error propagates. Existing keys are kept.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info_mut()
            .context
            .entry(key.into())
            .or_insert_with(|| value.into());
        self
    }

    /// Shorthand for a configuration error with a single context entry.
    pub fn config(
        code: &str,
        message: impl Into<String>,
        key: &str,
        value: impl ToString,
    ) -> Self {
        SmcError::Configuration(ErrorInfo::new(code, message).with_context(key, value.to_string()))
    }
}
