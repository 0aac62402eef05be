//! Error types for rule composition and ruleset loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the composition engine itself.
///
/// All of these fail at the offending call, before anything is appended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("unknown method '{method}': not a built-in directive or a registered macro")]
    UnknownMethod { method: String },

    #[error("cannot register macro '{name}': {reason}")]
    InvalidMacroName { name: String, reason: String },

    #[error("unsupported fragment shape: expected a fragment name or an object with 'invoke', got {actual}")]
    UnsupportedFragmentShape { actual: String },
}

/// Errors while reading a ruleset document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

/// Errors while turning a ruleset document into rule builders.
#[derive(Debug, Error)]
pub enum RulesetError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid step at {path}: {message}")]
    InvalidStep { path: String, message: String },

    #[error("unknown fragment '{name}' at {path}")]
    UnknownFragment { path: String, name: String },

    #[error("no field named '{field}' in ruleset")]
    UnknownField { field: String },

    #[error("invalid schema rule at {path}: {message}")]
    InvalidSchema { path: String, message: String },

    #[error("recursive macro at {path}: {}", .chain.join(" -> "))]
    MacroCycle { path: String, chain: Vec<String> },

    #[error("{path}: {source}")]
    Rule {
        path: String,
        #[source]
        source: RuleError,
    },
}

impl RulesetError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RulesetError::Load(e) => e.exit_code(),
            _ => 2,
        }
    }

    pub(crate) fn invalid_step(path: &str, message: impl Into<String>) -> Self {
        RulesetError::InvalidStep {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Single failure reported by an opaque rule, with path context.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    /// Attribute name followed by a JSON Pointer into the value.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
