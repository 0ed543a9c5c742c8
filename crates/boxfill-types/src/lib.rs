//! Shared types, errors, and diagnostics for the boxfill template engine.
//!
//! This crate provides the foundational types used across all other boxfill crates:
//! - `BoxfillError`: unified error taxonomy
//! - `Node`: a decoded endpoint record handed over by a node source
//! - `Outbound`: one entry of a configuration document's `outbounds` list
//! - `Diagnostic`: a recovered, non-fatal problem reported alongside a result
//! - `ErrorReport`: the structured error document returned instead of a config

use serde::{Deserialize, Serialize};

mod node;
mod outbound;

pub use node::{Node, NodeKind};
pub use outbound::{Outbound, OutboundKind};

/// Built-in direct-routing outbound tag. Also the default fallback tag.
pub const DIRECT_TAG: &str = "DIRECT";

/// Built-in block-routing outbound tag.
pub const BLOCK_TAG: &str = "REJECT";

/// Built-in DNS-routing outbound tag.
pub const DNS_TAG: &str = "DNS-OUT";

/// Returns `true` for the sentinel tags that never need a synthesized entry.
pub fn is_builtin_tag(tag: &str) -> bool {
    matches!(tag, DIRECT_TAG | BLOCK_TAG | DNS_TAG)
}

/// Unified error type for all boxfill subsystems.
#[derive(Debug, thiserror::Error)]
pub enum BoxfillError {
    // === Parameter Errors ===
    #[error("Missing or invalid parameter '{name}': {message}")]
    Parameter { name: String, message: String },

    // === Rule Errors ===
    #[error("Invalid rule clause '{clause}': {message}")]
    RuleClause { clause: String, message: String },

    // === Document Errors ===
    #[error("Base template is not a valid configuration: {message}")]
    DocumentFormat {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialization(#[source] serde_json::Error),

    // === Node Source Errors ===
    #[error("Failed to fetch nodes for {request}: {message}")]
    NodeSource { request: String, message: String },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl BoxfillError {
    pub fn parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        BoxfillError::Parameter {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        BoxfillError::DocumentFormat {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` if the error can be recovered from locally, so the
    /// surrounding run may continue after recording a diagnostic.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BoxfillError::RuleClause { .. })
    }
}

/// A convenience alias for `Result<T, BoxfillError>`.
pub type Result<T> = std::result::Result<T, BoxfillError>;

// ---------------------------------------------------------------------------
// Diagnostics: recovered problems reported alongside a result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A rule clause was malformed and dropped.
    RuleClause,
    /// A rule targeted a group tag the document does not contain.
    GroupLookup,
    /// The document shape was repaired (missing array, skipped entries, odd members).
    DocumentFormat,
    /// No rules were parsed at all.
    EmptyRules,
    /// A direct outbound was synthesized for the fallback tag.
    Fallback,
    /// Invocation parameters were missing or invalid.
    Parameter,
    /// The node source could not supply nodes.
    NodeSource,
    /// Serialization, I/O or an unexpected failure.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            tag: None,
        }
    }

    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::warning(kind, message)
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Recoverable errors become warnings, everything else an error.
impl From<&BoxfillError> for Diagnostic {
    fn from(err: &BoxfillError) -> Self {
        let kind = match err {
            BoxfillError::Parameter { .. } => DiagnosticKind::Parameter,
            BoxfillError::RuleClause { .. } => DiagnosticKind::RuleClause,
            BoxfillError::DocumentFormat { .. } => DiagnosticKind::DocumentFormat,
            BoxfillError::NodeSource { .. } => DiagnosticKind::NodeSource,
            BoxfillError::Serialization(_)
            | BoxfillError::Io(_)
            | BoxfillError::Json(_)
            | BoxfillError::Other(_) => DiagnosticKind::Internal,
        };
        let severity = if err.is_recoverable() {
            Severity::Warning
        } else {
            Severity::Error
        };
        Self {
            kind,
            severity,
            message: err.to_string(),
            tag: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorReport: structured failure result
// ---------------------------------------------------------------------------

/// The JSON document returned in place of a configuration when generation fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorReport {
    pub const PREFIX: &'static str = "Configuration generation failed";

    pub fn new(message: impl std::fmt::Display, details: Option<String>) -> Self {
        Self {
            error: format!("{}: {message}", Self::PREFIX),
            details,
        }
    }

    /// Build a report from an error, using its `source()` chain as the details.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut current = err.source();
        while let Some(cause) = current {
            causes.push(format!("caused by: {cause}"));
            current = cause.source();
        }
        let details = (!causes.is_empty()).then(|| causes.join("\n"));
        Self::new(err, details)
    }

    /// Pretty-printed JSON form of the report.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|_| serde_json::json!({ "error": self.error }).to_string())
    }
}
