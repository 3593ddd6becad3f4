use serde::Serialize;
use serde_json::Value;

use super::structure::{Fingerprints, Structure};

/// The finished result of one decode. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    source_label: String,
    text: String,
    summary: Structure,
}

impl Report {
    pub(crate) fn new(source_label: String, text: String, summary: Structure) -> Self {
        Self {
            source_label,
            text,
            summary,
        }
    }

    /// The PEM label the report was decoded from, e.g. `CERTIFICATE`.
    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    /// Canonical multi-line dump.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn summary(&self) -> &Structure {
        &self.summary
    }

    pub fn fingerprints(&self) -> Option<&Fingerprints> {
        self.summary.fingerprints()
    }

    pub fn success_message(&self) -> String {
        format!("Successfully parsed PEM {} file", self.source_label)
    }
}

/// Log entry produced while decoding one submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEntry {
    /// Unique ID for the submission
    pub request_id: String,
    pub timestamp: String,
    pub level: DiagnosticLevel,
    /// armor, classify, parse, render or outcome
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    pub message: String,
    /// Milliseconds since the decode started
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl From<DiagnosticLevel> for log::Level {
    fn from(level: DiagnosticLevel) -> Self {
        match level {
            DiagnosticLevel::Debug => log::Level::Debug,
            DiagnosticLevel::Info => log::Level::Info,
            DiagnosticLevel::Warning => log::Level::Warn,
            DiagnosticLevel::Error => log::Level::Error,
        }
    }
}
