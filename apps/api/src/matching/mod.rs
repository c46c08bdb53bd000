// Matching engine: normalization, profile extraction, semantic similarity,
// ATS compatibility scoring, gap analysis, and the pipeline entry point.
// All embedding calls go through the embedding adapter — no HTTP here.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod ats;
pub mod handlers;
pub mod normalizer;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod similarity;
pub mod vocabulary;

/// Which side of the match a document is on. Drives profile extraction
/// (experience entries are resume-only) and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Resume,
    JobDescription,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Resume => write!(f, "resume"),
            DocumentKind::JobDescription => write!(f, "job-description"),
        }
    }
}

/// A raw input document. Immutable once created; owned by the single
/// pipeline invocation that created it.
#[derive(Debug, Clone)]
pub struct Document {
    pub kind: DocumentKind,
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(kind: DocumentKind, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_kind_serde_kebab_case() {
        let kind: DocumentKind = serde_json::from_str(r#""job-description""#).unwrap();
        assert_eq!(kind, DocumentKind::JobDescription);
        assert_eq!(
            serde_json::to_string(&DocumentKind::Resume).unwrap(),
            r#""resume""#
        );
    }

    #[test]
    fn test_document_kind_display() {
        assert_eq!(DocumentKind::Resume.to_string(), "resume");
        assert_eq!(DocumentKind::JobDescription.to_string(), "job-description");
    }
}
