use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::metrics::ValidationMetrics;

/// Options for corpus validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateOptions {
    /// Corpus output directory (ledger, `files/`, reports).
    pub out_dir: PathBuf,
    /// Fail the run when any issue is found.
    pub strict: bool,
    /// Issues kept in the report and metrics.
    pub max_issues: usize,
    /// Sample matches shown per issue and per category.
    pub max_samples: usize,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("output"),
            strict: false,
            max_issues: 500,
            max_samples: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A TP assignment had fewer real-looking matches than instances.
    TpMissingMatches,
    /// An FP assignment contained a real-looking match.
    FpLeakedValue,
}

/// A label the corpus failed to satisfy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub doc_id: u64,
    pub sit_id: String,
    pub found: u64,
    pub expected: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub samples: Vec<String>,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IssueKind::TpMissingMatches => {
                write!(
                    f,
                    "TP missing matches for doc {}, sit {}: found {} expected {}",
                    self.doc_id, self.sit_id, self.found, self.expected
                )?;
                if let Some(path) = &self.path {
                    write!(f, " path {path}")?;
                }
                write!(f, " sample_matches: {:?}", self.samples)
            }
            IssueKind::FpLeakedValue => write!(
                f,
                "FP contains valid-looking match in doc {}, sit {}: sample {:?}",
                self.doc_id, self.sit_id, self.samples
            ),
        }
    }
}

/// Pure evaluation output, before anything is written.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metrics: ValidationMetrics,
    /// First `max_issues` issues, in ledger order.
    pub issues: Vec<ValidationIssue>,
}

/// Result of a validation run.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub metrics_path: PathBuf,
    pub report_path: PathBuf,
    pub metrics: ValidationMetrics,
    pub issues: Vec<ValidationIssue>,
    pub report: String,
}
