use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metrics contract version for corpus validation.
pub const METRICS_VERSION: &str = "0.1";

/// Machine-readable outcome of a validation run (`validation_metrics.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub metrics_version: String,
    pub run_id: String,
    pub per_sit_target: u64,
    pub docs_evaluated: u64,
    /// Rows whose artifacts yielded no text. TP assignments in them fail and
    /// FP assignments pass by default.
    pub empty_text_docs: u64,
    pub categories_observed: u64,
    pub avg_sits_per_doc: f64,
    pub avg_instances_per_sit: f64,
    pub sits: BTreeMap<String, SitMetrics>,
    pub issues_total: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<WarningItem>,
    pub performance: PerformanceMetrics,
}

impl ValidationMetrics {
    pub fn below_target(&self) -> impl Iterator<Item = (&String, &SitMetrics)> {
        self.sits.iter().filter(|(_, metrics)| metrics.below_target)
    }
}

/// Per-category counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SitMetrics {
    pub docs: u64,
    pub tp_expected: u64,
    /// TP assignments with enough real-looking matches.
    pub tp_docs: u64,
    pub fp_expected: u64,
    /// FP assignments that leaked a real-looking match.
    pub fp_flagged: u64,
    pub total_instances: u64,
    pub below_target: bool,
    /// Real-looking matches seen for the category, for eyeballing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_matches: Vec<String>,
}

/// Structured warning entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningItem {
    pub code: String,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Timings for the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub load_ms: u128,
    pub validate_ms: u128,
    pub total_ms: u128,
}
