use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options for the render engine and post-processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Corpus output directory (holds `meta.json`, the ledger and `files/`).
    pub out_dir: PathBuf,
    /// Log a progress event every this many documents.
    pub progress_every: u64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("output"),
            progress_every: 100,
        }
    }
}

/// Structured issue raised while rendering or post-processing a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sit_id: Option<String>,
}

impl GenerationIssue {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: "warning".to_string(),
            code: code.to_string(),
            message: message.into(),
            doc_id: None,
            sit_id: None,
        }
    }

    pub fn for_doc(mut self, doc_id: u64) -> Self {
        self.doc_id = Some(doc_id);
        self
    }

    pub fn for_sit(mut self, sit_id: &str) -> Self {
        self.sit_id = Some(sit_id.to_string());
        self
    }
}

/// Report for a render run, written to `generation_report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: String,
    pub seed: u64,
    pub docs_planned: u64,
    pub docs_rendered: u64,
    pub values_generated: u64,
    pub words_written: u64,
    pub bytes_written: u64,
    /// Values per generator kind (ex.: `luhn`, `pattern`).
    pub generator_usage: BTreeMap<String, u64>,
    pub placeholder_count: u64,
    /// Values from categories with no registered generator.
    pub fallback_count: u64,
    /// Values where a registered generator failed and the fallback was used.
    pub failed_over_count: u64,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub warnings: Vec<GenerationIssue>,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64, docs_planned: u64) -> Self {
        Self {
            run_id,
            seed,
            docs_planned,
            docs_rendered: 0,
            values_generated: 0,
            words_written: 0,
            bytes_written: 0,
            generator_usage: BTreeMap::new(),
            placeholder_count: 0,
            fallback_count: 0,
            failed_over_count: 0,
            duration_ms: 0,
            failure: None,
            warnings: Vec::new(),
        }
    }

    pub fn record_generator_usage(&mut self, kind: &str) {
        *self.generator_usage.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn record_warning(&mut self, issue: GenerationIssue) {
        self.warnings.push(issue);
    }
}

/// Report for a post-processing run, written to `postprocess_report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostprocessReport {
    pub run_id: String,
    pub rows_seen: u64,
    pub rows_processed: u64,
    pub rows_skipped: u64,
    /// Artifacts written per representation id.
    pub artifacts_written: BTreeMap<String, u64>,
    pub attachments_written: u64,
    pub duration_ms: u64,
    pub warnings: Vec<GenerationIssue>,
}

impl PostprocessReport {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            rows_seen: 0,
            rows_processed: 0,
            rows_skipped: 0,
            artifacts_written: BTreeMap::new(),
            attachments_written: 0,
            duration_ms: 0,
            warnings: Vec::new(),
        }
    }

    pub fn record_artifact(&mut self, representation: &str) {
        *self
            .artifacts_written
            .entry(representation.to_string())
            .or_insert(0) += 1;
    }
}
