//! Validation stage of the corpus pipeline.
//!
//! Re-extracts text from every artifact recorded in the mapping ledger,
//! matches category patterns and checks each TP / FP label, writing
//! `validation_report.md` and `validation_metrics.json`.

pub mod engine;
pub mod errors;
pub mod extract;
pub mod matching;
pub mod metrics;
pub mod model;
pub mod placeholder;
pub mod report;

pub use engine::ValidationEngine;
pub use errors::EvalError;
pub use matching::{PatternMatch, PatternSet, sample_for_display};
pub use metrics::{METRICS_VERSION, SitMetrics, ValidationMetrics, WarningItem};
pub use model::{Evaluation, IssueKind, ValidateOptions, ValidationIssue, ValidationResult};
pub use placeholder::{is_placeholder, is_template_token};
pub use report::render_report;
