use thiserror::Error;

use crate::model::GenerationReport;

/// Errors emitted by the render engine and post-processor.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid generator for '{sit_id}': {message}")]
    InvalidGenerator { sit_id: String, message: String },
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Core(#[from] sitcorpus_core::Error),
    #[error(transparent)]
    Plan(#[from] sitcorpus_plan::PlanError),
    #[error("generation failed after {} documents", .0.docs_rendered)]
    Failed(Box<GenerationReport>),
}
