use thiserror::Error;

/// Errors emitted by the validation engine.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid corpus: {0}")]
    InvalidCorpus(String),
    #[error("validation found {0} issue(s)")]
    Issues(u64),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Core(#[from] sitcorpus_core::Error),
    #[error(transparent)]
    Plan(#[from] sitcorpus_plan::PlanError),
}
