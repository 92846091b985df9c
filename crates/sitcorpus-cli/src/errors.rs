use sitcorpus_eval::EvalError;
use sitcorpus_generate::GenerationError;
use sitcorpus_plan::PlanError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("validation error: {0}")]
    Eval(#[from] EvalError),
    #[error("core error: {0}")]
    Core(#[from] sitcorpus_core::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
}

pub type CliResult<T> = std::result::Result<T, CliError>;
