//! Corpus config contracts, config validation, and the Corpus Planner.

pub mod errors;
pub mod manifest;
pub mod model;
pub mod planner;
pub mod schema;
pub mod validate;

pub use errors::{IssueSeverity, PlanError, Result, ValidationIssue, ValidationReport};
pub use manifest::{
    CoverageShortfall, Manifest, build_manifest, config_fingerprint, coverage_shortfalls,
    resolve_seed,
};
pub use model::{
    Bucket, BucketDistribution, ConfidenceRules, CorpusConfig, HighConfidenceRule, InstanceBucket, SitCountBucket,
    SizeDistribution,
};
pub use planner::{CorpusPlanner, CoverageCounters, PlanOutcome, draw_bucket};
pub use schema::config_json_schema;
pub use validate::{
    ValidatedConfig, load_config, read_config_value, validate_config, validate_config_json,
    validate_config_semantics,
};
