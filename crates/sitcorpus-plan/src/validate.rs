use std::collections::HashSet;
use std::path::Path;

use jsonschema::JSONSchema;
use regex::RegexBuilder;
use serde_json::Value;
use sitcorpus_core::ValueKind;

use crate::errors::{PlanError, Result, ValidationIssue, ValidationReport};
use crate::model::{Bucket, BucketDistribution, CorpusConfig};
use crate::schema::config_json_schema;

const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// Validated config with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: CorpusConfig,
    pub warnings: Vec<ValidationIssue>,
}

/// Parse a config file into JSON; `.toml` files go through the TOML parser.
pub fn read_config_value(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        let value: toml::Value = toml::from_str(&contents)?;
        Ok(serde_json::to_value(value)?)
    } else {
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Read and fully validate a config file.
pub fn load_config(path: &Path) -> Result<ValidatedConfig> {
    let value = read_config_value(path)?;
    validate_config(&value).map_err(PlanError::Invalid)
}

/// Validate a config JSON document against the generated JSON Schema.
pub fn validate_config_json(config_json: &Value) -> Result<ValidationReport> {
    let schema = serde_json::to_value(config_json_schema())?;
    let compiled = JSONSchema::compile(&schema).map_err(|err| PlanError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();
    if let Err(errors) = compiled.validate(config_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push(ValidationIssue::error(
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }
    Ok(report)
}

/// Validate the config end-to-end, returning structured issues on failure.
pub fn validate_config(config_json: &Value) -> std::result::Result<ValidatedConfig, ValidationReport> {
    let structural = match validate_config_json(config_json) {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push(ValidationIssue::error(
                "schema_validation_error",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };
    if !structural.is_ok() {
        return Err(structural);
    }

    let config: CorpusConfig = match serde_json::from_value(config_json.clone()) {
        Ok(config) => config,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push(ValidationIssue::error(
                "invalid_config_json",
                "/",
                err.to_string(),
                Some("check bucket keys and value types"),
            ));
            return Err(report);
        }
    };

    let semantic = validate_config_semantics(&config);
    if !semantic.is_ok() {
        return Err(semantic);
    }

    Ok(ValidatedConfig {
        config,
        warnings: semantic.warnings,
    })
}

/// Checks the JSON Schema cannot express: ranges, probabilities, catalog ids.
pub fn validate_config_semantics(config: &CorpusConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.per_sit_count == 0 {
        report.push(ValidationIssue::error(
            "per_sit_count_zero",
            "/per_sit_count",
            "per_sit_count must be greater than zero",
            Some("set per_sit_count to a positive integer"),
        ));
    }
    check_probability(&mut report, "/tp_ratio", config.tp_ratio);
    if config.formats.is_empty() {
        report.push(ValidationIssue::error(
            "formats_empty",
            "/formats",
            "at least one document format is required",
            Some("add one of document, email, chat, email_with_attachment"),
        ));
    }

    validate_distribution(
        &mut report,
        "/sit_count_distribution",
        &config.sit_count_distribution,
    );
    validate_distribution(
        &mut report,
        "/instance_count_distribution",
        &config.instance_count_distribution,
    );

    if config.confidence_rules.high.min_instances == 0 {
        report.push(ValidationIssue::error(
            "min_instances_zero",
            "/confidence_rules/high/min_instances",
            "min_instances must be greater than zero",
            None,
        ));
    }

    let size = &config.size_distribution;
    check_probability(
        &mut report,
        "/size_distribution/main_range_share",
        size.main_range_share,
    );
    if size.main_range_min > size.main_range_max {
        report.push(ValidationIssue::error(
            "invalid_range",
            "/size_distribution",
            format!(
                "main_range_min ({}) is greater than main_range_max ({})",
                size.main_range_min, size.main_range_max
            ),
            None,
        ));
    }
    if size.min_words > size.max_words {
        report.push(ValidationIssue::error(
            "invalid_range",
            "/size_distribution",
            format!(
                "min_words ({}) is greater than max_words ({})",
                size.min_words, size.max_words
            ),
            None,
        ));
    }

    report.merge(validate_catalog(config));
    report
}

fn validate_catalog(config: &CorpusConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    if config.sits.is_empty() {
        report.push(ValidationIssue::error(
            "catalog_empty",
            "/sits",
            "the catalog must declare at least one category",
            Some("add an entry with id, name and regex"),
        ));
        return report;
    }

    let mut seen = HashSet::new();
    for (idx, category) in config.sits.iter().enumerate() {
        let base_path = format!("/sits/{idx}");
        let id = category.id.trim();
        if id.is_empty() {
            report.push(ValidationIssue::error(
                "category_id_empty",
                format!("{base_path}/id"),
                "category id must not be empty",
                None,
            ));
            continue;
        }
        if id.contains(';') {
            report.push(ValidationIssue::error(
                "category_id_separator",
                format!("{base_path}/id"),
                format!("category id '{id}' contains the ledger list separator ';'"),
                None,
            ));
        }
        if !seen.insert(id.to_string()) {
            report.push(ValidationIssue::error(
                "duplicate_category",
                format!("{base_path}/id"),
                format!("category '{id}' is declared more than once"),
                Some("remove the duplicate entry"),
            ));
        }

        match &category.regex {
            None => report.push(ValidationIssue::warning(
                "regex_missing",
                format!("{base_path}/regex"),
                format!("category '{id}' has no regex; validation cannot check it"),
                None,
            )),
            Some(pattern) => {
                if let Err(err) = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .multi_line(true)
                    .build()
                {
                    report.push(ValidationIssue::warning(
                        "regex_invalid",
                        format!("{base_path}/regex"),
                        format!("regex for '{id}' does not compile: {err}"),
                        Some("validation treats this category as having no pattern"),
                    ));
                }
            }
        }

        if let Some(ValueKind::Digits {
            min_len, max_len, ..
        }) = &category.generator
            && (*min_len == 0 || min_len > max_len)
        {
            report.push(ValidationIssue::error(
                "invalid_range",
                format!("{base_path}/generator"),
                format!("digits generator for '{id}' needs 0 < min_len <= max_len"),
                None,
            ));
        }
    }
    report
}

fn validate_distribution<B: Bucket + std::fmt::Display>(
    report: &mut ValidationReport,
    path: &str,
    distribution: &BucketDistribution<B>,
) {
    if distribution.is_empty() {
        report.push(ValidationIssue::error(
            "distribution_empty",
            path,
            "distribution must declare at least one bucket",
            None,
        ));
        return;
    }

    let mut total = 0.0;
    for (bucket, probability) in distribution.iter() {
        check_probability(report, &format!("{path}/{bucket}"), probability);
        total += probability;
    }

    if total <= 0.0 {
        report.push(ValidationIssue::error(
            "distribution_zero",
            path,
            "bucket probabilities sum to zero",
            None,
        ));
    } else if (total - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        report.push(ValidationIssue::warning(
            "distribution_not_normalized",
            path,
            format!("bucket probabilities sum to {total:.4}"),
            Some("draws past the cumulative total resolve to the last bucket"),
        ));
    }
}

fn check_probability(report: &mut ValidationReport, path: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        report.push(ValidationIssue::error(
            "probability_out_of_range",
            path,
            format!("{value} is not a probability in [0, 1]"),
            None,
        ));
    }
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
