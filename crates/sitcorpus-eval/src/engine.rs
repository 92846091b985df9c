use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Instant;

use sitcorpus_core::{
    Category, CorpusPaths, Label, MappingLedger, Representation, default_representations,
    write_bytes_atomic, write_json_atomic,
};
use sitcorpus_plan::Manifest;
use tracing::{info, warn};

use crate::errors::EvalError;
use crate::extract::load_text;
use crate::matching::{PatternMatch, PatternSet, sample_for_display};
use crate::metrics::{
    METRICS_VERSION, PerformanceMetrics, SitMetrics, ValidationMetrics, WarningItem,
};
use crate::model::{Evaluation, IssueKind, ValidateOptions, ValidationIssue, ValidationResult};
use crate::placeholder::is_placeholder;
use crate::report::render_report;

/// Real matches kept per category while scanning, before sampling.
const SAMPLE_POOL: usize = 50;

/// Re-derives ground truth from rendered artifacts and checks every label.
pub struct ValidationEngine {
    options: ValidateOptions,
    representations: Vec<Box<dyn Representation>>,
}

impl ValidationEngine {
    pub fn new(options: ValidateOptions) -> Self {
        Self::with_representations(options, default_representations())
    }

    pub fn with_representations(
        options: ValidateOptions,
        representations: Vec<Box<dyn Representation>>,
    ) -> Self {
        Self {
            options,
            representations,
        }
    }

    pub fn paths(&self) -> CorpusPaths {
        CorpusPaths::new(&self.options.out_dir)
    }

    /// Validate against the catalog and target recorded in `meta.json`.
    pub fn run(&self) -> Result<ValidationResult, EvalError> {
        let manifest_path = self.paths().manifest_path();
        if !manifest_path.exists() {
            return Err(EvalError::InvalidCorpus(format!(
                "manifest not found at {}",
                manifest_path.display()
            )));
        }
        let manifest = Manifest::load(&manifest_path)?;
        self.run_with_catalog(&manifest.catalog, manifest.per_sit_target)
    }

    pub fn run_with_catalog(
        &self,
        catalog: &[Category],
        per_sit_target: u64,
    ) -> Result<ValidationResult, EvalError> {
        let total_start = Instant::now();
        let paths = self.paths();
        let ledger_path = paths.ledger_path();
        if !ledger_path.exists() {
            return Err(EvalError::InvalidCorpus(format!(
                "mapping ledger not found at {}",
                ledger_path.display()
            )));
        }
        let ledger = MappingLedger::load(&ledger_path)?;
        let load_ms = total_start.elapsed().as_millis();

        let Evaluation {
            mut metrics,
            issues,
        } = self.evaluate(&ledger, catalog, per_sit_target, &paths.files_dir);
        metrics.performance.load_ms = load_ms;
        metrics.performance.total_ms = total_start.elapsed().as_millis();

        let report = render_report(&metrics, &issues);
        let metrics_path = paths.validation_metrics_path();
        write_json_atomic(&metrics_path, &metrics)?;
        let report_path = paths.validation_report_path();
        write_bytes_atomic(&report_path, report.as_bytes())?;

        info!(
            run_id = %metrics.run_id,
            docs = metrics.docs_evaluated,
            issues = metrics.issues_total,
            empty_text_docs = metrics.empty_text_docs,
            duration_ms = metrics.performance.total_ms as u64,
            "validation completed"
        );

        if self.options.strict && metrics.issues_total > 0 {
            return Err(EvalError::Issues(metrics.issues_total));
        }

        Ok(ValidationResult {
            metrics_path,
            report_path,
            metrics,
            issues,
            report,
        })
    }

    /// Pure evaluation of a ledger; reads artifacts but writes nothing.
    pub fn evaluate(
        &self,
        ledger: &MappingLedger,
        catalog: &[Category],
        per_sit_target: u64,
        files_dir: &Path,
    ) -> Evaluation {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let mut warnings = Vec::new();
        let patterns = PatternSet::compile(catalog, &mut warnings);

        let mut sits: BTreeMap<String, SitMetrics> = BTreeMap::new();
        let mut pools: BTreeMap<String, Vec<PatternMatch>> = BTreeMap::new();
        let mut unknown: BTreeSet<String> = BTreeSet::new();
        let mut issues = Vec::new();
        let mut issues_total = 0_u64;
        let mut empty_text_docs = 0_u64;
        let mut sit_counts: Vec<usize> = Vec::new();
        let mut instance_counts: Vec<u32> = Vec::new();

        for row in ledger.rows() {
            let sit_ids = row.sit_id_list();
            let labels = row.label_list();
            let instances = row.instance_list();
            sit_counts.push(sit_ids.iter().filter(|sit_id| !sit_id.is_empty()).count());
            instance_counts.extend(instances.iter().copied());

            let text = load_text(row, files_dir, &self.representations);
            if text.is_empty() {
                empty_text_docs += 1;
                warn!(doc_id = row.doc_id, "no text extracted for document");
            }

            for (index, sit_id) in sit_ids.iter().enumerate() {
                if sit_id.is_empty() {
                    continue;
                }
                let label = labels.get(index).copied().unwrap_or(Label::Tp);
                let instance_count = instances.get(index).copied().unwrap_or(1);
                if !patterns.contains(sit_id) && unknown.insert(sit_id.to_string()) {
                    warnings.push(WarningItem {
                        code: "unknown_category".to_string(),
                        path: format!("ledger.{}", row.doc_id),
                        message: format!("category '{sit_id}' is not in the catalog"),
                        hint: Some("no pattern applies; TP assignments will fail".to_string()),
                    });
                }

                let counters = sits.entry(sit_id.to_string()).or_default();
                counters.docs += 1;
                counters.total_instances += u64::from(instance_count);

                let matches = patterns.find(sit_id, &text);
                let real: Vec<PatternMatch> = matches
                    .iter()
                    .filter(|found| !is_placeholder(&found.value))
                    .cloned()
                    .collect();
                let pool = pools.entry(sit_id.to_string()).or_default();
                let room = SAMPLE_POOL.saturating_sub(pool.len());
                pool.extend(real.iter().take(room).cloned());

                let issue = match label {
                    Label::Tp => {
                        counters.tp_expected += 1;
                        let needed = u64::from(instance_count.max(1));
                        let found = real.len() as u64;
                        if found >= needed {
                            counters.tp_docs += 1;
                            None
                        } else {
                            Some(ValidationIssue {
                                kind: IssueKind::TpMissingMatches,
                                doc_id: row.doc_id,
                                sit_id: sit_id.to_string(),
                                found,
                                expected: needed,
                                path: row
                                    .actual_file_path
                                    .clone()
                                    .or_else(|| Some(row.filename.clone()))
                                    .filter(|path| !path.is_empty()),
                                samples: sample_for_display(&matches, self.options.max_samples),
                            })
                        }
                    }
                    Label::Fp => {
                        counters.fp_expected += 1;
                        if real.is_empty() {
                            None
                        } else {
                            counters.fp_flagged += 1;
                            Some(ValidationIssue {
                                kind: IssueKind::FpLeakedValue,
                                doc_id: row.doc_id,
                                sit_id: sit_id.to_string(),
                                found: real.len() as u64,
                                expected: 0,
                                path: row.actual_file_path.clone(),
                                samples: sample_for_display(&matches, self.options.max_samples),
                            })
                        }
                    }
                };

                if let Some(issue) = issue {
                    issues_total += 1;
                    if issues.len() < self.options.max_issues {
                        issues.push(issue);
                    }
                }
            }
        }

        for (sit_id, counters) in sits.iter_mut() {
            counters.below_target = counters.docs < per_sit_target;
            if let Some(pool) = pools.get(sit_id) {
                counters.sample_matches = sample_for_display(pool, self.options.max_samples);
            }
        }

        let metrics = ValidationMetrics {
            metrics_version: METRICS_VERSION.to_string(),
            run_id,
            per_sit_target,
            docs_evaluated: ledger.len() as u64,
            empty_text_docs,
            categories_observed: sits.len() as u64,
            avg_sits_per_doc: mean(sit_counts.iter().map(|count| *count as f64)),
            avg_instances_per_sit: mean(instance_counts.iter().map(|count| f64::from(*count))),
            sits,
            issues_total,
            warnings,
            performance: PerformanceMetrics {
                load_ms: 0,
                validate_ms: start.elapsed().as_millis(),
                total_ms: 0,
            },
        };

        Evaluation { metrics, issues }
    }
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.representations.iter().map(|r| r.id()).collect();
        f.debug_struct("ValidationEngine")
            .field("options", &self.options)
            .field("representations", &ids)
            .finish()
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_u64), |(sum, count), value| (sum + value, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitcorpus_core::MappingRow;
    use std::path::PathBuf;

    fn files_dir() -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("sitcorpus_eval_{}", uuid::Uuid::new_v4()))
            .join("files");
        std::fs::create_dir_all(&dir).expect("files dir");
        dir
    }

    fn catalog() -> Vec<Category> {
        vec![
            Category::new("SIT_SSN", "SSN").with_regex(r"\b\d{3}-\d{2}-\d{4}\b"),
            Category::new("SIT_SWIFT", "SWIFT").with_regex(r"\b[A-Z]{6}[A-Z0-9]{2}\b"),
        ]
    }

    fn row(doc_id: u64, file: &str, sit_ids: &str, labels: &str, instances: &str) -> MappingRow {
        MappingRow {
            doc_id,
            filename: file.to_string(),
            sit_ids: sit_ids.to_string(),
            labels: labels.to_string(),
            instances: instances.to_string(),
            ..MappingRow::default()
        }
    }

    fn engine() -> ValidationEngine {
        ValidationEngine::new(ValidateOptions::default())
    }

    #[test]
    fn tp_needs_as_many_real_matches_as_instances() {
        let dir = files_dir();
        std::fs::write(dir.join("a.txt"), "SSN: 123-45-6789\nSSN: 234-56-7890").expect("write");
        std::fs::write(dir.join("b.txt"), "SSN: 123-45-6789\nSSN: 000-00-0000").expect("write");
        let mut ledger = MappingLedger::new();
        ledger.upsert(row(1, "a.txt", "SIT_SSN", "TP", "2"));
        ledger.upsert(row(2, "b.txt", "SIT_SSN", "TP", "2"));

        let evaluation = engine().evaluate(&ledger, &catalog(), 1, &dir);
        let ssn = &evaluation.metrics.sits["SIT_SSN"];
        assert_eq!(ssn.docs, 2);
        assert_eq!(ssn.tp_expected, 2);
        assert_eq!(ssn.tp_docs, 1);
        assert_eq!(ssn.total_instances, 4);
        assert_eq!(evaluation.issues.len(), 1);
        assert_eq!(evaluation.issues[0].doc_id, 2);
        assert_eq!(evaluation.issues[0].found, 1);
        assert_eq!(evaluation.issues[0].kind, IssueKind::TpMissingMatches);
    }

    #[test]
    fn fp_is_flagged_only_for_real_looking_matches() {
        let dir = files_dir();
        std::fs::write(dir.join("clean.txt"), "SSN: XXX-XX-XXXX and 000-00-0000").expect("write");
        std::fs::write(dir.join("leak.txt"), "SSN: 123-45-6789").expect("write");
        let mut ledger = MappingLedger::new();
        ledger.upsert(row(1, "clean.txt", "SIT_SSN", "FP", "1"));
        ledger.upsert(row(2, "leak.txt", "SIT_SSN", "FP", "1"));

        let evaluation = engine().evaluate(&ledger, &catalog(), 1, &dir);
        let ssn = &evaluation.metrics.sits["SIT_SSN"];
        assert_eq!(ssn.fp_expected, 2);
        assert_eq!(ssn.fp_flagged, 1);
        assert_eq!(evaluation.issues[0].kind, IssueKind::FpLeakedValue);
        assert_eq!(ssn.sample_matches.len(), 1);
    }

    #[test]
    fn missing_labels_default_to_tp_and_instances_to_one() {
        let dir = files_dir();
        std::fs::write(dir.join("c.txt"), "BIC DEUTDEFF; SSN 123-45-6789").expect("write");
        let mut ledger = MappingLedger::new();
        ledger.upsert(row(1, "c.txt", "SIT_SSN;SIT_SWIFT", "TP", ""));

        let evaluation = engine().evaluate(&ledger, &catalog(), 1, &dir);
        assert_eq!(evaluation.metrics.sits["SIT_SWIFT"].tp_expected, 1);
        assert_eq!(evaluation.metrics.sits["SIT_SWIFT"].tp_docs, 1);
        assert_eq!(evaluation.metrics.sits["SIT_SWIFT"].total_instances, 1);
        assert!(evaluation.issues.is_empty());
    }

    #[test]
    fn empty_text_and_targets_are_reported() {
        let dir = files_dir();
        let mut ledger = MappingLedger::new();
        ledger.upsert(row(1, "missing.txt", "SIT_SSN", "TP", "1"));
        ledger.upsert(row(2, "missing2.txt", "SIT_GHOST", "FP", "1"));

        let evaluation = engine().evaluate(&ledger, &catalog(), 3, &dir);
        let metrics = &evaluation.metrics;
        assert_eq!(metrics.empty_text_docs, 2);
        assert!(metrics.sits["SIT_SSN"].below_target);
        assert_eq!(metrics.sits["SIT_GHOST"].fp_flagged, 0);
        assert!(metrics.warnings.iter().any(|w| w.code == "unknown_category"));
        assert_eq!(metrics.avg_sits_per_doc, 1.0);
        assert_eq!(metrics.issues_total, 1);
    }

    #[test]
    fn issue_list_is_bounded() {
        let dir = files_dir();
        let mut ledger = MappingLedger::new();
        for doc_id in 0..12 {
            ledger.upsert(row(doc_id, "none.txt", "SIT_SSN", "TP", "1"));
        }
        let engine = ValidationEngine::new(ValidateOptions {
            max_issues: 10,
            ..ValidateOptions::default()
        });
        let evaluation = engine.evaluate(&ledger, &catalog(), 1, &dir);
        assert_eq!(evaluation.issues.len(), 10);
        assert_eq!(evaluation.metrics.issues_total, 12);
    }
}
