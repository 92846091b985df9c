use crate::metrics::ValidationMetrics;
use crate::model::ValidationIssue;

/// Render a deterministic markdown report from metrics and issues.
pub fn render_report(metrics: &ValidationMetrics, issues: &[ValidationIssue]) -> String {
    let mut lines = Vec::new();

    lines.push("# Corpus Validation Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    lines.push(format!("- run_id: {}", metrics.run_id));
    lines.push(format!("- docs_evaluated: {}", metrics.docs_evaluated));
    lines.push(format!(
        "- categories_observed: {}",
        metrics.categories_observed
    ));
    lines.push(format!("- per_sit_target: {}", metrics.per_sit_target));
    lines.push(format!("- empty_text_docs: {}", metrics.empty_text_docs));
    lines.push(String::new());

    lines.push("## Categories".to_string());
    lines.push(
        "| sit | docs | tp_expected | tp_docs | fp_expected | fp_flagged | total_instances |"
            .to_string(),
    );
    lines.push("| --- | --- | --- | --- | --- | --- | --- |".to_string());
    for (sit_id, sit) in &metrics.sits {
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} | {} |",
            sit_id,
            sit.docs,
            sit.tp_expected,
            sit.tp_docs,
            sit.fp_expected,
            sit.fp_flagged,
            sit.total_instances
        ));
    }
    lines.push(String::new());

    let below: Vec<String> = metrics
        .below_target()
        .map(|(sit_id, sit)| {
            format!(
                "- only {} docs for {} (target {})",
                sit.docs, sit_id, metrics.per_sit_target
            )
        })
        .collect();
    if !below.is_empty() {
        lines.push("## Below target".to_string());
        lines.extend(below);
        lines.push(String::new());
    }

    lines.push("## Distribution summary".to_string());
    lines.push(format!(
        "- average SITs per doc: {:.2}",
        metrics.avg_sits_per_doc
    ));
    lines.push(format!(
        "- average instances per SIT: {:.2}",
        metrics.avg_instances_per_sit
    ));
    lines.push(String::new());

    let samples: Vec<String> = metrics
        .sits
        .iter()
        .filter(|(_, sit)| !sit.sample_matches.is_empty())
        .map(|(sit_id, sit)| format!("- {}: {:?}", sit_id, sit.sample_matches))
        .collect();
    if !samples.is_empty() {
        lines.push("## Sample matches".to_string());
        lines.extend(samples);
        lines.push(String::new());
    }

    if !metrics.warnings.is_empty() {
        lines.push("## Warnings".to_string());
        for warning in &metrics.warnings {
            let hint = warning
                .hint
                .as_ref()
                .map(|hint| format!(" (hint: {hint})"))
                .unwrap_or_default();
            lines.push(format!("- {}: {}{}", warning.path, warning.message, hint));
        }
        lines.push(String::new());
    }

    lines.push(format!(
        "## Detected issues (first {} of {})",
        issues.len(),
        metrics.issues_total
    ));
    if issues.is_empty() {
        lines.push("No issues detected based on regex checks and heuristics.".to_string());
    } else {
        lines.extend(issues.iter().map(|issue| format!("- {issue}")));
    }
    lines.push(String::new());

    lines.push("## Known biases".to_string());
    lines.extend(known_biases(metrics));
    lines.join("\n")
}

fn known_biases(metrics: &ValidationMetrics) -> Vec<String> {
    let mut lines = vec![
        "- the placeholder heuristic over-flags short codes and long zero runs; genuine values of that shape count as placeholders."
            .to_string(),
    ];
    if metrics.empty_text_docs > 0 {
        lines.push(format!(
            "- {} document(s) produced no text; their TP assignments fail and FP assignments pass by default.",
            metrics.empty_text_docs
        ));
    }
    if metrics.issues_total == 0 {
        lines.push("- no issues detected; compare metrics across runs for drift.".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{PerformanceMetrics, SitMetrics};
    use crate::model::IssueKind;
    use std::collections::BTreeMap;

    #[test]
    fn report_lists_categories_shortfalls_and_issues() {
        let mut sits = BTreeMap::new();
        sits.insert(
            "SIT_CCN".to_string(),
            SitMetrics {
                docs: 2,
                tp_expected: 1,
                tp_docs: 0,
                fp_expected: 1,
                below_target: true,
                total_instances: 4,
                ..SitMetrics::default()
            },
        );
        let metrics = ValidationMetrics {
            metrics_version: "0.1".to_string(),
            run_id: "run".to_string(),
            per_sit_target: 5,
            docs_evaluated: 2,
            empty_text_docs: 1,
            categories_observed: 1,
            avg_sits_per_doc: 1.0,
            avg_instances_per_sit: 2.0,
            sits,
            issues_total: 1,
            warnings: Vec::new(),
            performance: PerformanceMetrics::default(),
        };
        let issues = vec![ValidationIssue {
            kind: IssueKind::TpMissingMatches,
            doc_id: 1,
            sit_id: "SIT_CCN".to_string(),
            found: 0,
            expected: 3,
            path: None,
            samples: Vec::new(),
        }];

        let report = render_report(&metrics, &issues);
        assert!(report.contains("| SIT_CCN | 2 | 1 | 0 | 1 | 0 | 4 |"));
        assert!(report.contains("- only 2 docs for SIT_CCN (target 5)"));
        assert!(report.contains("TP missing matches for doc 1, sit SIT_CCN: found 0 expected 3"));
        assert!(report.contains("1 document(s) produced no text"));
    }
}
