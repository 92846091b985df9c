use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sitcorpus_core::{
    Category, DocumentPlan, MANIFEST_VERSION, MappingLedger, MappingRow, write_json_atomic,
};
use tracing::info;

use crate::errors::Result;
use crate::model::CorpusConfig;
use crate::planner::{CorpusPlanner, CoverageCounters};

/// A category that did not reach its document target before the ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageShortfall {
    pub sit_id: String,
    pub count: u64,
    pub target: u64,
}

/// Planner output written to `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub manifest_version: String,
    pub generated_at: DateTime<Utc>,
    /// Effective seed; replaying with it reproduces every plan and value.
    pub seed: u64,
    pub config_fingerprint: String,
    pub per_sit_target: u64,
    pub safety_ceiling: u64,
    pub converged: bool,
    #[serde(default)]
    pub shortfalls: Vec<CoverageShortfall>,
    #[serde(default)]
    pub sit_doc_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub sit_instance_counts: BTreeMap<String, u64>,
    /// Catalog the plans were drawn from.
    #[serde(default)]
    pub catalog: Vec<Category>,
    pub docs: Vec<DocumentPlan>,
}

impl Manifest {
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// One ledger row per planned document, plan columns only.
    pub fn to_ledger(&self) -> MappingLedger {
        let mut ledger = MappingLedger::new();
        for plan in &self.docs {
            ledger.upsert(MappingRow::from_plan(plan));
        }
        ledger
    }
}

/// Run the planner with a resolved seed and wrap the outcome.
pub fn build_manifest(config: &CorpusConfig, seed: u64) -> Result<Manifest> {
    let generated_at = Utc::now();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let outcome = CorpusPlanner::new(config).plan(&mut rng, generated_at);

    let target = config.per_sit_count;
    let shortfalls = coverage_shortfalls(&config.sits, &outcome.counters, target);

    info!(
        seed,
        docs = outcome.docs.len(),
        converged = outcome.converged,
        shortfalls = shortfalls.len(),
        "corpus planned"
    );

    Ok(Manifest {
        manifest_version: MANIFEST_VERSION.to_string(),
        generated_at,
        seed,
        config_fingerprint: config_fingerprint(config)?,
        per_sit_target: target,
        safety_ceiling: outcome.safety_ceiling,
        converged: outcome.converged,
        shortfalls,
        sit_doc_counts: outcome.counters.doc_counts().clone(),
        sit_instance_counts: outcome.counters.instance_counts().clone(),
        catalog: config.sits.clone(),
        docs: outcome.docs,
    })
}

/// Catalog categories still under `target`, in catalog order.
pub fn coverage_shortfalls(
    catalog: &[Category],
    counters: &CoverageCounters,
    target: u64,
) -> Vec<CoverageShortfall> {
    catalog
        .iter()
        .filter_map(|category| {
            let count = counters.doc_count(&category.id);
            (count < target).then(|| CoverageShortfall {
                sit_id: category.id.clone(),
                count,
                target,
            })
        })
        .collect()
}

/// Seed from the config, or a fresh one when the config leaves it out.
pub fn resolve_seed(config: &CorpusConfig) -> u64 {
    config.random_seed.unwrap_or_else(rand::random)
}

/// SHA-256 over the canonical JSON form of the config.
pub fn config_fingerprint(config: &CorpusConfig) -> Result<String> {
    let bytes = serde_json::to_vec(config)?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CorpusConfig {
        let mut config = CorpusConfig::with_catalog(vec![
            Category::new("SIT_CCN", "Credit Card Number"),
            Category::new("SIT_SSN", "U.S. Social Security Number"),
        ]);
        config.per_sit_count = 3;
        config
    }

    #[test]
    fn manifest_records_seed_and_coverage() {
        let config = config();
        let manifest = build_manifest(&config, 99).expect("manifest");
        assert_eq!(manifest.seed, 99);
        assert!(manifest.converged);
        assert!(manifest.shortfalls.is_empty());
        assert!(manifest.sit_doc_counts.values().all(|count| *count >= 3));
        assert_eq!(manifest.config_fingerprint.len(), 64);
        assert_eq!(manifest.to_ledger().len(), manifest.docs.len());
    }

    #[test]
    fn under_target_counters_report_shortfalls_in_catalog_order() {
        use sitcorpus_core::{Confidence, Label, SitAssignment};

        let catalog = vec![
            Category::new("SIT_A", "A"),
            Category::new("SIT_B", "B"),
            Category::new("SIT_C", "C"),
        ];
        fn record(counters: &mut CoverageCounters, sit_id: &str, times: usize) {
            for _ in 0..times {
                counters.record(&SitAssignment {
                    sit_id: sit_id.to_string(),
                    sit_name: sit_id.to_string(),
                    label: Label::Tp,
                    instances: 1,
                    confidence: Confidence::Low,
                    tcs: Vec::new(),
                });
            }
        }
        let mut counters = CoverageCounters::default();
        record(&mut counters, "SIT_B", 3);
        record(&mut counters, "SIT_A", 1);

        assert!(!counters.satisfies(&catalog, 3));
        let shortfalls = coverage_shortfalls(&catalog, &counters, 3);
        assert_eq!(
            shortfalls,
            vec![
                CoverageShortfall {
                    sit_id: "SIT_A".to_string(),
                    count: 1,
                    target: 3,
                },
                CoverageShortfall {
                    sit_id: "SIT_C".to_string(),
                    count: 0,
                    target: 3,
                },
            ]
        );

        record(&mut counters, "SIT_A", 2);
        record(&mut counters, "SIT_C", 3);
        assert!(counters.satisfies(&catalog, 3));
        assert!(coverage_shortfalls(&catalog, &counters, 3).is_empty());
    }

    #[test]
    fn fingerprint_changes_with_config() {
        let config = config();
        let mut other = config.clone();
        other.tp_ratio = 0.9;
        let first = config_fingerprint(&config).expect("fingerprint");
        assert_eq!(first, config_fingerprint(&config).expect("fingerprint"));
        assert_ne!(first, config_fingerprint(&other).expect("fingerprint"));
    }

    #[test]
    fn missing_seed_is_resolved_and_configured_seed_kept() {
        let mut config = config();
        config.random_seed = Some(12);
        assert_eq!(resolve_seed(&config), 12);
    }

    #[test]
    fn manifest_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("sitcorpus-manifest-{}", std::process::id()));
        let path = dir.join("meta.json");
        let manifest = build_manifest(&config(), 4).expect("manifest");
        manifest.save(&path).expect("save");
        let loaded = Manifest::load(&path).expect("load");
        assert_eq!(loaded, manifest);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
