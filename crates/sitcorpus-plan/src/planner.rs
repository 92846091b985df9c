use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use sitcorpus_core::{Category, Confidence, DocumentFormat, DocumentPlan, Label, SitAssignment};
use tracing::{debug, warn};

use crate::model::{Bucket, BucketDistribution, CorpusConfig, InstanceBucket, SitCountBucket};

/// Ceiling multiplier: total documents never exceed `categories * target * 2.5`.
const SAFETY_FACTOR: f64 = 2.5;

/// Per-category coverage accumulated while planning. Counts only grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageCounters {
    docs: BTreeMap<String, u64>,
    instances: BTreeMap<String, u64>,
}

impl CoverageCounters {
    /// Documents planned so far that contain `sit_id`.
    pub fn doc_count(&self, sit_id: &str) -> u64 {
        self.docs.get(sit_id).copied().unwrap_or(0)
    }

    pub fn instance_count(&self, sit_id: &str) -> u64 {
        self.instances.get(sit_id).copied().unwrap_or(0)
    }

    pub fn record(&mut self, assignment: &SitAssignment) {
        *self.docs.entry(assignment.sit_id.clone()).or_insert(0) += 1;
        *self.instances.entry(assignment.sit_id.clone()).or_insert(0) +=
            u64::from(assignment.instances);
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// True once something was counted and every catalog category reached `target`.
    pub fn satisfies(&self, catalog: &[Category], target: u64) -> bool {
        !self.is_empty()
            && catalog
                .iter()
                .all(|category| self.doc_count(&category.id) >= target)
    }

    pub fn doc_counts(&self) -> &BTreeMap<String, u64> {
        &self.docs
    }

    pub fn instance_counts(&self) -> &BTreeMap<String, u64> {
        &self.instances
    }
}

/// Planning output before it is wrapped into a manifest.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub docs: Vec<DocumentPlan>,
    pub counters: CoverageCounters,
    pub converged: bool,
    pub safety_ceiling: u64,
}

/// Converges a stochastic document sampler onto per-category coverage targets.
#[derive(Debug, Clone, Copy)]
pub struct CorpusPlanner<'a> {
    config: &'a CorpusConfig,
}

impl<'a> CorpusPlanner<'a> {
    pub fn new(config: &'a CorpusConfig) -> Self {
        Self { config }
    }

    pub fn safety_ceiling(&self) -> u64 {
        let categories = self.config.sits.len() as f64;
        (categories * self.config.per_sit_count as f64 * SAFETY_FACTOR).floor() as u64
    }

    /// Plan documents until coverage is met or the safety ceiling is hit.
    ///
    /// Every plan shares `created_at`, so a fixed rng and timestamp give a
    /// byte-identical manifest.
    pub fn plan<R: Rng>(&self, rng: &mut R, created_at: DateTime<Utc>) -> PlanOutcome {
        let target = self.config.per_sit_count;
        let ceiling = self.safety_ceiling();
        let mut counters = CoverageCounters::default();
        let mut docs = Vec::new();

        loop {
            if counters.satisfies(&self.config.sits, target) || docs.len() as u64 >= ceiling {
                break;
            }
            let doc_id = docs.len() as u64 + 1;
            let plan = self.plan_document(rng, doc_id, &counters, created_at);
            for assignment in &plan.sits {
                counters.record(assignment);
            }
            debug!(doc_id, sits = plan.sits.len(), format = %plan.format, "document planned");
            docs.push(plan);
        }

        let converged = counters.satisfies(&self.config.sits, target);
        if !converged {
            warn!(
                docs = docs.len(),
                ceiling, target, "planner stopped at the safety ceiling before full coverage"
            );
        }

        PlanOutcome {
            docs,
            counters,
            converged,
            safety_ceiling: ceiling,
        }
    }

    fn plan_document<R: Rng>(
        &self,
        rng: &mut R,
        doc_id: u64,
        counters: &CoverageCounters,
        created_at: DateTime<Utc>,
    ) -> DocumentPlan {
        let format = self
            .config
            .formats
            .choose(rng)
            .copied()
            .unwrap_or(DocumentFormat::Document);

        let bucket = draw_bucket(&self.config.sit_count_distribution, rng)
            .unwrap_or(SitCountBucket::One);
        let wanted = rng.random_range(bucket.range()) as usize;

        let sits = self
            .least_served(counters, wanted)
            .into_iter()
            .map(|category| self.assign(rng, category))
            .collect();

        DocumentPlan {
            doc_id,
            filename: DocumentPlan::filename_for(doc_id, format),
            format,
            word_count_target: self.draw_word_target(rng),
            sits,
            created_at,
        }
    }

    /// Catalog order, stable-sorted by current document count ascending.
    fn least_served(&self, counters: &CoverageCounters, wanted: usize) -> Vec<&'a Category> {
        let mut candidates: Vec<&'a Category> = self.config.sits.iter().collect();
        candidates.sort_by_key(|category| counters.doc_count(&category.id));

        let mut chosen: Vec<&'a Category> = Vec::with_capacity(wanted);
        for category in candidates {
            if chosen.len() >= wanted {
                break;
            }
            if !chosen.iter().any(|picked| picked.id == category.id) {
                chosen.push(category);
            }
        }
        chosen
    }

    fn assign<R: Rng>(&self, rng: &mut R, category: &Category) -> SitAssignment {
        let label = if rng.random::<f64>() < self.config.tp_ratio {
            Label::Tp
        } else {
            Label::Fp
        };
        let bucket = draw_bucket(&self.config.instance_count_distribution, rng)
            .unwrap_or(InstanceBucket::One);
        let instances = rng.random_range(bucket.range());
        let confidence = Confidence::derive(
            label,
            instances,
            self.config.confidence_rules.high.min_instances,
        );

        SitAssignment {
            sit_id: category.id.clone(),
            sit_name: category.display_name().to_string(),
            label,
            instances,
            confidence,
            tcs: category.tc.clone(),
        }
    }

    fn draw_word_target<R: Rng>(&self, rng: &mut R) -> u64 {
        let size = &self.config.size_distribution;
        let (low, high) = if rng.random::<f64>() < size.main_range_share {
            (size.main_range_min, size.main_range_max)
        } else {
            (size.min_words, size.max_words)
        };
        rng.random_range(low.min(high)..=low.max(high))
    }
}

/// Cumulative-probability draw in declaration order; a draw past the total
/// resolves to the last declared bucket.
pub fn draw_bucket<B: Bucket, R: Rng>(
    distribution: &BucketDistribution<B>,
    rng: &mut R,
) -> Option<B> {
    draw_bucket_at(distribution, rng.random())
}

fn draw_bucket_at<B: Bucket>(distribution: &BucketDistribution<B>, r: f64) -> Option<B> {
    let mut cumulative = 0.0;
    for (bucket, probability) in distribution.iter() {
        cumulative += probability;
        if r <= cumulative {
            return Some(bucket);
        }
    }
    distribution.last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn catalog(n: usize) -> Vec<Category> {
        (0..n)
            .map(|idx| Category::new(format!("SIT_{idx}"), format!("Type {idx}")))
            .collect()
    }

    fn config(n: usize, target: u64) -> CorpusConfig {
        let mut config = CorpusConfig::with_catalog(catalog(n));
        config.per_sit_count = target;
        config
    }

    #[test]
    fn converges_on_every_category() {
        let config = config(12, 5);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let outcome = CorpusPlanner::new(&config).plan(&mut rng, Utc::now());

        assert!(outcome.converged);
        for category in &config.sits {
            assert!(outcome.counters.doc_count(&category.id) >= 5);
        }
        assert!(outcome.docs.len() as u64 <= outcome.safety_ceiling);
    }

    #[test]
    fn plans_are_non_empty_without_duplicates() {
        let config = config(9, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let outcome = CorpusPlanner::new(&config).plan(&mut rng, Utc::now());

        for (idx, plan) in outcome.docs.iter().enumerate() {
            assert_eq!(plan.doc_id, idx as u64 + 1);
            assert!(!plan.sits.is_empty());
            let unique: HashSet<&str> = plan.sit_ids().into_iter().collect();
            assert_eq!(unique.len(), plan.sits.len());
            assert!(plan.sits.iter().all(|sit| sit.instances >= 1));
        }
    }

    #[test]
    fn single_category_target_one_yields_one_plan() {
        let mut config = config(1, 1);
        config.tp_ratio = 1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let outcome = CorpusPlanner::new(&config).plan(&mut rng, Utc::now());

        assert_eq!(outcome.docs.len(), 1);
        assert_eq!(outcome.docs[0].sits[0].label, Label::Tp);
        assert!(outcome.converged);
    }

    #[test]
    fn same_seed_and_timestamp_give_identical_plans() {
        let config = config(6, 3);
        let now = Utc::now();
        let first = CorpusPlanner::new(&config).plan(&mut ChaCha8Rng::seed_from_u64(5), now);
        let second = CorpusPlanner::new(&config).plan(&mut ChaCha8Rng::seed_from_u64(5), now);
        assert_eq!(first.docs, second.docs);
    }

    #[test]
    fn safety_ceiling_follows_catalog_size_and_target() {
        let config = config(3, 2);
        let planner = CorpusPlanner::new(&config);
        assert_eq!(planner.safety_ceiling(), 15);

        // Partial coverage never satisfies the target.
        let mut counters = CoverageCounters::default();
        assert!(!counters.satisfies(&config.sits, 1));
        counters.record(&SitAssignment {
            sit_id: "SIT_0".to_string(),
            sit_name: "Type 0".to_string(),
            label: Label::Fp,
            instances: 2,
            confidence: Confidence::Low,
            tcs: Vec::new(),
        });
        assert!(!counters.satisfies(&config.sits, 1));
        assert_eq!(counters.instance_count("SIT_0"), 2);
    }

    #[test]
    fn least_served_prefers_uncounted_categories_in_catalog_order() {
        let config = config(4, 10);
        let planner = CorpusPlanner::new(&config);
        let mut counters = CoverageCounters::default();
        for id in ["SIT_0", "SIT_2"] {
            counters.record(&SitAssignment {
                sit_id: id.to_string(),
                sit_name: id.to_string(),
                label: Label::Tp,
                instances: 1,
                confidence: Confidence::Low,
                tcs: Vec::new(),
            });
        }
        let picked: Vec<&str> = planner
            .least_served(&counters, 3)
            .iter()
            .map(|category| category.id.as_str())
            .collect();
        assert_eq!(picked, vec!["SIT_1", "SIT_3", "SIT_0"]);
    }

    #[test]
    fn bucket_draw_falls_back_to_last_bucket() {
        let distribution = BucketDistribution::from([
            (InstanceBucket::One, 0.0),
            (InstanceBucket::ThreeToFive, 0.0),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            let bucket = draw_bucket(&distribution, &mut rng);
            assert_eq!(bucket, Some(InstanceBucket::ThreeToFive));
        }
    }

    #[test]
    fn bucket_draw_walks_declaration_order() {
        // Declared out of tier order and summing below one.
        let distribution =
            BucketDistribution::from([(SitCountBucket::MoreThanSix, 0.05), (SitCountBucket::One, 0.4)]);
        assert_eq!(draw_bucket_at(&distribution, 0.03), Some(SitCountBucket::MoreThanSix));
        assert_eq!(draw_bucket_at(&distribution, 0.3), Some(SitCountBucket::One));
        assert_eq!(draw_bucket_at(&distribution, 0.99), Some(SitCountBucket::One));

        let reversed =
            BucketDistribution::from([(SitCountBucket::One, 0.4), (SitCountBucket::MoreThanSix, 0.05)]);
        assert_eq!(draw_bucket_at(&reversed, 0.99), Some(SitCountBucket::MoreThanSix));
        assert_eq!(draw_bucket_at(&reversed, 0.3), Some(SitCountBucket::One));
    }

    #[test]
    fn configured_order_drives_the_fallback_bucket() {
        let json = r#"{"sits":[{"id":"SIT_A"}],"instance_count_distribution":{">10":0.0,"1":0.0}}"#;
        let config: CorpusConfig = serde_json::from_str(json).expect("config");
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        for _ in 0..10 {
            assert_eq!(
                draw_bucket(&config.instance_count_distribution, &mut rng),
                Some(InstanceBucket::One)
            );
        }
    }

    #[test]
    fn word_targets_stay_inside_configured_ranges() {
        let config = config(5, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let outcome = CorpusPlanner::new(&config).plan(&mut rng, Utc::now());
        let size = &config.size_distribution;
        for plan in &outcome.docs {
            assert!(plan.word_count_target >= size.min_words);
            assert!(plan.word_count_target <= size.max_words);
        }
    }
}
