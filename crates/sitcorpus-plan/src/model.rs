use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::RangeInclusive;

use schemars::JsonSchema;
use schemars::r#gen::SchemaGenerator;
use schemars::schema::Schema;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sitcorpus_core::{Category, DocumentFormat};

/// Corpus configuration: catalog plus the distributions the planner samples.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CorpusConfig {
    /// Seed for every random draw; a fresh seed is drawn and recorded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    /// Documents each category must appear in.
    #[serde(default = "default_per_sit_count")]
    pub per_sit_count: u64,
    /// Probability that an assignment is labeled TP.
    #[serde(default = "default_tp_ratio")]
    pub tp_ratio: f64,
    /// Formats drawn uniformly per document.
    #[serde(default = "default_formats")]
    pub formats: Vec<DocumentFormat>,
    /// Probability of each categories-per-document bucket.
    #[serde(default = "default_sit_count_distribution")]
    pub sit_count_distribution: BucketDistribution<SitCountBucket>,
    /// Probability of each instances-per-assignment bucket.
    #[serde(default = "default_instance_count_distribution")]
    pub instance_count_distribution: BucketDistribution<InstanceBucket>,
    #[serde(default)]
    pub confidence_rules: ConfidenceRules,
    #[serde(default)]
    pub size_distribution: SizeDistribution,
    /// Category catalog, in planning order.
    pub sits: Vec<Category>,
}

impl CorpusConfig {
    /// Config with every default and the given catalog.
    pub fn with_catalog(sits: Vec<Category>) -> Self {
        Self {
            random_seed: None,
            per_sit_count: default_per_sit_count(),
            tp_ratio: default_tp_ratio(),
            formats: default_formats(),
            sit_count_distribution: default_sit_count_distribution(),
            instance_count_distribution: default_instance_count_distribution(),
            confidence_rules: ConfidenceRules::default(),
            size_distribution: SizeDistribution::default(),
            sits,
        }
    }
}

/// Confidence tier thresholds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConfidenceRules {
    #[serde(default)]
    pub high: HighConfidenceRule,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HighConfidenceRule {
    /// TP assignments with at least this many instances are High.
    #[serde(default = "default_high_min_instances")]
    pub min_instances: u32,
}

impl Default for HighConfidenceRule {
    fn default() -> Self {
        Self {
            min_instances: default_high_min_instances(),
        }
    }
}

/// Word-count target distribution.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SizeDistribution {
    /// Share of documents drawn from the main range.
    #[serde(default = "default_main_range_share")]
    pub main_range_share: f64,
    #[serde(default = "default_main_range_min")]
    pub main_range_min: u64,
    #[serde(default = "default_main_range_max")]
    pub main_range_max: u64,
    #[serde(default = "default_min_words")]
    pub min_words: u64,
    #[serde(default = "default_max_words")]
    pub max_words: u64,
}

impl Default for SizeDistribution {
    fn default() -> Self {
        Self {
            main_range_share: default_main_range_share(),
            main_range_min: default_main_range_min(),
            main_range_max: default_main_range_max(),
            min_words: default_min_words(),
            max_words: default_max_words(),
        }
    }
}

/// A named bucket resolving to an inclusive integer range.
pub trait Bucket: Copy + Ord {
    fn key(self) -> &'static str;
    fn range(self) -> RangeInclusive<u32>;
    fn parse(key: &str) -> Result<Self, String>;
}

/// Bucket probabilities in the order the config declares them.
///
/// Draws walk this order and a draw past the cumulative total resolves to the
/// last declared bucket, so the order is part of the contract. A repeated key
/// overwrites the earlier probability in place.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketDistribution<B> {
    entries: Vec<(B, f64)>,
}

impl<B: Bucket> BucketDistribution<B> {
    pub fn insert(&mut self, bucket: B, probability: f64) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == bucket) {
            Some(entry) => entry.1 = probability,
            None => self.entries.push((bucket, probability)),
        }
    }

    pub fn get(&self, bucket: B) -> Option<f64> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == bucket)
            .map(|(_, probability)| *probability)
    }

    pub fn iter(&self) -> impl Iterator<Item = (B, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn buckets(&self) -> impl Iterator<Item = B> + '_ {
        self.entries.iter().map(|(bucket, _)| *bucket)
    }

    /// Last bucket in declaration order.
    pub fn last(&self) -> Option<B> {
        self.entries.last().map(|(bucket, _)| *bucket)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<B> Default for BucketDistribution<B> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<B: Bucket> FromIterator<(B, f64)> for BucketDistribution<B> {
    fn from_iter<I: IntoIterator<Item = (B, f64)>>(iter: I) -> Self {
        let mut distribution = Self::default();
        for (bucket, probability) in iter {
            distribution.insert(bucket, probability);
        }
        distribution
    }
}

impl<B: Bucket, const N: usize> From<[(B, f64); N]> for BucketDistribution<B> {
    fn from(entries: [(B, f64); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<B: Bucket> Serialize for BucketDistribution<B> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (bucket, probability) in &self.entries {
            map.serialize_entry(bucket.key(), probability)?;
        }
        map.end()
    }
}

impl<'de, B: Bucket> Deserialize<'de> for BucketDistribution<B> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DistributionVisitor<B>(PhantomData<B>);

        impl<'de, B: Bucket> Visitor<'de> for DistributionVisitor<B> {
            type Value = BucketDistribution<B>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of bucket keys to probabilities")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut distribution = BucketDistribution::default();
                while let Some((key, probability)) = access.next_entry::<String, f64>()? {
                    let bucket = B::parse(&key).map_err(serde::de::Error::custom)?;
                    distribution.insert(bucket, probability);
                }
                Ok(distribution)
            }
        }

        deserializer.deserialize_map(DistributionVisitor(PhantomData))
    }
}

impl<B> JsonSchema for BucketDistribution<B> {
    fn is_referenceable() -> bool {
        false
    }

    fn schema_name() -> String {
        "BucketDistribution".to_string()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        <BTreeMap<String, f64>>::json_schema(generator)
    }
}

/// Categories-per-document bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SitCountBucket {
    One,
    TwoToThree,
    FourToSix,
    MoreThanSix,
}

impl Bucket for SitCountBucket {
    fn key(self) -> &'static str {
        match self {
            SitCountBucket::One => "1",
            SitCountBucket::TwoToThree => "2-3",
            SitCountBucket::FourToSix => "4-6",
            SitCountBucket::MoreThanSix => ">6",
        }
    }

    fn range(self) -> RangeInclusive<u32> {
        match self {
            SitCountBucket::One => 1..=1,
            SitCountBucket::TwoToThree => 2..=3,
            SitCountBucket::FourToSix => 4..=6,
            SitCountBucket::MoreThanSix => 7..=10,
        }
    }

    fn parse(key: &str) -> Result<Self, String> {
        Self::try_from(key.to_string())
    }
}

impl TryFrom<String> for SitCountBucket {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "1" => Ok(SitCountBucket::One),
            "2-3" => Ok(SitCountBucket::TwoToThree),
            "4-6" => Ok(SitCountBucket::FourToSix),
            ">6" => Ok(SitCountBucket::MoreThanSix),
            other => Err(format!(
                "unknown sit count bucket '{other}' (expected one of 1, 2-3, 4-6, >6)"
            )),
        }
    }
}

impl From<SitCountBucket> for String {
    fn from(bucket: SitCountBucket) -> Self {
        bucket.key().to_string()
    }
}

impl fmt::Display for SitCountBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Instances-per-assignment bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InstanceBucket {
    One,
    ThreeToFive,
    SixToTen,
    MoreThanTen,
}

impl Bucket for InstanceBucket {
    fn key(self) -> &'static str {
        match self {
            InstanceBucket::One => "1",
            InstanceBucket::ThreeToFive => "3-5",
            InstanceBucket::SixToTen => "6-10",
            InstanceBucket::MoreThanTen => ">10",
        }
    }

    fn range(self) -> RangeInclusive<u32> {
        match self {
            InstanceBucket::One => 1..=1,
            InstanceBucket::ThreeToFive => 3..=5,
            InstanceBucket::SixToTen => 6..=10,
            InstanceBucket::MoreThanTen => 11..=20,
        }
    }

    fn parse(key: &str) -> Result<Self, String> {
        Self::try_from(key.to_string())
    }
}

impl TryFrom<String> for InstanceBucket {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "1" => Ok(InstanceBucket::One),
            "3-5" => Ok(InstanceBucket::ThreeToFive),
            "6-10" => Ok(InstanceBucket::SixToTen),
            ">10" => Ok(InstanceBucket::MoreThanTen),
            other => Err(format!(
                "unknown instance bucket '{other}' (expected one of 1, 3-5, 6-10, >10)"
            )),
        }
    }
}

impl From<InstanceBucket> for String {
    fn from(bucket: InstanceBucket) -> Self {
        bucket.key().to_string()
    }
}

impl fmt::Display for InstanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn default_per_sit_count() -> u64 {
    100
}

fn default_tp_ratio() -> f64 {
    0.5
}

fn default_formats() -> Vec<DocumentFormat> {
    vec![DocumentFormat::Document]
}

fn default_sit_count_distribution() -> BucketDistribution<SitCountBucket> {
    BucketDistribution::from([
        (SitCountBucket::One, 0.4),
        (SitCountBucket::TwoToThree, 0.35),
        (SitCountBucket::FourToSix, 0.2),
        (SitCountBucket::MoreThanSix, 0.05),
    ])
}

fn default_instance_count_distribution() -> BucketDistribution<InstanceBucket> {
    BucketDistribution::from([
        (InstanceBucket::One, 0.5),
        (InstanceBucket::ThreeToFive, 0.3),
        (InstanceBucket::SixToTen, 0.15),
        (InstanceBucket::MoreThanTen, 0.05),
    ])
}

fn default_high_min_instances() -> u32 {
    6
}

fn default_main_range_share() -> f64 {
    0.65
}

fn default_main_range_min() -> u64 {
    300
}

fn default_main_range_max() -> u64 {
    800
}

fn default_min_words() -> u64 {
    50
}

fn default_max_words() -> u64 {
    3000
}
