use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::atomic::write_bytes_atomic;
use crate::document::{DocumentPlan, Label};
use crate::error::{Error, Result};

/// Fixed ledger columns, in output order. Extra columns follow, sorted.
pub const BASE_COLUMNS: &[&str] = &[
    "doc_id",
    "filename",
    "format",
    "word_count_target",
    "sit_ids",
    "labels",
    "instances",
    "confidences",
    "tcs",
    "actual_file_path",
    "actual_word_count",
];

const LIST_SEPARATOR: &str = ";";

/// One row of the mapping ledger, keyed by `doc_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRow {
    pub doc_id: u64,
    pub filename: String,
    pub format: String,
    pub word_count_target: Option<u64>,
    pub sit_ids: String,
    pub labels: String,
    pub instances: String,
    pub confidences: String,
    pub tcs: String,
    pub actual_file_path: Option<String>,
    pub actual_word_count: Option<u64>,
    /// Columns contributed by later stages (ex.: `eml_path`).
    pub extra: BTreeMap<String, String>,
}

impl MappingRow {
    /// Flatten a document plan into ledger columns.
    pub fn from_plan(plan: &DocumentPlan) -> Self {
        let join = |values: Vec<String>| values.join(LIST_SEPARATOR);
        Self {
            doc_id: plan.doc_id,
            filename: plan.filename.clone(),
            format: plan.format.as_str().to_string(),
            word_count_target: Some(plan.word_count_target),
            sit_ids: join(plan.sits.iter().map(|s| s.sit_id.clone()).collect()),
            labels: join(plan.sits.iter().map(|s| s.label.to_string()).collect()),
            instances: join(plan.sits.iter().map(|s| s.instances.to_string()).collect()),
            confidences: join(plan.sits.iter().map(|s| s.confidence.to_string()).collect()),
            tcs: join(plan.tags().into_iter().map(str::to_string).collect()),
            actual_file_path: None,
            actual_word_count: None,
            extra: BTreeMap::new(),
        }
    }

    /// Column-wise merge, last writer wins for every column the incoming row sets.
    pub fn merge_from(&mut self, other: MappingRow) {
        fn take(target: &mut String, value: String) {
            if !value.is_empty() {
                *target = value;
            }
        }

        take(&mut self.filename, other.filename);
        take(&mut self.format, other.format);
        take(&mut self.sit_ids, other.sit_ids);
        take(&mut self.labels, other.labels);
        take(&mut self.instances, other.instances);
        take(&mut self.confidences, other.confidences);
        take(&mut self.tcs, other.tcs);
        if other.word_count_target.is_some() {
            self.word_count_target = other.word_count_target;
        }
        if other.actual_file_path.is_some() {
            self.actual_file_path = other.actual_file_path;
        }
        if other.actual_word_count.is_some() {
            self.actual_word_count = other.actual_word_count;
        }
        for (column, value) in other.extra {
            if !value.is_empty() {
                self.extra.insert(column, value);
            }
        }
    }

    /// Category ids by slot. Empty slots are kept so the lists stay aligned.
    pub fn sit_id_list(&self) -> Vec<&str> {
        split_slots(&self.sit_ids)
    }

    /// Labels aligned with `sit_id_list`. An empty slot is a missing label and
    /// reads as TP; any other value that is not `TP` reads as FP.
    pub fn label_list(&self) -> Vec<Label> {
        split_slots(&self.labels)
            .into_iter()
            .map(|value| match value {
                "" => Label::Tp,
                other => other.parse().unwrap_or(Label::Fp),
            })
            .collect()
    }

    /// Instance counts aligned with `sit_id_list`; empty or unparsable slots count as 1.
    pub fn instance_list(&self) -> Vec<u32> {
        split_slots(&self.instances)
            .into_iter()
            .map(|value| value.parse().unwrap_or(1))
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<String> {
        let value = match name {
            "doc_id" => Some(self.doc_id.to_string()),
            "filename" => Some(self.filename.clone()),
            "format" => Some(self.format.clone()),
            "word_count_target" => self.word_count_target.map(|value| value.to_string()),
            "sit_ids" => Some(self.sit_ids.clone()),
            "labels" => Some(self.labels.clone()),
            "instances" => Some(self.instances.clone()),
            "confidences" => Some(self.confidences.clone()),
            "tcs" => Some(self.tcs.clone()),
            "actual_file_path" => self.actual_file_path.clone(),
            "actual_word_count" => self.actual_word_count.map(|value| value.to_string()),
            other => self.extra.get(other).cloned(),
        };
        value.filter(|value| !value.is_empty())
    }

    fn set_column(&mut self, name: &str, value: &str) {
        let owned = value.to_string();
        match name {
            "doc_id" => {}
            "filename" => self.filename = owned,
            "format" => self.format = owned,
            "word_count_target" => self.word_count_target = value.trim().parse().ok(),
            "sit_ids" => self.sit_ids = owned,
            "labels" => self.labels = owned,
            "instances" => self.instances = owned,
            "confidences" => self.confidences = owned,
            "tcs" => self.tcs = owned,
            "actual_file_path" => self.actual_file_path = Some(owned).filter(|v| !v.is_empty()),
            "actual_word_count" => self.actual_word_count = value.trim().parse().ok(),
            other => {
                if !value.is_empty() {
                    self.extra.insert(other.to_string(), owned);
                }
            }
        }
    }
}

/// Positional split of a `;` list. One trailing separator is tolerated.
fn split_slots(value: &str) -> Vec<&str> {
    let value = value.trim();
    if value.is_empty() {
        return Vec::new();
    }
    let value = value.strip_suffix(LIST_SEPARATOR).unwrap_or(value);
    value.split(LIST_SEPARATOR).map(str::trim).collect()
}

/// Keyed mapping table shared by every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingLedger {
    rows: BTreeMap<u64, MappingRow>,
}

impl MappingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new row or merge it into the existing row with the same doc id.
    pub fn upsert(&mut self, row: MappingRow) {
        match self.rows.get_mut(&row.doc_id) {
            Some(existing) => existing.merge_from(row),
            None => {
                self.rows.insert(row.doc_id, row);
            }
        }
    }

    pub fn get(&self, doc_id: u64) -> Option<&MappingRow> {
        self.rows.get(&doc_id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &MappingRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header: base columns then every extra column seen in any row, sorted.
    pub fn columns(&self) -> Vec<String> {
        let extra: BTreeSet<&String> = self.rows.values().flat_map(|row| row.extra.keys()).collect();
        BASE_COLUMNS
            .iter()
            .map(|column| column.to_string())
            .chain(extra.into_iter().cloned())
            .collect()
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let columns = self.columns();
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(&columns)?;
        for row in self.rows.values() {
            let record: Vec<String> = columns
                .iter()
                .map(|column| row.column(column).unwrap_or_default())
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))
    }

    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers()?.clone();
        let mut ledger = Self::new();

        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let mut row = MappingRow::default();
            let mut doc_id = None;
            for (header, value) in headers.iter().zip(record.iter()) {
                if header == "doc_id" {
                    doc_id = value.trim().parse::<u64>().ok();
                } else {
                    row.set_column(header, value);
                }
            }
            match doc_id {
                Some(doc_id) => {
                    row.doc_id = doc_id;
                    ledger.upsert(row);
                }
                None => warn!(line = index + 2, "skipping ledger row without a valid doc_id"),
            }
        }

        Ok(ledger)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }

    /// Load the ledger when present, otherwise start empty.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Rewrite the full ledger atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_csv_bytes()?;
        write_bytes_atomic(path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(doc_id: u64) -> MappingRow {
        MappingRow {
            doc_id,
            filename: format!("doc_{doc_id:05}_email.txt"),
            format: "email".to_string(),
            word_count_target: Some(300),
            sit_ids: "SIT_CCN;SIT_SSN".to_string(),
            labels: "TP;FP".to_string(),
            instances: "3;1".to_string(),
            confidences: "Medium;Low".to_string(),
            tcs: "TC1".to_string(),
            ..MappingRow::default()
        }
    }

    #[test]
    fn upsert_merges_late_columns_instead_of_appending() {
        let mut ledger = MappingLedger::new();
        ledger.upsert(row(1));

        let mut update = MappingRow {
            doc_id: 1,
            actual_file_path: Some("out/files/doc_00001_email.txt".to_string()),
            actual_word_count: Some(310),
            ..MappingRow::default()
        };
        update
            .extra
            .insert("eml_path".to_string(), "out/files/doc_00001_email.eml".to_string());
        ledger.upsert(update);

        assert_eq!(ledger.len(), 1);
        let merged = ledger.get(1).expect("row");
        assert_eq!(merged.sit_ids, "SIT_CCN;SIT_SSN");
        assert_eq!(merged.actual_word_count, Some(310));
        assert_eq!(
            merged.column("eml_path").as_deref(),
            Some("out/files/doc_00001_email.eml")
        );
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let mut once = MappingLedger::new();
        once.upsert(row(4));
        let mut update = row(4);
        update.actual_word_count = Some(512);
        update.extra.insert("attachments".to_string(), "a.csv".to_string());

        once.upsert(update.clone());
        let mut twice = once.clone();
        twice.upsert(update);

        assert_eq!(once, twice);
    }

    #[test]
    fn conflicting_columns_resolve_to_last_writer() {
        let mut ledger = MappingLedger::new();
        ledger.upsert(row(2));
        let mut update = row(2);
        update.format = "chat".to_string();
        ledger.upsert(update);
        assert_eq!(ledger.get(2).map(|r| r.format.as_str()), Some("chat"));
    }

    #[test]
    fn csv_round_trip_keeps_extra_columns() {
        let mut ledger = MappingLedger::new();
        let mut first = row(1);
        first.extra.insert("eml_path".to_string(), "x.eml".to_string());
        ledger.upsert(first);
        ledger.upsert(row(2));

        let bytes = ledger.to_csv_bytes().expect("encode");
        let text = String::from_utf8(bytes.clone()).expect("utf8");
        assert!(text.starts_with("doc_id,filename,format"));
        assert!(text.lines().next().unwrap_or_default().ends_with("eml_path"));

        let parsed = MappingLedger::from_csv_reader(bytes.as_slice()).expect("decode");
        assert_eq!(parsed, ledger);
    }

    #[test]
    fn short_instance_lists_are_padded_by_callers() {
        let mut short = row(3);
        short.instances = "5;oops".to_string();
        assert_eq!(short.instance_list(), vec![5, 1]);
        assert_eq!(short.label_list(), vec![Label::Tp, Label::Fp]);
    }

    #[test]
    fn empty_slots_keep_lists_aligned_with_sit_ids() {
        let mut gaps = row(5);
        gaps.sit_ids = "SIT_A;SIT_B;SIT_C".to_string();
        gaps.instances = "3;;5".to_string();
        gaps.labels = "FP;;TP;".to_string();
        assert_eq!(gaps.sit_id_list(), vec!["SIT_A", "SIT_B", "SIT_C"]);
        assert_eq!(gaps.instance_list(), vec![3, 1, 5]);
        assert_eq!(gaps.label_list(), vec![Label::Fp, Label::Tp, Label::Tp]);

        gaps.instances = String::new();
        assert!(gaps.instance_list().is_empty());
    }

    #[test]
    fn rows_without_doc_id_are_skipped() {
        let csv = "doc_id,filename\n,orphan.txt\n7,doc_00007_chat.txt\n";
        let ledger = MappingLedger::from_csv_reader(csv.as_bytes()).expect("decode");
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get(7).is_some());
    }
}
