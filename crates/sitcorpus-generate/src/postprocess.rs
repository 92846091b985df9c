//! Post-processor: derives extra representations from the rendered text and
//! merges their paths into the mapping ledger.
//!
//! A row that cannot be processed (unknown doc id, missing text file, encode
//! failure) is logged and skipped; the remaining rows still run.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use sitcorpus_core::{
    Attachment, CorpusPaths, DocumentFormat, DocumentPlan, EmlMessage, MappingLedger, MappingRow,
    RenderedDocument, Representation, write_bytes_atomic, write_json_atomic,
};
use sitcorpus_plan::Manifest;
use tracing::{info, warn};

use crate::errors::GenerationError;
use crate::model::{GenerateOptions, GenerationIssue, PostprocessReport};
use crate::render::attachment_file_name;

pub const ATTACHMENTS_COLUMN: &str = "attachments";
pub const POSTPROCESSED_AT_COLUMN: &str = "postprocessed_at";

const ATTACHMENT_COLUMNS: &[&str] = &["sit_id", "sit_name", "label", "instances", "confidence", "tcs"];

#[derive(Debug, Clone)]
pub struct PostprocessResult {
    pub ledger: MappingLedger,
    pub report: PostprocessReport,
}

pub struct Postprocessor {
    options: GenerateOptions,
    representations: Vec<Box<dyn Representation>>,
}

impl Postprocessor {
    /// Post-processor with the in-tree e-mail representation.
    pub fn new(options: GenerateOptions) -> Self {
        Self::with_representations(options, vec![Box::new(EmlMessage)])
    }

    pub fn with_representations(
        options: GenerateOptions,
        representations: Vec<Box<dyn Representation>>,
    ) -> Self {
        Self {
            options,
            representations,
        }
    }

    pub fn run_from_disk(&self) -> Result<PostprocessResult, GenerationError> {
        let paths = CorpusPaths::new(&self.options.out_dir);
        let manifest = Manifest::load(&paths.manifest_path())?;
        self.run(&manifest)
    }

    pub fn run(&self, manifest: &Manifest) -> Result<PostprocessResult, GenerationError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let paths = CorpusPaths::new(&self.options.out_dir);
        let ledger_path = paths.ledger_path();
        if !ledger_path.exists() {
            return Err(GenerationError::InvalidManifest(format!(
                "mapping ledger not found at {}",
                ledger_path.display()
            )));
        }
        let mut ledger = MappingLedger::load(&ledger_path)?;
        let plans: HashMap<u64, &DocumentPlan> =
            manifest.docs.iter().map(|plan| (plan.doc_id, plan)).collect();
        let mut report = PostprocessReport::new(run_id.clone());

        info!(run_id = %run_id, rows = ledger.len(), "post-processing started");

        let mut updates = Vec::new();
        for row in ledger.rows() {
            report.rows_seen += 1;
            match self.process_row(&paths, row, &plans, &mut report) {
                Ok(Some(update)) => {
                    report.rows_processed += 1;
                    updates.push(update);
                }
                Ok(None) => {}
                Err(err) => {
                    report.rows_skipped += 1;
                    warn!(doc_id = row.doc_id, error = %err, "post-processing failed for row");
                    report.warnings.push(
                        GenerationIssue::warning("postprocess_failed", err.to_string())
                            .for_doc(row.doc_id),
                    );
                }
            }
        }
        for update in updates {
            ledger.upsert(update);
        }
        ledger.save(&ledger_path)?;

        report.duration_ms = start.elapsed().as_millis() as u64;
        write_json_atomic(&paths.postprocess_report_path(), &report)?;
        info!(
            run_id = %run_id,
            processed = report.rows_processed,
            skipped = report.rows_skipped,
            attachments = report.attachments_written,
            duration_ms = report.duration_ms,
            "post-processing completed"
        );
        Ok(PostprocessResult { ledger, report })
    }

    /// `Ok(None)` means the row has nothing to post-process.
    fn process_row(
        &self,
        paths: &CorpusPaths,
        row: &MappingRow,
        plans: &HashMap<u64, &DocumentPlan>,
        report: &mut PostprocessReport,
    ) -> Result<Option<MappingRow>, GenerationError> {
        let Some(plan) = plans.get(&row.doc_id).copied() else {
            report.rows_skipped += 1;
            warn!(doc_id = row.doc_id, "ledger row has no planned document; skipping");
            return Ok(None);
        };
        let applicable: Vec<&dyn Representation> = self
            .representations
            .iter()
            .map(|representation| representation.as_ref())
            .filter(|representation| representation.applies_to(plan.format))
            .collect();
        if applicable.is_empty() {
            return Ok(None);
        }

        let text_path = text_path_for(paths, row, plan);
        if !text_path.exists() {
            report.rows_skipped += 1;
            warn!(doc_id = row.doc_id, path = %text_path.display(), "rendered text missing; skipping");
            return Ok(None);
        }
        let text = std::fs::read_to_string(&text_path)?;

        let mut update = MappingRow {
            doc_id: row.doc_id,
            ..MappingRow::default()
        };
        let mut attachments = Vec::new();
        let mut attachment_paths = Vec::new();
        if plan.format == DocumentFormat::EmailWithAttachment {
            let attachment = attachment_for(plan)?;
            let path = paths.file_path(&attachment.file_name);
            write_bytes_atomic(&path, &attachment.data)?;
            report.attachments_written += 1;
            attachment_paths.push(path.display().to_string());
            attachments.push(attachment);
        }

        let doc = RenderedDocument {
            plan,
            text: &text,
            attachments: &attachments,
        };
        for representation in applicable {
            let bytes = representation.encode(&doc)?;
            let path = paths.file_path(&format!("{}.{}", plan.stem(), representation.extension()));
            write_bytes_atomic(&path, &bytes)?;
            report.record_artifact(representation.id());
            update
                .extra
                .insert(representation.column().to_string(), path.display().to_string());
        }

        if !attachment_paths.is_empty() {
            update
                .extra
                .insert(ATTACHMENTS_COLUMN.to_string(), attachment_paths.join(";"));
        }
        update
            .extra
            .insert(POSTPROCESSED_AT_COLUMN.to_string(), Utc::now().to_rfc3339());
        Ok(Some(update))
    }
}

impl std::fmt::Debug for Postprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.representations.iter().map(|r| r.id()).collect();
        f.debug_struct("Postprocessor")
            .field("options", &self.options)
            .field("representations", &ids)
            .finish()
    }
}

/// Recorded text path first, then `files/<filename>`.
fn text_path_for(paths: &CorpusPaths, row: &MappingRow, plan: &DocumentPlan) -> PathBuf {
    row.actual_file_path
        .as_ref()
        .map(PathBuf::from)
        .filter(|path| path.exists())
        .unwrap_or_else(|| paths.file_path(&plan.filename))
}

/// Summary CSV of the document's assignments.
pub fn attachment_for(plan: &DocumentPlan) -> Result<Attachment, GenerationError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ATTACHMENT_COLUMNS)?;
    for sit in &plan.sits {
        let instances = sit.instances.to_string();
        let tcs = sit.tcs.join(",");
        writer.write_record([
            sit.sit_id.as_str(),
            sit.sit_name.as_str(),
            sit.label.as_str(),
            instances.as_str(),
            sit.confidence.as_str(),
            tcs.as_str(),
        ])?;
    }
    let data = writer
        .into_inner()
        .map_err(|err| GenerationError::Io(err.into_error()))?;
    Ok(Attachment {
        file_name: attachment_file_name(plan),
        content_type: "text/csv".to_string(),
        data,
    })
}
