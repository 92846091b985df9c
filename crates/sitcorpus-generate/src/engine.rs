use std::any::Any;
use std::time::Instant;

use sitcorpus_core::{
    CorpusPaths, MappingLedger, MappingRow, PlainText, RenderedDocument, Representation,
    write_bytes_atomic, write_json_atomic,
};
use sitcorpus_plan::Manifest;
use tracing::{debug, info, warn};

use crate::context::GenerationContext;
use crate::errors::GenerationError;
use crate::generators::{ValueLibrary, ValueOrigin};
use crate::model::{GenerateOptions, GenerationIssue, GenerationReport};
use crate::render::ContentRenderer;

/// Result of a render run.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub paths: CorpusPaths,
    pub ledger: MappingLedger,
    pub report: GenerationReport,
}

/// Renders every planned document to `files/` and records the outcome in the
/// mapping ledger.
#[derive(Debug, Clone)]
pub struct RenderEngine {
    options: GenerateOptions,
}

impl RenderEngine {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    pub fn paths(&self) -> CorpusPaths {
        CorpusPaths::new(&self.options.out_dir)
    }

    /// Load `meta.json` from the output directory and render it.
    pub fn run_from_disk(&self) -> Result<RenderResult, GenerationError> {
        let paths = self.paths();
        let manifest_path = paths.manifest_path();
        if !manifest_path.exists() {
            return Err(GenerationError::InvalidManifest(format!(
                "manifest not found at {}",
                manifest_path.display()
            )));
        }
        let manifest = Manifest::load(&manifest_path)?;
        self.run(&manifest)
    }

    pub fn run(&self, manifest: &Manifest) -> Result<RenderResult, GenerationError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let paths = self.paths();
        paths.ensure_dirs()?;

        let library = ValueLibrary::new(&manifest.catalog);
        let renderer = ContentRenderer::new(&library);
        let text = PlainText;

        let ledger_path = paths.ledger_path();
        let mut ledger = MappingLedger::load_or_default(&ledger_path)?;
        for row in manifest.to_ledger().rows() {
            ledger.upsert(row.clone());
        }

        let mut report = GenerationReport::new(
            run_id.clone(),
            manifest.seed,
            manifest.docs.len() as u64,
        );
        let progress_every = self.options.progress_every.max(1);

        info!(
            run_id = %run_id,
            docs = manifest.docs.len(),
            seed = manifest.seed,
            out_dir = %paths.root.display(),
            "render started"
        );

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(
            || -> Result<(), GenerationError> {
                for plan in &manifest.docs {
                    let mut ctx = GenerationContext::for_document(manifest.seed, plan.doc_id);
                    let rendered = renderer.render(plan, &mut ctx);

                    for embedded in &rendered.values {
                        report.values_generated += 1;
                        report.record_generator_usage(embedded.value.kind);
                        match embedded.value.origin {
                            ValueOrigin::Generated => {}
                            ValueOrigin::Placeholder => report.placeholder_count += 1,
                            ValueOrigin::Fallback => report.fallback_count += 1,
                            ValueOrigin::FailedOver => {
                                report.failed_over_count += 1;
                                report.record_warning(
                                    GenerationIssue::warning(
                                        "generator_failed_over",
                                        "generator failed; fallback value embedded",
                                    )
                                    .for_doc(plan.doc_id)
                                    .for_sit(&embedded.sit_id),
                                );
                            }
                        }
                    }

                    let bytes = text.encode(&RenderedDocument {
                        plan,
                        text: &rendered.text,
                        attachments: &[],
                    })?;
                    let file_path = paths.file_path(&plan.filename);
                    write_bytes_atomic(&file_path, &bytes)?;

                    ledger.upsert(MappingRow {
                        doc_id: plan.doc_id,
                        actual_file_path: Some(file_path.display().to_string()),
                        actual_word_count: Some(rendered.word_count),
                        ..MappingRow::default()
                    });

                    report.docs_rendered += 1;
                    report.words_written += rendered.word_count;
                    report.bytes_written += bytes.len() as u64;
                    debug!(
                        doc_id = plan.doc_id,
                        format = %plan.format,
                        words = rendered.word_count,
                        target = plan.word_count_target,
                        "document rendered"
                    );
                    if report.docs_rendered % progress_every == 0 {
                        info!(
                            run_id = %run_id,
                            rendered = report.docs_rendered,
                            total = manifest.docs.len(),
                            "render progress"
                        );
                    }
                }
                ledger.save(&ledger_path)?;
                Ok(())
            },
        ));

        report.duration_ms = start.elapsed().as_millis() as u64;
        let report_path = paths.generation_report_path();
        let write_report = |report: &GenerationReport| -> Result<(), GenerationError> {
            write_json_atomic(&report_path, report)?;
            Ok(())
        };

        match outcome {
            Ok(Ok(())) => {
                write_report(&report)?;
                info!(
                    run_id = %run_id,
                    docs = report.docs_rendered,
                    words = report.words_written,
                    fallback = report.fallback_count,
                    failed_over = report.failed_over_count,
                    duration_ms = report.duration_ms,
                    "render completed"
                );
                Ok(RenderResult {
                    paths,
                    ledger,
                    report,
                })
            }
            Ok(Err(err)) => {
                report.failure = Some(err.to_string());
                write_report(&report)?;
                warn!(run_id = %run_id, error = %err, "render failed");
                Err(err)
            }
            Err(panic) => {
                report.failure = Some(panic_message(panic));
                write_report(&report)?;
                warn!(run_id = %run_id, "render panicked");
                Err(GenerationError::Failed(Box::new(report)))
            }
        }
    }
}

pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic: unknown".to_string()
    }
}
