use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use sitcorpus_core::{Category, DocumentFormat, EmlMessage, Label, MappingLedger, Representation};
use sitcorpus_generate::generators::{iban_is_valid, luhn_is_valid};
use sitcorpus_generate::{GenerateOptions, Postprocessor, RenderEngine};
use sitcorpus_plan::{CorpusConfig, Manifest, SizeDistribution, build_manifest};

fn hash_file(path: &Path) -> Result<String, std::io::Error> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn temp_out(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sitcorpus_{label}_{}", uuid::Uuid::new_v4()))
}

fn config(formats: Vec<DocumentFormat>) -> CorpusConfig {
    let mut config = CorpusConfig::with_catalog(vec![
        Category::new("SIT_CCN", "Credit Card Number")
            .with_regex(r"\b(?:\d[ -]*?){13,16}\b")
            .with_tags(["TC1"]),
        Category::new("SIT_IBAN", "IBAN").with_tags(["TC2"]),
        Category::new("SIT_BADGE", "Employee Badge"),
    ]);
    config.random_seed = Some(7);
    config.per_sit_count = 3;
    config.formats = formats;
    config.size_distribution = SizeDistribution {
        main_range_share: 0.5,
        main_range_min: 60,
        main_range_max: 120,
        min_words: 50,
        max_words: 200,
    };
    config
}

fn manifest(formats: Vec<DocumentFormat>) -> Manifest {
    build_manifest(&config(formats), 7).expect("manifest")
}

fn render(out_dir: &Path, manifest: &Manifest) -> MappingLedger {
    let options = GenerateOptions {
        out_dir: out_dir.to_path_buf(),
        progress_every: 100,
    };
    RenderEngine::new(options)
        .run(manifest)
        .expect("render succeeds")
        .ledger
}

fn file_hashes(files_dir: &Path) -> BTreeMap<String, String> {
    let mut hashes = BTreeMap::new();
    for entry in std::fs::read_dir(files_dir).expect("read files dir") {
        let path = entry.expect("dir entry").path();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        hashes.insert(name, hash_file(&path).expect("hash file"));
    }
    hashes
}

#[test]
fn same_manifest_renders_identical_files() {
    let manifest = manifest(vec![
        DocumentFormat::Document,
        DocumentFormat::Email,
        DocumentFormat::Chat,
    ]);
    let first = temp_out("golden_a");
    let second = temp_out("golden_b");
    render(&first, &manifest);
    render(&second, &manifest);

    let first_hashes = file_hashes(&first.join("files"));
    assert_eq!(first_hashes.len(), manifest.docs.len());
    assert_eq!(first_hashes, file_hashes(&second.join("files")));
}

#[test]
fn render_fills_ledger_and_meets_word_targets() {
    let manifest = manifest(vec![DocumentFormat::Document]);
    let out_dir = temp_out("render");
    let ledger = render(&out_dir, &manifest);

    assert_eq!(ledger.len(), manifest.docs.len());
    for plan in &manifest.docs {
        let row = ledger.get(plan.doc_id).expect("ledger row");
        let path = row.actual_file_path.as_deref().expect("file path");
        let text = std::fs::read_to_string(path).expect("rendered text");
        let words = row.actual_word_count.expect("word count");
        assert!(words >= plan.word_count_target, "doc {} is short", plan.doc_id);
        assert_eq!(words, text.split_whitespace().count() as u64);

        for sit in &plan.sits {
            let prefix = format!("{}: ", sit.sit_name);
            let values: Vec<&str> = text
                .lines()
                .filter_map(|line| line.strip_prefix(prefix.as_str()))
                .collect();
            assert_eq!(values.len() as u32, sit.instances);
            for value in values {
                match (sit.sit_id.as_str(), sit.label) {
                    ("SIT_CCN", Label::Tp) => assert!(luhn_is_valid(value), "{value}"),
                    ("SIT_IBAN", Label::Tp) => assert!(iban_is_valid(value), "{value}"),
                    ("SIT_BADGE", Label::Tp) => assert_eq!(value, "<EMPLOYEE_BADGE_VALUE>"),
                    ("SIT_BADGE", Label::Fp) => assert_eq!(value, "REDACTED_SIT_BADGE"),
                    ("SIT_CCN", Label::Fp) => assert_eq!(value, "0000 0000 0000 0000"),
                    ("SIT_IBAN", Label::Fp) => assert!(!iban_is_valid(value), "{value}"),
                    _ => {}
                }
            }
        }
    }

    let report: serde_json::Value = serde_json::from_slice(
        &std::fs::read(out_dir.join("generation_report.json")).expect("report"),
    )
    .expect("report json");
    assert_eq!(report["docs_rendered"], manifest.docs.len() as u64);
}

#[test]
fn postprocess_adds_eml_and_attachment_columns() {
    let manifest = manifest(vec![DocumentFormat::EmailWithAttachment]);
    let out_dir = temp_out("postprocess");
    render(&out_dir, &manifest);

    let options = GenerateOptions {
        out_dir: out_dir.clone(),
        progress_every: 100,
    };
    let result = Postprocessor::new(options).run(&manifest).expect("postprocess");
    assert_eq!(result.report.rows_processed, manifest.docs.len() as u64);
    assert_eq!(result.report.attachments_written, manifest.docs.len() as u64);

    let reloaded = MappingLedger::load(&out_dir.join("mapping_meta.csv")).expect("ledger");
    for plan in &manifest.docs {
        let row = reloaded.get(plan.doc_id).expect("row");
        let eml_path = row.column("eml_path").expect("eml path");
        let attachments = row.column("attachments").expect("attachments");
        assert!(attachments.ends_with("_attachment.csv"));
        assert!(Path::new(&attachments).exists());
        assert!(row.column("postprocessed_at").is_some());
        assert!(row.actual_word_count.is_some());

        let eml = std::fs::read(&eml_path).expect("eml bytes");
        let body = EmlMessage.extract_text(&eml);
        let text = std::fs::read_to_string(row.actual_file_path.as_deref().expect("txt"))
            .expect("txt");
        assert_eq!(body.trim_end(), text.trim_end());
    }
}

#[test]
fn postprocess_skips_rows_with_missing_text() {
    let manifest = manifest(vec![DocumentFormat::Email]);
    let out_dir = temp_out("postprocess_missing");
    render(&out_dir, &manifest);

    let first = &manifest.docs[0];
    std::fs::remove_file(out_dir.join("files").join(&first.filename)).expect("remove txt");

    let options = GenerateOptions {
        out_dir: out_dir.clone(),
        progress_every: 100,
    };
    let result = Postprocessor::new(options).run(&manifest).expect("postprocess");
    assert_eq!(result.report.rows_skipped, 1);
    assert_eq!(
        result.report.rows_processed,
        manifest.docs.len() as u64 - 1
    );
    assert!(result.ledger.get(first.doc_id).and_then(|row| row.column("eml_path")).is_none());
}
