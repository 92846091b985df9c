use std::path::{Path, PathBuf};

use crate::error::Result;

/// Artifact layout of a corpus output directory.
#[derive(Debug, Clone)]
pub struct CorpusPaths {
    pub root: PathBuf,
    pub files_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl CorpusPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let files_dir = root.join("files");
        let logs_dir = root.join("logs");
        Self {
            root,
            files_dir,
            logs_dir,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("meta.json")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join("mapping_meta.csv")
    }

    pub fn generation_report_path(&self) -> PathBuf {
        self.root.join("generation_report.json")
    }

    pub fn postprocess_report_path(&self) -> PathBuf {
        self.root.join("postprocess_report.json")
    }

    pub fn validation_report_path(&self) -> PathBuf {
        self.root.join("validation_report.md")
    }

    pub fn validation_metrics_path(&self) -> PathBuf {
        self.root.join("validation_metrics.json")
    }

    pub fn run_log_path(&self) -> PathBuf {
        self.logs_dir.join("run.jsonl")
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.files_dir.join(file_name)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        create_if_missing(&self.root)?;
        create_if_missing(&self.files_dir)?;
        create_if_missing(&self.logs_dir)?;
        Ok(())
    }
}

fn create_if_missing(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(path)?;
    Ok(())
}
