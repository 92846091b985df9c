use std::path::{Path, PathBuf};

use sitcorpus_core::{MappingRow, PlainText, Representation, representation_for_path};
use tracing::debug;

/// Candidate artifact paths for a ledger row, in lookup order: the recorded
/// text path, every representation column, then the bare filename.
pub fn candidate_paths(
    row: &MappingRow,
    files_dir: &Path,
    representations: &[Box<dyn Representation>],
) -> Vec<PathBuf> {
    let mut raw: Vec<String> = Vec::new();
    for column in std::iter::once("actual_file_path")
        .chain(representations.iter().map(|representation| representation.column()))
        .chain(std::iter::once("filename"))
    {
        if let Some(value) = row.column(column)
            && !raw.contains(&value)
        {
            raw.push(value);
        }
    }

    let mut paths: Vec<PathBuf> = raw
        .iter()
        .map(|value| resolve(Path::new(value), files_dir))
        .collect();
    if !row.filename.is_empty() {
        let fallback = files_dir.join(&row.filename);
        if !paths.contains(&fallback) {
            paths.push(fallback);
        }
    }
    paths
}

/// Relative paths that do not exist are retried under `files_dir`.
fn resolve(path: &Path, files_dir: &Path) -> PathBuf {
    if path.is_relative() && !path.exists() {
        let retried = files_dir.join(path);
        if retried.exists() {
            return retried;
        }
    }
    path.to_path_buf()
}

/// First non-empty text across the candidates; empty when nothing readable
/// exists.
pub fn load_text(
    row: &MappingRow,
    files_dir: &Path,
    representations: &[Box<dyn Representation>],
) -> String {
    for path in candidate_paths(row, files_dir, representations) {
        if !path.is_file() {
            continue;
        }
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(doc_id = row.doc_id, path = %path.display(), error = %err, "artifact unreadable");
                continue;
            }
        };
        let text = match representation_for_path(representations, &path) {
            Some(representation) => representation.extract_text(&bytes),
            None => PlainText.extract_text(&bytes),
        };
        if !text.trim().is_empty() {
            return text;
        }
    }
    String::new()
}
