//! Replace-in-place writes for corpus artifacts.
//!
//! Later stages read `meta.json`, the ledger and `files/*` while a run is in
//! progress, so an artifact is either the previous version or the complete new
//! one. Writes go to a hidden sibling temp file that is renamed over the target.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Pretty JSON with a trailing newline.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut data = serde_json::to_vec_pretty(value)?;
    data.push(b'\n');
    write_bytes_atomic(path, &data)
}

/// Write `data` to `path`, creating parent directories. Failures name the
/// artifact and never leave the temp file behind.
pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = temp_path(path)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| Error::write(parent, source))?;
    }

    let written = write_synced(&tmp_path, data).and_then(|()| fs::rename(&tmp_path, path));
    if let Err(source) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::write(path, source));
    }

    debug!(path = %path.display(), bytes = data.len(), "artifact written");
    Ok(())
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// `.<name>.<pid>.tmp` next to the target; hidden so directory scans skip it.
fn temp_path(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Invalid(format!("artifact path has no file name: {}", path.display())))?;
    let tmp_name = format!(".{}.{}.tmp", file_name.to_string_lossy(), std::process::id());
    Ok(path.with_file_name(tmp_name))
}
