use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Context, Result};

use crate::time_utils::current_unix_timestamp_ms;

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn staging_path(destination: &Path, dir: &Path) -> PathBuf {
    let stem = destination
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("godisk-state");
    dir.join(format!(
        ".{stem}.{}-{}-{}.partial",
        std::process::id(),
        current_unix_timestamp_ms(),
        TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    ))
}

/// Replaces `path` with `content` in one rename, creating parent directories.
///
/// Readers see either the old file or the new one. The staging file is
/// removed again when the rename fails.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("destination path cannot be empty");
    }
    if path.is_dir() {
        bail!("destination path '{}' is a directory", path.display());
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create state directory {}", dir.display()))?;

    let staging = staging_path(path, dir);
    std::fs::write(&staging, content)
        .with_context(|| format!("failed to stage {}", staging.display()))?;
    if let Err(error) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(error).with_context(|| {
            format!("failed to move {} into place at {}", staging.display(), path.display())
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_text_atomic;

    #[test]
    fn regression_failed_write_leaves_no_staging_files_behind() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let target = tempdir.path().join("storage.json");
        write_text_atomic(&target, "{}").expect("write");
        let leftovers = std::fs::read_dir(tempdir.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".partial"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
