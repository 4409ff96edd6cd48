//! `KEY=value` runtime configuration files
//!
//! Only the line for the requested key is touched. Everything else, including
//! comments and unknown keys, is written back byte-for-byte.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{InstallerError, Result};

/// Set `key` to `value`, creating the file if needed
///
/// Replaces the first `key=` line in place, otherwise appends one.
pub fn set_value(path: &Path, key: &str, value: &str) -> Result<()> {
    let original = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(InstallerError::FileReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            });
        }
    };

    let updated = with_value(&original, key, value);
    if updated == original {
        return Ok(());
    }
    write_atomically(path, &updated)
}

fn with_value(content: &str, key: &str, value: &str) -> String {
    let new_line = format!("{key}={value}");
    let mut replaced = false;
    let mut lines: Vec<String> = Vec::new();

    for line in content.lines() {
        let is_key = line
            .trim_start()
            .strip_prefix(key)
            .is_some_and(|rest| rest.trim_start().starts_with('='));
        if is_key && !replaced {
            lines.push(new_line.clone());
            replaced = true;
        } else {
            lines.push(line.to_string());
        }
    }
    if !replaced {
        lines.push(new_line);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Write through a sibling temp file and rename over `path`
///
/// A symlinked `path` keeps its link; the file it points at is replaced.
pub fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let write_err = |reason: String| InstallerError::FileWriteFailed {
        path: path.display().to_string(),
        reason,
    };

    let target = match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::canonicalize(path).map_err(|e| write_err(e.to_string()))?
        }
        _ => path.to_path_buf(),
    };
    let path = target.as_path();

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(|e| write_err(e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_err(e.to_string()))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| write_err(e.to_string()))?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())
            .map_err(|e| write_err(e.to_string()))?;
    }
    tmp.persist(path).map_err(|e| write_err(e.error.to_string()))?;
    Ok(())
}
