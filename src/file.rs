//! File-system access for config loading and writing.
//!
//! The include resolver needs three things from the file system: canonical
//! paths (to detect cycles), text contents, and relative path resolution
//! against the including file's directory. Writers (`config gen`, schema
//! export, YAML save) share [`write_text`], which creates parent
//! directories as needed.
//!
//! A missing file is reported as [`SchemafigError::IncludeNotFound`] naming
//! the file that referenced it; any other I/O failure is an
//! [`IoError`](SchemafigError::IoError).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::SchemafigError;

fn map_io(path: &Path, included_from: Option<&Path>, e: std::io::Error) -> SchemafigError {
    if e.kind() == ErrorKind::NotFound {
        SchemafigError::IncludeNotFound {
            path: path.to_path_buf(),
            included_from: included_from.map(Path::to_path_buf),
        }
    } else {
        SchemafigError::IoError {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

/// Canonical absolute form of `path`. Fails if the file does not exist.
pub fn canonicalize(path: &Path, included_from: Option<&Path>) -> Result<PathBuf, SchemafigError> {
    std::fs::canonicalize(path).map_err(|e| map_io(path, included_from, e))
}

/// Read a whole file as UTF-8 text.
pub fn read_text(path: &Path, included_from: Option<&Path>) -> Result<String, SchemafigError> {
    std::fs::read_to_string(path).map_err(|e| map_io(path, included_from, e))
}

/// Resolve `path` against `base_dir` unless it is already absolute.
pub fn resolve_relative(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Write `content` to `path`, creating parent directories first.
pub fn write_text(path: &Path, content: &str) -> Result<(), SchemafigError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| SchemafigError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, content).map_err(|e| SchemafigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}
