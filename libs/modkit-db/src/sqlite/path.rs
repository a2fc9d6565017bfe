use std::io;
use std::path::PathBuf;

/// True for `sqlite::memory:`, `sqlite://:memory:` and `mode=memory` URIs.
pub(crate) fn is_memory_dsn(dsn: &str) -> bool {
    let lower = dsn.to_ascii_lowercase();
    lower.contains(":memory:") || lower.contains("mode=memory")
}

/// Ensure the parent directory of a file-backed SQLite DSN exists.
/// Memory databases and `file:` URIs are returned untouched.
pub(crate) fn prepare_sqlite_path(dsn: &str, create_dirs: bool) -> io::Result<String> {
    if !create_dirs || is_memory_dsn(dsn) {
        return Ok(dsn.to_string());
    }

    if let Some(path) = file_path_from_dsn(dsn) {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    Ok(dsn.to_string())
}

fn file_path_from_dsn(dsn: &str) -> Option<PathBuf> {
    let raw = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))?;
    if raw.starts_with("file:") {
        return None;
    }
    let path = raw.split_once('?').map_or(raw, |(p, _)| p);
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}
