use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomeDirError {
    #[error("cannot determine the user's home directory")]
    NoHome,

    #[error("failed to create home directory '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Platform base directory used when `home_dir` is not configured.
/// Windows: %APPDATA%, Unix/macOS: $HOME.
fn platform_base() -> Result<PathBuf, HomeDirError> {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return Ok(PathBuf::from(appdata));
        }
        dirs::data_dir().ok_or(HomeDirError::NoHome)
    }
    #[cfg(not(target_os = "windows"))]
    {
        dirs::home_dir().ok_or(HomeDirError::NoHome)
    }
}

fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return dirs::home_dir().ok_or(HomeDirError::NoHome);
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        let home = dirs::home_dir().ok_or(HomeDirError::NoHome)?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Resolve the server home directory into an absolute path.
///
/// - `None` resolves to `<platform base>/<default_subdir>`.
/// - A leading `~` is expanded to the user's home.
/// - Relative paths are resolved against the current working directory.
///
/// With `create = true` the directory is created if missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let mut path = match configured {
        Some(raw) => expand_tilde(raw.trim())?,
        None => platform_base()?.join(default_subdir),
    };

    if path.is_relative() {
        let cwd = std::env::current_dir().map_err(|source| HomeDirError::Create {
            path: path.clone(),
            source,
        })?;
        path = cwd.join(path);
    }

    if create {
        ensure_dir(&path)?;
    }
    Ok(path)
}

fn ensure_dir(path: &Path) -> Result<(), HomeDirError> {
    std::fs::create_dir_all(path).map_err(|source| HomeDirError::Create {
        path: path.to_path_buf(),
        source,
    })
}
