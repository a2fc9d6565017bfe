use crate::config::{LoggingConfig, Section};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{level_filters::LevelFilter, Level};
use tracing_subscriber::{filter::Targets, fmt};

use file_rotate::{
    compression::Compression,
    suffix::AppendCount,
    ContentLimit, FileRotate,
};

const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

fn level_filter(s: &str) -> LevelFilter {
    parse_tracing_level(s).map_or(LevelFilter::OFF, LevelFilter::from_level)
}

/// Returns true if target == crate_name or target starts with "crate_name::"
fn matches_crate_prefix(target: &str, crate_name: &str) -> bool {
    target == crate_name
        || (target.starts_with(crate_name) && target[crate_name.len()..].starts_with("::"))
}

// -------- rotating writer for files --------

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendCount>>>);

struct RotWriterHandle(Option<RotWriter>);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.0 {
            Some(w) => w.0.lock().write(buf),
            // no sink for this target: drop silently
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.0 {
            Some(w) => w.0.lock().flush(),
            None => Ok(()),
        }
    }
}

/// Routes records to files by target prefix, falling back to the default file.
#[derive(Default)]
struct MultiFileRouter {
    default: Option<RotWriter>,
    by_prefix: HashMap<String, RotWriter>,
}

impl MultiFileRouter {
    fn resolve_for(&self, target: &str) -> Option<RotWriter> {
        self.by_prefix
            .iter()
            .find(|(crate_name, _)| matches_crate_prefix(target, crate_name))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for MultiFileRouter {
    type Writer = RotWriterHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RotWriterHandle(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RotWriterHandle(self.resolve_for(meta.target()))
    }
}

/// Resolve a log file path against `base_dir` (home_dir).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn create_rotating_writer_at_path(
    log_path: &Path,
    section: &Section,
) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let max_files = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);

    let rot = FileRotate::new(
        log_path,
        AppendCount::new(max_files),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn file_writer_for(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }
    let log_path = resolve_log_path(&section.file, base_dir);
    match create_rotating_writer_at_path(&log_path, section) {
        Ok(w) => Some(w),
        Err(e) => {
            eprintln!(
                "Failed to init log file for '{}': {} ({})",
                name,
                log_path.display(),
                e
            );
            None
        }
    }
}

/// Console filter: `default` section sets the fallback level, every other
/// section overrides it for its own crate.
fn build_console_targets(cfg: &LoggingConfig) -> Targets {
    let default = cfg
        .get("default")
        .map_or(LevelFilter::INFO, |s| level_filter(&s.console_level));

    cfg.iter()
        .filter(|(name, _)| name.as_str() != "default")
        .fold(Targets::new().with_default(default), |t, (name, s)| {
            t.with_target(name.clone(), level_filter(&s.console_level))
        })
}

/// File filter: a crate section without its own file inherits the default
/// file but keeps its own level.
fn build_file_targets(cfg: &LoggingConfig, router: &MultiFileRouter) -> Targets {
    let default = match (cfg.get("default"), router.default.is_some()) {
        (Some(s), true) => level_filter(&s.file_level),
        _ => LevelFilter::OFF,
    };

    cfg.iter()
        .filter(|(name, _)| name.as_str() != "default")
        .fold(Targets::new().with_default(default), |t, (name, s)| {
            let has_sink = router.by_prefix.contains_key(name) || router.default.is_some();
            let level = if has_sink && !s.file_level.is_empty() {
                level_filter(&s.file_level)
            } else if has_sink {
                default
            } else {
                LevelFilter::OFF
            };
            t.with_target(name.clone(), level)
        })
}

fn build_file_router(cfg: &LoggingConfig, base_dir: &Path) -> MultiFileRouter {
    let mut router = MultiFileRouter::default();
    for (name, section) in cfg {
        let Some(writer) = file_writer_for(name, section, base_dir) else {
            continue;
        };
        if name == "default" {
            router.default = Some(writer);
        } else {
            router.by_prefix.insert(name.clone(), writer);
        }
    }
    router
}

/// Initialize logging from a configuration.
/// `base_dir` resolves relative log file paths (usually `server.home_dir`).
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        let _ = fmt()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let ansi = std::io::stdout().is_terminal();
    let console_layer = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(build_console_targets(cfg));

    let router = build_file_router(cfg, base_dir);
    let file_layer = if router.is_empty() {
        None
    } else {
        let targets = build_file_targets(cfg, &router);
        Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(router)
                .with_filter(targets),
        )
    };

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
