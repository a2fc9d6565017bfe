//! Whitelisted SQLite PRAGMA parameters carried in the DSN query string.

use std::collections::HashMap;

const SQLITE_PRAGMA_PARAMS: &[&str] = &["wal", "synchronous", "busy_timeout", "journal_mode"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JournalMode {
    Delete,
    Wal,
    Memory,
    Truncate,
    Persist,
    Off,
}

impl JournalMode {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Off => "OFF",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DELETE" => Some(JournalMode::Delete),
            "WAL" => Some(JournalMode::Wal),
            "MEMORY" => Some(JournalMode::Memory),
            "TRUNCATE" => Some(JournalMode::Truncate),
            "PERSIST" => Some(JournalMode::Persist),
            "OFF" => Some(JournalMode::Off),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SyncMode {
    Off,
    Normal,
    Full,
    Extra,
}

impl SyncMode {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            SyncMode::Off => "OFF",
            SyncMode::Normal => "NORMAL",
            SyncMode::Full => "FULL",
            SyncMode::Extra => "EXTRA",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OFF" => Some(SyncMode::Off),
            "NORMAL" => Some(SyncMode::Normal),
            "FULL" => Some(SyncMode::Full),
            "EXTRA" => Some(SyncMode::Extra),
            _ => None,
        }
    }
}

/// Parsed PRAGMA parameters. Invalid values are logged and dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pragmas {
    pub journal_mode: Option<JournalMode>,
    pub synchronous: Option<SyncMode>,
    pub busy_timeout_ms: Option<u64>,
}

impl Pragmas {
    pub(crate) fn from_pairs(pairs: &HashMap<String, String>) -> Self {
        let mut pragmas = Pragmas::default();

        for (key, value) in pairs {
            match key.as_str() {
                "journal_mode" => match JournalMode::parse(value) {
                    Some(mode) => pragmas.journal_mode = Some(mode),
                    None => tracing::warn!("Invalid 'journal_mode' PRAGMA value '{}', ignoring", value),
                },
                "wal" => match value.to_lowercase().as_str() {
                    // explicit journal_mode wins over the legacy toggle
                    "true" | "1" => {
                        pragmas.journal_mode.get_or_insert(JournalMode::Wal);
                    }
                    "false" | "0" => {
                        pragmas.journal_mode.get_or_insert(JournalMode::Delete);
                    }
                    _ => tracing::warn!("Invalid 'wal' PRAGMA value '{}', ignoring", value),
                },
                "synchronous" => match SyncMode::parse(value) {
                    Some(mode) => pragmas.synchronous = Some(mode),
                    None => tracing::warn!("Invalid 'synchronous' PRAGMA value '{}', ignoring", value),
                },
                "busy_timeout" => match value.parse::<u64>() {
                    Ok(ms) => pragmas.busy_timeout_ms = Some(ms),
                    Err(_) => tracing::warn!("Invalid 'busy_timeout' PRAGMA value '{}', ignoring", value),
                },
                other => tracing::debug!("Unknown SQLite PRAGMA parameter: {}", other),
            }
        }

        pragmas
    }
}

/// Split whitelisted PRAGMA parameters off a SQLite DSN.
/// Returns the cleaned DSN and the extracted pairs (lowercased keys).
pub(crate) fn extract_sqlite_pragmas(dsn: &str) -> (String, HashMap<String, String>) {
    let Ok(mut url) = url::Url::parse(dsn) else {
        return (dsn.to_string(), HashMap::new());
    };

    let mut extracted = HashMap::new();
    let mut remaining = Vec::new();
    for (key, value) in url.query_pairs() {
        let key_lower = key.to_lowercase();
        if SQLITE_PRAGMA_PARAMS.contains(&key_lower.as_str()) {
            extracted.insert(key_lower, value.into_owned());
        } else {
            remaining.push(format!("{}={}", key, value));
        }
    }

    if extracted.is_empty() {
        return (dsn.to_string(), extracted);
    }

    if remaining.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&remaining.join("&")));
    }
    (url.to_string(), extracted)
}
