//! SQLite-specific helpers: DSN pragma extraction and path preparation.

pub(crate) mod path;
pub(crate) mod pragmas;

pub(crate) use path::{is_memory_dsn, prepare_sqlite_path};
pub(crate) use pragmas::{extract_sqlite_pragmas, Pragmas};
