#![cfg_attr(
    not(any(feature = "pg", feature = "sqlite")),
    allow(unused_imports, unused_variables, dead_code, unreachable_code)
)]

//! Database handle shared by the server modules.
//!
//! Detects the engine from the DSN, builds an sqlx pool with sane defaults and
//! exposes it as a SeaORM connection.
//!
//! # Features
//! - `pg`, `sqlite`: enable SQLx backends
//! - `sea-orm`: SeaORM connection on top of the pool
//!
//! ```rust,no_run
//! # async fn demo() -> modkit_db::Result<()> {
//! use modkit_db::{ConnectOpts, DbHandle};
//!
//! let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default()).await?;
//! let conn = db.sea();
//! # drop(conn);
//! db.close().await;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "sqlite")]
mod sqlite;

use std::time::Duration;

#[cfg(feature = "pg")]
use sqlx::{postgres::PgPoolOptions, PgPool};
#[cfg(feature = "sqlite")]
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

#[cfg(feature = "sea-orm")]
use sea_orm::DatabaseConnection;
#[cfg(all(feature = "sea-orm", feature = "pg"))]
use sea_orm::SqlxPostgresConnector;
#[cfg(all(feature = "sea-orm", feature = "sqlite"))]
use sea_orm::SqlxSqliteConnector;

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[cfg(feature = "sea-orm")]
    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Pool knobs; each driver applies the subset it supports.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    pub acquire_timeout: Option<Duration>,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    /// SQLite `busy_timeout`; a `busy_timeout` DSN parameter takes precedence.
    pub sqlite_busy_timeout: Option<Duration>,
    /// For SQLite file DSNs, create parent directories if missing.
    pub create_sqlite_dirs: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            max_lifetime: None,
            sqlite_busy_timeout: Some(Duration::from_millis(5_000)),
            create_sqlite_dirs: true,
        }
    }
}

/// One concrete sqlx pool.
#[derive(Clone, Debug)]
pub enum DbPool {
    #[cfg(feature = "pg")]
    Postgres(PgPool),
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

/// Main handle.
#[derive(Debug)]
pub struct DbHandle {
    engine: DbEngine,
    pool: DbPool,
    dsn: String,
    #[cfg(feature = "sea-orm")]
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Detect engine by DSN scheme.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(dsn.to_string()))
        }
    }

    /// Connect and build handle.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        match engine {
            #[cfg(feature = "pg")]
            DbEngine::Postgres => {
                let mut o = PgPoolOptions::new();
                if let Some(n) = opts.max_conns {
                    o = o.max_connections(n);
                }
                if let Some(n) = opts.min_conns {
                    o = o.min_connections(n);
                }
                if let Some(t) = opts.acquire_timeout {
                    o = o.acquire_timeout(t);
                }
                if let Some(t) = opts.idle_timeout {
                    o = o.idle_timeout(t);
                }
                if let Some(t) = opts.max_lifetime {
                    o = o.max_lifetime(t);
                }
                let pool = o.connect(dsn).await?;
                #[cfg(feature = "sea-orm")]
                let sea = SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone());
                Ok(Self {
                    engine,
                    pool: DbPool::Postgres(pool),
                    dsn: dsn.to_string(),
                    #[cfg(feature = "sea-orm")]
                    sea,
                })
            }
            #[cfg(feature = "sqlite")]
            DbEngine::Sqlite => Self::connect_sqlite(dsn, opts).await,
            #[cfg(not(feature = "pg"))]
            DbEngine::Postgres => Err(DbError::FeatureDisabled("PostgreSQL feature not enabled")),
            #[cfg(not(feature = "sqlite"))]
            DbEngine::Sqlite => Err(DbError::FeatureDisabled("SQLite feature not enabled")),
        }
    }

    #[cfg(feature = "sqlite")]
    async fn connect_sqlite(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        use std::str::FromStr;

        let dsn = sqlite::prepare_sqlite_path(dsn, opts.create_sqlite_dirs)?;
        let (clean_dsn, pairs) = sqlite::extract_sqlite_pragmas(&dsn);
        let pragmas = sqlite::Pragmas::from_pairs(&pairs);
        let in_memory = sqlite::is_memory_dsn(&clean_dsn);

        let connect_opts = SqliteConnectOptions::from_str(&clean_dsn)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut o = SqlitePoolOptions::new();
        if in_memory {
            // every connection to :memory: is a separate database; pin exactly one
            o = o
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            if let Some(n) = opts.max_conns {
                o = o.max_connections(n);
            }
            if let Some(n) = opts.min_conns {
                o = o.min_connections(n);
            }
            if let Some(t) = opts.idle_timeout {
                o = o.idle_timeout(t);
            }
            if let Some(t) = opts.max_lifetime {
                o = o.max_lifetime(t);
            }
        }
        if let Some(t) = opts.acquire_timeout {
            o = o.acquire_timeout(t);
        }

        let journal = pragmas.journal_mode.map_or(
            if in_memory { "DELETE" } else { "WAL" },
            |m| m.as_sql(),
        );
        let synchronous = pragmas.synchronous.map_or("NORMAL", |m| m.as_sql());
        let busy_ms = pragmas.busy_timeout_ms.or_else(|| {
            opts.sqlite_busy_timeout
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        });

        o = o.after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query(&format!("PRAGMA journal_mode = {journal}"))
                    .execute(&mut *conn)
                    .await?;
                sqlx::query(&format!("PRAGMA synchronous = {synchronous}"))
                    .execute(&mut *conn)
                    .await?;
                if let Some(ms) = busy_ms.filter(|_| !in_memory) {
                    // PRAGMA can't use bind parameters
                    sqlx::query(&format!("PRAGMA busy_timeout = {ms}"))
                        .execute(&mut *conn)
                        .await?;
                }
                Ok(())
            })
        });

        let pool = o.connect_with(connect_opts).await?;
        tracing::debug!(dsn = %clean_dsn, in_memory, "SQLite pool ready");

        #[cfg(feature = "sea-orm")]
        let sea = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());

        Ok(Self {
            engine: DbEngine::Sqlite,
            pool: DbPool::Sqlite(pool),
            dsn: clean_dsn,
            #[cfg(feature = "sea-orm")]
            sea,
        })
    }

    /// Graceful pool close.
    pub async fn close(self) {
        match self.pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres(p) => p.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.close().await,
        }
    }

    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// DSN the pool was built from, with PRAGMA parameters stripped.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlx_sqlite(&self) -> Option<&SqlitePool> {
        match self.pool {
            DbPool::Sqlite(ref p) => Some(p),
            #[cfg(feature = "pg")]
            _ => None,
        }
    }

    #[cfg(feature = "pg")]
    pub fn sqlx_postgres(&self) -> Option<&PgPool> {
        match self.pool {
            DbPool::Postgres(ref p) => Some(p),
            #[cfg(feature = "sqlite")]
            _ => None,
        }
    }

    /// SeaORM connection (clone; cheap handle).
    #[cfg(feature = "sea-orm")]
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }

    #[cfg(feature = "sea-orm")]
    pub fn seaorm(&self) -> &DatabaseConnection {
        &self.sea
    }
}
