//! ModKit runtime runner.
//!
//! One stable `ModuleCtx` is built up front and reused across all phases
//! (init → db → rest → start → wait → stop). Shutdown is driven by OS signals,
//! an external `CancellationToken`, or an arbitrary future.

use crate::context::{ConfigProvider, ModuleCtxBuilder};
use crate::registry::ModuleRegistry;
use crate::runtime::shutdown;
use std::{future::Future, pin::Pin, sync::Arc};
use tokio_util::sync::CancellationToken;

/// How the runtime should provide a DB to modules.
pub enum DbOptions {
    /// No database integration. `ModuleCtx::db()` will be `None` and the db phase is skipped.
    None,
    /// An already connected handle shared by every module.
    Existing(Arc<modkit_db::DbHandle>),
}

/// How the runtime should decide when to stop.
pub enum ShutdownOptions {
    /// Listen for OS signals (Ctrl+C / SIGTERM).
    Signals,
    /// An external `CancellationToken` controls the lifecycle.
    Token(CancellationToken),
    /// An arbitrary future; when it completes, we initiate shutdown.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

pub struct RunOptions {
    /// Provider of module config sections (raw JSON by module name).
    pub modules_cfg: Arc<dyn ConfigProvider>,
    pub db: DbOptions,
    pub shutdown: ShutdownOptions,
    /// Modules to run, already validated and ordered.
    pub registry: ModuleRegistry,
}

/// Full cycle: init → db → rest (sync) → start → wait → stop.
pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let cancel = match &opts.shutdown {
        ShutdownOptions::Token(t) => t.clone(),
        _ => CancellationToken::new(),
    };

    match opts.shutdown {
        ShutdownOptions::Signals => {
            let c = cancel.clone();
            tokio::spawn(async move {
                match shutdown::wait_for_shutdown().await {
                    Ok(()) => tracing::info!("shutdown: signal received"),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "shutdown: primary waiter failed; falling back to ctrl_c()"
                        );
                        let _ = tokio::signal::ctrl_c().await;
                    }
                }
                c.cancel();
            });
        }
        ShutdownOptions::Future(waiter) => {
            let c = cancel.clone();
            tokio::spawn(async move {
                waiter.await;
                tracing::info!("shutdown: external future completed");
                c.cancel();
            });
        }
        ShutdownOptions::Token(_) => {
            tracing::info!("shutdown: external token will control lifecycle");
        }
    }

    let registry = opts.registry;

    let mut ctx_builder =
        ModuleCtxBuilder::new(cancel.clone()).with_config_provider(opts.modules_cfg.clone());
    if let DbOptions::Existing(ref db) = opts.db {
        ctx_builder = ctx_builder.with_db(db.clone());
    }
    let base_ctx = ctx_builder.build();

    tracing::info!("Phase: init");
    registry.run_init_phase(&base_ctx).await?;

    if let DbOptions::Existing(ref db) = opts.db {
        tracing::info!("Phase: db");
        registry.run_db_phase(db).await?;
    }

    tracing::info!("Phase: rest (sync)");
    let _ = registry.run_rest_phase(&base_ctx, axum::Router::new())?;

    tracing::info!("Phase: start");
    registry.run_start_phase(cancel.clone()).await?;

    cancel.cancelled().await;

    tracing::info!("Phase: stop");
    registry.run_stop_phase(cancel).await;
    Ok(())
}
