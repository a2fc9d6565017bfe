use std::sync::Arc;

use async_trait::async_trait;
use modkit::api::OpenApiRegistry;
use modkit::{DbModule, Module, ModuleCtx, RestfulModule};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::NotesConfig;
use crate::contract::client::NotesApi;
use crate::domain::password::Hasher;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::NotesLocalClient;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::sea_orm_repo::SeaOrmRepository;

/// Notes module: users, tokens and notes behind one domain service.
#[derive(Default)]
pub struct Notes {
    service: arc_swap::ArcSwapOption<Service>,
}

impl Clone for Notes {
    fn clone(&self) -> Self {
        Self {
            service: arc_swap::ArcSwapOption::new(self.service.load_full()),
        }
    }
}

/// Wire the SeaORM repository into a domain service.
pub fn build_service(conn: DatabaseConnection, cfg: &NotesConfig) -> anyhow::Result<Service> {
    let repo = Arc::new(SeaOrmRepository::new(conn));
    let hasher = Hasher::from_config(&cfg.argon2)?;
    let service_config = ServiceConfig {
        min_password_length: cfg.min_password_length,
        max_username_length: cfg.max_username_length,
        allow_basic_auth: cfg.allow_basic_auth,
    };
    Ok(Service::new(
        repo.clone(),
        repo.clone(),
        repo,
        hasher,
        service_config,
    ))
}

/// In-process client over an already migrated database (admin tooling).
pub fn local_client(conn: DatabaseConnection, cfg: &NotesConfig) -> anyhow::Result<Arc<dyn NotesApi>> {
    let service = build_service(conn, cfg)?;
    Ok(Arc::new(NotesLocalClient::new(Arc::new(service))))
}

impl Notes {
    fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }
}

#[async_trait]
impl Module for Notes {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("Initializing notes module");

        let cfg: NotesConfig = ctx.module_config();
        debug!(
            min_password_length = cfg.min_password_length,
            allow_basic_auth = cfg.allow_basic_auth,
            "Loaded notes config"
        );

        let db = ctx.db_required()?;
        let service = Arc::new(build_service(db.sea(), &cfg)?);
        self.service.store(Some(service.clone()));

        let api: Arc<dyn NotesApi> = Arc::new(NotesLocalClient::new(service));
        ctx.client_hub().register::<dyn NotesApi>(api);
        info!("Notes API exposed to ClientHub");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl DbModule for Notes {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        info!("Running notes database migrations");
        Migrator::up(db.seaorm(), None).await?;
        info!("Notes database migrations completed");
        Ok(())
    }
}

impl RestfulModule for Notes {
    fn register_rest(
        &self,
        _ctx: &ModuleCtx,
        router: axum::Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<axum::Router> {
        info!("Registering notes REST routes");
        routes::register_routes(router, openapi, self.service()?)
    }
}
