use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use axum::{middleware::from_fn, routing::get, Router};
use modkit::api::OpenApiRegistry;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};
use utoipa::openapi::{self, InfoBuilder, OpenApiBuilder};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

/// HTTP ingress: owns the server (rest_host), wraps every route in the global
/// middleware stack and merges module OpenAPI documents into one.
pub struct ApiIngress {
    // Lock-free config using arc-swap for read-mostly access
    config: ArcSwap<ApiIngressConfig>,
    // Documents merged from every REST module
    openapi: Mutex<openapi::OpenApi>,
    // Finalized router from the REST phase, taken by `start`
    final_router: Mutex<Option<Router>>,
    local_addr: Mutex<Option<SocketAddr>>,
    server: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            openapi: Mutex::new(Self::base_document()),
            final_router: Mutex::new(None),
            local_addr: Mutex::new(None),
            server: Mutex::new(None),
        }
    }

    fn base_document() -> openapi::OpenApi {
        OpenApiBuilder::new()
            .info(
                InfoBuilder::new()
                    .title("Notes API")
                    .version(env!("CARGO_PKG_VERSION"))
                    .description(Some("Notes Service API Documentation"))
                    .build(),
            )
            .build()
    }

    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    /// Address the server is listening on, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    /// Snapshot of the merged OpenAPI document.
    pub fn openapi_document(&self) -> openapi::OpenApi {
        let mut doc = self.openapi.lock().clone();
        if let Some(base) = self.get_config().normalized_base_path() {
            doc.servers = Some(vec![openapi::server::Server::new(base)]);
        }
        doc
    }

    /// Wrap the router in the global middleware stack.
    ///
    /// Layers added later run first, so from the outside in:
    /// SetRequestId -> PropagateRequestId -> Trace -> push_req_id_to_extensions
    /// -> Timeout -> CORS -> BodyLimit.
    pub fn apply_middleware(&self, mut router: Router) -> Router {
        let config = self.get_config();
        let x_request_id = request_id::header();

        router = router.layer(RequestBodyLimitLayer::new(config.body_limit_bytes));

        if config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        router = router.layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )));
        router = router.layer(from_fn(request_id::push_req_id_to_extensions));
        router = router.layer(request_id::create_trace_layer());
        router = router.layer(PropagateRequestIdLayer::new(x_request_id.clone()));
        router.layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    async fn serve(
        listener: tokio::net::TcpListener,
        router: Router,
        cancel: CancellationToken,
    ) -> Result<()> {
        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}

#[async_trait]
impl modkit::Module for ApiIngress {
    async fn init(&self, ctx: &modkit::ModuleCtx) -> Result<()> {
        let cfg = ctx.module_config::<ApiIngressConfig>();
        tracing::debug!(
            module = "api_ingress",
            bind_addr = %cfg.bind_addr,
            base_path = %cfg.base_path,
            "Module initialized"
        );
        self.config.store(Arc::new(cfg));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// REST host role: prepare/finalize the router, but do not start the server here.
impl modkit::contracts::RestHostModule for ApiIngress {
    fn rest_prepare(&self, _ctx: &modkit::ModuleCtx, router: Router) -> Result<Router> {
        let router = router.route("/health", get(web::health_check));
        tracing::debug!("REST host prepared base router with health check");
        Ok(router)
    }

    fn rest_finalize(&self, _ctx: &modkit::ModuleCtx, mut router: Router) -> Result<Router> {
        let config = self.get_config();

        if config.enable_docs {
            let doc = self.openapi_document();
            tracing::info!(paths = doc.paths.paths.len(), "emitting OpenAPI document");
            // Serialized once, served as static JSON
            let body = Arc::new(serde_json::to_value(&doc)?);
            router = router.route(
                "/openapi.json",
                get({
                    use axum::{http::header, response::IntoResponse};
                    move || {
                        let v = body.clone();
                        async move {
                            ([(header::CACHE_CONTROL, "no-store")], axum::Json((*v).clone()))
                                .into_response()
                        }
                    }
                }),
            );
        }

        if let Some(base) = config.normalized_base_path() {
            router = Router::new().nest(&base, router);
        }

        let router = self.apply_middleware(router);
        *self.final_router.lock() = Some(router.clone());

        tracing::debug!("REST host finalized router");
        Ok(router)
    }

    fn as_registry(&self) -> &dyn OpenApiRegistry {
        self
    }
}

impl OpenApiRegistry for ApiIngress {
    fn register_openapi(&self, doc: openapi::OpenApi) {
        let mut merged = self.openapi.lock();
        let before = merged.paths.paths.len();
        merged.merge(doc);
        tracing::debug!(
            added = merged.paths.paths.len() - before,
            total = merged.paths.paths.len(),
            "Registered API document"
        );
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl modkit::contracts::StatefulModule for ApiIngress {
    /// Bind the listener, then serve in the background until cancelled.
    async fn start(&self, cancel: CancellationToken) -> Result<()> {
        let cfg = self.get_config();
        let addr: SocketAddr = cfg
            .bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", cfg.bind_addr))?;

        // Take the finalized router so the guard is dropped before awaits
        let stored = { self.final_router.lock().take() };
        let router = match stored {
            Some(r) => r,
            None => {
                tracing::debug!("No router from REST phase, serving health only");
                let base = Router::new().route("/health", get(web::health_check));
                self.apply_middleware(base)
            }
        };

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let local = listener.local_addr()?;
        *self.local_addr.lock() = Some(local);
        tracing::info!("HTTP server bound on {}", local);

        let handle = tokio::spawn(Self::serve(listener, router, cancel.child_token()));
        *self.server.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self, _cancel: CancellationToken) -> Result<()> {
        let handle = { self.server.lock().take() };
        let Some(handle) = handle else {
            return Ok(());
        };
        let timeout = Duration::from_secs(self.get_config().request_timeout_secs.max(1));
        match tokio::time::timeout(timeout, handle).await {
            Ok(joined) => joined.context("HTTP server task panicked")?,
            Err(_) => {
                tracing::warn!("HTTP server did not stop within {:?}", timeout);
                Ok(())
            }
        }
    }
}
