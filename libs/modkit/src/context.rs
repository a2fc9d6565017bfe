use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::client_hub::ClientHub;

/// Provider of module-specific configuration (raw JSON sections only).
pub trait ConfigProvider: Send + Sync {
    /// Returns raw JSON section for the module, if any.
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

#[derive(Clone)]
pub struct ModuleCtx {
    pub(crate) db: Option<Arc<modkit_db::DbHandle>>,
    pub(crate) config_provider: Option<Arc<dyn ConfigProvider>>,
    pub(crate) client_hub: Arc<ClientHub>,
    pub(crate) cancellation_token: CancellationToken,
    pub(crate) module_name: Option<Arc<str>>,
}

pub struct ModuleCtxBuilder {
    inner: ModuleCtx,
}

impl ModuleCtxBuilder {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            inner: ModuleCtx {
                db: None,
                config_provider: None,
                client_hub: Arc::new(ClientHub::default()),
                cancellation_token: token,
                module_name: None,
            },
        }
    }

    pub fn with_db(mut self, db: Arc<modkit_db::DbHandle>) -> Self {
        self.inner.db = Some(db);
        self
    }

    pub fn with_config_provider(mut self, p: Arc<dyn ConfigProvider>) -> Self {
        self.inner.config_provider = Some(p);
        self
    }

    pub fn with_client_hub(mut self, hub: Arc<ClientHub>) -> Self {
        self.inner.client_hub = hub;
        self
    }

    /// Scope the context to a module name (the registry does this per phase).
    pub fn for_module(mut self, name: &str) -> Self {
        self.inner.module_name = Some(Arc::<str>::from(name));
        self
    }

    pub fn build(self) -> ModuleCtx {
        self.inner
    }
}

impl ModuleCtx {
    pub(crate) fn for_module(mut self, name: &str) -> Self {
        self.module_name = Some(Arc::<str>::from(name));
        self
    }

    pub fn db(&self) -> Option<Arc<modkit_db::DbHandle>> {
        self.db.clone()
    }

    pub fn db_required(&self) -> anyhow::Result<Arc<modkit_db::DbHandle>> {
        self.db
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no database configured for this run"))
    }

    pub fn client_hub(&self) -> Arc<ClientHub> {
        self.client_hub.clone()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn current_module(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    /// Raw JSON section of an arbitrary module (e.g. a REST module peeking at
    /// the ingress settings).
    pub fn raw_config_of(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.config_provider
            .as_ref()
            .and_then(|p| p.get_module_config(module_name))
    }

    /// Best-effort: deserialize the module's config into `T`, fallback to `T::default()`
    /// if section is missing or invalid.
    pub fn module_config<T: DeserializeOwned + Default>(&self) -> T {
        let Some(name) = self.module_name.as_deref() else {
            return T::default();
        };
        match self.raw_config_of(name) {
            Some(v) => match serde_json::from_value::<T>(v.clone()) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(module = name, error = %e, "invalid module config, using defaults");
                    T::default()
                }
            },
            None => T::default(),
        }
    }

    /// Strict: deserialize the module's config into `T`, returning a pathful error on failure.
    pub fn module_config_required<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let name = self
            .module_name
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("context is not scoped to a module"))?;

        let val = self
            .raw_config_of(name)
            .ok_or_else(|| anyhow::anyhow!("missing module config: {name}"))?;

        serde_json::from_value(val.clone()).map_err(|e| anyhow::anyhow!("invalid {name} config: {e}"))
    }
}
