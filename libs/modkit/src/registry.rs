use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use thiserror::Error;

use crate::context;
use crate::contracts;

/// One registered module with the capabilities it provides.
pub struct ModuleEntry {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    pub core: Arc<dyn contracts::Module>,
    pub rest: Option<Arc<dyn contracts::RestfulModule>>,
    pub rest_host: Option<Arc<dyn contracts::RestHostModule>>,
    pub db: Option<Arc<dyn contracts::DbModule>>,
    pub stateful: Option<Arc<dyn contracts::StatefulModule>>,
}

impl ModuleEntry {
    pub fn new(name: &'static str, core: Arc<dyn contracts::Module>) -> Self {
        Self {
            name,
            deps: &[],
            core,
            rest: None,
            rest_host: None,
            db: None,
            stateful: None,
        }
    }

    pub fn deps(mut self, deps: &'static [&'static str]) -> Self {
        self.deps = deps;
        self
    }

    pub fn rest(mut self, m: Arc<dyn contracts::RestfulModule>) -> Self {
        self.rest = Some(m);
        self
    }

    pub fn rest_host(mut self, m: Arc<dyn contracts::RestHostModule>) -> Self {
        self.rest_host = Some(m);
        self
    }

    pub fn db(mut self, m: Arc<dyn contracts::DbModule>) -> Self {
        self.db = Some(m);
        self
    }

    pub fn stateful(mut self, m: Arc<dyn contracts::StatefulModule>) -> Self {
        self.stateful = Some(m);
        self
    }
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("has_rest", &self.rest.is_some())
            .field("is_rest_host", &self.rest_host.is_some())
            .field("has_db", &self.db.is_some())
            .field("has_stateful", &self.stateful.is_some())
            .finish()
    }
}

/// The final, topo-sorted runtime registry.
pub struct ModuleRegistry {
    modules: Vec<ModuleEntry>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.modules.iter().map(|m| m.name).collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .finish()
    }
}

impl ModuleRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    pub fn get_module(&self, name: &str) -> Option<Arc<dyn contracts::Module>> {
        self.modules
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.core.clone())
    }

    // ---- Ordered phases: init → DB → REST (sync) → start → stop ----

    pub async fn run_init_phase(&self, base_ctx: &context::ModuleCtx) -> Result<(), RegistryError> {
        for e in &self.modules {
            let ctx = base_ctx.clone().for_module(e.name);
            e.core
                .init(&ctx)
                .await
                .map_err(|source| RegistryError::Init {
                    module: e.name,
                    source,
                })?;
        }
        Ok(())
    }

    pub async fn run_db_phase(&self, db: &modkit_db::DbHandle) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(dbm) = &e.db {
                tracing::debug!(module = e.name, "running migrations");
                dbm.migrate(db)
                    .await
                    .map_err(|source| RegistryError::DbMigrate {
                        module: e.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    pub fn run_rest_phase(
        &self,
        base_ctx: &context::ModuleCtx,
        mut router: Router,
    ) -> Result<Router, RegistryError> {
        let mut hosts = self
            .modules
            .iter()
            .filter_map(|e| e.rest_host.as_ref().map(|h| (e.name, h)));

        let (host_name, host) = match (hosts.next(), hosts.next()) {
            (None, _) => {
                return if self.modules.iter().any(|e| e.rest.is_some()) {
                    Err(RegistryError::RestRequiresHost)
                } else {
                    Ok(router)
                };
            }
            (Some(host), None) => host,
            (Some(_), Some(_)) => return Err(RegistryError::MultipleRestHosts),
        };
        let host_ctx = base_ctx.clone().for_module(host_name);
        let registry = host.as_registry();

        // 1) Host prepare: base Router, /health
        router = host
            .rest_prepare(&host_ctx, router)
            .map_err(|source| RegistryError::RestPrepare {
                module: host_name,
                source,
            })?;

        // 2) Register all REST providers in dependency order
        for e in &self.modules {
            if let Some(rest) = &e.rest {
                let ctx = base_ctx.clone().for_module(e.name);
                router = rest
                    .register_rest(&ctx, router, registry)
                    .map_err(|source| RegistryError::RestRegister {
                        module: e.name,
                        source,
                    })?;
            }
        }

        // 3) Host finalize: /openapi.json, middleware, persist Router
        router = host
            .rest_finalize(&host_ctx, router)
            .map_err(|source| RegistryError::RestFinalize {
                module: host_name,
                source,
            })?;

        Ok(router)
    }

    pub async fn run_start_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(s) = &e.stateful {
                s.start(cancel.clone())
                    .await
                    .map_err(|source| RegistryError::Start {
                        module: e.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Stops in reverse order; failures are logged, not propagated.
    pub async fn run_stop_phase(&self, cancel: CancellationToken) {
        for e in self.modules.iter().rev() {
            if let Some(s) = &e.stateful {
                if let Err(err) = s.stop(cancel.clone()).await {
                    tracing::warn!(module = e.name, error = %err, "Failed to stop module");
                }
            }
        }
    }
}

/// Collects entries in registration order; `build` validates and topo-sorts them.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<ModuleEntry>,
}

impl RegistryBuilder {
    pub fn module(mut self, entry: ModuleEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Validate names and deps, then order modules so dependencies come first.
    /// Ties keep registration order.
    pub fn build(self) -> Result<ModuleRegistry, RegistryError> {
        let mut idx: HashMap<&'static str, usize> = HashMap::new();
        for (i, e) in self.entries.iter().enumerate() {
            if idx.insert(e.name, i).is_some() {
                return Err(RegistryError::DuplicateModule(e.name));
            }
        }

        if self
            .entries
            .iter()
            .filter(|e| e.rest_host.is_some())
            .count()
            > 1
        {
            return Err(RegistryError::MultipleRestHosts);
        }

        // edge dep -> module
        let mut adj = vec![Vec::<usize>::new(); self.entries.len()];
        let mut indeg = vec![0usize; self.entries.len()];
        for (u, e) in self.entries.iter().enumerate() {
            for &d in e.deps {
                let v = *idx.get(d).ok_or(RegistryError::UnknownDependency {
                    module: e.name,
                    depends_on: d,
                })?;
                adj[v].push(u);
                indeg[u] += 1;
            }
        }

        let mut q: VecDeque<usize> = (0..self.entries.len()).filter(|&i| indeg[i] == 0).collect();
        let mut order = Vec::with_capacity(self.entries.len());
        while let Some(u) = q.pop_front() {
            order.push(u);
            for &w in &adj[u] {
                indeg[w] -= 1;
                if indeg[w] == 0 {
                    q.push_back(w);
                }
            }
        }

        if order.len() != self.entries.len() {
            let stuck = (0..self.entries.len())
                .filter(|i| !order.contains(i))
                .map(|i| self.entries[i].name)
                .collect();
            return Err(RegistryError::CycleDetected { modules: stuck });
        }

        let mut slots: Vec<Option<ModuleEntry>> = self.entries.into_iter().map(Some).collect();
        let modules: Vec<ModuleEntry> = order.into_iter().filter_map(|i| slots[i].take()).collect();

        tracing::info!(
            modules = ?modules.iter().map(|e| e.name).collect::<Vec<_>>(),
            "Module dependency order resolved (topo)"
        );

        Ok(ModuleRegistry { modules })
    }
}

/// Structured errors for the module registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("initialization failed for module '{module}'")]
    Init {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("start failed for '{module}'")]
    Start {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("DB migration failed for module '{module}'")]
    DbMigrate {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST prepare failed for host module '{module}'")]
    RestPrepare {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST registration failed for module '{module}'")]
    RestRegister {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST finalize failed for host module '{module}'")]
    RestFinalize {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST phase requires an ingress host: modules with capability 'rest' found, but no module with capability 'rest_host'")]
    RestRequiresHost,
    #[error("multiple 'rest_host' modules detected; exactly one is allowed")]
    MultipleRestHosts,
    #[error("module '{0}' is already registered")]
    DuplicateModule(&'static str),
    #[error("module '{module}' depends on unknown '{depends_on}'")]
    UnknownDependency {
        module: &'static str,
        depends_on: &'static str,
    },
    #[error("cyclic dependency among modules: {modules:?}")]
    CycleDetected { modules: Vec<&'static str> },
}
