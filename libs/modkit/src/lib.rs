//! # ModKit - small module system
//!
//! Modules are plain structs implementing a subset of the capability traits
//! (`Module`, `DbModule`, `RestfulModule`, `RestHostModule`, `StatefulModule`).
//! The application registers them explicitly in a [`ModuleRegistry`] and hands
//! the registry to [`runtime::run`], which drives the phases:
//!
//! init → db (migrations) → rest (router composition) → start → wait → stop
//!
//! ```rust,ignore
//! let registry = ModuleRegistry::builder()
//!     .module(ModuleEntry::new("api_ingress", ingress.clone()).rest_host(ingress.clone()).stateful(ingress))
//!     .module(ModuleEntry::new("notes", notes.clone()).deps(&["api_ingress"]).db(notes.clone()).rest(notes))
//!     .build()?;
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod api;
pub mod client_hub;
pub mod context;
pub mod contracts;
pub mod registry;
pub mod runtime;

pub use api::problem::{Problem, ProblemResponse, ValidationError};
pub use api::OpenApiRegistry;
pub use client_hub::ClientHub;
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};
pub use contracts::*;
pub use registry::{ModuleEntry, ModuleRegistry, RegistryBuilder, RegistryError};
pub use runtime::{run, DbOptions, RunOptions, ShutdownOptions};
