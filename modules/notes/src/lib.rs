// === PUBLIC CONTRACT ===
// Only the contract module should be public for other modules to consume
pub mod contract;

pub use contract::{client, error, model};

// === MODULE DEFINITION ===
pub mod module;
pub use module::{build_service, local_client, Notes};

// === INTERNAL MODULES ===
// Exposed only for integration tests; use `contract` for stable APIs.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
