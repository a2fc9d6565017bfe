//! Process-level runtime support for the notes server: layered configuration
//! and logging bootstrap.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, AppConfig, AppConfigProvider, CliArgs, DatabaseConfig, LoggingConfig,
    Section, ServerConfig,
};
