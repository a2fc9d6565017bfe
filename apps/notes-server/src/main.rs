use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit::runtime::{run, DbOptions, RunOptions, ShutdownOptions};
use modkit::{DbModule, ModuleEntry, ModuleRegistry};
use modkit_db::{ConnectOpts, DbHandle};
use runtime::{AppConfig, AppConfigProvider, CliArgs, DatabaseConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use notes::contract::{client::NotesApi, error::NotesError};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// Adapter to make AppConfigProvider implement modkit::ConfigProvider
struct ModkitConfigAdapter(Arc<AppConfigProvider>);

impl modkit::ConfigProvider for ModkitConfigAdapter {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get_module_config(module_name)
    }
}

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case("sqlite::memory:") || dsn.eq_ignore_ascii_case("sqlite://:memory:")
    {
        return Ok("sqlite::memory:".to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)?;
        }
    }

    // Rebuild DSN with absolute path and normalized slashes
    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Notes Server - personal notes REST backend
#[derive(Parser)]
#[command(name = "notes-server")]
#[command(about = "Notes Server - personal notes REST backend")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
    /// Delete a user together with their notes and tokens
    DeleteUser {
        /// Username of the account to delete
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI args passed down to config/app
    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;

    // Apply CLI overrides (port / verbosity) and derive ingress settings
    config.apply_cli_overrides(&args);
    apply_ingress_defaults(&mut config, args.port.is_some());

    // Print config and exit if requested
    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    // Initialize logging
    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Notes Server starting");

    // Execute command
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config).await,
        Commands::DeleteUser { username } => delete_user(config, args, &username).await,
    }
}

/// Fill `modules.api_ingress` from the `server` section: `bind_addr` when it is
/// missing (or `--port` was given) and `request_timeout_secs` from `timeout_sec`.
fn apply_ingress_defaults(config: &mut AppConfig, port_overridden: bool) {
    let bind_addr = config.bind_addr();
    let timeout_sec = config.server.timeout_sec;

    let section = config
        .modules
        .entry("api_ingress".to_string())
        .or_insert_with(|| serde_json::json!({}));
    let Some(obj) = section.as_object_mut() else {
        return;
    };
    if port_overridden || !obj.contains_key("bind_addr") {
        obj.insert("bind_addr".to_string(), bind_addr.into());
    }
    if timeout_sec > 0 && !obj.contains_key("request_timeout_secs") {
        obj.insert("request_timeout_secs".to_string(), timeout_sec.into());
    }
}

/// Detect DB backend from URL scheme (sqlite/postgres).
fn detect_from_dsn(cfg: &DatabaseConfig) -> Result<&'static str> {
    let raw = cfg.url.trim().to_owned();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }

    let url = Url::parse(&raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;

    match url.scheme() {
        "sqlite" => Ok("sqlite"),
        "postgres" | "postgresql" => Ok("postgres"),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

/// Connect to the configured database; `--mock` swaps in an in-memory SQLite.
async fn connect_db(config: &AppConfig, mock: bool) -> Result<Option<Arc<DbHandle>>> {
    let db_config = match (&config.database, mock) {
        (_, true) => DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_conns: Some(1),
            busy_timeout_ms: None,
        },
        (Some(db_config), false) => db_config.clone(),
        (None, false) => return Ok(None),
    };

    let mut final_dsn = db_config.url.trim().to_owned();
    if !mock {
        detect_from_dsn(&db_config)?;
    }

    // Absolutize sqlite DSNs to avoid cwd issues
    if final_dsn.starts_with("sqlite://") {
        final_dsn = absolutize_sqlite_dsn(&final_dsn, Path::new(&config.server.home_dir), true)?;
    }

    let connect_opts = ConnectOpts {
        max_conns: db_config.max_conns,
        acquire_timeout: Some(Duration::from_secs(5)),
        sqlite_busy_timeout: db_config
            .busy_timeout_ms
            .map(|ms| Duration::from_millis(u64::from(ms))),
        create_sqlite_dirs: true,
        ..Default::default()
    };

    tracing::info!("Connecting to database: {}", final_dsn);
    let db = DbHandle::connect(&final_dsn, connect_opts)
        .await
        .with_context(|| format!("Failed to connect to database '{final_dsn}'"))?;
    tracing::info!("Connected DB backend: {:?}", db.engine());

    Ok(Some(Arc::new(db)))
}

fn build_registry() -> Result<ModuleRegistry> {
    let ingress = Arc::new(api_ingress::ApiIngress::default());
    let notes = Arc::new(notes::Notes::default());

    let registry = ModuleRegistry::builder()
        .module(
            ModuleEntry::new("api_ingress", ingress.clone())
                .rest_host(ingress.clone())
                .stateful(ingress),
        )
        .module(
            ModuleEntry::new("notes", notes.clone())
                .deps(&["api_ingress"])
                .db(notes.clone())
                .rest(notes),
        )
        .build()?;
    Ok(registry)
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");

    // Provide module configs to modkit
    let config_provider = Arc::new(ModkitConfigAdapter(Arc::new(AppConfigProvider::new(
        config.clone(),
    ))));

    let db_options = match connect_db(&config, args.mock).await? {
        Some(db) => DbOptions::Existing(db),
        None => {
            tracing::warn!("No database configuration found, running without database");
            DbOptions::None
        }
    };

    // Run the server via modkit
    let run_options = RunOptions {
        modules_cfg: config_provider,
        db: db_options,
        shutdown: ShutdownOptions::Signals,
        registry: build_registry()?,
    };

    run(run_options).await
}

async fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    if let Some(db) = &config.database {
        detect_from_dsn(db)?;
    }
    if let Some(v) = config.modules.get("api_ingress") {
        serde_json::from_value::<api_ingress::ApiIngressConfig>(v.clone())
            .context("Invalid modules.api_ingress config")?;
    }
    if let Some(v) = config.modules.get("notes") {
        serde_json::from_value::<notes::config::NotesConfig>(v.clone())
            .context("Invalid modules.notes config")?;
    }

    // AppConfig::load_* already normalized & created home_dir
    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);

    Ok(())
}

async fn delete_user(config: AppConfig, args: CliArgs, username: &str) -> Result<()> {
    let db = connect_db(&config, args.mock)
        .await?
        .ok_or_else(|| anyhow!("Database URL not configured"))?;

    let module = notes::Notes::default();
    module.migrate(&db).await?;

    let notes_cfg: notes::config::NotesConfig = match config.modules.get("notes") {
        Some(v) => serde_json::from_value(v.clone()).context("Invalid modules.notes config")?,
        None => Default::default(),
    };
    let api: Arc<dyn NotesApi> = notes::local_client(db.sea(), &notes_cfg)?;

    match api.delete_user(username).await {
        Ok(deleted) => {
            println!(
                "Deleted user \"{}\" (id {}) with {} note(s) and {} token(s)",
                deleted.user.username, deleted.user.id, deleted.notes, deleted.tokens
            );
            Ok(())
        }
        Err(NotesError::NotFound { .. }) => Err(anyhow!("User \"{username}\" does not exist")),
        Err(e) => Err(e.into()),
    }
}
