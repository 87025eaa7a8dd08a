use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use api_ingress::{shutdown, ApiIngress, ApiIngressConfig, HealthProbe};
use async_trait::async_trait;
use axum::Router;
use clap::{Parser, Subcommand};
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use scheduling::{config::SchedulingConfig, contract::client::SchedulingApi as _, Scheduling};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio_util::sync::CancellationToken;
use url::Url;

const MEMORY_DSN: &str = "sqlite::memory:";

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps in-memory DSNs as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case(MEMORY_DSN) || dsn.eq_ignore_ascii_case("sqlite://:memory:") {
        return Ok(MEMORY_DSN.to_string());
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
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Pick the DSN to connect to: in-memory under `--mock`, else the configured
/// sqlite URL made absolute against `home_dir`.
fn resolve_dsn(db: &DatabaseConfig, home_dir: &Path, mock: bool) -> Result<String> {
    if mock {
        return Ok(MEMORY_DSN.to_string());
    }

    let raw = db.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;
    match url.scheme() {
        "sqlite" | "sqlite3" => {}
        other => return Err(anyhow!("Unsupported database type: {}", other)),
    }

    absolutize_sqlite_dsn(&raw.replacen("sqlite3://", "sqlite://", 1), home_dir, true)
}

async fn connect(db: &DatabaseConfig, dsn: &str) -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(dsn.to_string());
    opts.acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false);

    if dsn == MEMORY_DSN {
        // Every pooled connection would otherwise see its own empty database.
        opts.max_connections(1).min_connections(1);
    } else {
        opts.max_connections(db.max_conns.unwrap_or(10));
    }

    let busy = Duration::from_millis(u64::from(db.busy_timeout_ms.unwrap_or(5000)));
    opts.map_sqlx_sqlite_opts(move |o| o.busy_timeout(busy).create_if_missing(true));

    tracing::info!("Connecting to database: {}", dsn);
    Database::connect(opts)
        .await
        .with_context(|| format!("Failed to connect to {dsn}"))
}

/// `/health` probe backed by a database ping.
struct DbProbe(DatabaseConnection);

#[async_trait]
impl HealthProbe for DbProbe {
    fn component(&self) -> &'static str {
        "database"
    }

    async fn check(&self) -> Result<()> {
        self.0.ping().await.context("database ping failed")
    }
}

/// tzplanner - timezone-aware event scheduling service
#[derive(Parser)]
#[command(name = "tzplanner-server")]
#[command(about = "tzplanner - timezone-aware event scheduling service")]
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

    /// Use an in-memory database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration and database access
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config
        .logging
        .clone()
        .unwrap_or_else(runtime::config::default_logging_config);
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("tzplanner server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config, args).await,
    }
}

/// Connect, migrate and initialize the scheduling module.
async fn bootstrap(config: &AppConfig, args: &CliArgs) -> Result<(Scheduling, DatabaseConnection)> {
    let db_config = config.database.clone().unwrap_or_default();
    let home_dir = PathBuf::from(&config.server.home_dir);
    let dsn = resolve_dsn(&db_config, &home_dir, args.mock)?;

    let db = connect(&db_config, &dsn).await?;
    Scheduling::migrate(&db).await?;

    let scheduling = Scheduling::new();
    let scheduling_cfg: SchedulingConfig = config.module_config("scheduling")?;
    scheduling.init(scheduling_cfg, db.clone())?;
    Ok((scheduling, db))
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");
    let (scheduling, db) = bootstrap(&config, &args).await?;

    let mut ingress_cfg: ApiIngressConfig = config.module_config("api_ingress")?;
    if config.server.timeout_sec > 0 {
        ingress_cfg.request_timeout_sec = config.server.timeout_sec;
    }
    let ingress = ApiIngress::new(ingress_cfg);

    let routes = scheduling.register_rest(Router::new())?;
    let router = ingress.build_router(routes, Arc::new(DbProbe(db.clone())));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let cancel = CancellationToken::new();
    let signals = shutdown::cancel_on_signal(cancel.clone());

    let served = ingress.serve(router, addr, cancel).await;
    signals.abort();

    if let Err(e) = db.close().await {
        tracing::warn!("Failed to close database cleanly: {}", e);
    }
    tracing::info!("tzplanner server stopped");
    served
}

async fn check_config(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    let (scheduling, _db) = bootstrap(&config, &args).await?;
    let profiles = scheduling
        .client()?
        .list_profiles()
        .await
        .map_err(|e| anyhow!("scheduling check failed: {e}"))?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed ({} active profiles)", profiles.len());
    println!("{}", config.to_yaml()?);
    Ok(())
}
