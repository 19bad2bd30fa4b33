// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # FNS Node
//!
//! Entry point for the `fns-node` binary:
//!
//! - `run`: open (or bootstrap) the name service and serve the API
//! - `init`: create a data directory with `config.json` and `admin.key`
//! - `keygen`: print a fresh wallet keypair and its address
//! - `status`: query a running node's `/status`
//! - `version`: print build version information

mod api;
mod calls;
mod cli;
mod ledger;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use fns_protocol::config::{ServiceConfig, PROTOCOL_VERSION};
use fns_protocol::crypto::keys::FnsKeypair;
use fns_protocol::storage::FnsDb;
use fns_protocol::Address;

use cli::{Commands, FnsNodeCli};
use ledger::{Ledger, SystemClock};
use logging::LogFormat;
use metrics::NodeMetrics;

/// Broadcast capacity for WebSocket fan-out. A register call emits around
/// ten events, so this absorbs a burst of a few dozen calls.
const EVENT_CHANNEL_CAPACITY: usize = 512;

const CONFIG_FILE: &str = "config.json";
const ADMIN_KEY_FILE: &str = "admin.key";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = FnsNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Keygen => {
            keygen();
            Ok(())
        }
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "fns_node=info,fns_contracts=info,fns_protocol=info,tower_http=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting fns-node"
    );

    let config = load_config(args.config.as_deref(), &args.data_dir)?;
    let admin = resolve_admin(args.admin.as_deref(), &args.data_dir)?;

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = FnsDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "database opened");

    // --- Ledger ---
    let ledger = Arc::new(
        Ledger::open(db, admin, config, Arc::new(SystemClock::new()))
            .context("failed to open name service ledger")?,
    );

    let node_metrics = Arc::new(NodeMetrics::new());
    node_metrics.events_logged.set(ledger.event_count() as i64);

    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        ledger: Arc::clone(&ledger),
        event_tx,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {api_addr}"))?;
    tracing::info!(addr = %api_addr, "API server listening");

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {metrics_addr}"))?;
    tracing::info!(addr = %metrics_addr, "metrics server listening");

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "API server error");
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!(error = %e, "metrics server error");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    ledger.flush().context("final flush failed")?;
    tracing::info!("fns-node stopped");
    Ok(())
}

/// Explicit `--config`, then `config.json` in the data directory, then
/// built-in defaults.
fn load_config(explicit: Option<&Path>, data_dir: &Path) -> Result<ServiceConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = data_dir.join(CONFIG_FILE);
            if !candidate.exists() {
                tracing::warn!("no config file found, using defaults");
                return Ok(ServiceConfig::default());
            }
            candidate
        }
    };
    let config = ServiceConfig::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    tracing::info!(path = %path.display(), tld = %config.base_tld, "config loaded");
    Ok(config)
}

/// Explicit `--admin`, then the address of `admin.key` in the data directory.
fn resolve_admin(explicit: Option<&str>, data_dir: &Path) -> Result<Address> {
    if let Some(raw) = explicit {
        return raw
            .parse()
            .with_context(|| format!("invalid --admin address: {raw}"));
    }
    let key_path = data_dir.join(ADMIN_KEY_FILE);
    if !key_path.exists() {
        bail!(
            "no admin address: pass --admin or run `fns-node init -d {}`",
            data_dir.display()
        );
    }
    let secret = std::fs::read_to_string(&key_path)
        .with_context(|| format!("failed to read {}", key_path.display()))?;
    let keypair = FnsKeypair::from_hex(secret.trim())
        .with_context(|| format!("malformed admin key in {}", key_path.display()))?;
    Ok(Address::from_public_key(&keypair.public_key()))
}

fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("fns_node=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let config_path = data_dir.join(CONFIG_FILE);
    let key_path = data_dir.join(ADMIN_KEY_FILE);
    for path in [&config_path, &key_path] {
        if path.exists() && !args.force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
    }

    ServiceConfig::default()
        .save(&config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    let keypair = FnsKeypair::generate();
    write_secret(&key_path, &keypair.secret_hex())?;
    let admin = Address::from_public_key(&keypair.public_key());

    tracing::info!(%admin, key_path = %key_path.display(), "admin key generated");

    println!("Node initialized.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Config         : {}", config_path.display());
    println!("  Admin key      : {}", key_path.display());
    println!("  Admin address  : {admin}");

    Ok(())
}

fn write_secret(path: &Path, secret_hex: &str) -> Result<()> {
    std::fs::write(path, secret_hex)
        .with_context(|| format!("failed to write key to {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

fn keygen() {
    let keypair = FnsKeypair::generate();
    let public_key = keypair.public_key();
    println!("secret key : {}", keypair.secret_hex());
    println!("public key : {}", public_key.to_hex());
    println!("address    : {}", Address::from_public_key(&public_key));
}

async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let (host, port, base_path) = split_http_url(&args.rpc_url)?;
    let path = format!("{}/status", base_path.trim_end_matches('/'));
    let body = http_get(&host, port, &path).await?;
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

/// `http://host[:port][/path]` into its parts. Plain HTTP only.
fn split_http_url(url: &str) -> Result<(String, u16, String)> {
    let rest = url.strip_prefix("http://").unwrap_or(url);
    if rest.starts_with("https://") {
        bail!("https is not supported by `status`: {url}");
    }
    let (authority, path) = match rest.find('/') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (
            host,
            port.parse::<u16>()
                .with_context(|| format!("bad port in {url}"))?,
        ),
        None => (authority, 80),
    };
    if host.is_empty() {
        bail!("missing host in {url}");
    }
    Ok((host.to_string(), port, path.to_string()))
}

/// One-shot HTTP/1.1 GET over a raw socket; returns the body.
async fn http_get(host: &str, port: u16, path: &str) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let addr = format!("{host}:{port}");
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;

    let request = format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string());
    Ok(body)
}

fn print_version() {
    println!("fns-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol {PROTOCOL_VERSION}");
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
