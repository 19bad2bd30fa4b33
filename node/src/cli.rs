//! # CLI Interface
//!
//! Command-line structure for `fns-node` (clap derive). Every flag that
//! matters in deployment has an `FNS_*` environment override.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fns_protocol::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

/// FNS name-service node.
///
/// Holds the registry, registrar, wrapper and controller state, executes
/// signed calls against it and serves the JSON-RPC / REST API.
#[derive(Parser, Debug)]
#[command(
    name = "fns-node",
    about = "FNS name-service node",
    version,
    propagate_version = true
)]
pub struct FnsNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Create a data directory with a default config and an admin key.
    Init(InitArgs),
    /// Generate a wallet keypair and print it.
    Keygen,
    /// Query the status of a running node.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Service configuration (JSON). Defaults to `config.json` in the data
    /// directory, then to built-in defaults.
    #[arg(long, short = 'c', env = "FNS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding the database and the admin key.
    #[arg(long, short = 'd', env = "FNS_DATA_DIR", default_value = ".fns")]
    pub data_dir: PathBuf,

    /// Administrator address used when bootstrapping a fresh database.
    /// Falls back to the address of `admin.key` in the data directory.
    #[arg(long, env = "FNS_ADMIN")]
    pub admin: Option<String>,

    #[arg(long, env = "FNS_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    #[arg(long, env = "FNS_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// `pretty` or `json`.
    #[arg(long, env = "FNS_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    #[arg(long, short = 'd', env = "FNS_DATA_DIR", default_value = ".fns")]
    pub data_dir: PathBuf,

    /// Overwrite an existing config and admin key.
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    #[arg(long, env = "FNS_RPC_URL", default_value = "http://127.0.0.1:9841")]
    pub rpc_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        FnsNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = FnsNodeCli::parse_from(["fns-node", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.rpc_port, DEFAULT_RPC_PORT);
        assert_eq!(args.metrics_port, DEFAULT_METRICS_PORT);
        assert_eq!(args.data_dir, PathBuf::from(".fns"));
        assert_eq!(args.log_format, "pretty");
    }
}
