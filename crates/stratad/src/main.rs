//! stratad — the Strata storage node daemon.
//!
//! One binary for both sides of the control plane:
//! - `server` runs a node: mirror set, control RPCs, heal loop, lifecycle
//! - `control` drives a running node as an operator
//!
//! # Usage
//!
//! ```text
//! stratad server --config /etc/strata/strata.toml
//! stratad control --server 10.0.0.1:9000 heal list media --max-keys 100
//! stratad control --server 10.0.0.1:9000 service restart
//! ```

mod config;
mod control;
mod daemon;
mod heal_loop;
mod lifecycle;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stratad", about = "Strata storage node daemon", version)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a storage node.
    Server {
        /// Path to strata.toml.
        #[arg(long, default_value = "/etc/strata/strata.toml")]
        config: PathBuf,
    },
    /// Send an operator command to a running node.
    Control {
        /// Node address, `host:port`.
        #[arg(long)]
        server: String,

        /// Read credentials from this config instead of the environment.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        command: control::ControlCommand,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Server { config } => daemon::run_server(&config).await,
        Command::Control {
            server,
            config: config_path,
            command,
        } => {
            let credentials = match config_path {
                Some(path) => config::StrataConfig::from_file(&path)?.credentials(),
                None => config::credentials_from_env(|key| std::env::var(key).ok())?,
            };
            control::run(server, credentials, command).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stratad=debug,strata=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
