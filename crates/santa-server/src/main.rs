//! Secret Santa console server.
//!
//! # Usage
//!
//! ```bash
//! # Two admins, persistent state, retry deadlocked shuffles
//! santa-server --admin 1001 --admin 1002 --state santa.cbor --shuffle-attempts 5
//!
//! # Then type commands as `<user-id> /<command> [args]`
//! 1001 /register @alice Alice
//! 1001 /shuffle
//! ```

use std::path::PathBuf;

use clap::Parser;
use santa_server::{AdminList, Server, ServerConfig, SystemEnv};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Secret Santa coordinator
#[derive(Parser, Debug)]
#[command(name = "santa-server")]
#[command(about = "Secret Santa gift exchange coordinator")]
#[command(version)]
struct Args {
    /// User id allowed to run admin commands (repeatable)
    #[arg(long = "admin")]
    admins: Vec<u64>,

    /// CBOR state file, loaded at start and saved after each change
    #[arg(long)]
    state: Option<PathBuf>,

    /// Attempts per /shuffle before reporting a deadlock
    #[arg(long, default_value = "1")]
    shuffle_attempts: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Logs go to stderr so stdout carries only console output.
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    if args.admins.is_empty() {
        tracing::warn!("no admins configured, /shuffle will be refused for everyone");
    }

    let config = ServerConfig {
        admins: AdminList::new(args.admins),
        shuffle_attempts: args.shuffle_attempts,
        state_path: args.state,
    };

    let server = Server::open(config, SystemEnv::new())?;
    tracing::info!("Santa server ready, reading commands from stdin");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    server.run(stdin, tokio::io::stdout()).await?;

    Ok(())
}
