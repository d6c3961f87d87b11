//! Fairhouse server binary.
//!
//! Hosts the coinflip, crash, and mines games behind one HTTP/WebSocket API.

use clap::Parser;
use fairhouse::api::{ApiServer, AppState};
use fairhouse::bank::Accounts;
use fairhouse::coinflip::Coinflip;
use fairhouse::config::ConfigLoader;
use fairhouse::crash;
use fairhouse::mines::MinesEngine;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "fairhouse")]
#[command(about = "Provably fair wager games server", long_about = None)]
struct Args {
    /// Server host
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Starting crash bank pool
    #[arg(long)]
    bank: Option<u64>,

    /// Minimum bet for coinflip and mines
    #[arg(long)]
    min_bet: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fairhouse=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;

    // CLI flags win over file and environment.
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bank) = args.bank {
        config.crash.initial_bank = bank;
    }
    if let Some(min_bet) = args.min_bet {
        config.games.min_bet = min_bet;
    }

    let accounts = Arc::new(Accounts::new(config.games.starting_balance));
    let coinflip = Arc::new(Coinflip::new(
        accounts.clone(),
        config.games.min_bet,
        config.games.history_limit,
    ));
    let mines = Arc::new(MinesEngine::new(
        accounts.clone(),
        config.games.min_bet,
        config.games.history_limit,
    ));
    let crash = crash::spawn(
        config.crash.clone(),
        accounts.clone(),
        config.games.history_limit,
    );

    let state = Arc::new(AppState {
        accounts,
        coinflip,
        mines,
        crash,
        version: env!("CARGO_PKG_VERSION").to_string(),
    });

    ApiServer::new(config.server.clone(), state).run().await
}
