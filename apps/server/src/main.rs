//! Portfolio Bot
//!
//! Telegram bot reporting BTC, ETH and DeFi holdings through a rotating pool of RPC endpoints.

mod config;
mod snapshot;

use clap::{Parser, Subcommand};
use config::{process_env, telegram_token, AppConfig, ConfigError};
use portfolio_bot::{Database, DbError, PortfolioService, TelegramBot};
use portfolio_feeds::{Collaborators, FeedError};
use portfolio_rpc::{RpcError, RpcManager};
use snapshot::SnapshotError;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Portfolio Bot CLI
#[derive(Parser, Debug)]
#[command(name = "portfolio-bot")]
#[command(about = "Crypto portfolio Telegram bot", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Run the Telegram bot (default)
    Run,
    /// Write the Compound position of every stored address to a JSON file
    Snapshot {
        #[arg(short, long, default_value = "cache_compound.json")]
        output: PathBuf,
    },
}

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

async fn run(args: Args) -> Result<(), AppError> {
    let config = AppConfig::load(&args.config)?.with_env(process_env);
    info!("  RPC endpoints: {}", config.rpc.endpoints.len());
    info!("  Database: {}", config.database_url);

    let manager = Arc::new(RpcManager::new(&config.rpc)?);
    let collaborators = Collaborators::new(
        Arc::clone(&manager),
        &config.explorer,
        &config.prices,
        &config.protocols,
    )?;
    let db = Database::connect(&config.database_url).await?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            let token = telegram_token(process_env)?;
            let portfolio =
                PortfolioService::new(Arc::new(collaborators), config.rpc.batch_deadline());
            let bot = Arc::new(TelegramBot::new(&token, db, portfolio, manager));
            bot.run().await;
        }
        Command::Snapshot { output } => {
            let snapshot = snapshot::collect(&db, collaborators.compound(), &manager).await?;
            snapshot.write(&output)?;
            info!(
                "Wrote {} addresses to {}",
                snapshot.addresses.len(),
                output.display()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_level);

    info!("🚀 Portfolio Bot starting...");

    match run(args).await {
        Ok(()) => {
            info!("👋 Portfolio Bot stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
