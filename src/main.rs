use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photoweek::chat::DiscordApi;
use photoweek::config::ContestConfig;
use photoweek::contest::ContestState;
use photoweek::schedule;
use photoweek::store::{MonthlyRollup, WinnerLedger};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoweek=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting photoweek...");

    let config = match ContestConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let chat = Arc::new(DiscordApi::new(config.token.clone()));
    let winners = WinnerLedger::load(&config.winners_file);
    let rollup = MonthlyRollup::load(&config.monthly_file);

    let state = Arc::new(ContestState::new(config, chat, winners, rollup));

    let weekly = schedule::spawn_weekly_scheduler(state.clone());
    let monthly = schedule::spawn_monthly_close_watcher(state.clone());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
        _ = weekly => tracing::error!("weekly scheduler exited unexpectedly"),
        _ = monthly => tracing::error!("monthly close watcher exited unexpectedly"),
    }
}
