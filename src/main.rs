mod bootstrap;
mod chain;
mod config;
mod error;
mod execution;
mod fellowship;
mod governance;
mod keeper;
mod payout;
mod scheduler;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::scheduler::KeeperScheduler;

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,keeper=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenv::dotenv().ok();

    init_tracing();

    info!("🚀 Starting validator keeper");

    let config = AppConfig::load().context("failed to load keeper configuration")?;

    // Network type from the first argument, then config, then every network
    let network_type = std::env::args()
        .nth(1)
        .or_else(|| config.network_type.clone())
        .unwrap_or_else(|| "all".to_string());
    info!("🌐 Network type: {}", network_type);

    let schedule = config.schedule.clone();
    let keeper = bootstrap::initialize_keeper(Arc::new(config), &network_type)
        .context("keeper startup checks failed")?;
    let keeper = Arc::new(keeper);

    KeeperScheduler::new(schedule, keeper, network_type)
        .run()
        .await
        .context("keeper run failed")?;

    info!("✓ Keeper finished");
    Ok(())
}
