// Keeper Scheduler - decides when keeper runs happen
//
// - Once: a single run, then exit (cron-driven deployments)
// - Hourly: every hour from startup
// - Daily: once per day at the configured UTC hour

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::time::{interval, Duration};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::AppResult;
use crate::keeper::{Keeper, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Hourly,
    Daily,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub frequency: Frequency,
    /// UTC hour (0-23) for daily runs
    pub execution_hour: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            frequency: Frequency::Once,
            execution_hour: 2,
        }
    }
}

pub struct KeeperScheduler {
    config: ScheduleConfig,
    keeper: Arc<Keeper>,
    network_type: String,
}

impl KeeperScheduler {
    pub fn new(config: ScheduleConfig, keeper: Arc<Keeper>, network_type: impl Into<String>) -> Self {
        Self {
            config,
            keeper,
            network_type: network_type.into(),
        }
    }

    /// Run according to the configured frequency; only `Once` ever returns
    pub async fn run(&self) -> AppResult<()> {
        match self.config.frequency {
            Frequency::Once => self.run_once().await.map(|_| ()),
            Frequency::Hourly => self.run_hourly().await,
            Frequency::Daily => self.run_daily().await,
        }
    }

    async fn run_once(&self) -> AppResult<RunReport> {
        let report = self.keeper.run(&self.network_type, Uuid::new_v4()).await?;
        info!(
            "📋 Run {} covered {} networks, {} with errors",
            report.run_id,
            report.networks.len(),
            report.failed_networks().len()
        );
        Ok(report)
    }

    async fn run_daily(&self) -> AppResult<()> {
        loop {
            let now = Utc::now();
            let next_execution = calculate_next_daily_execution(now, self.config.execution_hour);
            let wait = next_execution.signed_duration_since(now);

            info!(
                "⏰ Next keeper run scheduled for: {} UTC",
                next_execution.format("%Y-%m-%d %H:%M:%S")
            );
            if let Ok(wait) = wait.to_std() {
                tokio::time::sleep(wait).await;
            }

            info!("🔄 Starting daily keeper cycle");
            if let Err(e) = self.run_once().await {
                error!("❌ Keeper run failed: {}", e);
            }
        }
    }

    async fn run_hourly(&self) -> AppResult<()> {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;

            info!("🔄 Starting hourly keeper cycle");
            if let Err(e) = self.run_once().await {
                error!("❌ Keeper run failed: {}", e);
            }
        }
    }
}

/// Next occurrence of `execution_hour:00:00` UTC strictly after `now`
pub fn calculate_next_daily_execution(now: DateTime<Utc>, execution_hour: u32) -> DateTime<Utc> {
    let hour = execution_hour.min(23);
    let today = now.date_naive();

    let candidate = today
        .and_hms_opt(hour, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .filter(|at| *at > now);

    match candidate {
        Some(at) => at,
        None => {
            let tomorrow = today + chrono::Duration::days(1);
            tomorrow
                .and_hms_opt(hour, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive))
                .unwrap_or(now + chrono::Duration::days(1))
        }
    }
}
