use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::chain::{ChainSnapshot, SnapshotReader};
use crate::config::{AppConfig, NetworkConfig};
use crate::error::{AppResult, ConfigError};
use crate::execution::{DryRunTransport, Sender, Signer, Transport, TxStatus};
use crate::keeper::{Connector, Keeper, NetworkSession};

/// Status sequences answered to successive submissions, read from the snapshot file
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScriptedOutcomes {
    submission_outcomes: Vec<Vec<TxStatus>>,
}

/// Snapshot file: decoded chain state plus optional scripted submission outcomes
struct SnapshotDocument {
    state: ChainSnapshot,
    outcomes: Vec<Vec<TxStatus>>,
}

impl SnapshotDocument {
    fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let snapshot_error = |message: String| ConfigError::Snapshot {
            path: path.display().to_string(),
            message,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| snapshot_error(e.to_string()))?;
        let state: ChainSnapshot =
            serde_json::from_str(&raw).map_err(|e| snapshot_error(e.to_string()))?;
        let scripted: ScriptedOutcomes =
            serde_json::from_str(&raw).map_err(|e| snapshot_error(e.to_string()))?;

        info!(
            "📸 Loaded chain snapshot from {} ({} scripted outcomes)",
            path.display(),
            scripted.submission_outcomes.len()
        );
        Ok(Self {
            state,
            outcomes: scripted.submission_outcomes,
        })
    }
}

/// Connects networks to exported chain snapshots and a dry-run transport
pub struct SnapshotConnector {
    payout_signer: Option<Arc<Signer>>,
    bump_signer: Option<Arc<Signer>>,
    finality_timeout: Duration,
}

impl SnapshotConnector {
    pub fn from_config(config: &AppConfig) -> Self {
        let payout_signer = config
            .payout_account
            .as_ref()
            .map(|secret| Arc::new(Signer::from_secret("payouts", secret.as_str())));
        let bump_signer = config
            .bump_account
            .as_ref()
            .map(|secret| Arc::new(Signer::from_secret("bump", secret.as_str())));

        if payout_signer.is_some() {
            info!("✅ Payout signer loaded");
        } else {
            warn!("⚠️  PAYOUTS_ACCOUNT_MNEMONIC not set - payouts and votes disabled");
        }
        if bump_signer.is_some() {
            info!("✅ Bump signer loaded");
        } else {
            warn!("⚠️  BUMP_ACCOUNT_MNEMONIC not set - fellowship bumps disabled");
        }

        Self {
            payout_signer,
            bump_signer,
            finality_timeout: config.submission.finality_timeout(),
        }
    }
}

#[async_trait]
impl Connector for SnapshotConnector {
    async fn connect(&self, network: &NetworkConfig) -> AppResult<NetworkSession> {
        let path = network.snapshot.as_ref().ok_or_else(|| ConfigError::Invalid {
            network: network.name.clone(),
            field: "snapshot",
            message: format!("no chain snapshot configured for {}", network.endpoint),
        })?;
        let document = SnapshotDocument::from_json_file(path)?;

        let dry_run = DryRunTransport::new();
        for outcome in document.outcomes {
            dry_run.script(outcome);
        }
        let transport: Arc<dyn Transport> = Arc::new(dry_run);
        let sender = |signer: &Arc<Signer>| {
            Sender::new(transport.clone(), signer.clone(), self.finality_timeout)
        };

        Ok(NetworkSession {
            reader: Arc::new(SnapshotReader::new(document.state)),
            payout_sender: self.payout_signer.as_ref().map(sender),
            bump_sender: self.bump_signer.as_ref().map(sender),
        })
    }
}

/// Fails before any connection when a selected network lacks its signing secret
pub fn initialize_keeper(config: Arc<AppConfig>, network_type: &str) -> AppResult<Keeper> {
    info!("Initializing keeper components ...");
    config.require_secrets(network_type)?;

    let connector = Arc::new(SnapshotConnector::from_config(&config));
    Ok(Keeper::new(config, connector))
}
