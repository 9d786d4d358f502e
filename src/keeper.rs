// Keeper - runs every reconciliation pass for each selected network
//
// Per network, strictly in order:
// 1. Connect (state reader + signers)
// 2. Reward payouts for the network's reward model
// 3. Delegated votes, where governance is supported
// 4. Fellowship member and salary bumps, on collectives networks
//
// A failing pass is recorded and the next pass or network still runs.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::chain::{ChainStateReader, ChainView};
use crate::config::{AppConfig, NetworkConfig, RewardModel};
use crate::error::{AppError, AppResult, ConfigError};
use crate::execution::{Sender, SubmissionReport};
use crate::{fellowship, governance, payout};

/// Live handles for one network, dropped when its run ends
pub struct NetworkSession {
    pub reader: Arc<dyn ChainStateReader>,
    pub payout_sender: Option<Sender>,
    pub bump_sender: Option<Sender>,
}

impl NetworkSession {
    fn payout_sender(&self) -> Result<&Sender, ConfigError> {
        self.payout_sender
            .as_ref()
            .ok_or(ConfigError::MissingSecret("PAYOUTS_ACCOUNT_MNEMONIC"))
    }

    fn bump_sender(&self) -> Result<&Sender, ConfigError> {
        self.bump_sender
            .as_ref()
            .ok_or(ConfigError::MissingSecret("BUMP_ACCOUNT_MNEMONIC"))
    }
}

/// Opens sessions against a network
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, network: &NetworkConfig) -> AppResult<NetworkSession>;
}

/// Outcome of one network within a run
#[derive(Debug, Clone, Default)]
pub struct NetworkReport {
    pub network: String,
    pub payouts: SubmissionReport,
    pub votes: SubmissionReport,
    pub bumps: SubmissionReport,
    pub errors: Vec<String>,
}

impl NetworkReport {
    fn new(network: &str) -> Self {
        Self {
            network: network.to_string(),
            ..Default::default()
        }
    }

    fn record_error(&mut self, pass: &str, e: &AppError) {
        error!("❌ {} failed on {}: {}", pass, self.network, e);
        self.errors.push(format!("{}: {}", pass, e));
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total(&self) -> SubmissionReport {
        let mut total = self.payouts.clone();
        total.merge(&self.votes);
        total.merge(&self.bumps);
        total
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub networks: Vec<NetworkReport>,
}

impl RunReport {
    pub fn total(&self) -> SubmissionReport {
        self.networks.iter().fold(SubmissionReport::default(), |mut total, n| {
            total.merge(&n.total());
            total
        })
    }

    pub fn failed_networks(&self) -> Vec<&str> {
        self.networks
            .iter()
            .filter(|n| !n.is_ok())
            .map(|n| n.network.as_str())
            .collect()
    }
}

pub struct Keeper {
    config: Arc<AppConfig>,
    connector: Arc<dyn Connector>,
}

impl Keeper {
    pub fn new(config: Arc<AppConfig>, connector: Arc<dyn Connector>) -> Self {
        Self { config, connector }
    }

    /// One full pass over every network matching `network_type`.
    ///
    /// Only an unmatched network type fails the run as a whole.
    #[instrument(skip(self))]
    pub async fn run(&self, network_type: &str, run_id: Uuid) -> AppResult<RunReport> {
        let networks = self.config.networks_for(network_type)?;
        info!("🔄 Starting keeper run over {} networks", networks.len());

        let mut report = RunReport {
            run_id,
            networks: Vec::with_capacity(networks.len()),
        };
        for network in networks {
            report.networks.push(self.run_network(network).await);
        }

        let total = report.total();
        info!(
            "✓ Keeper run completed: {} submitted, {} finalized, {} failed",
            total.submitted, total.finalized, total.failed
        );
        let failed = report.failed_networks();
        if !failed.is_empty() {
            warn!("⚠️ Networks with errors: {}", failed.join(", "));
        }

        Ok(report)
    }

    #[instrument(skip_all, fields(network = %network.name, kind = %network.kind))]
    async fn run_network(&self, network: &NetworkConfig) -> NetworkReport {
        let mut report = NetworkReport::new(&network.name);

        let session = match self.connector.connect(network).await {
            Ok(session) => session,
            Err(e) => {
                report.record_error("connect", &e);
                return report;
            }
        };
        info!("🔗 Connected to {} network", network.name);

        let view = ChainView::new(session.reader.as_ref(), self.config.retry);

        if network.kind.reward_model() != RewardModel::None {
            let payouts = match session.payout_sender() {
                Ok(sender) => payout::payout_rewards(view, sender, network).await,
                Err(e) => Err(e.into()),
            };
            match payouts {
                Ok(payouts) => report.payouts = payouts,
                Err(e) => report.record_error("payouts", &e),
            }
        }

        if network.kind.supports_governance() {
            let votes = match session.payout_sender() {
                Ok(sender) => governance::cast_delegated_votes(view, sender, network).await,
                Err(e) => Err(e.into()),
            };
            match votes {
                Ok(votes) => report.votes = votes,
                Err(e) => report.record_error("votes", &e),
            }
        }

        if network.kind.supports_fellowship() {
            let bumps = match session.bump_sender() {
                Ok(sender) => fellowship::bump_fellowship(view, sender).await,
                Err(e) => Err(e.into()),
            };
            match bumps {
                Ok(bumps) => report.bumps = bumps,
                Err(e) => report.record_error("fellowship", &e),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::{StakeOverview, TrackId};
    use crate::chain::{Call, ChainSnapshot, SnapshotReader};
    use crate::error::ReadError;
    use crate::execution::{DryRunTransport, Signer};
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, HashMap};
    use std::time::Duration;

    struct FixtureConnector {
        snapshots: HashMap<String, ChainSnapshot>,
        transport: Arc<DryRunTransport>,
        with_bump_signer: bool,
        connected: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Connector for FixtureConnector {
        async fn connect(&self, network: &NetworkConfig) -> AppResult<NetworkSession> {
            self.connected.lock().push(network.name.clone());
            let snapshot = self
                .snapshots
                .get(&network.name)
                .cloned()
                .ok_or_else(|| ReadError::transient(network.endpoint.clone(), "connection refused"))?;

            let sender = |label: &str| {
                Sender::new(
                    self.transport.clone(),
                    Arc::new(Signer::from_secret(label, "//Alice")),
                    Duration::from_secs(5),
                )
            };

            Ok(NetworkSession {
                reader: Arc::new(SnapshotReader::new(snapshot)),
                payout_sender: Some(sender("payouts")),
                bump_sender: self.with_bump_signer.then(|| sender("bump")),
            })
        }
    }

    const CONFIG: &str = r#"
        [retry]
        max_attempts = 1
        delay_ms = 0

        [[networks]]
        name = "Kusama"
        kind = "relaychain"
        endpoint = "wss://kusama.example"

        [[networks.validators]]
        address = "alice"

        [[networks]]
        name = "Polkadot"
        kind = "relaychain"
        endpoint = "wss://polkadot.example"

        [[networks.validators]]
        address = "alice"
        vote_weight = 10
        vote_enabled = true

        [[networks]]
        name = "Collectives"
        kind = "fellowship"
        endpoint = "wss://collectives.example"
    "#;

    fn staked_snapshot() -> ChainSnapshot {
        ChainSnapshot {
            active_era: Some(10),
            history_depth: 2,
            stakers_overview_enabled: true,
            stakers_overview: BTreeMap::from([(
                9,
                BTreeMap::from([("alice".to_string(), StakeOverview::default())]),
            )]),
            tracks: vec![0 as TrackId],
            ..Default::default()
        }
    }

    fn keeper(connector: Arc<FixtureConnector>) -> Keeper {
        let config = AppConfig::from_toml_str(CONFIG).unwrap();
        Keeper::new(Arc::new(config), connector)
    }

    #[tokio::test]
    async fn test_unreachable_network_does_not_stop_the_others() {
        let transport = Arc::new(DryRunTransport::new());
        let connector = Arc::new(FixtureConnector {
            snapshots: HashMap::from([
                ("Polkadot".to_string(), staked_snapshot()),
                ("Collectives".to_string(), ChainSnapshot::default()),
            ]),
            transport: transport.clone(),
            with_bump_signer: true,
            connected: Mutex::new(Vec::new()),
        });

        let report = keeper(connector.clone()).run("all", Uuid::new_v4()).await.unwrap();

        assert_eq!(*connector.connected.lock(), vec!["Kusama", "Polkadot", "Collectives"]);
        assert_eq!(report.failed_networks(), vec!["Kusama"]);

        let polkadot = &report.networks[1];
        assert_eq!(polkadot.payouts.finalized, 1);
        assert_eq!(polkadot.votes.finalized, 0);
        assert!(transport.submitted().iter().any(|c| matches!(
            c,
            Call::Batch { calls, .. } if calls == &vec![Call::PayoutStakers {
                validator: "alice".to_string(),
                era: 9,
            }]
        )));
    }

    #[tokio::test]
    async fn test_missing_bump_signer_fails_only_fellowship() {
        let connector = Arc::new(FixtureConnector {
            snapshots: HashMap::from([
                ("Kusama".to_string(), staked_snapshot()),
                ("Polkadot".to_string(), staked_snapshot()),
                ("Collectives".to_string(), ChainSnapshot::default()),
            ]),
            transport: Arc::new(DryRunTransport::new()),
            with_bump_signer: false,
            connected: Mutex::new(Vec::new()),
        });

        let report = keeper(connector).run("all", Uuid::new_v4()).await.unwrap();

        assert_eq!(report.failed_networks(), vec!["Collectives"]);
        assert!(report.networks[2].errors[0].contains("BUMP_ACCOUNT_MNEMONIC"));
        assert_eq!(report.total().finalized, 2);
    }

    #[tokio::test]
    async fn test_unknown_network_type_fails_the_run() {
        let connector = Arc::new(FixtureConnector {
            snapshots: HashMap::new(),
            transport: Arc::new(DryRunTransport::new()),
            with_bump_signer: true,
            connected: Mutex::new(Vec::new()),
        });

        let result = keeper(connector.clone()).run("astar", Uuid::new_v4()).await;

        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::NoMatchingNetworks(_)))
        ));
        assert!(connector.connected.lock().is_empty());
    }
}
