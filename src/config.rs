use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ::config::{Environment, File, FileFormat};
use serde::{Deserialize, Deserializer};

use crate::chain::types::{AccountId, Balance};
use crate::chain::{BatchMode, RetryPolicy};
use crate::error::ConfigError;
use crate::scheduler::ScheduleConfig;

/// Network variant - decides which reconciliation passes apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    Relaychain,
    Astar,
    Kilt,
    Fellowship,
}

/// How a network pays out staking rewards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardModel {
    /// Era-based staking payouts (relay chains)
    StakeEra,
    /// Dapp-staking tier rewards
    DappTier,
    /// Parachain collator delegation rewards
    ParachainDelegation,
    None,
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NetworkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relaychain" => Ok(NetworkKind::Relaychain),
            "astar" => Ok(NetworkKind::Astar),
            "kilt" => Ok(NetworkKind::Kilt),
            "fellowship" => Ok(NetworkKind::Fellowship),
            _ => Err(ConfigError::UnknownNetworkType(s.to_string())),
        }
    }
}

impl NetworkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkKind::Relaychain => "relaychain",
            NetworkKind::Astar => "astar",
            NetworkKind::Kilt => "kilt",
            NetworkKind::Fellowship => "fellowship",
        }
    }

    pub fn reward_model(&self) -> RewardModel {
        match self {
            NetworkKind::Relaychain => RewardModel::StakeEra,
            NetworkKind::Astar => RewardModel::DappTier,
            NetworkKind::Kilt => RewardModel::ParachainDelegation,
            NetworkKind::Fellowship => RewardModel::None,
        }
    }

    pub fn supports_governance(&self) -> bool {
        matches!(self, NetworkKind::Relaychain)
    }

    pub fn supports_fellowship(&self) -> bool {
        matches!(self, NetworkKind::Fellowship)
    }

    fn default_batch_size(&self) -> usize {
        match self {
            NetworkKind::Relaychain => 4,
            NetworkKind::Astar => 20,
            NetworkKind::Kilt | NetworkKind::Fellowship => 1,
        }
    }

    fn default_batch_mode(&self) -> BatchMode {
        match self {
            NetworkKind::Relaychain => BatchMode::ForceBatch,
            NetworkKind::Astar | NetworkKind::Kilt => BatchMode::Batch,
            NetworkKind::Fellowship => BatchMode::BatchAll,
        }
    }
}

/// Operator-managed validator entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Validator {
    pub address: AccountId,
    /// Accounts whose votes the validator mirrors
    #[serde(default)]
    pub voting_delegates: Vec<AccountId>,
    /// Planck; an integer or a decimal string for amounts beyond `u64`
    #[serde(default, deserialize_with = "deserialize_balance")]
    pub vote_weight: Balance,
    #[serde(default)]
    pub vote_enabled: bool,
}

/// The `config` crate has no `u128` values, so balances arrive as `u64` or strings
fn deserialize_balance<'de, D>(deserializer: D) -> Result<Balance, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawBalance {
        Integer(u64),
        Text(String),
    }

    match RawBalance::deserialize(deserializer)? {
        RawBalance::Integer(value) => Ok(Balance::from(value)),
        RawBalance::Text(text) => text
            .trim()
            .parse::<Balance>()
            .map_err(|e| serde::de::Error::custom(format!("invalid balance {:?}: {}", text, e))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub kind: NetworkKind,
    pub endpoint: String,
    #[serde(default)]
    pub validators: Vec<Validator>,
    pub batch_size: Option<usize>,
    pub batch_mode: Option<BatchMode>,
    /// Rescan the whole retained history on the legacy payout path
    #[serde(default)]
    pub force_history_rescan: bool,
    /// Decoded state document served by the snapshot reader
    pub snapshot: Option<PathBuf>,
}

impl NetworkConfig {
    pub fn batch_size(&self) -> usize {
        self.batch_size
            .unwrap_or_else(|| self.kind.default_batch_size())
    }

    pub fn batch_mode(&self) -> BatchMode {
        self.batch_mode
            .unwrap_or_else(|| self.kind.default_batch_mode())
    }

    /// Payouts and delegated votes are signed by the payouts account
    pub fn needs_payout_signer(&self) -> bool {
        self.kind.reward_model() != RewardModel::None
            || (self.kind.supports_governance() && self.validators.iter().any(|v| v.vote_enabled))
    }

    pub fn needs_bump_signer(&self) -> bool {
        self.kind.supports_fellowship()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == Some(0) {
            return Err(ConfigError::Invalid {
                network: self.name.clone(),
                field: "batch_size",
                message: "must be at least 1".to_string(),
            });
        }

        if let Some(validator) = self
            .validators
            .iter()
            .find(|v| v.vote_enabled && v.vote_weight == 0)
        {
            return Err(ConfigError::Invalid {
                network: self.name.clone(),
                field: "vote_weight",
                message: format!("voting validator {} has zero vote weight", validator.address),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    pub finality_timeout_secs: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            finality_timeout_secs: 300,
        }
    }
}

impl SubmissionConfig {
    pub fn finality_timeout(&self) -> Duration {
        Duration::from_secs(self.finality_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Network kind to process when none is given on the command line
    #[serde(default)]
    pub network_type: Option<String>,
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Secrets never come from the config file
    #[serde(skip)]
    pub payout_account: Option<String>,
    #[serde(skip)]
    pub bump_account: Option<String>,
}

impl AppConfig {
    /// Layer `keeper.toml` (or `$KEEPER_CONFIG`) and `KEEPER__*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("KEEPER_CONFIG").unwrap_or_else(|_| "keeper".to_string());

        let config = ::config::Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix("KEEPER").separator("__"))
            .build()?;

        let mut app: AppConfig = config.try_deserialize()?;
        app.payout_account = std::env::var("PAYOUTS_ACCOUNT_MNEMONIC").ok();
        app.bump_account = std::env::var("BUMP_ACCOUNT_MNEMONIC").ok();
        app.validate()?;
        Ok(app)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config = ::config::Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.execution_hour > 23 {
            return Err(ConfigError::Schedule(format!(
                "execution_hour must be 0-23, got {}",
                self.schedule.execution_hour
            )));
        }

        self.networks.iter().try_for_each(NetworkConfig::validate)
    }

    /// Networks matching a requested network type; `all` selects every network
    pub fn networks_for(&self, network_type: &str) -> Result<Vec<&NetworkConfig>, ConfigError> {
        let selected: Vec<&NetworkConfig> = if network_type.eq_ignore_ascii_case("all") {
            self.networks.iter().collect()
        } else {
            let kind = NetworkKind::from_str(network_type)?;
            self.networks.iter().filter(|n| n.kind == kind).collect()
        };

        if selected.is_empty() {
            return Err(ConfigError::NoMatchingNetworks(network_type.to_string()));
        }

        Ok(selected)
    }

    /// Every secret the selected networks sign with must be present before any connection
    pub fn require_secrets(&self, network_type: &str) -> Result<(), ConfigError> {
        let networks = self.networks_for(network_type)?;

        if self.payout_account.is_none() && networks.iter().any(|n| n.needs_payout_signer()) {
            return Err(ConfigError::MissingSecret("PAYOUTS_ACCOUNT_MNEMONIC"));
        }
        if self.bump_account.is_none() && networks.iter().any(|n| n.needs_bump_signer()) {
            return Err(ConfigError::MissingSecret("BUMP_ACCOUNT_MNEMONIC"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        network_type = "relaychain"

        [retry]
        max_attempts = 5
        delay_ms = 100

        [[networks]]
        name = "Polkadot"
        kind = "relaychain"
        endpoint = "wss://rpc.polkadot.io"
        batch_mode = "batch"

        [[networks.validators]]
        address = "15oF4uVJwmo4TdGW7VfQxNLavjCXviqxT9S1MgbjMNHr6Sp5"
        voting_delegates = ["14Gjs1TD93gnwEBfDMHoCgsuf1s2TVKUP6Z1qKmAZnZ8cW5q"]
        vote_weight = 1000
        vote_enabled = true

        [[networks]]
        name = "Astar"
        kind = "astar"
        endpoint = "wss://rpc.astar.network"
    "#;

    #[test]
    fn test_parse_sample_config() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.networks.len(), 2);
        assert_eq!(config.retry, RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(100),
        });
        assert_eq!(config.submission.finality_timeout(), Duration::from_secs(300));

        let polkadot = &config.networks[0];
        assert_eq!(polkadot.validators[0].vote_weight, 1000);
        assert!(polkadot.validators[0].vote_enabled);
        assert_eq!(polkadot.batch_size(), 4);
        assert_eq!(polkadot.batch_mode(), BatchMode::Batch);

        let astar = &config.networks[1];
        assert_eq!(astar.batch_size(), 20);
        assert_eq!(astar.batch_mode(), BatchMode::Batch);
        assert!(astar.validators.is_empty());
    }

    #[test]
    fn test_network_filter() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();

        let relay = config.networks_for("Relaychain").unwrap();
        assert_eq!(relay.len(), 1);
        assert_eq!(relay[0].name, "Polkadot");

        assert_eq!(config.networks_for("all").unwrap().len(), 2);
        assert!(matches!(
            config.networks_for("kilt"),
            Err(ConfigError::NoMatchingNetworks(_))
        ));
        assert!(matches!(
            config.networks_for("ethereum"),
            Err(ConfigError::UnknownNetworkType(_))
        ));
    }

    #[test]
    fn test_vote_weight_accepts_decimal_strings() {
        let raw = r#"
            [[networks]]
            name = "Polkadot"
            kind = "relaychain"
            endpoint = "wss://rpc.polkadot.io"

            [[networks.validators]]
            address = "alice"
            vote_weight = "50000000000000000000000"
            vote_enabled = true
        "#;

        let config = AppConfig::from_toml_str(raw).unwrap();
        assert_eq!(
            config.networks[0].validators[0].vote_weight,
            50_000_000_000_000_000_000_000u128
        );

        let malformed = raw.replace("50000000000000000000000", "lots");
        assert!(matches!(
            AppConfig::from_toml_str(&malformed),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_missing_secrets_are_fatal_for_selected_networks() {
        let raw = r#"
            [[networks]]
            name = "Polkadot"
            kind = "relaychain"
            endpoint = "wss://rpc.polkadot.io"

            [[networks]]
            name = "Collectives"
            kind = "fellowship"
            endpoint = "wss://polkadot-collectives-rpc.polkadot.io"
        "#;
        let mut config = AppConfig::from_toml_str(raw).unwrap();

        assert!(matches!(
            config.require_secrets("all"),
            Err(ConfigError::MissingSecret("PAYOUTS_ACCOUNT_MNEMONIC"))
        ));

        config.payout_account = Some("//Alice".to_string());
        assert!(config.require_secrets("relaychain").is_ok());
        assert!(matches!(
            config.require_secrets("fellowship"),
            Err(ConfigError::MissingSecret("BUMP_ACCOUNT_MNEMONIC"))
        ));

        config.payout_account = None;
        config.bump_account = Some("//Bob".to_string());
        assert!(config.require_secrets("fellowship").is_ok());
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let raw = r#"
            [[networks]]
            name = "Kusama"
            kind = "relaychain"
            endpoint = "wss://kusama-rpc.polkadot.io"
            batch_size = 0
        "#;

        assert!(matches!(
            AppConfig::from_toml_str(raw),
            Err(ConfigError::Invalid { field: "batch_size", .. })
        ));
    }

    #[test]
    fn test_schedule_hour_is_validated() {
        let raw = r#"
            [schedule]
            frequency = "daily"
            execution_hour = 24
        "#;

        assert!(matches!(
            AppConfig::from_toml_str(raw),
            Err(ConfigError::Schedule(_))
        ));
    }

    #[test]
    fn test_capability_table() {
        assert_eq!(NetworkKind::Relaychain.reward_model(), RewardModel::StakeEra);
        assert_eq!(NetworkKind::Astar.reward_model(), RewardModel::DappTier);
        assert_eq!(NetworkKind::Kilt.reward_model(), RewardModel::ParachainDelegation);
        assert_eq!(NetworkKind::Fellowship.reward_model(), RewardModel::None);
        assert!(NetworkKind::Relaychain.supports_governance());
        assert!(!NetworkKind::Astar.supports_governance());
        assert!(NetworkKind::Fellowship.supports_fellowship());
    }
}
