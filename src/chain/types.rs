use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SS58 or hex account identifier, kept opaque
pub type AccountId = String;

/// Reward period index
pub type EraIndex = u32;

/// Planck-denominated amount
pub type Balance = u128;

pub type BlockNumber = u32;

pub type ReferendumIndex = u32;

pub type TrackId = u16;

pub type DappId = u16;

/// Per-era stake overview for a validator (paged exposure accounting)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeOverview {
    pub total: Balance,
    pub own: Balance,
    pub nominator_count: u32,
    pub page_count: u32,
}

/// Legacy full exposure of a validator in one era
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exposure {
    pub total: Balance,
    pub own: Balance,
}

/// Staking ledger as far as reward bookkeeping is concerned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StakingLedger {
    pub stash: AccountId,
    pub claimed_rewards: Option<Vec<EraIndex>>,
    /// Renamed field on chains that migrated to paged rewards
    pub legacy_claimed_rewards: Option<Vec<EraIndex>>,
}

impl StakingLedger {
    /// Claimed eras, falling back to the legacy field
    pub fn claimed_eras(&self) -> &[EraIndex] {
        self.claimed_rewards
            .as_deref()
            .or(self.legacy_claimed_rewards.as_deref())
            .unwrap_or(&[])
    }
}

/// Smart contract a dapp is registered under
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmartContract {
    Evm(String),
    Wasm(AccountId),
}

/// Entry of the registered-application table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DappInfo {
    pub id: DappId,
    pub owner: AccountId,
    pub smart_contract: SmartContract,
}

/// Tier assignments distributed in one era, keyed by dapp id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DappTierRewards {
    pub dapps: BTreeMap<DappId, u8>,
}

/// One storage page of a map enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque cursor for the next page, `None` when exhausted
    pub next: Option<String>,
}

/// Referendum tally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub ayes: Balance,
    pub nays: Balance,
    pub support: Balance,
}

/// Decoded `referendumInfoFor` value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferendumInfo {
    Ongoing { track: TrackId, tally: Tally },
    Approved,
    Rejected,
    Cancelled,
    TimedOut,
    Killed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conviction {
    None,
    Locked1x,
    Locked2x,
    Locked3x,
    Locked4x,
    Locked5x,
    Locked6x,
}

/// Decoded `AccountVote` as stored by conviction voting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountVote {
    Standard {
        aye: bool,
        conviction: Conviction,
        balance: Balance,
    },
    Split {
        aye: Balance,
        nay: Balance,
    },
    SplitAbstain {
        aye: Balance,
        nay: Balance,
        abstain: Balance,
    },
}

/// Per-account, per-track voting state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Voting {
    Casting {
        votes: Vec<(ReferendumIndex, AccountVote)>,
    },
    Delegating {
        target: AccountId,
    },
}

/// Parachain staking delegator record; only the owner matters here
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorState {
    pub owner: AccountId,
}

/// Fellowship core member record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatus {
    pub is_active: bool,
    pub last_promotion: BlockNumber,
    pub last_proof: BlockNumber,
}

/// Fellowship core parameters, indexed by `rank - 1`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FellowshipParams {
    pub demotion_period: Vec<BlockNumber>,
    pub min_promotion_period: Vec<BlockNumber>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryStatus {
    pub cycle_index: u32,
    pub cycle_start: BlockNumber,
}
