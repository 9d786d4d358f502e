use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::reader::ChainStateReader;
use crate::chain::types::*;
use crate::error::{ReadError, ReadResult};

/// Decoded chain state of one network at one block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChainSnapshot {
    pub active_era: Option<EraIndex>,
    pub current_era: Option<EraIndex>,
    pub history_depth: u32,
    pub stakers_overview_enabled: bool,
    pub stakers_overview: BTreeMap<EraIndex, BTreeMap<AccountId, StakeOverview>>,
    pub claimed_rewards: BTreeMap<EraIndex, BTreeMap<AccountId, Vec<u32>>>,
    pub ledgers: BTreeMap<AccountId, StakingLedger>,
    pub eras_stakers: BTreeMap<EraIndex, BTreeMap<AccountId, Exposure>>,

    pub integrated_dapps: Vec<DappInfo>,
    /// Kept as a list to preserve the node's enumeration order
    pub dapp_tiers: Vec<(EraIndex, Option<DappTierRewards>)>,

    pub referenda: BTreeMap<ReferendumIndex, ReferendumInfo>,
    pub tracks: Vec<TrackId>,
    pub voting: BTreeMap<AccountId, BTreeMap<TrackId, Voting>>,

    pub delegator_states: BTreeMap<AccountId, DelegatorState>,
    pub blocks_authored: BTreeMap<AccountId, u64>,
    pub blocks_rewarded: BTreeMap<AccountId, u64>,
    pub rewards: BTreeMap<AccountId, Balance>,

    pub block_number: BlockNumber,
    pub fellowship_members: Vec<(AccountId, MemberStatus)>,
    pub fellowship_ranks: Vec<(AccountId, u16)>,
    pub fellowship_params: FellowshipParams,
    pub salary_status: SalaryStatus,
    pub salary_registration_period: BlockNumber,
    pub salary_payout_period: BlockNumber,
}

/// `ChainStateReader` serving a `ChainSnapshot` from memory.
///
/// Used for dry runs against exported state. Transient failures can be injected to
/// exercise retry handling.
pub struct SnapshotReader {
    state: RwLock<ChainSnapshot>,
    failures_remaining: AtomicU32,
    reconnects: AtomicU32,
}

impl SnapshotReader {
    pub fn new(snapshot: ChainSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
            failures_remaining: AtomicU32::new(0),
            reconnects: AtomicU32::new(0),
        }
    }

    /// Fail the next `count` reads with a transient error
    pub fn with_transient_failures(self, count: u32) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    /// Mutate the served state, e.g. to apply a claim between runs
    pub fn update(&self, apply: impl FnOnce(&mut ChainSnapshot)) {
        apply(&mut self.state.write());
    }

    pub fn reconnect_count(&self) -> u32 {
        self.reconnects.load(Ordering::SeqCst)
    }

    fn read<T>(&self, key: &str, get: impl FnOnce(&ChainSnapshot) -> T) -> ReadResult<T> {
        let injected = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(ReadError::transient(key, "injected transient failure"));
        }

        debug!("read {}", key);
        Ok(get(&self.state.read()))
    }
}

fn page_of<T: Clone>(items: &[T], cursor: Option<String>, page_size: u32) -> ReadResult<Page<T>> {
    let start = match cursor {
        Some(c) => c.parse::<usize>().map_err(|_| ReadError::Malformed {
            key: "cursor".to_string(),
            message: format!("not a snapshot cursor: {}", c),
        })?,
        None => 0,
    };
    let end = start.saturating_add(page_size.max(1) as usize).min(items.len());
    let start = start.min(end);

    Ok(Page {
        items: items[start..end].to_vec(),
        next: (end < items.len()).then(|| end.to_string()),
    })
}

#[async_trait]
impl ChainStateReader for SnapshotReader {
    async fn reconnect(&self) -> ReadResult<()> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn active_era(&self) -> ReadResult<Option<EraIndex>> {
        self.read("staking.activeEra", |s| s.active_era)
    }

    async fn current_era(&self) -> ReadResult<Option<EraIndex>> {
        self.read("staking.currentEra", |s| s.current_era)
    }

    async fn history_depth(&self) -> ReadResult<u32> {
        self.read("staking.historyDepth", |s| s.history_depth)
    }

    async fn has_stakers_overview(&self) -> ReadResult<bool> {
        self.read("staking.erasStakersOverview", |s| s.stakers_overview_enabled)
    }

    async fn eras_stakers_overview(
        &self,
        era: EraIndex,
        validator: &AccountId,
    ) -> ReadResult<Option<StakeOverview>> {
        self.read("staking.erasStakersOverview", |s| {
            s.stakers_overview
                .get(&era)
                .and_then(|by_validator| by_validator.get(validator))
                .cloned()
        })
    }

    async fn claimed_rewards(&self, era: EraIndex, validator: &AccountId) -> ReadResult<Vec<u32>> {
        self.read("staking.claimedRewards", |s| {
            s.claimed_rewards
                .get(&era)
                .and_then(|by_validator| by_validator.get(validator))
                .cloned()
                .unwrap_or_default()
        })
    }

    async fn staking_ledger(&self, validator: &AccountId) -> ReadResult<Option<StakingLedger>> {
        self.read("staking.ledger", |s| s.ledgers.get(validator).cloned())
    }

    async fn eras_stakers(&self, era: EraIndex, validator: &AccountId) -> ReadResult<Exposure> {
        self.read("staking.erasStakers", |s| {
            s.eras_stakers
                .get(&era)
                .and_then(|by_validator| by_validator.get(validator))
                .cloned()
                .unwrap_or_default()
        })
    }

    async fn integrated_dapps(
        &self,
        cursor: Option<String>,
        page_size: u32,
    ) -> ReadResult<Page<DappInfo>> {
        self.read("dappStaking.integratedDApps", |s| {
            page_of(&s.integrated_dapps, cursor, page_size)
        })?
    }

    async fn dapp_tiers(
        &self,
        cursor: Option<String>,
        page_size: u32,
    ) -> ReadResult<Page<(EraIndex, Option<DappTierRewards>)>> {
        self.read("dappStaking.dAppTiers", |s| {
            page_of(&s.dapp_tiers, cursor, page_size)
        })?
    }

    async fn referenda(
        &self,
        cursor: Option<String>,
        page_size: u32,
    ) -> ReadResult<Page<(ReferendumIndex, ReferendumInfo)>> {
        self.read("referenda.referendumInfoFor", |s| {
            let entries: Vec<_> = s
                .referenda
                .iter()
                .map(|(index, info)| (*index, info.clone()))
                .collect();
            page_of(&entries, cursor, page_size)
        })?
    }

    async fn tracks(&self) -> ReadResult<Vec<TrackId>> {
        self.read("referenda.tracks", |s| s.tracks.clone())
    }

    async fn voting_for(&self, account: &AccountId, track: TrackId) -> ReadResult<Voting> {
        self.read("convictionVoting.votingFor", |s| {
            s.voting
                .get(account)
                .and_then(|by_track| by_track.get(&track))
                .cloned()
                .unwrap_or(Voting::Casting { votes: Vec::new() })
        })
    }

    async fn delegator_state(&self, account: &AccountId) -> ReadResult<Option<DelegatorState>> {
        self.read("parachainStaking.delegatorState", |s| {
            s.delegator_states.get(account).cloned()
        })
    }

    async fn blocks_authored(&self, owner: &AccountId) -> ReadResult<u64> {
        self.read("parachainStaking.blocksAuthored", |s| {
            s.blocks_authored.get(owner).copied().unwrap_or(0)
        })
    }

    async fn blocks_rewarded(&self, owner: &AccountId) -> ReadResult<u64> {
        self.read("parachainStaking.blocksRewarded", |s| {
            s.blocks_rewarded.get(owner).copied().unwrap_or(0)
        })
    }

    async fn pending_rewards(&self, account: &AccountId) -> ReadResult<Balance> {
        self.read("parachainStaking.rewards", |s| {
            s.rewards.get(account).copied().unwrap_or(0)
        })
    }

    async fn block_number(&self) -> ReadResult<BlockNumber> {
        self.read("system.number", |s| s.block_number)
    }

    async fn fellowship_members(&self) -> ReadResult<Vec<(AccountId, MemberStatus)>> {
        self.read("fellowshipCore.member", |s| s.fellowship_members.clone())
    }

    async fn fellowship_ranks(&self) -> ReadResult<Vec<(AccountId, u16)>> {
        self.read("fellowshipCollective.members", |s| s.fellowship_ranks.clone())
    }

    async fn fellowship_params(&self) -> ReadResult<FellowshipParams> {
        self.read("fellowshipCore.params", |s| s.fellowship_params.clone())
    }

    async fn salary_status(&self) -> ReadResult<SalaryStatus> {
        self.read("fellowshipSalary.status", |s| s.salary_status.clone())
    }

    async fn salary_periods(&self) -> ReadResult<(BlockNumber, BlockNumber)> {
        self.read("fellowshipSalary.periods", |s| {
            (s.salary_registration_period, s.salary_payout_period)
        })
    }
}
