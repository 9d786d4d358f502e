use async_trait::async_trait;

use crate::chain::types::*;
use crate::error::ReadResult;

/// Point-in-time reads against one network's chain storage.
///
/// Values are already decoded; codec and RPC transport live behind the implementation.
/// Map enumerations are paged through an opaque cursor.
#[async_trait]
pub trait ChainStateReader: Send + Sync {
    /// Re-establish the underlying connection after a transient failure
    async fn reconnect(&self) -> ReadResult<()> {
        Ok(())
    }

    // ---- staking ----

    async fn active_era(&self) -> ReadResult<Option<EraIndex>>;

    async fn current_era(&self) -> ReadResult<Option<EraIndex>>;

    async fn history_depth(&self) -> ReadResult<u32>;

    /// Whether `erasStakersOverview` exists in this runtime
    async fn has_stakers_overview(&self) -> ReadResult<bool>;

    async fn eras_stakers_overview(
        &self,
        era: EraIndex,
        validator: &AccountId,
    ) -> ReadResult<Option<StakeOverview>>;

    /// Claimed exposure pages; empty when nothing was claimed
    async fn claimed_rewards(&self, era: EraIndex, validator: &AccountId) -> ReadResult<Vec<u32>>;

    async fn staking_ledger(&self, validator: &AccountId) -> ReadResult<Option<StakingLedger>>;

    /// Legacy exposure; absent entries decode to zero exposure
    async fn eras_stakers(&self, era: EraIndex, validator: &AccountId) -> ReadResult<Exposure>;

    // ---- dapp staking ----

    async fn integrated_dapps(
        &self,
        cursor: Option<String>,
        page_size: u32,
    ) -> ReadResult<Page<DappInfo>>;

    async fn dapp_tiers(
        &self,
        cursor: Option<String>,
        page_size: u32,
    ) -> ReadResult<Page<(EraIndex, Option<DappTierRewards>)>>;

    // ---- governance ----

    async fn referenda(
        &self,
        cursor: Option<String>,
        page_size: u32,
    ) -> ReadResult<Page<(ReferendumIndex, ReferendumInfo)>>;

    async fn tracks(&self) -> ReadResult<Vec<TrackId>>;

    async fn voting_for(&self, account: &AccountId, track: TrackId) -> ReadResult<Voting>;

    // ---- parachain staking ----

    async fn delegator_state(&self, account: &AccountId) -> ReadResult<Option<DelegatorState>>;

    async fn blocks_authored(&self, owner: &AccountId) -> ReadResult<u64>;

    async fn blocks_rewarded(&self, owner: &AccountId) -> ReadResult<u64>;

    async fn pending_rewards(&self, account: &AccountId) -> ReadResult<Balance>;

    // ---- fellowship ----

    async fn block_number(&self) -> ReadResult<BlockNumber>;

    async fn fellowship_members(&self) -> ReadResult<Vec<(AccountId, MemberStatus)>>;

    async fn fellowship_ranks(&self) -> ReadResult<Vec<(AccountId, u16)>>;

    async fn fellowship_params(&self) -> ReadResult<FellowshipParams>;

    async fn salary_status(&self) -> ReadResult<SalaryStatus>;

    /// `(registrationPeriod, payoutPeriod)` salary constants
    async fn salary_periods(&self) -> ReadResult<(BlockNumber, BlockNumber)>;
}
