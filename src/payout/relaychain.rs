use std::ops::RangeInclusive;

use tracing::{debug, info, instrument, warn};

use crate::chain::types::{AccountId, EraIndex};
use crate::chain::{Call, ChainView};
use crate::config::Validator;
use crate::error::ReadResult;

/// Staking constants read once per network run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakingContext {
    pub active_era: EraIndex,
    pub history_depth: u32,
    /// Runtime exposes paged per-era stake overviews
    pub paged_overview: bool,
}

impl StakingContext {
    pub async fn fetch(view: &ChainView<'_>) -> ReadResult<Self> {
        let active = view.read("staking.activeEra", |r| r.active_era()).await?;
        let current = view.read("staking.currentEra", |r| r.current_era()).await?;
        let history_depth = view.read("staking.historyDepth", |r| r.history_depth()).await?;
        let paged_overview = view
            .read("staking.erasStakersOverview", |r| r.has_stakers_overview())
            .await?;

        let active_era = resolve_active_era(active, current);
        debug!(
            "Staking context: activeEra={}, historyDepth={}, pagedOverview={}",
            active_era, history_depth, paged_overview
        );

        Ok(Self {
            active_era,
            history_depth,
            paged_overview,
        })
    }
}

/// Active era, falling back to the current era counter; absence of both reads as era 0
pub fn resolve_active_era(active: Option<EraIndex>, current: Option<EraIndex>) -> EraIndex {
    active.or(current).unwrap_or(0)
}

/// Eras whose rewards are still claimable: `[active - 1 - depth, active - 1]`, clamped at 0.
///
/// Era 0 has nothing claimable yet.
pub fn overview_scan_range(active_era: EraIndex, history_depth: u32) -> Option<RangeInclusive<EraIndex>> {
    let last_claimable = active_era.checked_sub(1)?;
    let start = last_claimable.saturating_sub(history_depth);
    Some(start..=last_claimable)
}

/// One unclaimed `(validator, era)` reward
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraPayout {
    pub validator: AccountId,
    pub era: EraIndex,
}

impl EraPayout {
    pub fn to_call(&self) -> Call {
        Call::PayoutStakers {
            validator: self.validator.clone(),
            era: self.era,
        }
    }
}

/// Finds unclaimed staking rewards for a set of validators
pub struct EraRewardScanner<'a> {
    view: ChainView<'a>,
    context: StakingContext,
    force_rescan: bool,
}

impl<'a> EraRewardScanner<'a> {
    pub fn new(view: ChainView<'a>, context: StakingContext) -> Self {
        Self {
            view,
            context,
            force_rescan: false,
        }
    }

    /// Ignore ledger claim records on the legacy path and rescan from the history depth
    pub fn with_forced_rescan(mut self, force: bool) -> Self {
        self.force_rescan = force;
        self
    }

    /// Read failures skip the affected validator (or validator era) only
    pub async fn scan(&self, validators: &[Validator]) -> Vec<EraPayout> {
        let payouts = if self.context.paged_overview {
            self.scan_overview(validators).await
        } else {
            self.scan_legacy(validators).await
        };

        info!("📊 Found {} unclaimed era payouts", payouts.len());
        payouts
    }

    /// Eras ascending, validators in configured order within each era
    #[instrument(skip_all, fields(active_era = self.context.active_era))]
    async fn scan_overview(&self, validators: &[Validator]) -> Vec<EraPayout> {
        let Some(eras) = overview_scan_range(self.context.active_era, self.context.history_depth)
        else {
            warn!("⚠️ No active era available, nothing to scan");
            return Vec::new();
        };

        let mut payouts = Vec::new();
        for era in eras {
            for validator in validators {
                let address = &validator.address;
                match self.overview_unclaimed(era, address).await {
                    Ok(true) => {
                        debug!("Era {} unclaimed for {}", era, address);
                        payouts.push(EraPayout {
                            validator: address.clone(),
                            era,
                        });
                    }
                    Ok(false) => {}
                    Err(e) => warn!("⚠️ Skipping era {} for validator {}: {}", era, address, e),
                }
            }
        }

        payouts
    }

    /// Staked in `era` with no reward page claimed yet
    async fn overview_unclaimed(&self, era: EraIndex, validator: &AccountId) -> ReadResult<bool> {
        let overview = self
            .view
            .read("staking.erasStakersOverview", |r| {
                r.eras_stakers_overview(era, validator)
            })
            .await?;
        if overview.is_none() {
            return Ok(false);
        }

        let claimed_pages = self
            .view
            .read("staking.claimedRewards", |r| r.claimed_rewards(era, validator))
            .await?;
        Ok(claimed_pages.is_empty())
    }

    async fn scan_legacy(&self, validators: &[Validator]) -> Vec<EraPayout> {
        let mut payouts = Vec::new();
        for validator in validators {
            match self.legacy_unclaimed(&validator.address).await {
                Ok(found) => payouts.extend(found),
                Err(e) => warn!("⚠️ Skipping validator {}: {}", validator.address, e),
            }
        }
        payouts
    }

    #[instrument(skip(self))]
    async fn legacy_unclaimed(&self, validator: &AccountId) -> ReadResult<Vec<EraPayout>> {
        let ledger = self
            .view
            .read("staking.ledger", |r| r.staking_ledger(validator))
            .await?;

        let last_claimed = ledger
            .as_ref()
            .and_then(|ledger| ledger.claimed_eras().iter().copied().max());
        let last_rewarded = match last_claimed {
            Some(era) if !self.force_rescan => era,
            _ => self.context.history_depth,
        };

        let candidates = self
            .context
            .active_era
            .saturating_sub(last_rewarded)
            .saturating_sub(1);
        debug!(
            "Last rewarded era {}, {} candidate eras",
            last_rewarded, candidates
        );

        let mut payouts = Vec::new();
        for offset in 1..=candidates {
            let era = last_rewarded + offset;
            let exposure = self
                .view
                .read("staking.erasStakers", |r| r.eras_stakers(era, validator))
                .await?;
            if exposure.total > 0 {
                payouts.push(EraPayout {
                    validator: validator.clone(),
                    era,
                });
            }
        }

        Ok(payouts)
    }
}
