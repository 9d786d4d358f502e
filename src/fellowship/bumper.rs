use std::collections::HashMap;

use tracing::{debug, info};

use crate::chain::types::{AccountId, BlockNumber, FellowshipParams, MemberStatus};
use crate::chain::{BatchMode, Call, ChainView};
use crate::error::{AppResult, ReadResult};
use crate::execution::{Sender, SubmissionReport};

/// Keeps fellowship members and the salary cycle moving
pub struct FellowshipBumper<'a> {
    view: ChainView<'a>,
    params: FellowshipParams,
    current_block: BlockNumber,
}

impl<'a> FellowshipBumper<'a> {
    /// Read the core params and current block once for the whole run
    pub async fn load(view: ChainView<'a>) -> ReadResult<Self> {
        let params = view.read("fellowshipCore.params", |r| r.fellowship_params()).await?;
        let current_block = view.read("system.number", |r| r.block_number()).await?;
        debug!("Fellowship params loaded at block {}", current_block);

        Ok(Self {
            view,
            params,
            current_block,
        })
    }

    /// Members whose proof of activity is older than their rank's demotion period
    pub async fn bump_candidates(&self) -> ReadResult<Vec<AccountId>> {
        let members = self
            .view
            .read("fellowshipCore.member", |r| r.fellowship_members())
            .await?;
        let ranks: HashMap<AccountId, u16> = self
            .view
            .read("fellowshipCollective.members", |r| r.fellowship_ranks())
            .await?
            .into_iter()
            .collect();

        Ok(members
            .into_iter()
            .filter(|(account, status)| {
                may_be_bumped(ranks.get(account).copied(), status, &self.params, self.current_block)
            })
            .map(|(account, _)| account)
            .collect())
    }

    pub async fn bump_members(&self, sender: &Sender) -> AppResult<SubmissionReport> {
        let mut report = SubmissionReport::default();
        let candidates = self.bump_candidates().await?;

        let call = match candidates.len() {
            0 => {
                info!("✓ No fellowship members to bump");
                return Ok(report);
            }
            1 => Call::BumpMember {
                who: candidates[0].clone(),
            },
            _ => Call::batch(
                BatchMode::BatchAll,
                candidates
                    .iter()
                    .map(|who| Call::BumpMember { who: who.clone() })
                    .collect(),
            ),
        };

        info!("🔄 Bumping {} fellowship members", candidates.len());
        report.record(&sender.send(&call).await);
        Ok(report)
    }

    /// Bump the salary cycle once registration and payout have both elapsed
    pub async fn bump_salary_cycle(&self, sender: &Sender) -> AppResult<SubmissionReport> {
        let mut report = SubmissionReport::default();
        let status = self
            .view
            .read("fellowshipSalary.status", |r| r.salary_status())
            .await?;
        let (registration, payout) = self
            .view
            .read("fellowshipSalary.periods", |r| r.salary_periods())
            .await?;

        let cycle_end = status
            .cycle_start
            .saturating_add(registration)
            .saturating_add(payout);
        if cycle_end >= self.current_block {
            debug!("Salary cycle {} runs until block {}", status.cycle_index, cycle_end);
            return Ok(report);
        }

        info!("🔄 Bumping salary cycle {}", status.cycle_index);
        report.record(&sender.send(&Call::BumpSalary).await);
        Ok(report)
    }
}

/// Active members of a ranked tier whose last proof is older than the tier's demotion period
pub fn may_be_bumped(
    rank: Option<u16>,
    status: &MemberStatus,
    params: &FellowshipParams,
    current_block: BlockNumber,
) -> bool {
    if !status.is_active {
        return false;
    }

    let Some(index) = rank.and_then(|rank| rank.checked_sub(1)) else {
        return false;
    };
    let demotion_period = params
        .demotion_period
        .get(index as usize)
        .copied()
        .unwrap_or(0);

    demotion_period > 0 && current_block.saturating_sub(status.last_proof) > demotion_period
}
