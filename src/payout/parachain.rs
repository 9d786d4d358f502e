use tracing::{debug, info, instrument, warn};

use crate::chain::types::AccountId;
use crate::chain::{Call, ChainView, ProxyType};
use crate::config::Validator;
use crate::error::AppResult;
use crate::execution::{Sender, SubmissionReport};

/// Collator reward upkeep for parachain-delegation networks
pub struct ParachainDelegationPayouter<'a> {
    view: ChainView<'a>,
    sender: &'a Sender,
}

impl<'a> ParachainDelegationPayouter<'a> {
    pub fn new(view: ChainView<'a>, sender: &'a Sender) -> Self {
        Self { view, sender }
    }

    pub async fn run(&self, validators: &[Validator]) -> SubmissionReport {
        let mut report = SubmissionReport::default();
        for validator in validators {
            if let Err(e) = self.reconcile(&validator.address, &mut report).await {
                warn!("⚠️ Collator upkeep failed for {}: {}", validator.address, e);
            }
        }
        report
    }

    /// Increment delegator rewards for unrewarded blocks, then claim whatever accrued
    #[instrument(skip(self, report))]
    async fn reconcile(&self, collator: &AccountId, report: &mut SubmissionReport) -> AppResult<()> {
        let state = self
            .view
            .read("parachainStaking.delegatorState", |r| r.delegator_state(collator))
            .await?;

        match state {
            Some(state) => {
                let owner = &state.owner;
                let authored = self
                    .view
                    .read("parachainStaking.blocksAuthored", |r| r.blocks_authored(owner))
                    .await?;
                let rewarded = self
                    .view
                    .read("parachainStaking.blocksRewarded", |r| r.blocks_rewarded(owner))
                    .await?;
                debug!("Blocks authored {}, rewarded {}", authored, rewarded);

                if authored > rewarded {
                    info!("🔄 Incrementing delegator rewards for {} unrewarded blocks", authored - rewarded);
                    let call = Call::proxy(collator, ProxyType::ParachainStaking, Call::IncrementDelegatorRewards);
                    let outcome = self.sender.send(&call).await;
                    report.record(&outcome);
                    outcome?;
                }
            }
            None => debug!("No delegator state, skipping increment"),
        }

        let pending = self
            .view
            .read("parachainStaking.rewards", |r| r.pending_rewards(collator))
            .await?;
        if pending == 0 {
            info!("✓ No rewards to claim");
            return Ok(());
        }

        info!("💰 Claiming {} pending rewards", pending);
        let call = Call::proxy(collator, ProxyType::ParachainStaking, Call::ClaimRewards);
        let outcome = self.sender.send(&call).await;
        report.record(&outcome);
        outcome?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::DelegatorState;
    use crate::chain::{ChainSnapshot, RetryPolicy, SnapshotReader};
    use crate::execution::{DryRunTransport, Signer, TxStatus};
    use std::sync::Arc;
    use std::time::Duration;

    fn validator(address: &str) -> Validator {
        Validator {
            address: address.to_string(),
            voting_delegates: Vec::new(),
            vote_weight: 0,
            vote_enabled: false,
        }
    }

    fn sender(transport: Arc<DryRunTransport>) -> Sender {
        Sender::new(
            transport,
            Arc::new(Signer::from_secret("payouts", "//Alice")),
            Duration::from_secs(5),
        )
    }

    fn collator_snapshot(authored: u64, rewarded: u64, pending: u128) -> ChainSnapshot {
        let mut snapshot = ChainSnapshot::default();
        snapshot.delegator_states.insert(
            "collator".to_string(),
            DelegatorState {
                owner: "owner".to_string(),
            },
        );
        snapshot.blocks_authored.insert("owner".to_string(), authored);
        snapshot.blocks_rewarded.insert("owner".to_string(), rewarded);
        snapshot.rewards.insert("collator".to_string(), pending);
        snapshot
    }

    fn inner_methods(calls: &[Call]) -> Vec<&'static str> {
        calls
            .iter()
            .map(|c| match c {
                Call::Proxy { call, proxy_type, .. } => {
                    assert_eq!(*proxy_type, ProxyType::ParachainStaking);
                    call.method()
                }
                other => other.method(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_increment_then_claim() {
        let reader = SnapshotReader::new(collator_snapshot(120, 100, 5_000));
        let transport = Arc::new(DryRunTransport::new());
        let sender = sender(transport.clone());
        let view = ChainView::new(&reader, RetryPolicy::immediate(1));

        let report = ParachainDelegationPayouter::new(view, &sender)
            .run(&[validator("collator")])
            .await;

        assert_eq!(
            inner_methods(&transport.submitted()),
            vec![
                "parachainStaking.incrementDelegatorRewards",
                "parachainStaking.claimRewards"
            ]
        );
        assert_eq!(report.finalized, 2);
    }

    #[tokio::test]
    async fn test_nothing_to_do() {
        let reader = SnapshotReader::new(collator_snapshot(100, 100, 0));
        let transport = Arc::new(DryRunTransport::new());
        let sender = sender(transport.clone());
        let view = ChainView::new(&reader, RetryPolicy::immediate(1));

        let report = ParachainDelegationPayouter::new(view, &sender)
            .run(&[validator("collator"), validator("stranger")])
            .await;

        assert!(transport.submitted().is_empty());
        assert_eq!(report, SubmissionReport::default());
    }

    #[tokio::test]
    async fn test_failed_increment_skips_claim_for_that_collator() {
        let reader = SnapshotReader::new(collator_snapshot(120, 100, 5_000));
        let transport = Arc::new(DryRunTransport::new());
        transport.script(vec![TxStatus::Ready, TxStatus::Dropped]);
        let sender = sender(transport.clone());
        let view = ChainView::new(&reader, RetryPolicy::immediate(1));

        let report = ParachainDelegationPayouter::new(view, &sender)
            .run(&[validator("collator")])
            .await;

        assert_eq!(transport.submitted().len(), 1);
        assert_eq!(report.failed, 1);
    }
}
