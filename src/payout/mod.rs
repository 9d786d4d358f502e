// Reward payouts, one strategy per reward model
pub mod batch;
pub mod dapp;
pub mod parachain;
pub mod relaychain;

pub use batch::PayoutBatchBuilder;
pub use dapp::{DappClaim, DappTierRewardScanner};
pub use parachain::ParachainDelegationPayouter;
pub use relaychain::{EraPayout, EraRewardScanner, StakingContext};

use tracing::{info, instrument};

use crate::chain::ChainView;
use crate::config::{NetworkConfig, RewardModel};
use crate::error::AppResult;
use crate::execution::{Sender, SubmissionReport};

/// Scan and submit every outstanding reward claim for `network`
#[instrument(skip_all, fields(network = %network.name))]
pub async fn payout_rewards(
    view: ChainView<'_>,
    sender: &Sender,
    network: &NetworkConfig,
) -> AppResult<SubmissionReport> {
    let builder = PayoutBatchBuilder::new(network.batch_size(), network.batch_mode());

    let report = match network.kind.reward_model() {
        RewardModel::StakeEra => {
            let context = StakingContext::fetch(&view).await?;
            let payouts = EraRewardScanner::new(view, context)
                .with_forced_rescan(network.force_history_rescan)
                .scan(&network.validators)
                .await;
            let batches = builder.build(payouts.iter().map(EraPayout::to_call));
            builder.submit(sender, &batches).await
        }
        RewardModel::DappTier => {
            let claims = DappTierRewardScanner::new(view)
                .scan(&network.validators)
                .await?;
            let batches = builder.build(claims.iter().map(DappClaim::to_call));
            builder.submit(sender, &batches).await
        }
        RewardModel::ParachainDelegation => {
            ParachainDelegationPayouter::new(view, sender)
                .run(&network.validators)
                .await
        }
        RewardModel::None => {
            info!("⏭️ No reward model for {}, skipping payouts", network.kind);
            SubmissionReport::default()
        }
    };

    info!(
        "✓ Payouts done: {} submitted, {} finalized, {} failed",
        report.submitted, report.finalized, report.failed
    );
    Ok(report)
}
