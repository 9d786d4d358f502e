// OpenGov vote mirroring for validators with voting delegates
pub mod aggregator;
pub mod codec;
pub mod vote;

pub use aggregator::DelegatedVoteAggregator;

use tracing::{info, instrument};

use crate::chain::ChainView;
use crate::config::NetworkConfig;
use crate::error::AppResult;
use crate::execution::{Sender, SubmissionReport};

#[instrument(skip_all, fields(network = %network.name))]
pub async fn cast_delegated_votes(
    view: ChainView<'_>,
    sender: &Sender,
    network: &NetworkConfig,
) -> AppResult<SubmissionReport> {
    if !network.validators.iter().any(|v| v.vote_enabled) {
        info!("⏭️ No validators with voting enabled");
        return Ok(SubmissionReport::default());
    }

    let tracks = view.read("referenda.tracks", |r| r.tracks()).await?;
    let report = DelegatedVoteAggregator::new(view, &tracks)
        .run(&network.validators, sender)
        .await?;

    info!(
        "✓ Votes done: {} submitted, {} finalized, {} failed",
        report.submitted, report.finalized, report.failed
    );
    Ok(report)
}
