use tracing::debug;

use crate::chain::types::{Balance, Conviction};
use crate::chain::VotePayload;
use crate::governance::vote::{Vote, VoteKind};

/// On-chain payload for `vote`, cast with `weight`.
///
/// Standard votes keep their direction at `Locked1x`. Split votes become a standard vote for
/// the strictly larger side, or a pure abstain when tied. Abstain votes are always mirrored as
/// a pure abstain.
pub fn encode(vote: &Vote, weight: Balance) -> VotePayload {
    match vote.kind {
        VoteKind::Standard { aye } => standard(aye, weight),
        VoteKind::Split { .. } => match vote.direction() {
            Some(aye) => standard(aye, weight),
            None => {
                debug!("Split vote on #{} is tied, abstaining", vote.referendum);
                abstain(weight)
            }
        },
        VoteKind::Abstain { .. } => {
            if !vote.is_genuine_abstain() {
                debug!("Abstain vote on #{} leans {:?}, mirroring as abstain", vote.referendum, vote.direction());
            }
            abstain(weight)
        }
    }
}

fn standard(aye: bool, balance: Balance) -> VotePayload {
    VotePayload::Standard {
        aye,
        conviction: Conviction::Locked1x,
        balance,
    }
}

fn abstain(balance: Balance) -> VotePayload {
    VotePayload::SplitAbstain {
        aye: 0,
        nay: 0,
        abstain: balance,
    }
}
