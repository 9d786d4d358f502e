use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};

use crate::chain::types::{AccountId, ReferendumIndex, ReferendumInfo, TrackId, Voting};
use crate::chain::{Call, ChainView, ProxyType};
use crate::config::Validator;
use crate::error::ReadResult;
use crate::execution::{Sender, SubmissionReport};
use crate::governance::codec;
use crate::governance::vote::{Vote, VoteKind};

/// Mirrors delegate accounts' votes onto validators, abstaining where delegates are silent
pub struct DelegatedVoteAggregator<'a> {
    view: ChainView<'a>,
    tracks: &'a [TrackId],
}

impl<'a> DelegatedVoteAggregator<'a> {
    pub fn new(view: ChainView<'a>, tracks: &'a [TrackId]) -> Self {
        Self { view, tracks }
    }

    /// Referenda still open for voting, in enumeration order
    pub async fn ongoing_referenda(&self) -> ReadResult<Vec<ReferendumIndex>> {
        let referenda = self
            .view
            .entries("referenda.referendumInfoFor", |r, cursor, size| {
                r.referenda(cursor, size)
            })
            .await?;

        Ok(referenda
            .into_iter()
            .filter(|(_, info)| matches!(info, ReferendumInfo::Ongoing { .. }))
            .map(|(index, _)| index)
            .collect())
    }

    /// Votes cast by `account` across every track; delegating tracks contribute nothing
    pub async fn account_votes(&self, account: &AccountId) -> ReadResult<Vec<Vote>> {
        let mut votes = Vec::new();
        for &track in self.tracks {
            let voting = self
                .view
                .read("convictionVoting.votingFor", |r| r.voting_for(account, track))
                .await?;

            match voting {
                Voting::Casting { votes: cast } => votes.extend(
                    cast.iter()
                        .map(|(referendum, vote)| Vote::from_account_vote(*referendum, vote)),
                ),
                Voting::Delegating { target } => {
                    debug!("{} delegates track {} to {}", account, track, target)
                }
            }
        }
        Ok(votes)
    }

    /// Delegate votes on ongoing referenda, first delegate wins, plus an abstain for every
    /// ongoing referendum no delegate voted on
    pub async fn potential_votes(
        &self,
        validator: &Validator,
        ongoing: &[ReferendumIndex],
    ) -> ReadResult<Vec<Vote>> {
        let open: HashSet<ReferendumIndex> = ongoing.iter().copied().collect();
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for delegate in &validator.voting_delegates {
            for vote in self.account_votes(delegate).await? {
                if open.contains(&vote.referendum) && seen.insert(vote.referendum) {
                    candidates.push(vote);
                }
            }
        }

        candidates.extend(
            ongoing
                .iter()
                .filter(|referendum| !seen.contains(*referendum))
                .map(|referendum| Vote::abstain_fallback(*referendum, validator.vote_weight)),
        );

        Ok(candidates)
    }

    /// Candidates that differ from what the validator has already cast
    #[instrument(skip_all, fields(validator = %validator.address))]
    pub async fn decide(&self, validator: &Validator, ongoing: &[ReferendumIndex]) -> ReadResult<Vec<Vote>> {
        let candidates = self.potential_votes(validator, ongoing).await?;
        let existing = self.account_votes(&validator.address).await?;

        let changes: Vec<Vote> = candidates
            .into_iter()
            .filter(|candidate| {
                let current = existing.iter().find(|v| v.referendum == candidate.referendum);
                should_change(current, candidate)
            })
            .collect();

        debug!("{} votes need to be cast", changes.len());
        Ok(changes)
    }

    /// Cast every required vote through `proxy(validator, Governance, vote)`.
    ///
    /// A failing validator is logged and skipped.
    pub async fn run(&self, validators: &[Validator], sender: &Sender) -> ReadResult<SubmissionReport> {
        let ongoing = self.ongoing_referenda().await?;
        info!("🗳️ {} ongoing referenda", ongoing.len());

        let mut report = SubmissionReport::default();
        for validator in validators.iter().filter(|v| v.vote_enabled) {
            let votes = match self.decide(validator, &ongoing).await {
                Ok(votes) => votes,
                Err(e) => {
                    warn!("⚠️ Skipping votes for {}: {}", validator.address, e);
                    continue;
                }
            };

            for vote in votes {
                let call = Call::proxy(
                    &validator.address,
                    ProxyType::Governance,
                    Call::Vote {
                        referendum: vote.referendum,
                        vote: codec::encode(&vote, validator.vote_weight),
                    },
                );
                let outcome = sender.send(&call).await;
                report.record(&outcome);
            }
        }

        Ok(report)
    }
}

/// Whether `candidate` must be cast given the validator's `current` vote on the same referendum
pub fn should_change(current: Option<&Vote>, candidate: &Vote) -> bool {
    let Some(current) = current else {
        return true;
    };

    match (&current.kind, &candidate.kind) {
        (VoteKind::Abstain { .. }, VoteKind::Abstain { .. }) => false,
        (VoteKind::Standard { aye: was }, VoteKind::Standard { aye: wanted }) => was != wanted,
        _ => true,
    }
}
