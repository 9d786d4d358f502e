use crate::chain::types::{AccountVote, Balance, ReferendumIndex};

/// Shape of a vote as observed on chain or synthesized for a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Standard { aye: bool },
    Split { aye: Balance, nay: Balance },
    Abstain {
        aye: Balance,
        nay: Balance,
        abstain: Balance,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub referendum: ReferendumIndex,
    pub kind: VoteKind,
}

impl Vote {
    pub fn from_account_vote(referendum: ReferendumIndex, vote: &AccountVote) -> Self {
        let kind = match *vote {
            AccountVote::Standard { aye, .. } => VoteKind::Standard { aye },
            AccountVote::Split { aye, nay } => VoteKind::Split { aye, nay },
            AccountVote::SplitAbstain { aye, nay, abstain } => VoteKind::Abstain { aye, nay, abstain },
        };
        Self { referendum, kind }
    }

    /// Pure abstain carrying the validator's whole vote weight
    pub fn abstain_fallback(referendum: ReferendumIndex, weight: Balance) -> Self {
        Self {
            referendum,
            kind: VoteKind::Abstain {
                aye: 0,
                nay: 0,
                abstain: weight,
            },
        }
    }

    /// `Some(true)` for aye, `Some(false)` for nay, `None` when no side strictly wins
    pub fn direction(&self) -> Option<bool> {
        match self.kind {
            VoteKind::Standard { aye } => Some(aye),
            VoteKind::Split { aye, nay } => strict_winner(aye, nay, 0),
            VoteKind::Abstain { aye, nay, abstain } => strict_winner(aye, nay, abstain),
        }
    }

    /// Abstain amount strictly exceeds both aye and nay
    pub fn is_genuine_abstain(&self) -> bool {
        match self.kind {
            VoteKind::Abstain { aye, nay, abstain } => abstain > aye && abstain > nay,
            _ => false,
        }
    }
}

fn strict_winner(aye: Balance, nay: Balance, abstain: Balance) -> Option<bool> {
    if aye > nay && aye > abstain {
        Some(true)
    } else if nay > aye && nay > abstain {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::Conviction;

    #[test]
    fn test_direction_derivation() {
        let standard = Vote::from_account_vote(1, &AccountVote::Standard {
            aye: false,
            conviction: Conviction::Locked3x,
            balance: 10,
        });
        assert_eq!(standard.direction(), Some(false));

        let split = Vote::from_account_vote(1, &AccountVote::Split { aye: 7, nay: 3 });
        assert_eq!(split.direction(), Some(true));

        let tied = Vote::from_account_vote(1, &AccountVote::Split { aye: 5, nay: 5 });
        assert_eq!(tied.direction(), None);

        let abstain = Vote::from_account_vote(1, &AccountVote::SplitAbstain {
            aye: 4,
            nay: 1,
            abstain: 4,
        });
        assert_eq!(abstain.direction(), None);
        assert!(!abstain.is_genuine_abstain());
    }

    #[test]
    fn test_abstain_fallback_carries_full_weight() {
        let vote = Vote::abstain_fallback(12, 1000);
        assert_eq!(vote.kind, VoteKind::Abstain {
            aye: 0,
            nay: 0,
            abstain: 1000,
        });
        assert!(vote.is_genuine_abstain());
    }
}
