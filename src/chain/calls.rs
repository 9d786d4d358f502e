use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chain::types::*;

/// How a batch wrapper treats failing members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// `utility.batch`: stops at the first failing item, earlier items stay applied
    Batch,
    /// `utility.forceBatch`: continues past failing items
    ForceBatch,
    /// `utility.batchAll`: all-or-nothing
    BatchAll,
}

impl BatchMode {
    pub fn method(&self) -> &'static str {
        match self {
            BatchMode::Batch => "utility.batch",
            BatchMode::ForceBatch => "utility.forceBatch",
            BatchMode::BatchAll => "utility.batchAll",
        }
    }
}

/// Proxy permission scope used when acting for a validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyType {
    Governance,
    ParachainStaking,
}

/// On-chain vote payload for `convictionVoting.vote`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VotePayload {
    Standard {
        aye: bool,
        conviction: Conviction,
        balance: Balance,
    },
    SplitAbstain {
        aye: Balance,
        nay: Balance,
        abstain: Balance,
    },
}

/// A pre-built call, ready to be signed and submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    PayoutStakers {
        validator: AccountId,
        era: EraIndex,
    },
    ClaimDappReward {
        smart_contract: SmartContract,
        era: EraIndex,
    },
    Vote {
        referendum: ReferendumIndex,
        vote: VotePayload,
    },
    Proxy {
        real: AccountId,
        proxy_type: ProxyType,
        call: Box<Call>,
    },
    Batch {
        mode: BatchMode,
        calls: Vec<Call>,
    },
    IncrementDelegatorRewards,
    ClaimRewards,
    BumpMember {
        who: AccountId,
    },
    BumpSalary,
}

impl Call {
    pub fn batch(mode: BatchMode, calls: Vec<Call>) -> Self {
        Call::Batch { mode, calls }
    }

    pub fn proxy(real: &AccountId, proxy_type: ProxyType, call: Call) -> Self {
        Call::Proxy {
            real: real.clone(),
            proxy_type,
            call: Box::new(call),
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Call::PayoutStakers { .. } => "staking.payoutStakers",
            Call::ClaimDappReward { .. } => "dappStaking.claimDappReward",
            Call::Vote { .. } => "convictionVoting.vote",
            Call::Proxy { .. } => "proxy.proxy",
            Call::Batch { mode, .. } => mode.method(),
            Call::IncrementDelegatorRewards => "parachainStaking.incrementDelegatorRewards",
            Call::ClaimRewards => "parachainStaking.claimRewards",
            Call::BumpMember { .. } => "fellowshipCore.bump",
            Call::BumpSalary => "fellowshipSalary.bump",
        }
    }

    /// Number of leaf calls, counting through proxy and batch wrappers
    pub fn leaf_count(&self) -> usize {
        match self {
            Call::Proxy { call, .. } => call.leaf_count(),
            Call::Batch { calls, .. } => calls.iter().map(Call::leaf_count).sum(),
            _ => 1,
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Call::PayoutStakers { validator, era } => {
                write!(f, "{}({}, {})", self.method(), validator, era)
            }
            Call::ClaimDappReward {
                smart_contract,
                era,
            } => write!(f, "{}({:?}, {})", self.method(), smart_contract, era),
            Call::Vote { referendum, vote } => {
                write!(f, "{}({}, {:?})", self.method(), referendum, vote)
            }
            Call::Proxy {
                real,
                proxy_type,
                call,
            } => write!(f, "{}({}, {:?}, {})", self.method(), real, proxy_type, call),
            Call::Batch { calls, .. } => write!(f, "{}[{} calls]", self.method(), calls.len()),
            Call::BumpMember { who } => write!(f, "{}({})", self.method(), who),
            _ => write!(f, "{}()", self.method()),
        }
    }
}
