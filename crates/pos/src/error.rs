//! Rejection reasons for stake validation.

use std::fmt;

use stakecore_consensus::Amount;
use stakecore_pow::CompactError;
use stakecore_primitives::transaction::OutputType;
use stakecore_script::ScriptError;

use crate::chain::ChainViewError;
use crate::kernel::ProofOfStakeResult;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RejectCategory {
    Malformed,
    Provenance,
    /// Expected during sync or honest competition; never misbehaviour.
    Policy,
    Signature,
    Backend,
}

impl RejectCategory {
    pub fn is_misbehavior(self) -> bool {
        matches!(self, Self::Malformed | Self::Provenance | Self::Signature)
    }

    pub fn dos_score(self) -> u32 {
        match self {
            Self::Malformed | Self::Signature => 100,
            Self::Provenance => 10,
            Self::Policy => 1,
            Self::Backend => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetFault {
    Negative,
    Overflow,
    Zero,
}

impl From<CompactError> for TargetFault {
    fn from(err: CompactError) -> Self {
        match err {
            CompactError::Negative => TargetFault::Negative,
            CompactError::Overflow => TargetFault::Overflow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PosError {
    MalformedTransaction,
    InvalidCompactTarget { bits: u32, fault: TargetFault },
    NegativeStakeAmount(Amount),
    ValueOutOfRange,
    BadOutputType { output: usize, output_type: OutputType },
    CoinstakeOpInactive { time: u32 },
    CoinstakeOpP2pkhSpend,
    PrevoutNotInChain { input: usize },
    PrevoutSpent { input: usize },
    InvalidPrevout { input: usize },
    MixedPrevoutScripts { input: usize },
    AmountScriptMismatch { paid: Amount, staked: Amount },
    StakeTooYoung { depth: i32, required: i32 },
    TimestampViolation { time: u32, block_from_time: u32 },
    KernelCheckFailed { proof: ProofOfStakeResult },
    ScriptVerifyFailed(ScriptError),
    Chain(ChainViewError),
}

impl PosError {
    pub fn category(&self) -> RejectCategory {
        match self {
            PosError::MalformedTransaction
            | PosError::InvalidCompactTarget { .. }
            | PosError::NegativeStakeAmount(_)
            | PosError::ValueOutOfRange
            | PosError::BadOutputType { .. }
            | PosError::CoinstakeOpInactive { .. }
            | PosError::CoinstakeOpP2pkhSpend => RejectCategory::Malformed,
            PosError::PrevoutNotInChain { .. }
            | PosError::PrevoutSpent { .. }
            | PosError::InvalidPrevout { .. }
            | PosError::MixedPrevoutScripts { .. }
            | PosError::AmountScriptMismatch { .. } => RejectCategory::Provenance,
            PosError::StakeTooYoung { .. }
            | PosError::TimestampViolation { .. }
            | PosError::KernelCheckFailed { .. } => RejectCategory::Policy,
            PosError::ScriptVerifyFailed(_) => RejectCategory::Signature,
            PosError::Chain(_) => RejectCategory::Backend,
        }
    }

    pub fn is_misbehavior(&self) -> bool {
        self.category().is_misbehavior()
    }

    /// Penalty for the peer that relayed the block. Provenance failures that
    /// can only come from a crafted transaction score as malformed input; an
    /// extra coinstake input that cannot be found scores like a policy miss.
    pub fn dos_score(&self) -> u32 {
        match self {
            PosError::InvalidPrevout { .. }
            | PosError::MixedPrevoutScripts { .. }
            | PosError::AmountScriptMismatch { .. } => 100,
            PosError::PrevoutNotInChain { input } if *input > 0 => 1,
            _ => self.category().dos_score(),
        }
    }

    pub fn reject_reason(&self) -> &'static str {
        match self {
            PosError::MalformedTransaction => "malformed-txn",
            PosError::InvalidCompactTarget { .. } => "bad-diffbits",
            PosError::NegativeStakeAmount(_) => "bad-stake-amount",
            PosError::ValueOutOfRange => "bad-txns-value-outofrange",
            PosError::BadOutputType { .. } => "bad-output-type",
            PosError::CoinstakeOpInactive { .. } => "bad-coinstake-op-inactive",
            PosError::CoinstakeOpP2pkhSpend => "bad-coinstake-spend-script",
            PosError::PrevoutNotInChain { .. } => "prevout-not-in-chain",
            PosError::PrevoutSpent { .. } => "prevout-spent",
            PosError::InvalidPrevout { .. } => "invalid-prevout",
            PosError::MixedPrevoutScripts { .. } => "mixed-prevout-scripts",
            PosError::AmountScriptMismatch { .. } => "verify-amount-script-failed",
            PosError::StakeTooYoung { .. } => "invalid-stake-depth",
            PosError::TimestampViolation { .. } => "kernel-time-violation",
            PosError::KernelCheckFailed { .. } => "check-kernel-failed",
            PosError::ScriptVerifyFailed(_) => "verify-script-failed",
            PosError::Chain(_) => "chain-view-error",
        }
    }
}

impl fmt::Display for PosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PosError::MalformedTransaction => write!(f, "not a coinstake transaction"),
            PosError::InvalidCompactTarget { bits, fault } => {
                write!(f, "invalid compact target {bits:#010x}: {fault:?}")
            }
            PosError::NegativeStakeAmount(amount) => write!(f, "negative stake amount {amount}"),
            PosError::ValueOutOfRange => write!(f, "coinstake value out of range"),
            PosError::BadOutputType {
                output,
                output_type,
            } => write!(f, "coinstake output {output} has type {output_type:?}"),
            PosError::CoinstakeOpInactive { time } => {
                write!(f, "coinstake opcode scripts not active at time {time}")
            }
            PosError::CoinstakeOpP2pkhSpend => {
                write!(f, "coinstake opcode script with p2pkh spend branch")
            }
            PosError::PrevoutNotInChain { input } => {
                write!(f, "prevout of input {input} not in chain")
            }
            PosError::PrevoutSpent { input } => write!(f, "prevout of input {input} is spent"),
            PosError::InvalidPrevout { input } => write!(f, "invalid prevout for input {input}"),
            PosError::MixedPrevoutScripts { input } => {
                write!(f, "input {input} spends a different script than the kernel")
            }
            PosError::AmountScriptMismatch { paid, staked } => {
                write!(f, "outputs pay {paid} to kernel script, inputs staked {staked}")
            }
            PosError::StakeTooYoung { depth, required } => {
                write!(f, "tried to stake at depth {} (required {})", depth + 1, required + 1)
            }
            PosError::TimestampViolation {
                time,
                block_from_time,
            } => write!(f, "kernel time {time} before coin time {block_from_time}"),
            PosError::KernelCheckFailed { .. } => write!(f, "kernel hash above weighted target"),
            PosError::ScriptVerifyFailed(err) => write!(f, "kernel script: {err}"),
            PosError::Chain(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PosError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PosError::ScriptVerifyFailed(err) => Some(err),
            PosError::Chain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ChainViewError> for PosError {
    fn from(err: ChainViewError) -> Self {
        PosError::Chain(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_rejections_are_not_misbehavior() {
        let young = PosError::StakeTooYoung {
            depth: 3,
            required: 10,
        };
        assert!(!young.is_misbehavior());
        assert_eq!(young.reject_reason(), "invalid-stake-depth");
        let kernel = PosError::KernelCheckFailed {
            proof: ProofOfStakeResult::default(),
        };
        assert!(!kernel.is_misbehavior());
        assert_eq!(kernel.dos_score(), 1);
        assert!(!PosError::Chain(ChainViewError("io".into())).is_misbehavior());
    }

    #[test]
    fn provenance_scores() {
        assert_eq!(PosError::PrevoutNotInChain { input: 0 }.dos_score(), 10);
        assert_eq!(PosError::PrevoutNotInChain { input: 2 }.dos_score(), 1);
        assert_eq!(PosError::InvalidPrevout { input: 0 }.dos_score(), 100);
        assert!(PosError::MixedPrevoutScripts { input: 1 }.is_misbehavior());
        assert_eq!(PosError::MalformedTransaction.dos_score(), 100);
        assert_eq!(
            PosError::ScriptVerifyFailed(ScriptError::SigCheck).category(),
            RejectCategory::Signature
        );
    }
}
