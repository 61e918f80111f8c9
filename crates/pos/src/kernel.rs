//! Stake kernel hash and weighted target check.
//!
//! The kernel hash is
//! `sha256d(modifier || block_from_time || prevout.hash || prevout.index || time)`
//! with all integers as 32-bit little endian. A kernel wins when the hash, read
//! as a little-endian 256-bit integer, does not exceed `target * amount`.

use primitive_types::U256;
use stakecore_consensus::{Amount, Hash256};
use stakecore_log::{log_category, Category};
use stakecore_pow::{compact_to_u256, hash_to_u256, u256_to_hash};
use stakecore_primitives::encoding::Encoder;
use stakecore_primitives::hash::{hash256_to_hex, sha256d};
use stakecore_primitives::outpoint::OutPoint;

use crate::chain::BlockIndexEntry;
use crate::error::{PosError, TargetFault};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProofOfStakeResult {
    pub hash_proof_of_stake: Hash256,
    pub target_proof_of_stake: Hash256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelCheck {
    pub accepted: bool,
    pub proof: ProofOfStakeResult,
}

pub fn kernel_hash(
    stake_modifier: &Hash256,
    block_from_time: u32,
    prevout: &OutPoint,
    time: u32,
) -> Hash256 {
    let mut encoder = Encoder::with_capacity(80);
    encoder.write_hash_le(stake_modifier);
    encoder.write_u32_le(block_from_time);
    encoder.write_hash_le(&prevout.hash);
    encoder.write_u32_le(prevout.index);
    encoder.write_u32_le(time);
    sha256d(&encoder.into_inner())
}

/// `target(bits) * amount`, wrapping at 256 bits like the consensus arithmetic
/// it replaces.
pub fn weighted_target(bits: u32, amount: Amount) -> Result<U256, PosError> {
    let target =
        compact_to_u256(bits).map_err(|err| PosError::InvalidCompactTarget {
            bits,
            fault: err.into(),
        })?;
    if target.is_zero() {
        return Err(PosError::InvalidCompactTarget {
            bits,
            fault: TargetFault::Zero,
        });
    }
    if amount < 0 {
        return Err(PosError::NegativeStakeAmount(amount));
    }
    let (weighted, _) = target.overflowing_mul(U256::from(amount as u64));
    Ok(weighted)
}

pub fn check_stake_kernel_hash(
    prev: Option<&BlockIndexEntry>,
    bits: u32,
    block_from_time: u32,
    amount: Amount,
    prevout: &OutPoint,
    time: u32,
) -> Result<KernelCheck, PosError> {
    if time < block_from_time {
        return Err(PosError::TimestampViolation {
            time,
            block_from_time,
        });
    }

    let target = weighted_target(bits, amount)?;
    let modifier = prev.map(|entry| entry.stake_modifier).unwrap_or([0u8; 32]);
    let hash = kernel_hash(&modifier, block_from_time, prevout, time);
    let accepted = hash_to_u256(&hash) <= target;

    log_category!(
        Category::Pos,
        "kernel modifier={} height={} block_from_time={} prevout={}:{} time={} hash={} accepted={}",
        hash256_to_hex(&modifier),
        prev.map(|entry| entry.height).unwrap_or(-1),
        block_from_time,
        hash256_to_hex(&prevout.hash),
        prevout.index,
        time,
        hash256_to_hex(&hash),
        accepted
    );

    Ok(KernelCheck {
        accepted,
        proof: ProofOfStakeResult {
            hash_proof_of_stake: hash,
            target_proof_of_stake: u256_to_hash(target),
        },
    })
}
