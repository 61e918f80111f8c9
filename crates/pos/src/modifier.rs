//! Stake modifier chain.

use stakecore_consensus::Hash256;
use stakecore_primitives::hash::sha256d;

/// Next modifier in the chain: `sha256d(kernel || prev_modifier)`. The genesis
/// block has no predecessor and gets the all-zero modifier.
pub fn compute_stake_modifier(prev_modifier: Option<&Hash256>, kernel: &Hash256) -> Hash256 {
    let Some(prev_modifier) = prev_modifier else {
        return [0u8; 32];
    };
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(kernel);
    preimage[32..].copy_from_slice(prev_modifier);
    sha256d(&preimage)
}

/// Value a block feeds into the modifier chain: its kernel hash when it was
/// staked, its own hash otherwise.
pub fn stake_modifier_kernel(block_hash: &Hash256, proof_of_stake: Option<&Hash256>) -> Hash256 {
    *proof_of_stake.unwrap_or(block_hash)
}
