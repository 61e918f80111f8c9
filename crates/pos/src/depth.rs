//! Coin maturity rule for stake kernels.

use crate::error::PosError;

/// Confirmations a kernel coin needs on top of `tip_height`. Capped at half the
/// chain height so an early chain can start staking.
pub fn required_depth(tip_height: i32, min_confirmations: i32) -> i32 {
    (min_confirmations - 1).min(tip_height / 2)
}

/// Returns the coin depth when it meets [`required_depth`].
pub fn check_stake_depth(
    tip_height: i32,
    coin_height: i32,
    min_confirmations: i32,
) -> Result<i32, PosError> {
    let depth = tip_height - coin_height;
    let required = required_depth(tip_height, min_confirmations);
    if depth < required {
        return Err(PosError::StakeTooYoung { depth, required });
    }
    Ok(depth)
}
