//! Local search for a winning kernel time.

use stakecore_consensus::ConsensusParams;
use stakecore_log::{log_category, Category};
use stakecore_primitives::hash::hash256_to_hex;
use stakecore_primitives::outpoint::OutPoint;

use crate::chain::{BlockIndexEntry, ChainView};
use crate::error::PosError;
use crate::validation::check_kernel;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelHit {
    pub time: u32,
    /// Time of the block that created the staked coin.
    pub block_time: u32,
}

/// Tries every timestamp in `[from, to]` that satisfies the stake timestamp
/// mask, earliest first. Kernel misses and times before the coin are skipped;
/// any other rejection ends the search, since it would repeat for every time.
pub fn search_kernel_time<V: ChainView + ?Sized>(
    view: &V,
    params: &ConsensusParams,
    prev: &BlockIndexEntry,
    bits: u32,
    prevout: &OutPoint,
    from: u32,
    to: u32,
) -> Result<Option<KernelHit>, PosError> {
    let mask = u64::from(params.stake_timestamp_mask(prev.height + 1));
    let step = mask + 1;
    let mut time = (u64::from(from) + mask) & !mask;
    let mut tried = 0u64;

    while time <= u64::from(to) {
        let candidate = time as u32;
        tried += 1;
        match check_kernel(view, params, prev, bits, candidate, prevout) {
            Ok(block_time) => {
                log_category!(
                    Category::Pos,
                    "kernel found for {}:{} at {} after {} tries",
                    hash256_to_hex(&prevout.hash),
                    prevout.index,
                    candidate,
                    tried
                );
                return Ok(Some(KernelHit {
                    time: candidate,
                    block_time,
                }));
            }
            Err(PosError::KernelCheckFailed { .. } | PosError::TimestampViolation { .. }) => {}
            Err(err) => return Err(err),
        }
        time += step;
    }
    Ok(None)
}
