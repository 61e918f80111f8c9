//! Coinstake validation against the active chain.

use stakecore_consensus::ConsensusParams;
use stakecore_log::{log_category, log_debug, Category};
use stakecore_primitives::hash::hash256_to_hex;
use stakecore_primitives::outpoint::OutPoint;
use stakecore_primitives::transaction::{OutputType, Transaction};
use stakecore_script::standard::{has_is_coinstake_op, is_p2pkh, split_coinstake_script};
use stakecore_script::ScriptVerifier;

use crate::chain::{BlockIndexEntry, ChainView};
use crate::coinstake::verify_coinstake_outputs;
use crate::depth::check_stake_depth;
use crate::error::PosError;
use crate::kernel::{check_stake_kernel_hash, ProofOfStakeResult};
use crate::resolve::{containing_block, resolve_prevout};

/// Consensus inputs fixed for the duration of one validation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsensusSnapshot {
    pub bits: u32,
    pub block_from_time: u32,
    pub min_confirmations: i32,
}

/// Checks that `tx` is a valid proof of stake for a block at `time` built on
/// `prev`, returning the kernel hash and the weighted target it met.
pub fn check_proof_of_stake<V, S>(
    view: &V,
    params: &ConsensusParams,
    verifier: &S,
    prev: &BlockIndexEntry,
    tx: &Transaction,
    time: u32,
    bits: u32,
) -> Result<ProofOfStakeResult, PosError>
where
    V: ChainView + ?Sized,
    S: ScriptVerifier + ?Sized,
{
    let result = validate_coinstake(view, params, verifier, prev, tx, time, bits);
    if let Err(err) = &result {
        log_category!(
            Category::Pos,
            "coinstake {} rejected at height {}: {} ({})",
            hash256_to_hex(&tx.txid()),
            prev.height + 1,
            err.reject_reason(),
            err
        );
    }
    result
}

fn validate_coinstake<V, S>(
    view: &V,
    params: &ConsensusParams,
    verifier: &S,
    prev: &BlockIndexEntry,
    tx: &Transaction,
    time: u32,
    bits: u32,
) -> Result<ProofOfStakeResult, PosError>
where
    V: ChainView + ?Sized,
    S: ScriptVerifier + ?Sized,
{
    let Some(kernel_in) = tx.vin.first().filter(|_| tx.is_coin_stake()) else {
        return Err(PosError::MalformedTransaction);
    };

    let kernel = resolve_prevout(view, &kernel_in.prevout, 0)?;
    let coin_block = containing_block(view, &kernel.source, 0)?;
    let height = prev.height + 1;
    let snapshot = ConsensusSnapshot {
        bits,
        block_from_time: coin_block.time,
        min_confirmations: params.min_stake_confirmations(height),
    };

    check_stake_depth(prev.height, coin_block.height, snapshot.min_confirmations)?;

    let coinstake_op = has_is_coinstake_op(&kernel.script_pubkey);
    if coinstake_op {
        check_coinstake_script_allowed(params, &kernel.script_pubkey, time)?;
    }

    verifier
        .verify(tx, 0, &kernel.script_pubkey, kernel.value)
        .map_err(PosError::ScriptVerifyFailed)?;

    let check = check_stake_kernel_hash(
        Some(prev),
        snapshot.bits,
        snapshot.block_from_time,
        kernel.value,
        &kernel_in.prevout,
        time,
    )?;
    if !check.accepted {
        return Err(PosError::KernelCheckFailed { proof: check.proof });
    }

    if coinstake_op {
        verify_coinstake_outputs(view, tx, &kernel.script_pubkey, kernel.value)?;
    }

    log_debug!(
        "accepted coinstake {} at height {} hash {}",
        hash256_to_hex(&tx.txid()),
        height,
        hash256_to_hex(&check.proof.hash_proof_of_stake)
    );
    Ok(check.proof)
}

fn check_coinstake_script_allowed(
    params: &ConsensusParams,
    script: &[u8],
    time: u32,
) -> Result<(), PosError> {
    if !params.op_is_coinstake_active(time) {
        return Err(PosError::CoinstakeOpInactive { time });
    }
    if !params.allow_op_is_coinstake_with_p2pkh {
        if let Some(split) = split_coinstake_script(script) {
            if is_p2pkh(split.spend) {
                return Err(PosError::CoinstakeOpP2pkhSpend);
            }
        }
    }
    Ok(())
}

/// Kernel check for local staking: live coins only, no signature. Returns the
/// time of the block that created the coin.
pub fn check_kernel<V: ChainView + ?Sized>(
    view: &V,
    params: &ConsensusParams,
    prev: &BlockIndexEntry,
    bits: u32,
    time: u32,
    prevout: &OutPoint,
) -> Result<u32, PosError> {
    let coin = view
        .get_coin(prevout)?
        .ok_or(PosError::PrevoutNotInChain { input: 0 })?;
    if coin.output_type != OutputType::Standard {
        return Err(PosError::InvalidPrevout { input: 0 });
    }
    if coin.spent {
        return Err(PosError::PrevoutSpent { input: 0 });
    }
    let coin_block = view
        .get_block_index(coin.height)?
        .ok_or(PosError::InvalidPrevout { input: 0 })?;

    check_stake_depth(
        prev.height,
        coin.height,
        params.min_stake_confirmations(prev.height + 1),
    )?;

    let check =
        check_stake_kernel_hash(Some(prev), bits, coin_block.time, coin.value, prevout, time)?;
    if !check.accepted {
        return Err(PosError::KernelCheckFailed { proof: check.proof });
    }
    Ok(coin_block.time)
}

/// Coinstake block times must be multiples of the stake timestamp granularity.
pub fn check_coinstake_timestamp(params: &ConsensusParams, height: i32, time: u32) -> bool {
    time & params.stake_timestamp_mask(height) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakecore_consensus::{consensus_params, Network};

    #[test]
    fn timestamp_mask_per_network() {
        let mainnet = consensus_params(Network::Mainnet);
        assert!(check_coinstake_timestamp(&mainnet, 10, 1_600_000_000));
        assert!(!check_coinstake_timestamp(&mainnet, 10, 1_600_000_001));
        assert!(!check_coinstake_timestamp(&mainnet, 10, 1_600_000_015));
        assert!(check_coinstake_timestamp(&mainnet, 10, 1_600_000_016));

        let regtest = consensus_params(Network::Regtest);
        assert!(check_coinstake_timestamp(&regtest, 10, 1_600_000_001));
    }

    #[test]
    fn coinstake_script_gating() {
        use stakecore_script::standard::{coinstake_script, p2pkh256_script, p2pkh_script};

        let mainnet = consensus_params(Network::Mainnet);
        let p2pkh_spend = coinstake_script(&p2pkh_script(&[1; 20]), &p2pkh_script(&[2; 20]));
        let hash256_spend =
            coinstake_script(&p2pkh_script(&[1; 20]), &p2pkh256_script(&[2; 32]));

        assert_eq!(
            check_coinstake_script_allowed(&mainnet, &hash256_spend, 0x5A04_EBFF),
            Err(PosError::CoinstakeOpInactive { time: 0x5A04_EBFF })
        );
        assert_eq!(
            check_coinstake_script_allowed(&mainnet, &hash256_spend, 0x5A04_EC00),
            Ok(())
        );
        assert_eq!(
            check_coinstake_script_allowed(&mainnet, &p2pkh_spend, 0x5A04_EC00),
            Err(PosError::CoinstakeOpP2pkhSpend)
        );

        let testnet = consensus_params(Network::Testnet);
        assert_eq!(check_coinstake_script_allowed(&testnet, &p2pkh_spend, 0), Ok(()));
    }
}
