//! Prevout lookup: live unspent set first, then the transaction index.

use stakecore_consensus::Amount;
use stakecore_primitives::block::BlockHeader;
use stakecore_primitives::outpoint::OutPoint;
use stakecore_primitives::transaction::{OutputType, TxOut};

use crate::chain::{BlockIndexEntry, ChainView};
use crate::error::PosError;

pub(crate) enum PrevoutSource {
    Live { height: i32 },
    Historical { header: BlockHeader },
}

pub(crate) struct ResolvedPrevout {
    pub value: Amount,
    pub script_pubkey: Vec<u8>,
    pub source: PrevoutSource,
}

/// Resolves the output spent by input `input`. A live coin that is absent or
/// already spent falls back to the historical transaction lookup.
pub(crate) fn resolve_prevout<V: ChainView + ?Sized>(
    view: &V,
    prevout: &OutPoint,
    input: usize,
) -> Result<ResolvedPrevout, PosError> {
    if let Some(coin) = view.get_coin(prevout)?.filter(|coin| !coin.spent) {
        if coin.output_type != OutputType::Standard {
            return Err(PosError::InvalidPrevout { input });
        }
        return Ok(ResolvedPrevout {
            value: coin.value,
            script_pubkey: coin.script_pubkey,
            source: PrevoutSource::Live {
                height: coin.height,
            },
        });
    }

    let (tx, header) = view
        .get_transaction_and_block(&prevout.hash)?
        .ok_or(PosError::PrevoutNotInChain { input })?;
    let output = tx
        .vout
        .into_iter()
        .nth(prevout.index as usize)
        .ok_or(PosError::PrevoutNotInChain { input })?;
    match output {
        TxOut::Standard {
            value,
            script_pubkey,
        } => Ok(ResolvedPrevout {
            value,
            script_pubkey,
            source: PrevoutSource::Historical { header },
        }),
        _ => Err(PosError::InvalidPrevout { input }),
    }
}

/// Active-chain entry of the block that created the resolved coin.
pub(crate) fn containing_block<V: ChainView + ?Sized>(
    view: &V,
    source: &PrevoutSource,
    input: usize,
) -> Result<BlockIndexEntry, PosError> {
    match source {
        PrevoutSource::Live { height } => view
            .get_block_index(*height)?
            .ok_or(PosError::InvalidPrevout { input }),
        PrevoutSource::Historical { header } => {
            let hash = header.hash();
            let height = view
                .block_height(&hash)?
                .ok_or(PosError::PrevoutNotInChain { input })?;
            view.get_block_index(height)?
                .filter(|entry| entry.hash == hash)
                .ok_or(PosError::PrevoutNotInChain { input })
        }
    }
}
