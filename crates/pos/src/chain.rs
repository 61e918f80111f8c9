//! Read-only view of chain state consumed by stake validation.

use std::fmt;

use stakecore_consensus::{Amount, Hash256};
use stakecore_primitives::block::BlockHeader;
use stakecore_primitives::outpoint::OutPoint;
use stakecore_primitives::transaction::{OutputType, Transaction};

/// One block of the active chain as the kernel sees it.
///
/// `prev_hash` is a lookup key into the same table, never an owning link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockIndexEntry {
    pub height: i32,
    pub hash: Hash256,
    pub prev_hash: Hash256,
    pub time: u32,
    pub bits: u32,
    pub stake_modifier: Hash256,
    /// Kernel hash for proof-of-stake blocks, the block hash otherwise.
    pub proof_hash: Hash256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    pub value: Amount,
    pub script_pubkey: Vec<u8>,
    pub output_type: OutputType,
    pub height: i32,
    pub spent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainViewError(pub String);

impl fmt::Display for ChainViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chain view: {}", self.0)
    }
}

impl std::error::Error for ChainViewError {}

pub trait ChainView {
    /// Live unspent-set lookup.
    fn get_coin(&self, outpoint: &OutPoint) -> Result<Option<Coin>, ChainViewError>;

    /// Active-chain entry at `height`.
    fn get_block_index(&self, height: i32) -> Result<Option<BlockIndexEntry>, ChainViewError>;

    /// Historical lookup of a transaction and the header of the block that holds it.
    fn get_transaction_and_block(
        &self,
        txid: &Hash256,
    ) -> Result<Option<(Transaction, BlockHeader)>, ChainViewError>;

    /// Height of `hash` if that block is on the active chain.
    fn block_height(&self, hash: &Hash256) -> Result<Option<i32>, ChainViewError>;

    fn tip_height(&self) -> i32;
}

impl<T: ChainView + ?Sized> ChainView for &T {
    fn get_coin(&self, outpoint: &OutPoint) -> Result<Option<Coin>, ChainViewError> {
        (**self).get_coin(outpoint)
    }

    fn get_block_index(&self, height: i32) -> Result<Option<BlockIndexEntry>, ChainViewError> {
        (**self).get_block_index(height)
    }

    fn get_transaction_and_block(
        &self,
        txid: &Hash256,
    ) -> Result<Option<(Transaction, BlockHeader)>, ChainViewError> {
        (**self).get_transaction_and_block(txid)
    }

    fn block_height(&self, hash: &Hash256) -> Result<Option<i32>, ChainViewError> {
        (**self).block_height(hash)
    }

    fn tip_height(&self) -> i32 {
        (**self).tip_height()
    }
}
