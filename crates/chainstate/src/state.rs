//! Active chain, block connection and the read snapshot used by stake validation.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use stakecore_consensus::{ConsensusParams, Hash256};
use stakecore_log::{log_category, log_debug, log_info, Category};
use stakecore_pos::{
    check_coinstake_timestamp, check_proof_of_stake, compute_stake_modifier,
    stake_modifier_kernel, BlockIndexEntry, ChainView, ChainViewError, Coin, PosError,
};
use stakecore_primitives::block::{Block, BlockHeader};
use stakecore_primitives::hash::hash256_to_hex;
use stakecore_primitives::outpoint::OutPoint;
use stakecore_primitives::transaction::Transaction;
use stakecore_script::ScriptVerifier;
use stakecore_storage::{KeyValueStore, StoreError, WriteBatch};

use crate::index::BlockIndex;
use crate::txindex::{TxIndex, TxRecord};
use crate::utxo::{coin_from_output, UtxoSet};

#[derive(Debug)]
pub enum ChainStateError {
    Store(StoreError),
    Stake(PosError),
    /// The block does not build on the current tip.
    NotOnTip { tip: Hash256, prev_block: Hash256 },
    /// A proof-of-stake block needs a predecessor to stake against.
    StakeWithoutPredecessor,
    BadCoinstakeTimestamp { height: i32, time: u32 },
    MissingInput(OutPoint),
    CorruptIndex(&'static str),
    LockPoisoned,
}

impl fmt::Display for ChainStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainStateError::Store(err) => write!(f, "{err}"),
            ChainStateError::Stake(err) => write!(f, "{err}"),
            ChainStateError::NotOnTip { tip, prev_block } => write!(
                f,
                "block builds on {} but the tip is {}",
                hash256_to_hex(prev_block),
                hash256_to_hex(tip)
            ),
            ChainStateError::StakeWithoutPredecessor => {
                write!(f, "proof-of-stake block without predecessor")
            }
            ChainStateError::BadCoinstakeTimestamp { height, time } => {
                write!(f, "coinstake time {time} at height {height} violates the timestamp mask")
            }
            ChainStateError::MissingInput(outpoint) => write!(
                f,
                "missing input {}:{}",
                hash256_to_hex(&outpoint.hash),
                outpoint.index
            ),
            ChainStateError::CorruptIndex(message) => write!(f, "{message}"),
            ChainStateError::LockPoisoned => write!(f, "chain state lock poisoned"),
        }
    }
}

impl std::error::Error for ChainStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChainStateError::Store(err) => Some(err),
            ChainStateError::Stake(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ChainStateError {
    fn from(err: StoreError) -> Self {
        ChainStateError::Store(err)
    }
}

impl From<PosError> for ChainStateError {
    fn from(err: PosError) -> Self {
        ChainStateError::Stake(err)
    }
}

/// Block-index arena of the active chain; position equals height.
#[derive(Default)]
struct ActiveChain {
    entries: Vec<BlockIndexEntry>,
    heights: HashMap<Hash256, i32>,
}

impl ActiveChain {
    fn tip(&self) -> Option<&BlockIndexEntry> {
        self.entries.last()
    }

    fn push(&mut self, entry: BlockIndexEntry) {
        self.heights.insert(entry.hash, entry.height);
        self.entries.push(entry);
    }
}

pub struct ChainState<S> {
    index: BlockIndex<Arc<S>>,
    utxos: UtxoSet<Arc<S>>,
    txindex: TxIndex<Arc<S>>,
    store: Arc<S>,
    chain: RwLock<ActiveChain>,
}

impl<S: KeyValueStore> ChainState<S> {
    /// Opens the chain state stored in `store`, rebuilding the active chain
    /// from the best block back to genesis.
    pub fn open(store: Arc<S>) -> Result<Self, ChainStateError> {
        let index = BlockIndex::new(Arc::clone(&store));
        let mut entries = Vec::new();
        let mut cursor = index.best_block()?;
        while let Some(hash) = cursor {
            let entry = index
                .get_entry(&hash)?
                .ok_or(ChainStateError::CorruptIndex("missing block index entry"))?;
            cursor = (entry.height > 0).then_some(entry.prev_hash);
            entries.push(entry);
        }
        entries.reverse();

        let mut chain = ActiveChain::default();
        for (height, entry) in entries.into_iter().enumerate() {
            if usize::try_from(entry.height).ok() != Some(height) {
                return Err(ChainStateError::CorruptIndex("block index heights out of order"));
            }
            chain.push(entry);
        }
        if let Some(tip) = chain.tip() {
            log_info!(
                "loaded chain state at height {} tip {}",
                tip.height,
                hash256_to_hex(&tip.hash)
            );
        }

        Ok(Self {
            utxos: UtxoSet::new(Arc::clone(&store)),
            txindex: TxIndex::new(Arc::clone(&store)),
            index,
            store,
            chain: RwLock::new(chain),
        })
    }

    pub fn tip(&self) -> Result<Option<BlockIndexEntry>, ChainStateError> {
        Ok(self.read_chain()?.tip().cloned())
    }

    /// Consistent read view for validation. Block connection waits until the
    /// snapshot is dropped.
    pub fn snapshot(&self) -> Result<ChainSnapshot<'_, S>, ChainStateError> {
        Ok(ChainSnapshot {
            state: self,
            chain: self.read_chain()?,
        })
    }

    /// Validates the stake of `block` (when it carries a coinstake) against the
    /// current tip and connects it, all under one write guard.
    pub fn accept_block<V>(
        &self,
        params: &ConsensusParams,
        verifier: &V,
        block: &Block,
    ) -> Result<BlockIndexEntry, ChainStateError>
    where
        V: ScriptVerifier + ?Sized,
    {
        let mut chain = self.write_chain()?;
        check_extends_tip(&chain, &block.header)?;

        let proof = match block.coinstake() {
            Some(coinstake) => {
                let prev = chain
                    .tip()
                    .cloned()
                    .ok_or(ChainStateError::StakeWithoutPredecessor)?;
                let height = prev.height + 1;
                let time = block.header.time;
                if !check_coinstake_timestamp(params, height, time) {
                    return Err(ChainStateError::BadCoinstakeTimestamp { height, time });
                }
                let view = StateView {
                    state: self,
                    chain: &chain,
                };
                let proof = check_proof_of_stake(
                    &view,
                    params,
                    verifier,
                    &prev,
                    coinstake,
                    time,
                    block.header.bits,
                )?;
                Some(proof.hash_proof_of_stake)
            }
            None => None,
        };

        self.connect_locked(&mut chain, block, proof.as_ref())
    }

    /// Connects `block` on top of the tip without stake validation.
    /// `proof_of_stake` is the kernel hash of an already validated coinstake
    /// and feeds the stake modifier in place of the block hash.
    pub fn connect_block(
        &self,
        block: &Block,
        proof_of_stake: Option<&Hash256>,
    ) -> Result<BlockIndexEntry, ChainStateError> {
        let mut chain = self.write_chain()?;
        check_extends_tip(&chain, &block.header)?;
        self.connect_locked(&mut chain, block, proof_of_stake)
    }

    fn connect_locked(
        &self,
        chain: &mut ActiveChain,
        block: &Block,
        proof_of_stake: Option<&Hash256>,
    ) -> Result<BlockIndexEntry, ChainStateError> {
        let hash = block.hash();
        let prev = chain.tip();
        let kernel = stake_modifier_kernel(&hash, proof_of_stake);
        let entry = BlockIndexEntry {
            height: prev.map_or(0, |prev| prev.height + 1),
            hash,
            prev_hash: block.header.prev_block,
            time: block.header.time,
            bits: block.header.bits,
            stake_modifier: compute_stake_modifier(
                prev.map(|prev| &prev.stake_modifier),
                &kernel,
            ),
            proof_hash: kernel,
        };

        let mut batch = WriteBatch::new();
        let mut created: HashMap<OutPoint, Coin> = HashMap::new();
        let mut spent: HashSet<OutPoint> = HashSet::new();
        for tx in &block.transactions {
            if !tx.is_coin_base() {
                for input in &tx.vin {
                    self.spend(&mut batch, &mut created, &mut spent, &input.prevout)?;
                }
            }
            let txid = tx.txid();
            for (index, output) in tx.vout.iter().enumerate() {
                if let Some(coin) = coin_from_output(output, entry.height) {
                    created.insert(OutPoint::new(txid, index as u32), coin);
                }
            }
            self.txindex.insert(
                &mut batch,
                &txid,
                &TxRecord {
                    block_hash: hash,
                    tx: tx.clone(),
                },
            );
        }
        for (outpoint, coin) in &created {
            self.utxos.put(&mut batch, outpoint, coin);
        }

        self.index.put_entry(&mut batch, &entry);
        self.index.put_header(&mut batch, &hash, &block.header);
        self.index.set_height_hash(&mut batch, entry.height, &hash);
        self.index.set_best_block(&mut batch, &hash);
        self.store.write_batch(&batch)?;

        log_category!(
            Category::Chain,
            "connected block {} at height {}: {} txs, {} spent, {} created",
            hash256_to_hex(&hash),
            entry.height,
            block.transactions.len(),
            spent.len(),
            created.len()
        );
        log_debug!(
            "stake modifier at height {} is {}",
            entry.height,
            hash256_to_hex(&entry.stake_modifier)
        );

        chain.push(entry.clone());
        Ok(entry)
    }

    /// Removes `prevout` from the coins created earlier in the block, or
    /// schedules its deletion from the stored set.
    fn spend(
        &self,
        batch: &mut WriteBatch,
        created: &mut HashMap<OutPoint, Coin>,
        spent: &mut HashSet<OutPoint>,
        prevout: &OutPoint,
    ) -> Result<(), ChainStateError> {
        if !spent.insert(prevout.clone()) {
            return Err(ChainStateError::MissingInput(prevout.clone()));
        }
        if created.remove(prevout).is_some() {
            return Ok(());
        }
        if self.utxos.get(prevout)?.is_none() {
            return Err(ChainStateError::MissingInput(prevout.clone()));
        }
        self.utxos.delete(batch, prevout);
        Ok(())
    }

    fn read_chain(&self) -> Result<RwLockReadGuard<'_, ActiveChain>, ChainStateError> {
        self.chain.read().map_err(|_| ChainStateError::LockPoisoned)
    }

    fn write_chain(&self) -> Result<RwLockWriteGuard<'_, ActiveChain>, ChainStateError> {
        self.chain.write().map_err(|_| ChainStateError::LockPoisoned)
    }
}

fn check_extends_tip(chain: &ActiveChain, header: &BlockHeader) -> Result<(), ChainStateError> {
    let tip = chain.tip().map_or([0u8; 32], |tip| tip.hash);
    if header.prev_block != tip {
        return Err(ChainStateError::NotOnTip {
            tip,
            prev_block: header.prev_block,
        });
    }
    Ok(())
}

/// Read guard over the active chain that answers [`ChainView`] queries.
pub struct ChainSnapshot<'a, S> {
    state: &'a ChainState<S>,
    chain: RwLockReadGuard<'a, ActiveChain>,
}

impl<S> ChainSnapshot<'_, S> {
    pub fn tip(&self) -> Option<&BlockIndexEntry> {
        self.chain.tip()
    }

    fn view(&self) -> StateView<'_, S> {
        StateView {
            state: self.state,
            chain: &self.chain,
        }
    }
}

impl<S: KeyValueStore> ChainView for ChainSnapshot<'_, S> {
    fn get_coin(&self, outpoint: &OutPoint) -> Result<Option<Coin>, ChainViewError> {
        self.view().get_coin(outpoint)
    }

    fn get_block_index(&self, height: i32) -> Result<Option<BlockIndexEntry>, ChainViewError> {
        self.view().get_block_index(height)
    }

    fn get_transaction_and_block(
        &self,
        txid: &Hash256,
    ) -> Result<Option<(Transaction, BlockHeader)>, ChainViewError> {
        self.view().get_transaction_and_block(txid)
    }

    fn block_height(&self, hash: &Hash256) -> Result<Option<i32>, ChainViewError> {
        self.view().block_height(hash)
    }

    fn tip_height(&self) -> i32 {
        self.view().tip_height()
    }
}

struct StateView<'a, S> {
    state: &'a ChainState<S>,
    chain: &'a ActiveChain,
}

fn view_error(err: StoreError) -> ChainViewError {
    ChainViewError(err.to_string())
}

impl<S: KeyValueStore> ChainView for StateView<'_, S> {
    fn get_coin(&self, outpoint: &OutPoint) -> Result<Option<Coin>, ChainViewError> {
        self.state.utxos.get(outpoint).map_err(view_error)
    }

    fn get_block_index(&self, height: i32) -> Result<Option<BlockIndexEntry>, ChainViewError> {
        Ok(usize::try_from(height)
            .ok()
            .and_then(|height| self.chain.entries.get(height))
            .cloned())
    }

    fn get_transaction_and_block(
        &self,
        txid: &Hash256,
    ) -> Result<Option<(Transaction, BlockHeader)>, ChainViewError> {
        let Some(record) = self.state.txindex.get(txid).map_err(view_error)? else {
            return Ok(None);
        };
        let header = self
            .state
            .index
            .get_header(&record.block_hash)
            .map_err(view_error)?
            .ok_or_else(|| {
                ChainViewError(format!(
                    "missing header {} for indexed tx",
                    hash256_to_hex(&record.block_hash)
                ))
            })?;
        Ok(Some((record.tx, header)))
    }

    fn block_height(&self, hash: &Hash256) -> Result<Option<i32>, ChainViewError> {
        Ok(self.chain.heights.get(hash).copied())
    }

    fn tip_height(&self) -> i32 {
        self.chain.entries.len() as i32 - 1
    }
}
