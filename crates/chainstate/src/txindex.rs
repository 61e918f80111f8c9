//! Transaction index: txid to the containing block and the transaction itself.

use stakecore_consensus::Hash256;
use stakecore_primitives::encoding::{DecodeError, Decoder, Encoder};
use stakecore_primitives::transaction::Transaction;
use stakecore_storage::{Column, KeyValueStore, StoreError, WriteBatch};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxRecord {
    pub block_hash: Hash256,
    pub tx: Transaction,
}

impl TxRecord {
    pub fn encode(&self) -> Vec<u8> {
        let tx_bytes = self.tx.consensus_encode();
        let mut encoder = Encoder::with_capacity(32 + tx_bytes.len());
        encoder.write_hash_le(&self.block_hash);
        encoder.write_bytes(&tx_bytes);
        encoder.into_inner()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut decoder = Decoder::new(bytes);
        let block_hash = decoder.read_hash_le()?;
        let tx = Transaction::consensus_decode(&bytes[bytes.len() - decoder.remaining()..])?;
        Ok(Self { block_hash, tx })
    }
}

pub struct TxIndex<S> {
    store: S,
}

impl<S> TxIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore> TxIndex<S> {
    pub fn insert(&self, batch: &mut WriteBatch, txid: &Hash256, record: &TxRecord) {
        batch.put(Column::TxIndex, *txid, record.encode());
    }

    pub fn get(&self, txid: &Hash256) -> Result<Option<TxRecord>, StoreError> {
        let bytes = match self.store.get(Column::TxIndex, txid)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        TxRecord::decode(&bytes)
            .map(Some)
            .map_err(|err| StoreError::Backend(format!("tx index entry: {err}")))
    }
}
