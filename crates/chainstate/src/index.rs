//! Block index entries and the active-chain height map, backed by the storage trait.

use stakecore_consensus::Hash256;
use stakecore_pos::BlockIndexEntry;
use stakecore_primitives::block::BlockHeader;
use stakecore_primitives::encoding::{DecodeError, Decoder, Encoder};
use stakecore_storage::{Column, KeyValueStore, StoreError, WriteBatch};

const META_BEST_BLOCK_KEY: &[u8] = b"best_block";
const INDEX_ENTRY_LEN: usize = 4 + 32 * 3 + 4 + 4;

pub struct BlockIndex<S> {
    store: S,
}

impl<S> BlockIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore> BlockIndex<S> {
    pub fn get_entry(&self, hash: &Hash256) -> Result<Option<BlockIndexEntry>, StoreError> {
        let bytes = match self.store.get(Column::HeaderIndex, hash)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        decode_index_entry(hash, &bytes)
            .map(Some)
            .map_err(|err| StoreError::Backend(format!("block index entry: {err}")))
    }

    pub fn put_entry(&self, batch: &mut WriteBatch, entry: &BlockIndexEntry) {
        batch.put(Column::HeaderIndex, entry.hash, encode_index_entry(entry));
    }

    pub fn get_header(&self, hash: &Hash256) -> Result<Option<BlockHeader>, StoreError> {
        let bytes = match self.store.get(Column::BlockHeader, hash)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        BlockHeader::consensus_decode(&bytes)
            .map(Some)
            .map_err(|err| StoreError::Backend(format!("block header: {err}")))
    }

    pub fn put_header(&self, batch: &mut WriteBatch, hash: &Hash256, header: &BlockHeader) {
        batch.put(Column::BlockHeader, *hash, header.consensus_encode());
    }

    pub fn height_hash(&self, height: i32) -> Result<Option<Hash256>, StoreError> {
        match self.store.get(Column::HeightIndex, &height_key(height))? {
            Some(bytes) => decode_hash(&bytes).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_height_hash(&self, batch: &mut WriteBatch, height: i32, hash: &Hash256) {
        batch.put(Column::HeightIndex, height_key(height), hash.to_vec());
    }

    pub fn best_block(&self) -> Result<Option<Hash256>, StoreError> {
        match self.store.get(Column::Meta, META_BEST_BLOCK_KEY)? {
            Some(bytes) => decode_hash(&bytes).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_best_block(&self, batch: &mut WriteBatch, hash: &Hash256) {
        batch.put(Column::Meta, META_BEST_BLOCK_KEY, hash.to_vec());
    }
}

/// Big-endian so a prefix scan walks the chain in height order.
pub fn height_key(height: i32) -> [u8; 4] {
    (height as u32).to_be_bytes()
}

pub fn encode_index_entry(entry: &BlockIndexEntry) -> Vec<u8> {
    let mut encoder = Encoder::with_capacity(INDEX_ENTRY_LEN);
    encoder.write_i32_le(entry.height);
    encoder.write_hash_le(&entry.prev_hash);
    encoder.write_u32_le(entry.time);
    encoder.write_u32_le(entry.bits);
    encoder.write_hash_le(&entry.stake_modifier);
    encoder.write_hash_le(&entry.proof_hash);
    encoder.into_inner()
}

/// The entry's own hash is the storage key and is not repeated in the value.
pub fn decode_index_entry(hash: &Hash256, bytes: &[u8]) -> Result<BlockIndexEntry, DecodeError> {
    let mut decoder = Decoder::new(bytes);
    let height = decoder.read_i32_le()?;
    let prev_hash = decoder.read_hash_le()?;
    let time = decoder.read_u32_le()?;
    let bits = decoder.read_u32_le()?;
    let stake_modifier = decoder.read_hash_le()?;
    let proof_hash = decoder.read_hash_le()?;
    if !decoder.is_empty() {
        return Err(DecodeError::TrailingBytes);
    }
    Ok(BlockIndexEntry {
        height,
        hash: *hash,
        prev_hash,
        time,
        bits,
        stake_modifier,
        proof_hash,
    })
}

fn decode_hash(bytes: &[u8]) -> Result<Hash256, StoreError> {
    bytes
        .try_into()
        .map_err(|_| StoreError::Backend("invalid hash length".to_string()))
}
