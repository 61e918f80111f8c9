//! Block header and block types.

use stakecore_consensus::Hash256;

use crate::encoding::{decode, Decodable, DecodeError, Decoder, Encodable, Encoder};
use crate::hash::sha256d;
use crate::transaction::Transaction;

pub const CURRENT_VERSION: i32 = 0xa0;

pub const HEADER_SIZE: usize = 80;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: Hash256,
    pub merkle_root: Hash256,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn hash(&self) -> Hash256 {
        sha256d(&self.consensus_encode())
    }

    pub fn consensus_encode(&self) -> Vec<u8> {
        let mut encoder = Encoder::with_capacity(HEADER_SIZE);
        Encodable::consensus_encode(self, &mut encoder);
        encoder.into_inner()
    }

    pub fn consensus_decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        decode(bytes)
    }
}

impl Encodable for BlockHeader {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_i32_le(self.version);
        encoder.write_hash_le(&self.prev_block);
        encoder.write_hash_le(&self.merkle_root);
        encoder.write_u32_le(self.time);
        encoder.write_u32_le(self.bits);
        encoder.write_u32_le(self.nonce);
    }
}

impl Decodable for BlockHeader {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        Ok(Self {
            version: decoder.read_i32_le()?,
            prev_block: decoder.read_hash_le()?,
            merkle_root: decoder.read_hash_le()?,
            time: decoder.read_u32_le()?,
            bits: decoder.read_u32_le()?,
            nonce: decoder.read_u32_le()?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }

    /// Proof-of-stake blocks carry their coinstake as the first transaction.
    pub fn is_proof_of_stake(&self) -> bool {
        self.transactions
            .first()
            .is_some_and(Transaction::is_coin_stake)
    }

    pub fn coinstake(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_coin_stake())
    }

    pub fn compute_merkle_root(&self) -> Hash256 {
        let leaves: Vec<Hash256> = self.transactions.iter().map(Transaction::txid).collect();
        merkle_root(leaves)
    }

    pub fn consensus_encode(&self) -> Vec<u8> {
        let mut encoder = Encoder::new();
        Encodable::consensus_encode(&self.header, &mut encoder);
        encoder.write_varint(self.transactions.len() as u64);
        for tx in &self.transactions {
            encoder.write_bytes(&tx.consensus_encode());
        }
        encoder.into_inner()
    }

    pub fn consensus_decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut decoder = Decoder::new(bytes);
        let header = <BlockHeader as Decodable>::consensus_decode(&mut decoder)?;
        let count = decoder.read_varint()? as usize;
        let mut transactions = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            transactions.push(<Transaction as Decodable>::consensus_decode(&mut decoder)?);
        }
        if !decoder.is_empty() {
            return Err(DecodeError::TrailingBytes);
        }
        Ok(Self {
            header,
            transactions,
        })
    }
}

/// Pairwise sha256d reduction; an odd last node is paired with itself.
pub fn merkle_root(mut level: Vec<Hash256>) -> Hash256 {
    if level.is_empty() {
        return [0u8; 32];
    }
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            if let Some(last) = level.last().copied() {
                level.push(last);
            }
        }
        level = level
            .chunks_exact(2)
            .map(|pair| {
                let mut buf = [0u8; 64];
                buf[..32].copy_from_slice(&pair[0]);
                buf[32..].copy_from_slice(&pair[1]);
                sha256d(&buf)
            })
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outpoint::OutPoint;
    use crate::transaction::{TxIn, TxOut, TxType};

    fn header() -> BlockHeader {
        BlockHeader {
            version: CURRENT_VERSION,
            prev_block: [0x22; 32],
            merkle_root: [0x33; 32],
            time: 1_600_000_000,
            bits: 0x1f03_ffff,
            nonce: 7,
        }
    }

    #[test]
    fn header_encoding_is_fixed_size() {
        let bytes = header().consensus_encode();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(BlockHeader::consensus_decode(&bytes).expect("decode"), header());
    }

    #[test]
    fn proof_of_stake_detection_and_merkle() {
        let mut coinstake = Transaction::new(TxType::Coinstake);
        coinstake.vin.push(TxIn::new(OutPoint::new([1; 32], 0)));
        coinstake.vout.push(TxOut::standard(5, vec![0x51]));
        let mut block = Block {
            header: header(),
            transactions: vec![coinstake.clone()],
        };
        assert!(block.is_proof_of_stake());
        assert_eq!(block.compute_merkle_root(), coinstake.txid());

        block.transactions.push(Transaction::new(TxType::Standard));
        let root = block.compute_merkle_root();
        let decoded = Block::consensus_decode(&block.consensus_encode()).expect("decode");
        assert_eq!(decoded.compute_merkle_root(), root);

        block.transactions.reverse();
        assert!(!block.is_proof_of_stake());
        assert!(block.coinstake().is_none());
    }

    #[test]
    fn merkle_root_duplicates_odd_leaf() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        let c = [3u8; 32];
        assert_eq!(merkle_root(vec![a, b, c]), merkle_root(vec![a, b, c, c]));
        assert_eq!(merkle_root(Vec::new()), [0u8; 32]);
    }
}
