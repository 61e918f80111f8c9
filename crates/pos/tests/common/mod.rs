#![allow(dead_code)]

use std::collections::HashMap;

use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use stakecore_consensus::{Amount, Hash256};
use stakecore_pos::chain::{BlockIndexEntry, ChainView, ChainViewError, Coin};
use stakecore_pos::modifier::{compute_stake_modifier, stake_modifier_kernel};
use stakecore_primitives::block::BlockHeader;
use stakecore_primitives::hash::{hash160, sha256d};
use stakecore_primitives::outpoint::OutPoint;
use stakecore_primitives::transaction::{OutputType, Transaction, TxIn, TxOut, TxType};
use stakecore_script::sighash::{signature_hash, SighashType, SIGHASH_ALL};
use stakecore_script::standard::p2pkh_script;

pub const BASE_TIME: u32 = 1_600_000_000;
pub const EASY_BITS: u32 = 0x1f00_ffff;

#[derive(Default)]
pub struct MemoryChain {
    pub headers: Vec<BlockHeader>,
    pub entries: Vec<BlockIndexEntry>,
    pub coins: HashMap<OutPoint, Coin>,
    pub txs: HashMap<Hash256, (Transaction, BlockHeader)>,
    pub fail_reads: bool,
}

impl MemoryChain {
    /// Active chain of `tip + 1` blocks spaced 16 seconds apart.
    pub fn with_tip(tip: i32) -> Self {
        let mut chain = Self::default();
        let mut prev_hash = [0u8; 32];
        let mut prev_modifier: Option<Hash256> = None;
        for height in 0..=tip {
            let header = BlockHeader {
                version: 0xa0,
                prev_block: prev_hash,
                merkle_root: sha256d(&height.to_le_bytes()),
                time: BASE_TIME + height as u32 * 16,
                bits: EASY_BITS,
                nonce: 0,
            };
            let hash = header.hash();
            let modifier = compute_stake_modifier(
                prev_modifier.as_ref(),
                &stake_modifier_kernel(&hash, None),
            );
            chain.entries.push(BlockIndexEntry {
                height,
                hash,
                prev_hash,
                time: header.time,
                bits: header.bits,
                stake_modifier: modifier,
                proof_hash: hash,
            });
            chain.headers.push(header);
            prev_hash = hash;
            prev_modifier = Some(modifier);
        }
        chain
    }

    pub fn tip(&self) -> &BlockIndexEntry {
        self.entries.last().expect("non-empty chain")
    }

    pub fn add_coin(&mut self, outpoint: OutPoint, value: Amount, script: Vec<u8>, height: i32) {
        self.coins.insert(
            outpoint,
            Coin {
                value,
                script_pubkey: script,
                output_type: OutputType::Standard,
                height,
                spent: false,
            },
        );
    }

    /// Records `tx` in the transaction index as mined at `height` and returns its txid.
    pub fn index_tx(&mut self, tx: Transaction, height: i32) -> Hash256 {
        let txid = tx.txid();
        let header = self.headers[height as usize].clone();
        self.txs.insert(txid, (tx, header));
        txid
    }

    fn check(&self) -> Result<(), ChainViewError> {
        if self.fail_reads {
            return Err(ChainViewError("backend offline".to_string()));
        }
        Ok(())
    }
}

impl ChainView for MemoryChain {
    fn get_coin(&self, outpoint: &OutPoint) -> Result<Option<Coin>, ChainViewError> {
        self.check()?;
        Ok(self.coins.get(outpoint).cloned())
    }

    fn get_block_index(&self, height: i32) -> Result<Option<BlockIndexEntry>, ChainViewError> {
        self.check()?;
        Ok(usize::try_from(height)
            .ok()
            .and_then(|h| self.entries.get(h))
            .cloned())
    }

    fn get_transaction_and_block(
        &self,
        txid: &Hash256,
    ) -> Result<Option<(Transaction, BlockHeader)>, ChainViewError> {
        self.check()?;
        Ok(self.txs.get(txid).cloned())
    }

    fn block_height(&self, hash: &Hash256) -> Result<Option<i32>, ChainViewError> {
        self.check()?;
        Ok(self
            .entries
            .iter()
            .find(|entry| entry.hash == *hash)
            .map(|entry| entry.height))
    }

    fn tip_height(&self) -> i32 {
        self.entries.len() as i32 - 1
    }
}

pub struct TestKey {
    pub secret: SecretKey,
    pub pubkey: Vec<u8>,
}

impl TestKey {
    pub fn new(last_byte: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[31] = last_byte;
        let secret = SecretKey::from_slice(&bytes).expect("secret key");
        let pubkey = PublicKey::from_secret_key(&Secp256k1::new(), &secret)
            .serialize()
            .to_vec();
        Self { secret, pubkey }
    }

    pub fn p2pkh(&self) -> Vec<u8> {
        p2pkh_script(&hash160(&self.pubkey))
    }

    /// Signs input `index` of `tx` and installs a `[sig, pubkey]` witness.
    pub fn sign_input(&self, tx: &mut Transaction, index: usize, script: &[u8], amount: Amount) {
        let sighash = signature_hash(tx, index, script, amount, SighashType(SIGHASH_ALL))
            .expect("sighash");
        let sig = Secp256k1::new().sign_ecdsa(&Message::from_digest(sighash), &self.secret);
        let mut sig_bytes = sig.serialize_der().to_vec();
        sig_bytes.push(SIGHASH_ALL as u8);
        tx.vin[index].witness = vec![sig_bytes, self.pubkey.clone()];
    }
}

pub fn coinstake_spending(prevouts: &[OutPoint], outputs: Vec<TxOut>) -> Transaction {
    let mut tx = Transaction::new(TxType::Coinstake);
    tx.vin = prevouts.iter().cloned().map(TxIn::new).collect();
    tx.vout = outputs;
    tx
}

/// A funding transaction with one standard output per `(value, script)`.
pub fn funding_tx(outputs: &[(Amount, Vec<u8>)], salt: u8) -> Transaction {
    let mut tx = Transaction::new(TxType::Standard);
    tx.vin.push(TxIn::new(OutPoint::new([salt; 32], 0)));
    tx.vout = outputs
        .iter()
        .map(|(value, script)| TxOut::standard(*value, script.clone()))
        .collect();
    tx
}
