#![allow(dead_code)]

use std::sync::Arc;

use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use stakecore_chainstate::ChainState;
use stakecore_consensus::{Amount, Hash256};
use stakecore_primitives::block::{Block, BlockHeader};
use stakecore_primitives::hash::hash160;
use stakecore_primitives::outpoint::OutPoint;
use stakecore_primitives::transaction::{Transaction, TxIn, TxOut, TxType};
use stakecore_script::sighash::{signature_hash, SighashType, SIGHASH_ALL};
use stakecore_script::standard::p2pkh_script;
use stakecore_storage::memory::MemoryStore;

pub const BASE_TIME: u32 = 1_600_000_000;
pub const EASY_BITS: u32 = 0x1f00_ffff;

pub fn empty_state() -> (Arc<MemoryStore>, ChainState<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = ChainState::open(Arc::clone(&store)).expect("open chain state");
    (store, state)
}

pub fn coinbase(height: u32, outputs: Vec<TxOut>) -> Transaction {
    let mut tx = Transaction::new(TxType::Coinbase);
    tx.vin.push(TxIn::new(OutPoint::null()));
    tx.vout = outputs;
    tx.lock_time = height;
    tx
}

pub fn make_block(prev_block: Hash256, time: u32, transactions: Vec<Transaction>) -> Block {
    let mut block = Block {
        header: BlockHeader {
            version: 0xa0,
            prev_block,
            merkle_root: [0u8; 32],
            time,
            bits: EASY_BITS,
            nonce: 0,
        },
        transactions,
    };
    block.header.merkle_root = block.compute_merkle_root();
    block
}

/// Connects coinbase-only blocks until the tip reaches `tip_height`.
pub fn extend_to(state: &ChainState<MemoryStore>, tip_height: u32) {
    loop {
        let tip = state.tip().expect("tip").expect("genesis connected");
        let height = tip.height as u32 + 1;
        if height > tip_height {
            return;
        }
        let block = make_block(
            tip.hash,
            BASE_TIME + height * 16,
            vec![coinbase(height, vec![TxOut::Data { data: vec![0x01] }])],
        );
        state.connect_block(&block, None).expect("connect filler block");
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

    pub fn sign_input(&self, tx: &mut Transaction, index: usize, script: &[u8], amount: Amount) {
        let sighash = signature_hash(tx, index, script, amount, SighashType(SIGHASH_ALL))
            .expect("sighash");
        let sig = Secp256k1::new().sign_ecdsa(&Message::from_digest(sighash), &self.secret);
        let mut sig_bytes = sig.serialize_der().to_vec();
        sig_bytes.push(SIGHASH_ALL as u8);
        tx.vin[index].witness = vec![sig_bytes, self.pubkey.clone()];
    }
}
