//! Amount-committing signature hash for transparent inputs.
//!
//! The preimage follows the segwit layout: per-transaction digests of prevouts,
//! sequences and outputs, then the signed input with its script code and the
//! value it spends. Every digest is sha256d.

use stakecore_consensus::{Amount, Hash256};
use stakecore_primitives::encoding::{Encodable, Encoder};
use stakecore_primitives::hash::sha256d;
use stakecore_primitives::transaction::{Transaction, TxOut};

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_NONE: u32 = 0x02;
pub const SIGHASH_SINGLE: u32 = 0x03;
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SighashType(pub u32);

impl SighashType {
    pub fn base_type(self) -> u32 {
        self.0 & 0x1f
    }

    pub fn has_anyone_can_pay(self) -> bool {
        (self.0 & SIGHASH_ANYONECANPAY) != 0
    }

    pub fn is_defined(self) -> bool {
        matches!(
            self.base_type(),
            SIGHASH_ALL | SIGHASH_NONE | SIGHASH_SINGLE
        ) && (self.0 & !(0x1f | SIGHASH_ANYONECANPAY)) == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SighashError {
    InputIndexOutOfRange,
    UndefinedType(u32),
}

impl std::fmt::Display for SighashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SighashError::InputIndexOutOfRange => write!(f, "input index out of range"),
            SighashError::UndefinedType(value) => write!(f, "undefined sighash type {value:#x}"),
        }
    }
}

impl std::error::Error for SighashError {}

pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    amount: Amount,
    sighash_type: SighashType,
) -> Result<Hash256, SighashError> {
    let input = tx
        .vin
        .get(input_index)
        .ok_or(SighashError::InputIndexOutOfRange)?;
    if !sighash_type.is_defined() {
        return Err(SighashError::UndefinedType(sighash_type.0));
    }

    let anyone_can_pay = sighash_type.has_anyone_can_pay();
    let base = sighash_type.base_type();

    let hash_prevouts = if anyone_can_pay {
        [0u8; 32]
    } else {
        hash_prevouts(tx)
    };
    let hash_sequence = if anyone_can_pay || base != SIGHASH_ALL {
        [0u8; 32]
    } else {
        hash_sequence(tx)
    };
    let hash_outputs = match base {
        SIGHASH_ALL => hash_outputs(&tx.vout),
        SIGHASH_SINGLE => tx
            .vout
            .get(input_index)
            .map(|output| hash_outputs(std::slice::from_ref(output)))
            .unwrap_or([0u8; 32]),
        _ => [0u8; 32],
    };

    let mut encoder = Encoder::with_capacity(160 + script_code.len());
    encoder.write_i32_le(tx.version);
    encoder.write_u8(tx.tx_type as u8);
    encoder.write_hash_le(&hash_prevouts);
    encoder.write_hash_le(&hash_sequence);
    input.prevout.consensus_encode(&mut encoder);
    encoder.write_var_bytes(script_code);
    encoder.write_i64_le(amount);
    encoder.write_u32_le(input.sequence);
    encoder.write_hash_le(&hash_outputs);
    encoder.write_u32_le(tx.lock_time);
    encoder.write_u32_le(sighash_type.0);

    Ok(sha256d(&encoder.into_inner()))
}

fn hash_prevouts(tx: &Transaction) -> Hash256 {
    let mut encoder = Encoder::with_capacity(tx.vin.len() * 36);
    for input in &tx.vin {
        input.prevout.consensus_encode(&mut encoder);
    }
    sha256d(&encoder.into_inner())
}

fn hash_sequence(tx: &Transaction) -> Hash256 {
    let mut encoder = Encoder::with_capacity(tx.vin.len() * 4);
    for input in &tx.vin {
        encoder.write_u32_le(input.sequence);
    }
    sha256d(&encoder.into_inner())
}

fn hash_outputs(outputs: &[TxOut]) -> Hash256 {
    let mut encoder = Encoder::new();
    for output in outputs {
        output.consensus_encode(&mut encoder);
    }
    sha256d(&encoder.into_inner())
}
