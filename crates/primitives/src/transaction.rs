//! Transactions with typed outputs.
//!
//! Layout of the full serialization:
//! `version i32 | tx_type u8 | flags u8 | vin | vout | lock_time u32 | [witness]`.
//! The txid commits to everything except the witness stacks.

use stakecore_consensus::{Amount, Hash256};

use crate::encoding::{decode, Decodable, DecodeError, Decoder, Encodable, Encoder};
use crate::hash::sha256d;
use crate::outpoint::OutPoint;

pub const CURRENT_VERSION: i32 = 2;

const FLAG_WITNESS: u8 = 0x01;
const PUBKEY_SIZE: usize = 33;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TxType {
    Standard = 0,
    Coinbase = 1,
    Coinstake = 2,
}

impl TxType {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Standard),
            1 => Some(Self::Coinbase),
            2 => Some(Self::Coinstake),
            _ => None,
        }
    }
}

/// Wire codes for output kinds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OutputType {
    Standard = 1,
    Ct = 2,
    RingCt = 3,
    Data = 4,
}

impl OutputType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Standard),
            2 => Some(Self::Ct),
            3 => Some(Self::RingCt),
            4 => Some(Self::Data),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    pub witness: Vec<Vec<u8>>,
}

impl TxIn {
    pub fn new(prevout: OutPoint) -> Self {
        Self {
            prevout,
            script_sig: Vec::new(),
            sequence: u32::MAX,
            witness: Vec::new(),
        }
    }
}

impl Encodable for TxIn {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        self.prevout.consensus_encode(encoder);
        encoder.write_var_bytes(&self.script_sig);
        encoder.write_u32_le(self.sequence);
    }
}

impl Decodable for TxIn {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let prevout = OutPoint::consensus_decode(decoder)?;
        let script_sig = decoder.read_var_bytes()?;
        let sequence = decoder.read_u32_le()?;
        Ok(Self {
            prevout,
            script_sig,
            sequence,
            witness: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TxOut {
    /// Plain value locked to a script.
    Standard { value: Amount, script_pubkey: Vec<u8> },
    /// Confidential output: hidden value behind a Pedersen commitment.
    Ct {
        commitment: [u8; PUBKEY_SIZE],
        script_pubkey: Vec<u8>,
        range_proof: Vec<u8>,
    },
    /// Ring-signature output: one-time key and commitment.
    RingCt {
        pubkey: [u8; PUBKEY_SIZE],
        commitment: [u8; PUBKEY_SIZE],
        range_proof: Vec<u8>,
    },
    /// Unspendable data carrier.
    Data { data: Vec<u8> },
}

impl TxOut {
    pub fn standard(value: Amount, script_pubkey: Vec<u8>) -> Self {
        Self::Standard {
            value,
            script_pubkey,
        }
    }

    pub fn output_type(&self) -> OutputType {
        match self {
            Self::Standard { .. } => OutputType::Standard,
            Self::Ct { .. } => OutputType::Ct,
            Self::RingCt { .. } => OutputType::RingCt,
            Self::Data { .. } => OutputType::Data,
        }
    }

    pub fn value(&self) -> Option<Amount> {
        match self {
            Self::Standard { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn script_pubkey(&self) -> Option<&[u8]> {
        match self {
            Self::Standard { script_pubkey, .. } | Self::Ct { script_pubkey, .. } => {
                Some(script_pubkey)
            }
            _ => None,
        }
    }
}

impl Encodable for TxOut {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_u8(self.output_type().as_u8());
        match self {
            Self::Standard {
                value,
                script_pubkey,
            } => {
                encoder.write_i64_le(*value);
                encoder.write_var_bytes(script_pubkey);
            }
            Self::Ct {
                commitment,
                script_pubkey,
                range_proof,
            } => {
                encoder.write_bytes(commitment);
                encoder.write_var_bytes(script_pubkey);
                encoder.write_var_bytes(range_proof);
            }
            Self::RingCt {
                pubkey,
                commitment,
                range_proof,
            } => {
                encoder.write_bytes(pubkey);
                encoder.write_bytes(commitment);
                encoder.write_var_bytes(range_proof);
            }
            Self::Data { data } => encoder.write_var_bytes(data),
        }
    }
}

impl Decodable for TxOut {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let output_type = OutputType::from_u8(decoder.read_u8()?)
            .ok_or(DecodeError::InvalidData("unknown output type"))?;
        Ok(match output_type {
            OutputType::Standard => Self::Standard {
                value: decoder.read_i64_le()?,
                script_pubkey: decoder.read_var_bytes()?,
            },
            OutputType::Ct => Self::Ct {
                commitment: decoder.read_fixed()?,
                script_pubkey: decoder.read_var_bytes()?,
                range_proof: decoder.read_var_bytes()?,
            },
            OutputType::RingCt => Self::RingCt {
                pubkey: decoder.read_fixed()?,
                commitment: decoder.read_fixed()?,
                range_proof: decoder.read_var_bytes()?,
            },
            OutputType::Data => Self::Data {
                data: decoder.read_var_bytes()?,
            },
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    pub version: i32,
    pub tx_type: TxType,
    pub vin: Vec<TxIn>,
    pub vout: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new(tx_type: TxType) -> Self {
        Self {
            version: CURRENT_VERSION,
            tx_type,
            vin: Vec::new(),
            vout: Vec::new(),
            lock_time: 0,
        }
    }

    pub fn is_coin_base(&self) -> bool {
        self.tx_type == TxType::Coinbase
    }

    /// A coinstake spends at least one real prevout; its first input is the kernel.
    pub fn is_coin_stake(&self) -> bool {
        self.tx_type == TxType::Coinstake
            && self
                .vin
                .first()
                .is_some_and(|input| !input.prevout.is_null())
    }

    pub fn has_witness(&self) -> bool {
        self.vin.iter().any(|input| !input.witness.is_empty())
    }

    /// Sum of the explicit values of standard outputs.
    pub fn standard_value_out(&self) -> Option<Amount> {
        self.vout
            .iter()
            .filter_map(TxOut::value)
            .try_fold(0i64, |acc, value| acc.checked_add(value))
    }

    pub fn consensus_encode(&self) -> Vec<u8> {
        self.encode_with_witness(true)
    }

    pub fn txid(&self) -> Hash256 {
        sha256d(&self.encode_with_witness(false))
    }

    fn encode_with_witness(&self, include_witness: bool) -> Vec<u8> {
        let witness = include_witness && self.has_witness();
        let mut encoder = Encoder::with_capacity(64 + self.vin.len() * 48);
        encoder.write_i32_le(self.version);
        encoder.write_u8(self.tx_type as u8);
        encoder.write_u8(if witness { FLAG_WITNESS } else { 0 });
        encoder.write_varint(self.vin.len() as u64);
        for input in &self.vin {
            input.consensus_encode(&mut encoder);
        }
        encoder.write_varint(self.vout.len() as u64);
        for output in &self.vout {
            output.consensus_encode(&mut encoder);
        }
        encoder.write_u32_le(self.lock_time);
        if witness {
            for input in &self.vin {
                encoder.write_varint(input.witness.len() as u64);
                for item in &input.witness {
                    encoder.write_var_bytes(item);
                }
            }
        }
        encoder.into_inner()
    }

    pub fn consensus_decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        decode(bytes)
    }
}

impl Decodable for Transaction {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let version = decoder.read_i32_le()?;
        let tx_type = TxType::from_u8(decoder.read_u8()?)
            .ok_or(DecodeError::InvalidData("unknown transaction type"))?;
        let flags = decoder.read_u8()?;
        if flags & !FLAG_WITNESS != 0 {
            return Err(DecodeError::InvalidData("unknown transaction flags"));
        }

        let vin_len = decoder.read_varint()? as usize;
        let mut vin = Vec::with_capacity(vin_len.min(1024));
        for _ in 0..vin_len {
            vin.push(TxIn::consensus_decode(decoder)?);
        }
        let vout_len = decoder.read_varint()? as usize;
        let mut vout = Vec::with_capacity(vout_len.min(1024));
        for _ in 0..vout_len {
            vout.push(TxOut::consensus_decode(decoder)?);
        }
        let lock_time = decoder.read_u32_le()?;

        if flags & FLAG_WITNESS != 0 {
            for input in vin.iter_mut() {
                let items = decoder.read_varint()? as usize;
                let mut stack = Vec::with_capacity(items.min(64));
                for _ in 0..items {
                    stack.push(decoder.read_var_bytes()?);
                }
                input.witness = stack;
            }
            if vin.iter().all(|input| input.witness.is_empty()) {
                return Err(DecodeError::InvalidData("empty witness with witness flag"));
            }
        }

        Ok(Self {
            version,
            tx_type,
            vin,
            vout,
            lock_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_coinstake() -> Transaction {
        let mut tx = Transaction::new(TxType::Coinstake);
        let mut input = TxIn::new(OutPoint::new([0x11; 32], 1));
        input.witness = vec![vec![0x30; 71], vec![0x02; 33]];
        tx.vin.push(input);
        tx.vout.push(TxOut::Data {
            data: vec![0x01, 0x02],
        });
        tx.vout.push(TxOut::standard(12_000, vec![0x76, 0xa9]));
        tx
    }

    #[test]
    fn witness_does_not_change_txid() {
        let tx = sample_coinstake();
        let mut stripped = tx.clone();
        stripped.vin[0].witness.clear();
        assert_eq!(tx.txid(), stripped.txid());
        assert_ne!(tx.consensus_encode(), stripped.consensus_encode());
    }

    #[test]
    fn decode_restores_witness_and_outputs() {
        let tx = sample_coinstake();
        let decoded = Transaction::consensus_decode(&tx.consensus_encode()).expect("decode");
        assert_eq!(decoded, tx);
        assert_eq!(decoded.vout[0].output_type(), OutputType::Data);
        assert_eq!(decoded.standard_value_out(), Some(12_000));
    }

    #[test]
    fn coinstake_requires_real_first_prevout() {
        let mut tx = sample_coinstake();
        assert!(tx.is_coin_stake());
        tx.vin[0].prevout = OutPoint::null();
        assert!(!tx.is_coin_stake());
        tx.vin.clear();
        assert!(!tx.is_coin_stake());
        let mut standard = sample_coinstake();
        standard.tx_type = TxType::Standard;
        assert!(!standard.is_coin_stake());
    }

    #[test]
    fn rejects_unknown_output_type() {
        let mut bytes = Transaction::new(TxType::Standard).consensus_encode();
        // vout count sits right before lock_time
        let vout_pos = bytes.len() - 5;
        bytes[vout_pos] = 1;
        bytes.splice(vout_pos + 1..vout_pos + 1, [9u8]);
        assert_eq!(
            Transaction::consensus_decode(&bytes),
            Err(DecodeError::InvalidData("unknown output type"))
        );
    }
}
