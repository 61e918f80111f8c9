//! Unspent coin set backed by the storage trait.

use stakecore_pos::Coin;
use stakecore_primitives::encoding::{DecodeError, Decoder, Encoder};
use stakecore_primitives::outpoint::OutPoint;
use stakecore_primitives::transaction::{OutputType, TxOut};
use stakecore_storage::{Column, KeyValueStore, StoreError, WriteBatch};

pub const OUTPOINT_KEY_LEN: usize = 36;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct OutPointKey([u8; OUTPOINT_KEY_LEN]);

impl OutPointKey {
    pub fn new(outpoint: &OutPoint) -> Self {
        let mut bytes = [0u8; OUTPOINT_KEY_LEN];
        bytes[..32].copy_from_slice(&outpoint.hash);
        bytes[32..].copy_from_slice(&outpoint.index.to_le_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

/// Unspent coin created by `output` at `height`. Data outputs are unspendable
/// and never enter the set; confidential outputs keep no explicit value.
pub fn coin_from_output(output: &TxOut, height: i32) -> Option<Coin> {
    let (value, script_pubkey) = match output {
        TxOut::Standard {
            value,
            script_pubkey,
        } => (*value, script_pubkey.clone()),
        TxOut::Ct { script_pubkey, .. } => (0, script_pubkey.clone()),
        TxOut::RingCt { .. } => (0, Vec::new()),
        TxOut::Data { .. } => return None,
    };
    Some(Coin {
        value,
        script_pubkey,
        output_type: output.output_type(),
        height,
        spent: false,
    })
}

/// Spent coins are deleted rather than flagged, so the flag is not stored.
pub fn encode_coin(coin: &Coin) -> Vec<u8> {
    let mut encoder = Encoder::with_capacity(14 + coin.script_pubkey.len());
    encoder.write_i64_le(coin.value);
    encoder.write_u8(coin.output_type.as_u8());
    encoder.write_i32_le(coin.height);
    encoder.write_var_bytes(&coin.script_pubkey);
    encoder.into_inner()
}

pub fn decode_coin(bytes: &[u8]) -> Result<Coin, DecodeError> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.read_i64_le()?;
    let output_type = OutputType::from_u8(decoder.read_u8()?)
        .ok_or(DecodeError::InvalidData("unknown output type"))?;
    let height = decoder.read_i32_le()?;
    let script_pubkey = decoder.read_var_bytes()?;
    if !decoder.is_empty() {
        return Err(DecodeError::TrailingBytes);
    }
    Ok(Coin {
        value,
        script_pubkey,
        output_type,
        height,
        spent: false,
    })
}

pub struct UtxoSet<S> {
    store: S,
}

impl<S> UtxoSet<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore> UtxoSet<S> {
    pub fn get(&self, outpoint: &OutPoint) -> Result<Option<Coin>, StoreError> {
        let key = OutPointKey::new(outpoint);
        match self.store.get(Column::Utxo, key.as_bytes())? {
            Some(bytes) => Ok(Some(
                decode_coin(&bytes).map_err(|err| StoreError::Backend(err.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    pub fn put(&self, batch: &mut WriteBatch, outpoint: &OutPoint, coin: &Coin) {
        let key = OutPointKey::new(outpoint);
        batch.put(Column::Utxo, key.as_bytes(), encode_coin(coin));
    }

    pub fn delete(&self, batch: &mut WriteBatch, outpoint: &OutPoint) {
        let key = OutPointKey::new(outpoint);
        batch.delete(Column::Utxo, key.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_roundtrip_and_type_check() {
        let coin = Coin {
            value: 12_345,
            script_pubkey: vec![0x76, 0xa9, 0x14],
            output_type: OutputType::Standard,
            height: 77,
            spent: false,
        };
        let mut encoded = encode_coin(&coin);
        assert_eq!(decode_coin(&encoded), Ok(coin));

        encoded[8] = 9;
        assert_eq!(
            decode_coin(&encoded),
            Err(DecodeError::InvalidData("unknown output type"))
        );
    }

    #[test]
    fn outputs_map_to_coins() {
        let standard = TxOut::standard(50, vec![0x51]);
        let coin = coin_from_output(&standard, 3).expect("standard coin");
        assert_eq!(coin.value, 50);
        assert_eq!(coin.output_type, OutputType::Standard);

        let ct = TxOut::Ct {
            commitment: [0x08; 33],
            script_pubkey: vec![0x52],
            range_proof: Vec::new(),
        };
        let coin = coin_from_output(&ct, 3).expect("ct coin");
        assert_eq!((coin.value, coin.output_type), (0, OutputType::Ct));

        assert_eq!(coin_from_output(&TxOut::Data { data: vec![1] }, 3), None);
    }

    #[test]
    fn outpoint_key_layout() {
        let key = OutPointKey::new(&OutPoint::new([0xaa; 32], 0x0102_0304));
        assert_eq!(&key.as_bytes()[..32], &[0xaa; 32]);
        assert_eq!(&key.as_bytes()[32..], &[0x04, 0x03, 0x02, 0x01]);
    }
}
