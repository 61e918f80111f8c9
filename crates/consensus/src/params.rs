//! Consensus parameter definitions.

use crate::constants::{DEFAULT_STAKE_MIN_CONFIRMATIONS, DEFAULT_STAKE_TIMESTAMP_MASK};
use crate::Hash256;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Some(Self::Mainnet),
            "testnet" | "test" => Some(Self::Testnet),
            "regtest" => Some(Self::Regtest),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Regtest => "regtest",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConsensusParams {
    pub network: Network,
    pub pow_limit: Hash256,
    pub target_spacing: u32,
    /// Confirmations a coin needs before it can be used as a kernel.
    pub stake_min_confirmations: i32,
    pub stake_timestamp_mask: u32,
    /// Block time from which coinstake-opcode scripts may be staked.
    pub op_is_coinstake_time: u32,
    pub allow_op_is_coinstake_with_p2pkh: bool,
}

impl ConsensusParams {
    pub fn min_stake_confirmations(&self, _height: i32) -> i32 {
        self.stake_min_confirmations
    }

    pub fn stake_timestamp_mask(&self, _height: i32) -> u32 {
        self.stake_timestamp_mask
    }

    pub fn op_is_coinstake_active(&self, time: u32) -> bool {
        time >= self.op_is_coinstake_time
    }
}

#[derive(Debug)]
pub enum HexError {
    InvalidLength,
    InvalidHex,
}

impl std::fmt::Display for HexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HexError::InvalidLength => write!(f, "invalid hex length"),
            HexError::InvalidHex => write!(f, "invalid hex digit"),
        }
    }
}

impl std::error::Error for HexError {}

/// Parses a display-order (big-endian) hex string into an internal little-endian hash.
/// Short inputs are zero-padded on the left.
pub fn hash256_from_hex(input: &str) -> Result<Hash256, HexError> {
    let mut hex = input.trim();
    if let Some(stripped) = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")) {
        hex = stripped;
    }

    if hex.is_empty() || hex.len() > 64 {
        return Err(HexError::InvalidLength);
    }

    let mut padded = String::with_capacity(64);
    for _ in hex.len()..64 {
        padded.push('0');
    }
    padded.push_str(hex);

    let mut bytes = [0u8; 32];
    for (i, byte_out) in bytes.iter_mut().enumerate() {
        let start = i * 2;
        *byte_out = u8::from_str_radix(&padded[start..start + 2], 16)
            .map_err(|_| HexError::InvalidHex)?;
    }
    bytes.reverse();

    Ok(bytes)
}

pub fn consensus_params(network: Network) -> ConsensusParams {
    match network {
        Network::Mainnet => mainnet_consensus_params(),
        Network::Testnet => testnet_consensus_params(),
        Network::Regtest => regtest_consensus_params(),
    }
}

fn mainnet_consensus_params() -> ConsensusParams {
    ConsensusParams {
        network: Network::Mainnet,
        pow_limit: hash256_from_hex(
            "0000ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        )
        .expect("mainnet pow limit"),
        target_spacing: 120,
        stake_min_confirmations: DEFAULT_STAKE_MIN_CONFIRMATIONS,
        stake_timestamp_mask: DEFAULT_STAKE_TIMESTAMP_MASK,
        op_is_coinstake_time: 0x5A04_EC00,
        allow_op_is_coinstake_with_p2pkh: false,
    }
}

fn testnet_consensus_params() -> ConsensusParams {
    ConsensusParams {
        network: Network::Testnet,
        pow_limit: hash256_from_hex(
            "0000ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        )
        .expect("testnet pow limit"),
        target_spacing: 120,
        stake_min_confirmations: DEFAULT_STAKE_MIN_CONFIRMATIONS,
        stake_timestamp_mask: DEFAULT_STAKE_TIMESTAMP_MASK,
        op_is_coinstake_time: 0,
        allow_op_is_coinstake_with_p2pkh: true,
    }
}

fn regtest_consensus_params() -> ConsensusParams {
    ConsensusParams {
        network: Network::Regtest,
        pow_limit: hash256_from_hex(
            "7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        )
        .expect("regtest pow limit"),
        target_spacing: 5,
        stake_min_confirmations: 12,
        stake_timestamp_mask: 0,
        op_is_coinstake_time: 0,
        allow_op_is_coinstake_with_p2pkh: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash256_to_hex(hash: &Hash256) -> String {
        use std::fmt::Write;

        let mut out = String::with_capacity(64);
        for byte in hash.iter().rev() {
            let _ = write!(out, "{:02x}", byte);
        }
        out
    }

    #[test]
    fn mainnet_stake_params() {
        let params = consensus_params(Network::Mainnet);
        assert_eq!(params.stake_min_confirmations, 225);
        assert_eq!(params.stake_timestamp_mask, 0xf);
        assert_eq!(params.target_spacing, 120);
        assert_eq!(params.op_is_coinstake_time, 1_510_272_000);
        assert!(!params.allow_op_is_coinstake_with_p2pkh);
        assert_eq!(
            hash256_to_hex(&params.pow_limit),
            "0000ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
        );
    }

    #[test]
    fn testnet_allows_coinstake_op_with_p2pkh() {
        let params = consensus_params(Network::Testnet);
        assert_eq!(params.stake_min_confirmations, 225);
        assert!(params.allow_op_is_coinstake_with_p2pkh);
        assert!(params.op_is_coinstake_active(0));
    }

    #[test]
    fn regtest_stake_params() {
        let params = consensus_params(Network::Regtest);
        assert_eq!(params.min_stake_confirmations(1_000), 12);
        assert_eq!(params.stake_timestamp_mask(1_000), 0);
        assert_eq!(params.target_spacing, 5);
        assert_eq!(params.pow_limit[31], 0x7f);
        assert_eq!(params.pow_limit[0], 0xff);
    }

    #[test]
    fn coinstake_op_activation_boundary() {
        let params = consensus_params(Network::Mainnet);
        assert!(!params.op_is_coinstake_active(0x5A04_EBFF));
        assert!(params.op_is_coinstake_active(0x5A04_EC00));
    }

    #[test]
    fn network_names_round_trip() {
        for network in [Network::Mainnet, Network::Testnet, Network::Regtest] {
            assert_eq!(Network::parse(network.as_str()), Some(network));
        }
        assert_eq!(Network::parse(" Main "), Some(Network::Mainnet));
        assert_eq!(Network::parse("signet"), None);
    }

    #[test]
    fn hash256_from_hex_pads_and_reverses() {
        let hash = hash256_from_hex("0x01ff").expect("hex");
        assert_eq!(hash[0], 0xff);
        assert_eq!(hash[1], 0x01);
        assert!(hash[2..].iter().all(|b| *b == 0));
        assert!(matches!(
            hash256_from_hex(""),
            Err(HexError::InvalidLength)
        ));
        assert!(matches!(hash256_from_hex("zz"), Err(HexError::InvalidHex)));
    }
}
