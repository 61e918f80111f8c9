//! Consensus constants, per-network parameters, and monetary rules.

pub mod constants;
pub mod money;
pub mod params;

pub use money::{money_range, Amount, COIN, MAX_MONEY};
pub use params::{consensus_params, hash256_from_hex, ConsensusParams, HexError, Network};

pub type Hash256 = [u8; 32];
