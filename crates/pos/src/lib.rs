//! Proof-of-stake kernel validation.
//!
//! A coinstake proves its right to extend the chain when its first input (the
//! kernel) hashes, together with the predecessor's stake modifier, below the
//! difficulty target scaled by the kernel coin's value. [`check_proof_of_stake`]
//! runs the full check; the building blocks are exposed for block connection
//! ([`compute_stake_modifier`]) and local staking ([`search_kernel_time`]).

pub mod chain;
pub mod coinstake;
pub mod depth;
pub mod error;
pub mod kernel;
pub mod modifier;
mod resolve;
pub mod search;
pub mod validation;

pub use chain::{BlockIndexEntry, ChainView, ChainViewError, Coin};
pub use coinstake::verify_coinstake_outputs;
pub use depth::{check_stake_depth, required_depth};
pub use error::{PosError, RejectCategory, TargetFault};
pub use kernel::{check_stake_kernel_hash, kernel_hash, KernelCheck, ProofOfStakeResult};
pub use modifier::{compute_stake_modifier, stake_modifier_kernel};
pub use search::{search_kernel_time, KernelHit};
pub use validation::{
    check_coinstake_timestamp, check_kernel, check_proof_of_stake, ConsensusSnapshot,
};
