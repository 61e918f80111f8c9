//! Chain state: block index, unspent coins and the transaction index, exposed
//! to stake validation through [`ChainSnapshot`].

pub mod index;
pub mod state;
pub mod txindex;
pub mod utxo;

pub use state::{ChainSnapshot, ChainState, ChainStateError};
