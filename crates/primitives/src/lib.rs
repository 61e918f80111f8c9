//! Core block/transaction types and consensus serialization.

pub mod block;
pub mod encoding;
pub mod hash;
pub mod outpoint;
pub mod transaction;

pub use block::{Block, BlockHeader};
pub use encoding::DecodeError;
pub use hash::{hash160, hash256_to_hex, sha256, sha256d};
pub use outpoint::OutPoint;
pub use transaction::{OutputType, Transaction, TxIn, TxOut, TxType};
