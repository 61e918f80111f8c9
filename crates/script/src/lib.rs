//! Script classification, signature hashing and input verification.

mod secp;
pub mod sighash;
pub mod standard;
pub mod verify;

pub use sighash::{signature_hash, SighashType, SIGHASH_ALL};
pub use standard::{classify_script_pubkey, has_is_coinstake_op, split_coinstake_script, ScriptType};
pub use verify::{ScriptError, ScriptVerifier, StandardScriptVerifier};
