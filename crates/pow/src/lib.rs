//! Compact difficulty targets.

pub mod difficulty;

pub use difficulty::{
    compact_to_target, compact_to_u256, decode_compact, hash_meets_target, hash_to_u256,
    target_to_compact, u256_to_compact, u256_to_hash, CompactError, DecodedCompact,
};
