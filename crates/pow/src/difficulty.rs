//! Compact target encoding on 256-bit integers.
//!
//! A compact value is `size:8 | sign:1 | mantissa:23`; the target is
//! `mantissa * 256^(size - 3)`.

use primitive_types::U256;
use stakecore_consensus::Hash256;

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactError {
    Negative,
    Overflow,
}

impl std::fmt::Display for CompactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompactError::Negative => write!(f, "compact target is negative"),
            CompactError::Overflow => write!(f, "compact target overflows 256-bit range"),
        }
    }
}

impl std::error::Error for CompactError {}

/// Raw decode result. `negative` is only set for a non-zero mantissa, matching
/// the reference arithmetic, so `0x01800000` decodes to a plain zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedCompact {
    pub value: U256,
    pub negative: bool,
    pub overflow: bool,
}

pub fn decode_compact(bits: u32) -> DecodedCompact {
    let size = bits >> 24;
    let mut word = bits & MANTISSA_MASK;
    let value = if size <= 3 {
        word >>= 8 * (3 - size);
        U256::from(word)
    } else {
        let shift = 8 * (size - 3);
        if shift >= 256 {
            U256::zero()
        } else {
            U256::from(word) << shift
        }
    };
    let negative = word != 0 && (bits & SIGN_BIT) != 0;
    let overflow =
        word != 0 && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));
    DecodedCompact {
        value,
        negative,
        overflow,
    }
}

pub fn compact_to_u256(bits: u32) -> Result<U256, CompactError> {
    let decoded = decode_compact(bits);
    if decoded.negative {
        return Err(CompactError::Negative);
    }
    if decoded.overflow {
        return Err(CompactError::Overflow);
    }
    Ok(decoded.value)
}

pub fn u256_to_compact(value: U256) -> u32 {
    if value.is_zero() {
        return 0;
    }

    let mut size = value.bits().div_ceil(8) as u32;
    let mut compact = if size <= 3 {
        value.low_u32() << (8 * (3 - size))
    } else {
        (value >> (8 * (size - 3))).low_u32()
    };

    if compact & SIGN_BIT != 0 {
        compact >>= 8;
        size += 1;
    }

    (size << 24) | (compact & MANTISSA_MASK)
}

pub fn u256_to_hash(value: U256) -> Hash256 {
    value.to_little_endian()
}

pub fn hash_to_u256(hash: &Hash256) -> U256 {
    U256::from_little_endian(hash)
}

pub fn compact_to_target(bits: u32) -> Result<Hash256, CompactError> {
    compact_to_u256(bits).map(u256_to_hash)
}

pub fn target_to_compact(target: &Hash256) -> u32 {
    u256_to_compact(hash_to_u256(target))
}

/// Both sides are read as little-endian 256-bit integers.
pub fn hash_meets_target(hash: &Hash256, target: &Hash256) -> bool {
    hash_to_u256(hash) <= hash_to_u256(target)
}
