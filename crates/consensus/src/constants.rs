//! Consensus-wide constants shared by stake validation.

/// Default coinstake timestamp granularity: block times must be multiples of 16 seconds.
pub const DEFAULT_STAKE_TIMESTAMP_MASK: u32 = (1 << 4) - 1;
/// Default number of confirmations before a coin may be staked.
pub const DEFAULT_STAKE_MIN_CONFIRMATIONS: i32 = 225;
