//! # rategate-types
//!
//! Shared domain types used across the rategate workspace: principal
//! addresses, the persisted rate snapshot, audit events, and the fixed-point
//! constants that form the wire-level contract with downstream consumers.

pub mod address;
pub mod events;
pub mod snapshot;

pub use address::{Address, AddressError};
pub use ethnum::{I256, U256};
pub use events::{EventCategory, RateEvent};
pub use snapshot::RateSnapshot;

/// Unix timestamp in whole seconds.
pub type Timestamp = u64;

/// Fixed-point scale shared by rates, reserves and the divergence threshold (1e18).
pub const RATE_PRECISION_FACTOR: U256 = U256::new(1_000_000_000_000_000_000);

/// Lowest publishable rate (0.985e18, parity minus 1.5%).
pub const MIN_RATE: U256 = U256::new(985_000_000_000_000_000);

/// Highest publishable rate (1.015e18, parity plus 1.5%).
pub const MAX_RATE: U256 = U256::new(1_015_000_000_000_000_000);

/// Upper bound (inclusive) for the max-difference fraction: 100%.
pub const MAX_DIFFERENCE_CEILING: U256 = RATE_PRECISION_FACTOR;

/// Parse a base-10 string into a [`U256`].
///
/// Surrounding whitespace is ignored; signs, prefixes and separators are not
/// accepted.
pub fn parse_u256(value: &str) -> Result<U256, std::num::ParseIntError> {
    U256::from_str_radix(value.trim(), 10)
}

/// Parse a base-10 string, optionally negative, into an [`I256`].
pub fn parse_i256(value: &str) -> Result<I256, std::num::ParseIntError> {
    I256::from_str_radix(value.trim(), 10)
}
