//! Principal and feed identities.
//!
//! An [`Address`] is a 20-byte identity rendered as `0x`-prefixed lowercase
//! hex. The all-zero address is the null identity and is never accepted as a
//! feed, updater or owner.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Length of an address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Errors produced when parsing an [`Address`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The string is not `0x`-prefixed.
    #[error("address must start with 0x")]
    MissingPrefix,

    /// The hex body has the wrong number of digits.
    #[error("address must be {expected} hex digits, got {actual}")]
    InvalidLength {
        /// Expected number of hex digits.
        expected: usize,
        /// Number of hex digits supplied.
        actual: usize,
    },

    /// The hex body contains a non-hex character.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// A 20-byte principal or feed identity.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The null identity.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Build an address whose last byte is `b` and all others zero.
    ///
    /// Handy for fixtures and local configuration.
    pub const fn from_low_u8(b: u8) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[ADDRESS_LEN - 1] = b;
        Self(bytes)
    }

    /// Whether this is the null identity.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .trim()
            .strip_prefix("0x")
            .or_else(|| s.trim().strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        if body.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LEN * 2,
                actual: body.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(body, &mut bytes)
            .map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}
