//! # rategate-oracle
//!
//! Oracle-validated exchange rate engine.
//!
//! An updater submits `(total_supply, total_tvl)` observations. Each
//! submission is checked against an independent reserve feed and against a
//! fixed band around parity before a new rate is committed. Rejected
//! submissions keep the last good rate and emit an alert event.
//!
//! ## Modules
//!
//! - [`access`]: owner / updater authorization
//! - [`feed`]: reserve feed interface and registry
//! - [`gates`]: the three validation gates as pure functions
//! - [`stub`]: in-process reserve feed for local deployments and tests
//! - [`validator`]: the stateful updater that owns the snapshot

pub mod access;
pub mod feed;
pub mod gates;
pub mod stub;
pub mod validator;

pub use access::Role;
pub use feed::{FeedRegistry, ReserveFeed, RoundData};
pub use gates::GateVerdict;
pub use stub::StubFeed;
pub use validator::{RateValidator, UpdateOutcome};

use rategate_types::{Address, U256};

/// Error types for rate engine operations.
///
/// Every variant is a hard failure: the call is aborted with no state change
/// and no event. Data-quality problems are not errors; they surface as alert
/// events on an `Ok` outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    /// The caller does not hold the role the operation requires.
    #[error("unauthorized: {caller} is not the {role}")]
    Unauthorized {
        /// Identity that attempted the call.
        caller: Address,
        /// Role the operation requires.
        role: Role,
    },

    /// `update_rate` was called with zero total supply.
    #[error("total supply must be non-zero")]
    ZeroTotalSupply,

    /// A configuration setter received the null identity.
    #[error("{field} must not be the zero address")]
    ZeroAddress {
        /// Name of the rejected field.
        field: &'static str,
    },

    /// Max-difference fraction outside `(0, 1e18]`.
    #[error("max difference {0} outside (0, 1e18]")]
    InvalidMaxDifference(U256),

    /// The snapshot has already been initialized.
    #[error("rate snapshot already initialized")]
    AlreadyInitialized,

    /// The configured reserve feed could not be resolved or read.
    #[error("reserve feed {feed} unavailable: {reason}")]
    FeedUnavailable {
        /// Configured feed address.
        feed: Address,
        /// What went wrong.
        reason: String,
    },

    /// 256-bit arithmetic overflowed.
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

/// Convenience result type for rate engine operations.
pub type Result<T> = std::result::Result<T, RateError>;
