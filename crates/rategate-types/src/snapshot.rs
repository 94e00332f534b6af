//! The persisted rate snapshot.

use ethnum::U256;
use serde::{Deserialize, Serialize};

use crate::{Address, Timestamp};

/// The single mutable record behind a deployment.
///
/// Configuration fields (`owner`, `reserve_feed`, `updater`,
/// `max_difference`) are changed by owner-only setters. The `last_*` fields
/// move together and only when an update passes every gate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Principal allowed to change configuration.
    pub owner: Address,
    /// Oracle source currently trusted.
    pub reserve_feed: Address,
    /// Sole principal allowed to submit updates.
    pub updater: Address,
    /// Maximum tolerated relative divergence, scale 1e18, in `(0, 1e18]`.
    #[serde(with = "ethnum::serde::decimal")]
    pub max_difference: U256,
    /// Time of the last successful commit.
    pub last_update_timestamp: Timestamp,
    /// Supply from the last successful commit.
    #[serde(with = "ethnum::serde::decimal")]
    pub last_total_supply: U256,
    /// TVL from the last successful commit.
    #[serde(with = "ethnum::serde::decimal")]
    pub last_tvl: U256,
    /// Last committed rate, scale 1e18. Zero before the first commit.
    #[serde(with = "ethnum::serde::decimal")]
    pub last_rate: U256,
}

impl RateSnapshot {
    /// A freshly initialized snapshot: configuration set, numeric state zero.
    pub fn genesis(
        owner: Address,
        reserve_feed: Address,
        updater: Address,
        max_difference: U256,
    ) -> Self {
        Self {
            owner,
            reserve_feed,
            updater,
            max_difference,
            ..Self::default()
        }
    }
}
