//! Audit events.
//!
//! Every operation that completes emits exactly one event (initialization
//! emits one per configured field). Events are the off-chain monitoring
//! channel: alerts mark soft rejections, `LatestRateUpdated` marks a commit.

use ethnum::{I256, U256};
use serde::{Deserialize, Serialize};

use crate::{Address, Timestamp};

/// Coarse grouping used for subscription filters and the event log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Owner-driven configuration changes.
    Config,
    /// Soft rejections of an update.
    Alert,
    /// Successful rate commits.
    Rate,
}

impl EventCategory {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Alert => "alert",
            Self::Rate => "rate",
        }
    }

    /// Parse a lowercase category name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "config" => Some(Self::Config),
            "alert" => Some(Self::Alert),
            "rate" => Some(Self::Rate),
            _ => None,
        }
    }
}

/// An event emitted by the rate validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum RateEvent {
    ReserveFeedSet {
        feed: Address,
        timestamp: Timestamp,
    },
    UpdaterSet {
        updater: Address,
        timestamp: Timestamp,
    },
    MaxDifferencePercentSet {
        #[serde(with = "ethnum::serde::decimal")]
        max_difference: U256,
        timestamp: Timestamp,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
        timestamp: Timestamp,
    },
    /// The oracle returned a negative reserve.
    AlertInvalidReserve {
        #[serde(with = "ethnum::serde::decimal")]
        reserve: I256,
        timestamp: Timestamp,
    },
    /// Oracle reserve and caller TVL diverge beyond the threshold.
    AlertInvalidReserveDifference {
        #[serde(with = "ethnum::serde::decimal")]
        reserve: U256,
        #[serde(with = "ethnum::serde::decimal")]
        tvl: U256,
        timestamp: Timestamp,
    },
    /// The computed rate fell outside `[MIN_RATE, MAX_RATE]`.
    AlertInvalidRate {
        #[serde(with = "ethnum::serde::decimal")]
        rate: U256,
        timestamp: Timestamp,
    },
    LatestRateUpdated {
        #[serde(with = "ethnum::serde::decimal")]
        rate: U256,
        timestamp: Timestamp,
    },
}

impl RateEvent {
    /// Event name as it appears in the audit log.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReserveFeedSet { .. } => "ReserveFeedSet",
            Self::UpdaterSet { .. } => "UpdaterSet",
            Self::MaxDifferencePercentSet { .. } => "MaxDifferencePercentSet",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
            Self::AlertInvalidReserve { .. } => "AlertInvalidReserve",
            Self::AlertInvalidReserveDifference { .. } => "AlertInvalidReserveDifference",
            Self::AlertInvalidRate { .. } => "AlertInvalidRate",
            Self::LatestRateUpdated { .. } => "LatestRateUpdated",
        }
    }

    /// When the event was emitted.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Self::ReserveFeedSet { timestamp, .. }
            | Self::UpdaterSet { timestamp, .. }
            | Self::MaxDifferencePercentSet { timestamp, .. }
            | Self::OwnershipTransferred { timestamp, .. }
            | Self::AlertInvalidReserve { timestamp, .. }
            | Self::AlertInvalidReserveDifference { timestamp, .. }
            | Self::AlertInvalidRate { timestamp, .. }
            | Self::LatestRateUpdated { timestamp, .. } => *timestamp,
        }
    }

    pub fn category(&self) -> EventCategory {
        match self {
            Self::ReserveFeedSet { .. }
            | Self::UpdaterSet { .. }
            | Self::MaxDifferencePercentSet { .. }
            | Self::OwnershipTransferred { .. } => EventCategory::Config,
            Self::AlertInvalidReserve { .. }
            | Self::AlertInvalidReserveDifference { .. }
            | Self::AlertInvalidRate { .. } => EventCategory::Alert,
            Self::LatestRateUpdated { .. } => EventCategory::Rate,
        }
    }

    /// Whether this event reports a soft rejection.
    pub fn is_alert(&self) -> bool {
        self.category() == EventCategory::Alert
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let alert = RateEvent::AlertInvalidRate {
            rate: U256::ZERO,
            timestamp: 5,
        };
        assert_eq!(alert.category(), EventCategory::Alert);
        assert!(alert.is_alert());

        let commit = RateEvent::LatestRateUpdated {
            rate: U256::new(1_000_000_000_000_000_000),
            timestamp: 5,
        };
        assert_eq!(commit.category(), EventCategory::Rate);
        assert!(!commit.is_alert());

        let set = RateEvent::UpdaterSet {
            updater: Address::from_low_u8(9),
            timestamp: 5,
        };
        assert_eq!(set.category(), EventCategory::Config);
    }

    #[test]
    fn test_category_names_roundtrip() {
        for cat in [EventCategory::Config, EventCategory::Alert, EventCategory::Rate] {
            assert_eq!(EventCategory::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(EventCategory::parse("system"), None);
    }

    #[test]
    fn test_tagged_json_shape() {
        let event = RateEvent::AlertInvalidReserve {
            reserve: I256::new(-1),
            timestamp: 1_700_000_000,
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["event"], "AlertInvalidReserve");
        assert_eq!(value["reserve"], "-1");
        assert_eq!(value["timestamp"], 1_700_000_000u64);
        assert_eq!(event.name(), "AlertInvalidReserve");
        assert_eq!(event.timestamp(), 1_700_000_000);
    }
}
