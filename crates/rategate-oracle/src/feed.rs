//! Reserve feed interface.
//!
//! A reserve feed reports an independent measurement of the reserve backing
//! the share token, as a signed integer at 18 decimals plus round metadata.
//! The validator reads exactly one round per update and has no fallback
//! source.

use std::collections::{BTreeMap, HashMap};

use rategate_types::{Address, Timestamp, I256};
use serde::{Deserialize, Serialize};

/// Decimals every reserve feed must report in.
pub const FEED_DECIMALS: u8 = 18;

/// One round of reserve data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    /// Identifier of the round.
    pub round_id: u128,
    /// Reported reserve. Negative values mean the feed is unusable.
    pub answer: I256,
    /// When the round started.
    pub started_at: Timestamp,
    /// When the answer was last written.
    pub updated_at: Timestamp,
    /// Round in which the answer was computed.
    pub answered_in_round: u128,
}

/// Errors a feed may report when asked for its latest round.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    /// The feed could not be reached.
    #[error("feed unreachable: {0}")]
    Unreachable(String),
}

/// Source of reserve readings.
pub trait ReserveFeed {
    /// The most recent round.
    fn latest_round_data(&self) -> std::result::Result<RoundData, FeedError>;

    /// Decimals of `answer`.
    fn decimals(&self) -> u8 {
        FEED_DECIMALS
    }
}

/// Lookup from feed address to feed.
///
/// The validator resolves the snapshot's configured feed address through a
/// registry on every update, so changing the feed address switches the
/// source without touching the validator.
pub trait FeedRegistry {
    /// The feed registered at `address`, if any.
    fn resolve(&self, address: &Address) -> Option<&dyn ReserveFeed>;
}

impl<F: ReserveFeed> FeedRegistry for HashMap<Address, F> {
    fn resolve(&self, address: &Address) -> Option<&dyn ReserveFeed> {
        self.get(address).map(|f| f as &dyn ReserveFeed)
    }
}

impl<F: ReserveFeed> FeedRegistry for BTreeMap<Address, F> {
    fn resolve(&self, address: &Address) -> Option<&dyn ReserveFeed> {
        self.get(address).map(|f| f as &dyn ReserveFeed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StubFeed;

    #[test]
    fn test_hashmap_registry_resolves() {
        let mut feeds = HashMap::new();
        feeds.insert(Address::from_low_u8(5), StubFeed::with_answer(I256::new(7)));

        let feed = feeds.resolve(&Address::from_low_u8(5)).expect("registered");
        let round = feed.latest_round_data().expect("round");
        assert_eq!(round.answer, I256::new(7));
        assert_eq!(feed.decimals(), FEED_DECIMALS);

        assert!(feeds.resolve(&Address::from_low_u8(6)).is_none());
    }

    #[test]
    fn test_btreemap_registry_resolves() {
        let mut feeds = BTreeMap::new();
        feeds.insert(Address::from_low_u8(1), StubFeed::with_answer(I256::new(-3)));
        let round = feeds
            .resolve(&Address::from_low_u8(1))
            .expect("registered")
            .latest_round_data()
            .expect("round");
        assert!(round.answer.is_negative());
    }
}
