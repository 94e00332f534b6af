//! In-process reserve feed.
//!
//! Until the reserve feed is wired to a live proof-of-reserve source, a stub
//! feed holds a configured answer. The answer can be changed for development
//! and testing via [`dev_set_answer`](StubFeed::dev_set_answer); each change
//! opens a new round.

use rategate_types::{Timestamp, I256};

use crate::feed::{FeedError, ReserveFeed, RoundData, FEED_DECIMALS};

/// A reserve feed that returns a fixed answer.
#[derive(Debug, Clone)]
pub struct StubFeed {
    answer: I256,
    round_id: u128,
    updated_at: Timestamp,
    decimals: u8,
}

impl StubFeed {
    /// Create a stub feed with a zero answer.
    pub fn new() -> Self {
        Self::with_answer(I256::ZERO)
    }

    /// Create a stub feed reporting `answer` in round 1.
    pub fn with_answer(answer: I256) -> Self {
        Self {
            answer,
            round_id: 1,
            updated_at: 0,
            decimals: FEED_DECIMALS,
        }
    }

    /// Override the reported decimals.
    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    /// The current answer.
    pub fn answer(&self) -> I256 {
        self.answer
    }

    /// Set the answer (development/testing only).
    ///
    /// Advances the round and stamps it with `now`.
    pub fn dev_set_answer(&mut self, answer: I256, now: Timestamp) {
        tracing::warn!(%answer, "stub feed: answer changed (dev only)");
        self.answer = answer;
        self.round_id = self.round_id.saturating_add(1);
        self.updated_at = now;
    }
}

impl Default for StubFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ReserveFeed for StubFeed {
    fn latest_round_data(&self) -> Result<RoundData, FeedError> {
        Ok(RoundData {
            round_id: self.round_id,
            answer: self.answer,
            started_at: self.updated_at,
            updated_at: self.updated_at,
            answered_in_round: self.round_id,
        })
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }
}
