//! The rate validator / updater.
//!
//! [`RateValidator`] owns the [`RateSnapshot`] and is the only code that
//! mutates it. Every operation is all-or-nothing: it either returns `Err`
//! with the snapshot untouched, or returns the single event it emitted.
//!
//! ## Update flow
//!
//! 1. Caller must be the updater.
//! 2. `total_supply` must be non-zero.
//! 3. The configured reserve feed is resolved and read once.
//! 4. [`gates::evaluate`] decides; only an accepted verdict writes the
//!    `last_*` fields.

use rategate_types::{
    Address, RateEvent, RateSnapshot, Timestamp, MAX_DIFFERENCE_CEILING, U256,
};

use crate::access::{authorize, Role};
use crate::feed::{FeedRegistry, RoundData, FEED_DECIMALS};
use crate::gates::{self, GateVerdict};
use crate::{RateError, Result};

/// Result of an `update_rate` call that did not hard-fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The published rate after the call: the new rate on commit, otherwise
    /// the previous `last_rate`.
    pub rate: U256,
    /// What the gates decided.
    pub verdict: GateVerdict,
    /// The single event emitted by the call.
    pub event: RateEvent,
    /// The oracle round that was read.
    pub round: RoundData,
}

impl UpdateOutcome {
    /// Whether the call committed a new snapshot.
    pub fn committed(&self) -> bool {
        self.verdict.is_accepted()
    }
}

/// Stateful validator around a single [`RateSnapshot`].
#[derive(Debug, Clone, Default)]
pub struct RateValidator {
    snapshot: RateSnapshot,
    initialized: bool,
}

impl RateValidator {
    /// An uninitialized validator. Every role check fails until
    /// [`initialize`](Self::initialize) succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a validator from a persisted snapshot.
    pub fn from_snapshot(snapshot: RateSnapshot) -> Self {
        Self {
            snapshot,
            initialized: true,
        }
    }

    /// One-shot initialization.
    ///
    /// Validates every field the way the corresponding setter would and
    /// returns one event per configured field.
    ///
    /// # Errors
    ///
    /// - [`RateError::AlreadyInitialized`] on a second call
    /// - [`RateError::ZeroAddress`] for a zero owner, feed or updater
    /// - [`RateError::InvalidMaxDifference`] for a threshold outside `(0, 1e18]`
    pub fn initialize(
        &mut self,
        owner: Address,
        reserve_feed: Address,
        updater: Address,
        max_difference: U256,
        now: Timestamp,
    ) -> Result<Vec<RateEvent>> {
        if self.initialized {
            return Err(RateError::AlreadyInitialized);
        }
        require_non_zero(&owner, "owner")?;
        require_non_zero(&reserve_feed, "reserve feed")?;
        require_non_zero(&updater, "updater")?;
        validate_max_difference(max_difference)?;

        self.snapshot = RateSnapshot::genesis(owner, reserve_feed, updater, max_difference);
        self.initialized = true;

        tracing::info!(
            %owner,
            %reserve_feed,
            %updater,
            %max_difference,
            "rate snapshot initialized"
        );

        Ok(vec![
            RateEvent::OwnershipTransferred {
                previous_owner: Address::ZERO,
                new_owner: owner,
                timestamp: now,
            },
            RateEvent::ReserveFeedSet {
                feed: reserve_feed,
                timestamp: now,
            },
            RateEvent::UpdaterSet {
                updater,
                timestamp: now,
            },
            RateEvent::MaxDifferencePercentSet {
                max_difference,
                timestamp: now,
            },
        ])
    }

    /// Validate a `(total_supply, total_tvl)` observation and commit it if
    /// every gate passes.
    ///
    /// Soft rejections return `Ok` with the previous rate and an alert event.
    ///
    /// # Errors
    ///
    /// - [`RateError::Unauthorized`] if `caller` is not the updater
    /// - [`RateError::ZeroTotalSupply`] if `total_supply` is zero
    /// - [`RateError::FeedUnavailable`] if the configured feed is unknown,
    ///   unreadable, or not at 18 decimals
    /// - [`RateError::Overflow`] if the fixed-point math overflows
    pub fn update_rate<R>(
        &mut self,
        caller: &Address,
        total_supply: U256,
        total_tvl: U256,
        feeds: &R,
        now: Timestamp,
    ) -> Result<UpdateOutcome>
    where
        R: FeedRegistry + ?Sized,
    {
        authorize(&self.snapshot, caller, Role::Updater)?;
        if total_supply == U256::ZERO {
            return Err(RateError::ZeroTotalSupply);
        }

        let round = self.read_feed(feeds)?;
        let verdict = gates::evaluate(
            round.answer,
            total_supply,
            total_tvl,
            self.snapshot.max_difference,
        )?;

        // Commit timestamps never move backwards, even if the clock does.
        let timestamp = now.max(self.snapshot.last_update_timestamp);
        let event = verdict.to_event(timestamp);

        let rate = match verdict {
            GateVerdict::Accepted { rate } => {
                self.snapshot.last_tvl = total_tvl;
                self.snapshot.last_total_supply = total_supply;
                self.snapshot.last_update_timestamp = timestamp;
                self.snapshot.last_rate = rate;
                tracing::info!(
                    %rate,
                    %total_supply,
                    %total_tvl,
                    round_id = round.round_id,
                    feed_updated_at = round.updated_at,
                    "rate updated"
                );
                rate
            }
            GateVerdict::InvalidReserve { reserve } => {
                tracing::warn!(%reserve, round_id = round.round_id, "rejected: negative reserve");
                self.snapshot.last_rate
            }
            GateVerdict::ExcessiveDifference {
                reserve,
                tvl,
                difference,
            } => {
                tracing::warn!(
                    %reserve,
                    %tvl,
                    %difference,
                    max_difference = %self.snapshot.max_difference,
                    "rejected: reserve difference too large"
                );
                self.snapshot.last_rate
            }
            GateVerdict::RateOutOfBounds { rate } => {
                tracing::warn!(%rate, %total_supply, %total_tvl, "rejected: rate out of bounds");
                self.snapshot.last_rate
            }
        };

        Ok(UpdateOutcome {
            rate,
            verdict,
            event,
            round,
        })
    }

    /// Point the validator at a different reserve feed.
    pub fn set_reserve_feed(
        &mut self,
        caller: &Address,
        feed: Address,
        now: Timestamp,
    ) -> Result<RateEvent> {
        authorize(&self.snapshot, caller, Role::Owner)?;
        require_non_zero(&feed, "reserve feed")?;
        self.snapshot.reserve_feed = feed;
        tracing::info!(%feed, "reserve feed set");
        Ok(RateEvent::ReserveFeedSet {
            feed,
            timestamp: now,
        })
    }

    /// Replace the updater principal.
    pub fn set_updater(
        &mut self,
        caller: &Address,
        updater: Address,
        now: Timestamp,
    ) -> Result<RateEvent> {
        authorize(&self.snapshot, caller, Role::Owner)?;
        require_non_zero(&updater, "updater")?;
        self.snapshot.updater = updater;
        tracing::info!(%updater, "updater set");
        Ok(RateEvent::UpdaterSet {
            updater,
            timestamp: now,
        })
    }

    /// Change the divergence threshold. Must be in `(0, 1e18]`.
    pub fn set_max_difference_percent(
        &mut self,
        caller: &Address,
        max_difference: U256,
        now: Timestamp,
    ) -> Result<RateEvent> {
        authorize(&self.snapshot, caller, Role::Owner)?;
        validate_max_difference(max_difference)?;
        self.snapshot.max_difference = max_difference;
        tracing::info!(%max_difference, "max difference set");
        Ok(RateEvent::MaxDifferencePercentSet {
            max_difference,
            timestamp: now,
        })
    }

    /// Hand the owner role to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
        now: Timestamp,
    ) -> Result<RateEvent> {
        authorize(&self.snapshot, caller, Role::Owner)?;
        require_non_zero(&new_owner, "new owner")?;
        let previous_owner = self.snapshot.owner;
        self.snapshot.owner = new_owner;
        tracing::info!(%previous_owner, %new_owner, "ownership transferred");
        Ok(RateEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
            timestamp: now,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The full snapshot.
    pub fn snapshot(&self) -> &RateSnapshot {
        &self.snapshot
    }

    pub fn owner(&self) -> Address {
        self.snapshot.owner
    }

    pub fn reserve_feed(&self) -> Address {
        self.snapshot.reserve_feed
    }

    pub fn updater(&self) -> Address {
        self.snapshot.updater
    }

    pub fn max_difference(&self) -> U256 {
        self.snapshot.max_difference
    }

    pub fn last_total_supply(&self) -> U256 {
        self.snapshot.last_total_supply
    }

    pub fn last_tvl(&self) -> U256 {
        self.snapshot.last_tvl
    }

    pub fn last_update_timestamp(&self) -> Timestamp {
        self.snapshot.last_update_timestamp
    }

    /// The published rate, scale 1e18. Zero until the first commit.
    pub fn last_rate(&self) -> U256 {
        self.snapshot.last_rate
    }

    fn read_feed<R>(&self, feeds: &R) -> Result<RoundData>
    where
        R: FeedRegistry + ?Sized,
    {
        let address = self.snapshot.reserve_feed;
        let feed = feeds.resolve(&address).ok_or_else(|| RateError::FeedUnavailable {
            feed: address,
            reason: "not registered".to_string(),
        })?;
        if feed.decimals() != FEED_DECIMALS {
            return Err(RateError::FeedUnavailable {
                feed: address,
                reason: format!("reports {} decimals, expected {FEED_DECIMALS}", feed.decimals()),
            });
        }
        feed.latest_round_data()
            .map_err(|e| RateError::FeedUnavailable {
                feed: address,
                reason: e.to_string(),
            })
    }
}

fn require_non_zero(address: &Address, field: &'static str) -> Result<()> {
    if address.is_zero() {
        return Err(RateError::ZeroAddress { field });
    }
    Ok(())
}

fn validate_max_difference(value: U256) -> Result<()> {
    if value == U256::ZERO || value > MAX_DIFFERENCE_CEILING {
        return Err(RateError::InvalidMaxDifference(value));
    }
    Ok(())
}
