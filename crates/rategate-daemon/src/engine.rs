//! Serialized, persistent wrapper around the rate validator.
//!
//! Every mutating call runs against a clone of the validator. The clone's
//! snapshot and the emitted events are written to the store in one
//! transaction; only after that succeeds does the clone replace the live
//! validator. A failure at any step leaves both memory and disk unchanged.

use std::collections::BTreeMap;

use rategate_db::DbError;
use rategate_oracle::{RateError, RateValidator, StubFeed, UpdateOutcome};
use rategate_types::{Address, RateEvent, Timestamp, I256, U256};
use rusqlite::Connection;
use tracing::info;

use crate::config::DaemonConfig;

/// Errors from an engine operation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The validator rejected the call.
    #[error(transparent)]
    Rate(#[from] RateError),

    /// The store failed.
    #[error("store error: {0}")]
    Db(#[from] DbError),

    /// The named stub feed is not registered.
    #[error("unknown feed {0}")]
    UnknownFeed(Address),

    /// The store is empty and no genesis configuration was provided.
    #[error("store is not initialized and no [genesis] section is configured")]
    MissingGenesis,

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Validator, feeds and store, owned together.
pub struct Engine {
    conn: Connection,
    validator: RateValidator,
    feeds: BTreeMap<Address, StubFeed>,
}

impl Engine {
    /// Load the snapshot from `conn`, initializing it from `config.genesis`
    /// when the store is empty, and register the configured feeds.
    pub fn open(mut conn: Connection, config: &DaemonConfig, now: Timestamp) -> Result<Self> {
        let validator = match rategate_db::queries::snapshot::load(&conn)? {
            Some(snapshot) => {
                info!(rate = %snapshot.last_rate, "loaded rate snapshot");
                RateValidator::from_snapshot(snapshot)
            }
            None => {
                let genesis = config.genesis.as_ref().ok_or(EngineError::MissingGenesis)?;
                let max_difference = genesis
                    .max_difference()
                    .map_err(|e| EngineError::Config(e.to_string()))?;
                let mut validator = RateValidator::new();
                let events = validator.initialize(
                    genesis.owner,
                    genesis.reserve_feed,
                    genesis.updater,
                    max_difference,
                    now,
                )?;
                rategate_db::initialize(&mut conn, validator.snapshot(), &events, now)?;
                validator
            }
        };

        let mut feeds = BTreeMap::new();
        for feed in &config.feeds {
            let answer = feed
                .answer()
                .map_err(|e| EngineError::Config(e.to_string()))?;
            feeds.insert(
                feed.address,
                StubFeed::with_answer(answer).with_decimals(feed.decimals),
            );
        }
        for (address, answer, updated_at) in rategate_db::queries::feeds::overrides(&conn)? {
            if let Some(feed) = feeds.get_mut(&address) {
                feed.dev_set_answer(answer, updated_at);
            }
        }
        info!(feeds = feeds.len(), "reserve feeds registered");

        Ok(Self {
            conn,
            validator,
            feeds,
        })
    }

    /// Current validator state.
    pub fn validator(&self) -> &RateValidator {
        &self.validator
    }

    /// The store connection, for read-only queries.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn update_rate(
        &mut self,
        caller: &Address,
        total_supply: U256,
        total_tvl: U256,
        now: Timestamp,
    ) -> Result<UpdateOutcome> {
        let mut next = self.validator.clone();
        let outcome = next.update_rate(caller, total_supply, total_tvl, &self.feeds, now)?;
        self.commit(next, std::slice::from_ref(&outcome.event))?;
        Ok(outcome)
    }

    pub fn set_reserve_feed(&mut self, caller: &Address, feed: Address, now: Timestamp) -> Result<RateEvent> {
        self.apply(|v| v.set_reserve_feed(caller, feed, now))
    }

    pub fn set_updater(&mut self, caller: &Address, updater: Address, now: Timestamp) -> Result<RateEvent> {
        self.apply(|v| v.set_updater(caller, updater, now))
    }

    pub fn set_max_difference_percent(
        &mut self,
        caller: &Address,
        max_difference: U256,
        now: Timestamp,
    ) -> Result<RateEvent> {
        self.apply(|v| v.set_max_difference_percent(caller, max_difference, now))
    }

    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
        now: Timestamp,
    ) -> Result<RateEvent> {
        self.apply(|v| v.transfer_ownership(caller, new_owner, now))
    }

    /// Change a stub feed's answer and persist the override.
    pub fn dev_set_reserve(&mut self, feed: &Address, answer: I256, now: Timestamp) -> Result<()> {
        let stub = self
            .feeds
            .get_mut(feed)
            .ok_or(EngineError::UnknownFeed(*feed))?;
        rategate_db::queries::feeds::set_override(&self.conn, feed, answer, now)?;
        stub.dev_set_answer(answer, now);
        Ok(())
    }

    /// Registered feed addresses with their current answers.
    pub fn feeds(&self) -> impl Iterator<Item = (&Address, &StubFeed)> {
        self.feeds.iter()
    }

    fn apply<F>(&mut self, op: F) -> Result<RateEvent>
    where
        F: FnOnce(&mut RateValidator) -> rategate_oracle::Result<RateEvent>,
    {
        let mut next = self.validator.clone();
        let event = op(&mut next)?;
        self.commit(next, std::slice::from_ref(&event))?;
        Ok(event)
    }

    fn commit(&mut self, next: RateValidator, events: &[RateEvent]) -> Result<()> {
        rategate_db::commit(&mut self.conn, next.snapshot(), events)?;
        self.validator = next;
        Ok(())
    }
}
