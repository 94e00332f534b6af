//! Rate snapshot query functions.

use rategate_types::{parse_u256, Address, RateSnapshot, Timestamp, U256};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::{DbError, Result};

/// Load the snapshot, or `None` before initialization.
pub fn load(conn: &Connection) -> Result<Option<RateSnapshot>> {
    let raw = conn
        .query_row(
            "SELECT owner, reserve_feed, updater, max_difference, last_update_timestamp,
                    last_total_supply, last_tvl, last_rate
             FROM rate_state WHERE id = 1",
            [],
            RawSnapshot::from_row,
        )
        .optional()?;
    raw.map(RawSnapshot::decode).transpose()
}

/// Insert the snapshot row. Fails if one already exists.
pub fn insert(conn: &Connection, snapshot: &RateSnapshot, initialized_at: Timestamp) -> Result<()> {
    let exists: i64 = conn.query_row("SELECT COUNT(*) FROM rate_state", [], |row| row.get(0))?;
    if exists > 0 {
        return Err(DbError::AlreadyInitialized);
    }
    conn.execute(
        "INSERT INTO rate_state (id, owner, reserve_feed, updater, max_difference,
                                 last_update_timestamp, last_total_supply, last_tvl, last_rate,
                                 initialized_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            snapshot.owner.to_string(),
            snapshot.reserve_feed.to_string(),
            snapshot.updater.to_string(),
            snapshot.max_difference.to_string(),
            snapshot.last_update_timestamp as i64,
            snapshot.last_total_supply.to_string(),
            snapshot.last_tvl.to_string(),
            snapshot.last_rate.to_string(),
            initialized_at as i64,
        ],
    )?;
    Ok(())
}

/// Overwrite the snapshot row.
pub fn store(conn: &Connection, snapshot: &RateSnapshot) -> Result<()> {
    let updated = conn.execute(
        "UPDATE rate_state
         SET owner = ?1, reserve_feed = ?2, updater = ?3, max_difference = ?4,
             last_update_timestamp = ?5, last_total_supply = ?6, last_tvl = ?7, last_rate = ?8
         WHERE id = 1",
        rusqlite::params![
            snapshot.owner.to_string(),
            snapshot.reserve_feed.to_string(),
            snapshot.updater.to_string(),
            snapshot.max_difference.to_string(),
            snapshot.last_update_timestamp as i64,
            snapshot.last_total_supply.to_string(),
            snapshot.last_tvl.to_string(),
            snapshot.last_rate.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound("rate snapshot".into()));
    }
    Ok(())
}

/// Columns as stored, before parsing.
struct RawSnapshot {
    owner: String,
    reserve_feed: String,
    updater: String,
    max_difference: String,
    last_update_timestamp: i64,
    last_total_supply: String,
    last_tvl: String,
    last_rate: String,
}

impl RawSnapshot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            owner: row.get(0)?,
            reserve_feed: row.get(1)?,
            updater: row.get(2)?,
            max_difference: row.get(3)?,
            last_update_timestamp: row.get(4)?,
            last_total_supply: row.get(5)?,
            last_tvl: row.get(6)?,
            last_rate: row.get(7)?,
        })
    }

    fn decode(self) -> Result<RateSnapshot> {
        Ok(RateSnapshot {
            owner: address(&self.owner)?,
            reserve_feed: address(&self.reserve_feed)?,
            updater: address(&self.updater)?,
            max_difference: amount(&self.max_difference)?,
            last_update_timestamp: self.last_update_timestamp as u64,
            last_total_supply: amount(&self.last_total_supply)?,
            last_tvl: amount(&self.last_tvl)?,
            last_rate: amount(&self.last_rate)?,
        })
    }
}

fn address(s: &str) -> Result<Address> {
    s.parse()
        .map_err(|e| DbError::Serialization(format!("address '{s}': {e}")))
}

fn amount(s: &str) -> Result<U256> {
    parse_u256(s).map_err(|e| DbError::Serialization(format!("amount '{s}': {e}")))
}
