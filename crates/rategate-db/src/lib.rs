//! # rategate-db
//!
//! Persistence for the rate snapshot and its audit log.
//! Manages the single SQLite database at `$RATEGATE_DATA_DIR/rategate.db`.
//!
//! ## Schema
//!
//! - WAL mode
//! - `rate_state` holds exactly one row (`id = 1`)
//! - `events` is append-only, enforced by triggers
//! - All timestamps are Unix epoch seconds
//! - Schema version stored in `PRAGMA user_version`

pub mod migrations;
pub mod queries;
pub mod schema;

use rategate_types::{RateEvent, RateSnapshot, Timestamp};
use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already initialized")]
    AlreadyInitialized,

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the database at the given path.
///
/// Configures WAL mode and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Create the snapshot row and record the initialization events, atomically.
///
/// # Errors
///
/// [`DbError::AlreadyInitialized`] if a snapshot row already exists.
pub fn initialize(
    conn: &mut Connection,
    snapshot: &RateSnapshot,
    events: &[RateEvent],
    now: Timestamp,
) -> Result<()> {
    let tx = conn.transaction()?;
    queries::snapshot::insert(&tx, snapshot, now)?;
    for event in events {
        queries::events::append(&tx, event)?;
    }
    tx.commit()?;
    tracing::info!(events = events.len(), "snapshot initialized in store");
    Ok(())
}

/// Persist a new snapshot together with the events that produced it.
///
/// Both writes land in one transaction: either the snapshot and every event
/// are stored, or nothing is.
pub fn commit(conn: &mut Connection, snapshot: &RateSnapshot, events: &[RateEvent]) -> Result<()> {
    let tx = conn.transaction()?;
    queries::snapshot::store(&tx, snapshot)?;
    for event in events {
        queries::events::append(&tx, event)?;
    }
    tx.commit()?;
    Ok(())
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = FULL;",
    )?;
    Ok(())
}
