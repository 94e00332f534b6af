//! Stub feed overrides.
//!
//! Answers set through the development RPC are persisted here so a restarted
//! daemon reports the same reserve as before.

use rategate_types::{parse_i256, Address, Timestamp, I256};
use rusqlite::Connection;

use crate::{DbError, Result};

/// Record the answer for a stub feed.
pub fn set_override(
    conn: &Connection,
    address: &Address,
    answer: I256,
    updated_at: Timestamp,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO feed_overrides (address, answer, updated_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![address.to_string(), answer.to_string(), updated_at as i64],
    )?;
    Ok(())
}

/// Every recorded override as `(address, answer, updated_at)`.
pub fn overrides(conn: &Connection) -> Result<Vec<(Address, I256, Timestamp)>> {
    let mut stmt =
        conn.prepare("SELECT address, answer, updated_at FROM feed_overrides ORDER BY address")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut result = Vec::new();
    for row in rows {
        let (address, answer, updated_at) = row?;
        let address: Address = address
            .parse()
            .map_err(|e| DbError::Serialization(format!("feed address '{address}': {e}")))?;
        let answer = parse_i256(&answer)
            .map_err(|e| DbError::Serialization(format!("feed answer '{answer}': {e}")))?;
        result.push((address, answer, updated_at as u64));
    }
    Ok(result)
}
