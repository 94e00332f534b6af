//! Audit log query functions.

use rategate_types::{EventCategory, RateEvent};
use rusqlite::types::Value;
use rusqlite::Connection;

use crate::{DbError, Result};

/// An event as stored in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    /// Position in the log; strictly increasing.
    pub seq: i64,
    pub event: RateEvent,
}

/// Append an event. Returns its sequence number.
pub fn append(conn: &Connection, event: &RateEvent) -> Result<i64> {
    let payload =
        serde_json::to_string(event).map_err(|e| DbError::Serialization(e.to_string()))?;
    conn.execute(
        "INSERT INTO events (event_type, category, timestamp, payload) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            event.name(),
            event.category().as_str(),
            event.timestamp() as i64,
            payload,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// The most recent `limit` events, oldest first.
///
/// An empty `categories` slice matches every category. Filtering and the
/// limit are applied in SQL so the category index serves the lookup.
pub fn recent(
    conn: &Connection,
    limit: usize,
    categories: &[EventCategory],
) -> Result<Vec<StoredEvent>> {
    let mut params: Vec<Value> = categories
        .iter()
        .map(|c| Value::Text(c.as_str().to_string()))
        .collect();
    let filter = if categories.is_empty() {
        String::new()
    } else {
        let placeholders: Vec<String> = (1..=categories.len()).map(|i| format!("?{i}")).collect();
        format!("WHERE category IN ({})", placeholders.join(", "))
    };
    params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    let sql = format!(
        "SELECT seq, payload FROM events {filter} ORDER BY seq DESC LIMIT ?{}",
        params.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut events = Vec::new();
    for row in rows {
        let (seq, payload) = row?;
        let event: RateEvent = serde_json::from_str(&payload)
            .map_err(|e| DbError::Serialization(format!("event {seq}: {e}")))?;
        events.push(StoredEvent { seq, event });
    }
    events.reverse();
    Ok(events)
}

/// Total number of events in the log.
pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
    Ok(n as u64)
}

/// Number of events with the given name (e.g. `"AlertInvalidRate"`).
pub fn count_by_type(conn: &Connection, event_type: &str) -> Result<u64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM events WHERE event_type = ?1",
        [event_type],
        |row| row.get(0),
    )?;
    Ok(n as u64)
}
