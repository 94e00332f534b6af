//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Rate snapshot: exactly one row, created at initialization.
-- 256-bit quantities are stored as base-10 TEXT.
-- ============================================================

CREATE TABLE IF NOT EXISTS rate_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    owner TEXT NOT NULL,
    reserve_feed TEXT NOT NULL,
    updater TEXT NOT NULL,
    max_difference TEXT NOT NULL,
    last_update_timestamp INTEGER NOT NULL DEFAULT 0,
    last_total_supply TEXT NOT NULL DEFAULT '0',
    last_tvl TEXT NOT NULL DEFAULT '0',
    last_rate TEXT NOT NULL DEFAULT '0',
    initialized_at INTEGER NOT NULL
);

-- ============================================================
-- Append-only audit log.
-- ============================================================

CREATE TABLE IF NOT EXISTS events (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type TEXT NOT NULL,
    category TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_type ON events(event_type);
CREATE INDEX IF NOT EXISTS idx_events_category ON events(category, seq);

CREATE TRIGGER IF NOT EXISTS events_no_update
BEFORE UPDATE ON events
BEGIN
    SELECT RAISE(ABORT, 'events are append-only');
END;

CREATE TRIGGER IF NOT EXISTS events_no_delete
BEFORE DELETE ON events
BEGIN
    SELECT RAISE(ABORT, 'events are append-only');
END;

-- ============================================================
-- Development overrides for stub reserve feeds.
-- ============================================================

CREATE TABLE IF NOT EXISTS feed_overrides (
    address TEXT PRIMARY KEY,
    answer TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;
