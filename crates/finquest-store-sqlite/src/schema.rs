//! SQL schema for the finquest SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One document per user. Every write bumps `revision`.
CREATE TABLE IF NOT EXISTS users (
    user_id                   TEXT PRIMARY KEY,
    current_streak            INTEGER NOT NULL DEFAULT 0 CHECK (current_streak >= 0),
    longest_streak            INTEGER NOT NULL DEFAULT 0 CHECK (longest_streak >= 0),
    last_streak_update_at     TEXT,            -- ISO 8601 UTC or NULL
    last_streak_update_reason TEXT,
    daily_streak_update_count INTEGER NOT NULL DEFAULT 0,
    xp                        INTEGER NOT NULL DEFAULT 0,
    completed_quests_count    INTEGER NOT NULL DEFAULT 0,
    revision                  INTEGER NOT NULL DEFAULT 0,
    created_at                TEXT NOT NULL,   -- server-assigned
    updated_at                TEXT NOT NULL    -- server-assigned
);

-- Incidents are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
-- `incident_key` is `{user_id}_{epoch_millis}` and may repeat within a
-- millisecond, so rows are identified by `seq`.
CREATE TABLE IF NOT EXISTS streak_incidents (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    incident_key    TEXT NOT NULL,
    user_id         TEXT NOT NULL,
    attempted_value INTEGER NOT NULL,
    applied_value   INTEGER NOT NULL,
    reason_code     TEXT NOT NULL,
    message         TEXT NOT NULL,
    recorded_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS streak_incidents_user_idx ON streak_incidents(user_id);

PRAGMA user_version = 1;
";
