//! Encoding and decoding helpers between Rust domain types and the plain-text
//! and integer representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Counters are stored as
//! `INTEGER` and range-checked on the way out.

use chrono::{DateTime, Utc};
use finquest_core::{
  incident::IncidentRecord,
  outcome::ReasonCode,
  progress::{UserId, UserProgressRecord},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Counters ────────────────────────────────────────────────────────────────

fn decode_u32(column: &'static str, value: i64) -> Result<u32> {
  u32::try_from(value).map_err(|_| Error::OutOfRange { column, value })
}

fn decode_u64(column: &'static str, value: i64) -> Result<u64> {
  u64::try_from(value).map_err(|_| Error::OutOfRange { column, value })
}

/// SQLite integers are signed; saturate rather than wrap.
pub fn encode_u64(value: u64) -> i64 { i64::try_from(value).unwrap_or(i64::MAX) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// The column list matching [`RawRecord::from_row`].
pub const RECORD_COLUMNS: &str = "user_id, current_streak, longest_streak,
  last_streak_update_at, last_streak_update_reason, daily_streak_update_count,
  xp, completed_quests_count, revision, created_at, updated_at";

/// Raw values read directly from a `users` row.
pub struct RawRecord {
  pub user_id:                   String,
  pub current_streak:            i64,
  pub longest_streak:            i64,
  pub last_streak_update_at:     Option<String>,
  pub last_streak_update_reason: Option<String>,
  pub daily_streak_update_count: i64,
  pub xp:                        i64,
  pub completed_quests_count:    i64,
  pub revision:                  i64,
  pub created_at:                String,
  pub updated_at:                String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:                   row.get(0)?,
      current_streak:            row.get(1)?,
      longest_streak:            row.get(2)?,
      last_streak_update_at:     row.get(3)?,
      last_streak_update_reason: row.get(4)?,
      daily_streak_update_count: row.get(5)?,
      xp:                        row.get(6)?,
      completed_quests_count:    row.get(7)?,
      revision:                  row.get(8)?,
      created_at:                row.get(9)?,
      updated_at:                row.get(10)?,
    })
  }

  pub fn into_record(self) -> Result<UserProgressRecord> {
    Ok(UserProgressRecord {
      user_id:                   UserId::new(self.user_id)?,
      current_streak:            decode_u32("current_streak", self.current_streak)?,
      longest_streak:            decode_u32("longest_streak", self.longest_streak)?,
      last_streak_update_at:     self
        .last_streak_update_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      last_streak_update_reason: self.last_streak_update_reason,
      daily_streak_update_count: decode_u32(
        "daily_streak_update_count",
        self.daily_streak_update_count,
      )?,
      xp:                        decode_u64("xp", self.xp)?,
      completed_quests_count:    decode_u32(
        "completed_quests_count",
        self.completed_quests_count,
      )?,
      revision:                  decode_u64("revision", self.revision)?,
      created_at:                decode_dt(&self.created_at)?,
      updated_at:                decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `streak_incidents` row.
pub struct RawIncident {
  pub incident_key:    String,
  pub user_id:         String,
  pub attempted_value: i64,
  pub applied_value:   i64,
  pub reason_code:     String,
  pub message:         String,
  pub recorded_at:     String,
}

impl RawIncident {
  pub fn into_incident(self) -> Result<IncidentRecord> {
    Ok(IncidentRecord {
      incident_key:    self.incident_key,
      user_id:         UserId::new(self.user_id)?,
      attempted_value: self.attempted_value,
      applied_value:   decode_u32("applied_value", self.applied_value)?,
      reason_code:     self.reason_code.parse::<ReasonCode>()?,
      message:         self.message,
      recorded_at:     decode_dt(&self.recorded_at)?,
    })
  }
}
