//! The user progress record — the document the engine protects.
//!
//! The record is owned by the store. The engine reads it whole and writes the
//! streak fields back as a single [`StreakPatch`], conditioned on the
//! record's `revision`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Opaque, stable user identifier. Immutable once a record is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
  /// Wrap a raw identifier, rejecting the empty string.
  pub fn new(raw: impl Into<String>) -> Result<Self> {
    let raw = raw.into();
    if raw.trim().is_empty() {
      return Err(Error::EmptyUserId);
    }
    Ok(Self(raw))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// Per-user progress state as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgressRecord {
  pub user_id:                   UserId,
  /// The counter under protection.
  pub current_streak:            u32,
  /// Never decreases; always `>= current_streak` after an engine commit.
  pub longest_streak:            u32,
  /// Most recent accepted-or-clamped write to `current_streak`. `None` until
  /// the first such write.
  pub last_streak_update_at:     Option<DateTime<Utc>>,
  pub last_streak_update_reason: Option<String>,
  /// Writes applied within the calendar day of `last_streak_update_at`.
  pub daily_streak_update_count: u32,
  pub xp:                        u64,
  pub completed_quests_count:    u32,
  /// Optimistic-concurrency token; bumped by the store on every write.
  pub revision:                  u64,
  /// Server-assigned.
  pub created_at:                DateTime<Utc>,
  /// Server-assigned; changes on every write.
  pub updated_at:                DateTime<Utc>,
}

impl UserProgressRecord {
  /// A fresh record with every counter at zero.
  pub fn baseline(user_id: UserId, now: DateTime<Utc>) -> Self {
    Self {
      user_id,
      current_streak: 0,
      longest_streak: 0,
      last_streak_update_at: None,
      last_streak_update_reason: None,
      daily_streak_update_count: 0,
      xp: 0,
      completed_quests_count: 0,
      revision: 0,
      created_at: now,
      updated_at: now,
    }
  }

  /// `true` if the stored counters already violate
  /// `current_streak <= longest_streak`.
  pub fn is_inconsistent(&self) -> bool {
    self.current_streak > self.longest_streak
  }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// The streak fields written together by one protected update.
///
/// Input to [`crate::store::ProgressStore::commit_streak`]. Every field is
/// written in a single atomic statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakPatch {
  pub current_streak:            u32,
  pub longest_streak:            u32,
  pub last_streak_update_at:     DateTime<Utc>,
  pub last_streak_update_reason: String,
  pub daily_streak_update_count: u32,
}

/// Result of a revision-conditioned write.
#[derive(Debug, Clone)]
pub enum CommitResult {
  /// The write was applied; carries the record as stored afterwards.
  Committed(UserProgressRecord),
  /// The record changed since it was read; nothing was written.
  Stale,
}
