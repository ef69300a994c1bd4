//! Append-only audit records for rejected updates.
//!
//! Incidents are purely diagnostic: the engine writes them and never reads
//! them back on the decision path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{outcome::ReasonCode, progress::UserId};

/// A rejected proposal as persisted by the store. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
  /// Document key, `"{user_id}_{epoch_millis}"`.
  pub incident_key:    String,
  pub user_id:         UserId,
  pub attempted_value: i64,
  pub applied_value:   u32,
  pub reason_code:     ReasonCode,
  pub message:         String,
  /// Server-assigned.
  pub recorded_at:     DateTime<Utc>,
}

/// Input to [`crate::store::ProgressStore::record_incident`].
/// `recorded_at` and the key are always set by the store.
#[derive(Debug, Clone)]
pub struct NewIncident {
  pub user_id:         UserId,
  pub attempted_value: i64,
  pub applied_value:   u32,
  pub reason_code:     ReasonCode,
  pub message:         String,
}

/// Build the incident document key for a user and write time.
pub fn incident_key(user_id: &UserId, at: DateTime<Utc>) -> String {
  format!("{user_id}_{}", at.timestamp_millis())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn key_joins_user_and_epoch_millis() {
    let user = UserId::new("abc").unwrap();
    let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
    assert_eq!(incident_key(&user, at), "abc_1700000000123");
  }
}
