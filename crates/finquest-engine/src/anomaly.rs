//! Heuristic screening of proposed streak values.

use std::fmt;

use finquest_core::{
  policy::StreakPolicy,
  progress::{UserId, UserProgressRecord},
};
use thiserror::Error;
use tracing::warn;

/// What made a proposal look implausible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
  Negative,
  Jump { from: u32, to: i64 },
  ExceedsLongest { longest: u32, to: i64 },
}

impl fmt::Display for Anomaly {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Negative => f.write_str("negative streak proposed"),
      Self::Jump { from, to } => write!(f, "streak jumped from {from} to {to}"),
      Self::ExceedsLongest { longest, to } => {
        write!(f, "streak {to} is far beyond longest streak {longest}")
      }
    }
  }
}

#[derive(Debug, Error)]
pub enum ScreenError {
  #[error("arithmetic overflow while screening {0}")]
  Overflow(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnomalyDetector {
  max_jump:           u32,
  longest_multiplier: u32,
}

impl AnomalyDetector {
  pub fn new(policy: &StreakPolicy) -> Self {
    Self {
      max_jump:           policy.anomaly_max_jump,
      longest_multiplier: policy.anomaly_longest_multiplier,
    }
  }

  /// Screen `proposed` against the user's recorded history. Fails closed: a
  /// screening error counts as anomalous.
  pub fn is_anomalous(
    &self,
    user_id: &UserId,
    proposed: i64,
    record: &UserProgressRecord,
  ) -> bool {
    match self.detect(proposed, record) {
      Ok(found) => found.is_some(),
      Err(e) => {
        warn!(%user_id, proposed, error = %e, "anomaly screen failed");
        true
      }
    }
  }

  /// The first anomaly found, if any.
  pub fn detect(
    &self,
    proposed: i64,
    record: &UserProgressRecord,
  ) -> Result<Option<Anomaly>, ScreenError> {
    if proposed < 0 {
      return Ok(Some(Anomaly::Negative));
    }

    let jump = proposed
      .checked_sub(i64::from(record.current_streak))
      .ok_or(ScreenError::Overflow(proposed))?;
    if jump > i64::from(self.max_jump) {
      return Ok(Some(Anomaly::Jump { from: record.current_streak, to: proposed }));
    }

    let bound = i64::from(record.longest_streak)
      .checked_mul(i64::from(self.longest_multiplier))
      .ok_or(ScreenError::Overflow(proposed))?;
    if proposed > bound {
      return Ok(Some(Anomaly::ExceedsLongest {
        longest: record.longest_streak,
        to:      proposed,
      }));
    }

    Ok(None)
  }
}
