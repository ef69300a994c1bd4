//! Tunable thresholds for the streak rules.
//!
//! The defaults are the production values. The anomaly thresholds are
//! heuristics; deployments may tighten or loosen them in configuration.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset as _, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakPolicy {
  /// Largest accepted single-step advance.
  pub max_increment:               u32,
  /// Hard upper bound on an accepted streak.
  pub ceiling:                     u32,
  /// Minimum time between two accepted advancing updates.
  pub cooldown_hours:              u32,
  /// Writes allowed per calendar day before further writes are refused.
  pub daily_quota:                 u32,
  /// Proposals above this value are screened by the anomaly detector.
  pub anomaly_gate:                u32,
  /// Largest single jump the detector tolerates.
  pub anomaly_max_jump:            u32,
  /// Proposals above `longest_streak * multiplier` are anomalous.
  pub anomaly_longest_multiplier:  u32,
  /// Upper bound on the value restored after an anomaly.
  pub anomaly_fallback_cap:        u32,
  /// Offset from UTC, in minutes, of the reference calendar day.
  pub day_boundary_offset_minutes: i32,
  /// Budget for each individual store read or write.
  pub store_timeout_ms:            u64,
  /// Read-validate-commit attempts before giving up on a contended record.
  pub max_commit_attempts:         u32,
}

impl Default for StreakPolicy {
  fn default() -> Self {
    Self {
      max_increment:               1,
      ceiling:                     365,
      cooldown_hours:              24,
      daily_quota:                 5,
      anomaly_gate:                1000,
      anomaly_max_jump:            50,
      anomaly_longest_multiplier:  2,
      anomaly_fallback_cap:        100,
      day_boundary_offset_minutes: 0,
      store_timeout_ms:            2000,
      max_commit_attempts:         3,
    }
  }
}

impl StreakPolicy {
  pub fn cooldown(&self) -> chrono::Duration {
    chrono::Duration::hours(i64::from(self.cooldown_hours))
  }

  pub fn store_timeout(&self) -> Duration {
    Duration::from_millis(self.store_timeout_ms)
  }

  /// The reference timezone for calendar-day comparisons. Out-of-range
  /// offsets fall back to UTC.
  pub fn day_boundary(&self) -> FixedOffset {
    FixedOffset::east_opt(self.day_boundary_offset_minutes.saturating_mul(60))
      .unwrap_or_else(|| Utc.fix())
  }

  /// The calendar date of `at` in the reference timezone.
  pub fn calendar_day(&self, at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&self.day_boundary()).date_naive()
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn defaults_match_documented_thresholds() {
    let p = StreakPolicy::default();
    assert_eq!(p.max_increment, 1);
    assert_eq!(p.ceiling, 365);
    assert_eq!(p.cooldown(), chrono::Duration::hours(24));
    assert_eq!(p.daily_quota, 5);
    assert_eq!(p.anomaly_gate, 1000);
    assert_eq!(p.anomaly_max_jump, 50);
    assert_eq!(p.anomaly_longest_multiplier, 2);
    assert_eq!(p.anomaly_fallback_cap, 100);
  }

  #[test]
  fn partial_config_keeps_remaining_defaults() {
    let p: StreakPolicy =
      serde_json::from_value(serde_json::json!({ "ceiling": 500 })).unwrap();
    assert_eq!(p.ceiling, 500);
    assert_eq!(p.daily_quota, 5);
  }

  #[test]
  fn calendar_day_respects_offset() {
    let at = Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();

    let utc = StreakPolicy::default();
    assert_eq!(utc.calendar_day(at), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());

    let plus_one = StreakPolicy { day_boundary_offset_minutes: 60, ..StreakPolicy::default() };
    assert_eq!(plus_one.calendar_day(at), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
  }
}
