//! The streak rules, as an ordered list of independent checks.
//!
//! Each [`Rule`] is a predicate plus the fallback value it prescribes when it
//! fails. [`evaluate`] runs them in order and the first failure wins.

use chrono::{DateTime, Utc};
use finquest_core::{
  outcome::{ReasonCode, ValidationOutcome},
  policy::StreakPolicy,
  progress::UserProgressRecord,
};

use crate::anomaly::AnomalyDetector;

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
  pub record:   &'a UserProgressRecord,
  pub proposed: i64,
  pub now:      DateTime<Utc>,
  pub policy:   &'a StreakPolicy,
  pub detector: &'a AnomalyDetector,
}

impl RuleContext<'_> {
  fn current(&self) -> i64 { i64::from(self.record.current_streak) }
}

/// A failed rule: the reason, the value to fall back to, and a message for
/// the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
  pub code:     ReasonCode,
  pub fallback: u32,
  pub message:  String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
  /// At most `max_increment` per triggering event.
  Rate,
  /// Never above `ceiling`.
  Ceiling,
  /// At most one advancing update per cooldown window. Replaying the
  /// current value inside the window counts as a repeat of that update.
  Cooldown,
  /// At most `daily_quota` writes per calendar day.
  DailyQuota,
  /// Screens proposals above `anomaly_gate`.
  Anomaly,
  /// The counter never moves backwards on request.
  Decrease,
}

impl Rule {
  /// Evaluation order for a consistent record.
  pub const ORDER: [Rule; 6] = [
    Rule::Rate,
    Rule::Ceiling,
    Rule::Cooldown,
    Rule::DailyQuota,
    Rule::Anomaly,
    Rule::Decrease,
  ];

  /// Evaluation order when the stored record is already inconsistent
  /// (`current_streak > longest_streak`). The rate fallback is relative to a
  /// counter that cannot be trusted, so the anomaly screen goes first.
  pub const INCONSISTENT_ORDER: [Rule; 6] = [
    Rule::Anomaly,
    Rule::Rate,
    Rule::Ceiling,
    Rule::Cooldown,
    Rule::DailyQuota,
    Rule::Decrease,
  ];

  pub fn reason_code(self) -> ReasonCode {
    match self {
      Self::Rate => ReasonCode::IncrementTooHigh,
      Self::Ceiling => ReasonCode::ValueTooHigh,
      Self::Cooldown => ReasonCode::UpdateTooSoon,
      Self::DailyQuota => ReasonCode::DailyQuotaExceeded,
      Self::Anomaly => ReasonCode::AnomalyDetected,
      Self::Decrease => ReasonCode::ValidationError,
    }
  }

  /// `Some` if this rule rejects the proposal.
  pub fn check(self, ctx: &RuleContext<'_>) -> Option<Violation> {
    let record = ctx.record;
    let policy = ctx.policy;
    let violation = |fallback: u32, message: String| Violation {
      code: self.reason_code(),
      fallback,
      message,
    };

    match self {
      Self::Rate => {
        let increment = ctx.proposed.saturating_sub(ctx.current());
        (increment > i64::from(policy.max_increment)).then(|| {
          violation(
            record.current_streak.saturating_add(policy.max_increment),
            format!(
              "streak may advance by at most {} (proposed {} from {})",
              policy.max_increment, ctx.proposed, record.current_streak
            ),
          )
        })
      }

      Self::Ceiling => (ctx.proposed > i64::from(policy.ceiling)).then(|| {
        violation(
          policy.ceiling,
          format!("proposed {} exceeds ceiling {}", ctx.proposed, policy.ceiling),
        )
      }),

      Self::Cooldown => {
        if ctx.proposed < ctx.current() {
          return None;
        }
        let last = record.last_streak_update_at?;
        let elapsed = ctx.now.signed_duration_since(last);
        (elapsed < policy.cooldown()).then(|| {
          violation(
            record.current_streak,
            format!(
              "last advancing update was {}m ago; cooldown is {}h",
              elapsed.num_minutes(),
              policy.cooldown_hours
            ),
          )
        })
      }

      Self::DailyQuota => {
        if starts_new_day(record, ctx.now, policy) {
          return None;
        }
        (record.daily_streak_update_count >= policy.daily_quota).then(|| {
          violation(
            record.current_streak,
            format!(
              "{} updates already applied today; quota is {}",
              record.daily_streak_update_count, policy.daily_quota
            ),
          )
        })
      }

      Self::Anomaly => {
        if ctx.proposed <= i64::from(policy.anomaly_gate) {
          return None;
        }
        let fallback = record.current_streak.min(policy.anomaly_fallback_cap);
        match ctx.detector.detect(ctx.proposed, record) {
          Ok(None) => None,
          Ok(Some(anomaly)) => Some(violation(fallback, anomaly.to_string())),
          Err(e) => Some(violation(fallback, e.to_string())),
        }
      }

      Self::Decrease => (ctx.proposed < ctx.current()).then(|| {
        violation(
          record.current_streak,
          format!(
            "proposed {} is below current streak {}; resets are not accepted here",
            ctx.proposed, record.current_streak
          ),
        )
      }),
    }
  }
}

/// `true` if a write at `now` would be the first of its calendar day, by the
/// date of the record's own last update.
pub fn starts_new_day(
  record: &UserProgressRecord,
  now: DateTime<Utc>,
  policy: &StreakPolicy,
) -> bool {
  match record.last_streak_update_at {
    None => true,
    Some(last) => policy.calendar_day(last) != policy.calendar_day(now),
  }
}

/// Run the rules in order; the first failure wins.
pub fn evaluate(ctx: &RuleContext<'_>) -> ValidationOutcome {
  if ctx.proposed < 0 {
    return ValidationOutcome::validation_error(format!(
      "proposed streak {} is negative",
      ctx.proposed
    ));
  }

  let order = if ctx.record.is_inconsistent() {
    &Rule::INCONSISTENT_ORDER
  } else {
    &Rule::ORDER
  };

  if let Some(v) = order.iter().find_map(|rule| rule.check(ctx)) {
    return ValidationOutcome::reject(v.code, v.fallback, v.message);
  }

  // Passing the ceiling rule bounds the value by a `u32`.
  match u32::try_from(ctx.proposed) {
    Ok(value) => ValidationOutcome::accept(value),
    Err(_) => ValidationOutcome::validation_error(format!(
      "proposed streak {} is out of range",
      ctx.proposed
    )),
  }
}
