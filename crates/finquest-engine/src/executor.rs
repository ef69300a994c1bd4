//! [`StreakGuard`] — the only writer of a user's streak fields.
//!
//! Every protected update is a read, a pure rule evaluation, and one
//! revision-conditioned write. Rejections are audited off the request path;
//! analytics are emitted fire-and-forget.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use finquest_core::{
  analytics::{AnalyticsEvent, AnalyticsSink, NullSink},
  clock::{Clock, SystemClock},
  incident::NewIncident,
  outcome::ValidationOutcome,
  policy::StreakPolicy,
  progress::{CommitResult, StreakPatch, UserId, UserProgressRecord},
  store::ProgressStore,
};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{Error, Result, rules::starts_new_day, validator::Validator};

/// What a validated outcome requires of the store.
enum Plan {
  /// Commit `patch`; the outcome stands as-is once it lands.
  Write(StreakPatch, ValidationOutcome),
  /// Nothing to write.
  Settle(ValidationOutcome),
}

pub struct StreakGuard<S> {
  store:     Arc<S>,
  validator: Validator,
  clock:     Arc<dyn Clock>,
  sink:      Arc<dyn AnalyticsSink>,
}

impl<S> StreakGuard<S>
where
  S: ProgressStore + 'static,
{
  /// A guard using wall-clock time and no analytics.
  pub fn new(store: Arc<S>, policy: StreakPolicy) -> Self {
    Self {
      store,
      validator: Validator::new(policy),
      clock: Arc::new(SystemClock),
      sink: Arc::new(NullSink),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_sink(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
    self.sink = sink;
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn policy(&self) -> &StreakPolicy { self.validator.policy() }

  pub(crate) fn validator(&self) -> &Validator { &self.validator }

  /// Dry-run: evaluate `proposed` against the stored record without writing.
  pub async fn validate(&self, user_id: &UserId, proposed: i64) -> ValidationOutcome {
    self
      .validator
      .validate(&*self.store, user_id, proposed, self.clock.now())
      .await
  }

  /// Validate `proposed` and commit the accepted or clamped value.
  ///
  /// Never fails. Every rejection writes exactly one incident (best-effort);
  /// every call emits one analytics event (best-effort).
  pub async fn apply_protected_update(
    &self,
    user_id: &UserId,
    proposed: i64,
    trigger_reason: &str,
  ) -> ValidationOutcome {
    let outcome = match self.try_apply(user_id, proposed, trigger_reason).await {
      Ok(outcome) => outcome,
      Err(e) => {
        warn!(%user_id, proposed, error = %e, "protected streak update failed");
        ValidationOutcome::validation_error(e.to_string())
      }
    };

    if outcome.accepted {
      info!(%user_id, streak = outcome.applied_value, trigger_reason, "streak advanced");
    } else {
      info!(
        %user_id,
        proposed,
        applied = outcome.applied_value,
        reason = %outcome.reason_code,
        "streak update rejected"
      );
      self.spawn_incident(user_id, proposed, &outcome);
    }
    self.emit(user_id, proposed, trigger_reason, &outcome);

    outcome
  }

  async fn try_apply(
    &self,
    user_id: &UserId,
    proposed: i64,
    trigger_reason: &str,
  ) -> Result<ValidationOutcome> {
    if trigger_reason.trim().is_empty() {
      return Err(Error::EmptyTriggerReason);
    }
    if proposed < 0 {
      return Err(Error::NegativeProposal(proposed));
    }

    let attempts = self.policy().max_commit_attempts.max(1);
    for attempt in 1..=attempts {
      // Validate against this read, and commit only if it is still current.
      let record = self.validator.read(&*self.store, user_id).await?;
      let now = self.clock.now();
      let outcome = self.validator.evaluate(&record, proposed, now);

      let (patch, outcome) = match self.plan(&record, outcome, now, trigger_reason) {
        Plan::Settle(outcome) => return Ok(outcome),
        Plan::Write(patch, outcome) => (patch, outcome),
      };

      let committed = timeout(
        self.policy().store_timeout(),
        self.store.commit_streak(user_id.clone(), record.revision, patch),
      )
      .await
      .map_err(|_| Error::Timeout("write"))?
      .map_err(Error::store)?;

      match committed {
        CommitResult::Committed(_) => return Ok(outcome),
        CommitResult::Stale => {
          debug!(%user_id, attempt, "progress record changed since read; re-validating");
        }
      }
    }

    Err(Error::Contended(user_id.clone(), attempts))
  }

  /// Decide what, if anything, `outcome` writes.
  fn plan(
    &self,
    record: &UserProgressRecord,
    outcome: ValidationOutcome,
    now: DateTime<Utc>,
    trigger_reason: &str,
  ) -> Plan {
    if outcome.accepted {
      // Re-affirming the current value outside the cooldown changes nothing.
      if outcome.applied_value == record.current_streak {
        return Plan::Settle(outcome);
      }
      let patch = self.patch(record, outcome.applied_value, now, trigger_reason);
      return Plan::Write(patch, outcome);
    }

    let fallback = outcome.applied_value;
    if outcome.reason_code.is_no_op() || fallback == record.current_streak {
      return Plan::Settle(outcome);
    }

    // An advancing fallback must itself be an acceptable proposal, or the
    // rate fallback would step around the cooldown and the daily quota.
    if fallback > record.current_streak {
      let recheck = self.validator.evaluate(record, i64::from(fallback), now);
      if !recheck.accepted {
        let message = format!(
          "{}; fallback {fallback} withheld ({})",
          outcome.message.as_deref().unwrap_or_default(),
          recheck.reason_code
        );
        return Plan::Settle(ValidationOutcome::reject(
          outcome.reason_code,
          record.current_streak,
          message,
        ));
      }
    }

    let patch = self.patch(record, fallback, now, trigger_reason);
    Plan::Write(patch, outcome)
  }

  fn patch(
    &self,
    record: &UserProgressRecord,
    value: u32,
    now: DateTime<Utc>,
    trigger_reason: &str,
  ) -> StreakPatch {
    let daily_streak_update_count = if starts_new_day(record, now, self.policy()) {
      1
    } else {
      record.daily_streak_update_count.saturating_add(1)
    };

    StreakPatch {
      current_streak: value,
      longest_streak: record.longest_streak.max(value),
      last_streak_update_at: now,
      last_streak_update_reason: trigger_reason.to_owned(),
      daily_streak_update_count,
    }
  }

  /// Write the incident on its own task; failures are logged and dropped.
  fn spawn_incident(&self, user_id: &UserId, proposed: i64, outcome: &ValidationOutcome) {
    let store = Arc::clone(&self.store);
    let budget = self.policy().store_timeout();
    let incident = NewIncident {
      user_id:         user_id.clone(),
      attempted_value: proposed,
      applied_value:   outcome.applied_value,
      reason_code:     outcome.reason_code,
      message:         outcome.message.clone().unwrap_or_default(),
    };

    tokio::spawn(async move {
      let user_id = incident.user_id.clone();
      match timeout(budget, store.record_incident(incident)).await {
        Ok(Ok(recorded)) => {
          debug!(%user_id, key = %recorded.incident_key, "streak incident recorded")
        }
        Ok(Err(e)) => warn!(%user_id, error = %e, "failed to record streak incident"),
        Err(_) => warn!(%user_id, "streak incident write timed out"),
      }
    });
  }

  fn emit(
    &self,
    user_id: &UserId,
    proposed: i64,
    trigger_reason: &str,
    outcome: &ValidationOutcome,
  ) {
    let event = AnalyticsEvent {
      event_id:        Uuid::new_v4(),
      user_id:         user_id.clone(),
      accepted:        outcome.accepted,
      reason_code:     outcome.reason_code,
      attempted_value: proposed,
      applied_value:   outcome.applied_value,
      trigger_reason:  trigger_reason.to_owned(),
      occurred_at:     self.clock.now(),
    };
    if let Err(e) = self.sink.emit(event) {
      debug!(%user_id, error = %e, "analytics event dropped");
    }
  }
}
