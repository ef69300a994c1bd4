//! [`Validator`] — runs the rule set against a user's stored record.

use chrono::{DateTime, Utc};
use finquest_core::{
  outcome::ValidationOutcome,
  policy::StreakPolicy,
  progress::{UserId, UserProgressRecord},
  store::ProgressStore,
};
use tokio::time::timeout;
use tracing::warn;

use crate::{
  Error, Result,
  anomaly::AnomalyDetector,
  rules::{self, RuleContext},
};

#[derive(Debug, Clone)]
pub struct Validator {
  policy:   StreakPolicy,
  detector: AnomalyDetector,
}

impl Validator {
  pub fn new(policy: StreakPolicy) -> Self {
    let detector = AnomalyDetector::new(&policy);
    Self { policy, detector }
  }

  pub fn policy(&self) -> &StreakPolicy { &self.policy }

  /// Evaluate `proposed` against an already-read record. Pure.
  pub fn evaluate(
    &self,
    record: &UserProgressRecord,
    proposed: i64,
    now: DateTime<Utc>,
  ) -> ValidationOutcome {
    rules::evaluate(&RuleContext {
      record,
      proposed,
      now,
      policy: &self.policy,
      detector: &self.detector,
    })
  }

  /// Read the user's record and evaluate `proposed` against it.
  ///
  /// Never fails: a missing record, a store error, or a timeout all become a
  /// `validation_error` outcome with an applied value of zero.
  pub async fn validate<S: ProgressStore>(
    &self,
    store: &S,
    user_id: &UserId,
    proposed: i64,
    now: DateTime<Utc>,
  ) -> ValidationOutcome {
    if proposed < 0 {
      return ValidationOutcome::validation_error(
        Error::NegativeProposal(proposed).to_string(),
      );
    }
    match self.read(store, user_id).await {
      Ok(record) => self.evaluate(&record, proposed, now),
      Err(e) => {
        warn!(%user_id, proposed, error = %e, "streak validation failed");
        ValidationOutcome::validation_error(e.to_string())
      }
    }
  }

  /// Read a record within the store timeout. Absence is an error.
  pub(crate) async fn read<S: ProgressStore>(
    &self,
    store: &S,
    user_id: &UserId,
  ) -> Result<UserProgressRecord> {
    timeout(self.policy.store_timeout(), store.get_record(user_id.clone()))
      .await
      .map_err(|_| Error::Timeout("read"))?
      .map_err(Error::store)?
      .ok_or_else(|| Error::RecordNotFound(user_id.clone()))
  }
}
