//! The quest-completion flow: score the quest, grant xp, and propose the
//! next streak value to the guard.

use finquest_core::{
  outcome::ValidationOutcome,
  progress::UserId,
  quest::{QuestStep, StepResponse},
  store::ProgressStore,
};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::{StreakGuard, scorer};

pub const DEFAULT_TRIGGER_REASON: &str = "quest_completion";

/// A finished quest as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestCompletion {
  pub steps:          Vec<QuestStep>,
  #[serde(default)]
  pub responses:      Vec<StepResponse>,
  /// Xp granted for a perfect score; scaled down by the score.
  #[serde(default)]
  pub xp_reward:      u64,
  #[serde(default)]
  pub trigger_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestCompletionReport {
  pub score:      u8,
  pub xp_awarded: u64,
  pub streak:     ValidationOutcome,
}

impl QuestCompletionReport {
  /// A report for a submission that never reached scoring.
  pub fn rejected(message: impl Into<String>) -> Self {
    Self {
      score:      0,
      xp_awarded: 0,
      streak:     ValidationOutcome::validation_error(message),
    }
  }
}

/// Xp for a quest worth `reward` at `score` percent, rounded down.
pub fn xp_for(reward: u64, score: u8) -> u64 {
  reward.saturating_mul(u64::from(score)) / 100
}

impl<S> StreakGuard<S>
where
  S: ProgressStore + 'static,
{
  /// Score `completion`, grant its xp, and propose `current_streak + 1`.
  ///
  /// Never fails. If the xp grant cannot be written, `xp_awarded` is zero and
  /// the streak proposal still goes ahead.
  pub async fn complete_quest(
    &self,
    user_id: &UserId,
    completion: QuestCompletion,
  ) -> QuestCompletionReport {
    let answers = scorer::grade(&completion.steps, &completion.responses);
    let score = scorer::score(&answers);
    let xp = xp_for(completion.xp_reward, score);
    let trigger_reason = completion
      .trigger_reason
      .unwrap_or_else(|| DEFAULT_TRIGGER_REASON.to_owned());

    let granted = timeout(
      self.policy().store_timeout(),
      self.store().record_quest_completion(user_id.clone(), xp),
    )
    .await;

    let (xp_awarded, current) = match granted {
      Ok(Ok(record)) => (xp, Some(record.current_streak)),
      Ok(Err(e)) => {
        warn!(%user_id, error = %e, "failed to record quest completion");
        (0, None)
      }
      Err(_) => {
        warn!(%user_id, "quest completion write timed out");
        (0, None)
      }
    };

    let current = match current {
      Some(c) => Some(c),
      None => self
        .validator()
        .read(&**self.store(), user_id)
        .await
        .ok()
        .map(|r| r.current_streak),
    };

    let streak = match current {
      Some(c) => {
        self
          .apply_protected_update(user_id, i64::from(c) + 1, &trigger_reason)
          .await
      }
      None => ValidationOutcome::validation_error("progress record unavailable"),
    };

    info!(%user_id, score, xp_awarded, streak = streak.applied_value, "quest completed");
    QuestCompletionReport { score, xp_awarded, streak }
  }
}
