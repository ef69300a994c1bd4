//! Handlers for `/users/:id/streak` endpoints.
//!
//! Both always answer `200` with a [`ValidationOutcome`]; rejections are
//! outcomes, not errors. That includes bodies that are not JSON or whose
//! `proposed_streak` is not an integer.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
};
use finquest_core::{outcome::ValidationOutcome, progress::UserId, store::ProgressStore};
use finquest_engine::StreakGuard;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;

/// Fields are kept loose so a bad value becomes an outcome rather than an
/// extractor rejection.
#[derive(Debug, Deserialize)]
pub struct ApplyBody {
  #[serde(default)]
  pub proposed_streak: Value,
  #[serde(default)]
  pub trigger_reason:  Value,
}

#[derive(Debug, Deserialize)]
pub struct ValidateBody {
  #[serde(default)]
  pub proposed_streak: Value,
}

/// The proposal as a whole number, or why it isn't one.
fn proposal(value: &Value) -> Result<i64, String> {
  value
    .as_i64()
    .ok_or_else(|| format!("proposed_streak must be a whole number, got {value}"))
}

/// `POST /users/:id/streak` — body: `{"proposed_streak":6,"trigger_reason":"quest_completion"}`
pub async fn apply<S>(
  State(guard): State<Arc<StreakGuard<S>>>,
  Path(id): Path<String>,
  body: Result<Json<ApplyBody>, JsonRejection>,
) -> Result<Json<ValidationOutcome>, ApiError>
where
  S: ProgressStore + 'static,
{
  let user_id = UserId::new(id)?;
  let Json(body) = match body {
    Ok(body) => body,
    Err(rejection) => {
      debug!(%user_id, error = %rejection.body_text(), "unreadable streak body");
      return Ok(Json(ValidationOutcome::validation_error(rejection.body_text())));
    }
  };
  let proposed = match proposal(&body.proposed_streak) {
    Ok(proposed) => proposed,
    Err(message) => {
      debug!(%user_id, %message, "malformed streak proposal");
      return Ok(Json(ValidationOutcome::validation_error(message)));
    }
  };
  // A missing reason goes through the guard, which refuses it.
  let trigger_reason = body.trigger_reason.as_str().unwrap_or_default();

  let outcome = guard
    .apply_protected_update(&user_id, proposed, trigger_reason)
    .await;
  Ok(Json(outcome))
}

/// `POST /users/:id/streak/validate` — dry run; nothing is written.
pub async fn validate<S>(
  State(guard): State<Arc<StreakGuard<S>>>,
  Path(id): Path<String>,
  body: Result<Json<ValidateBody>, JsonRejection>,
) -> Result<Json<ValidationOutcome>, ApiError>
where
  S: ProgressStore + 'static,
{
  let user_id = UserId::new(id)?;
  let proposed = body
    .map_err(|rejection| rejection.body_text())
    .and_then(|Json(body)| proposal(&body.proposed_streak));

  let outcome = match proposed {
    Ok(proposed) => guard.validate(&user_id, proposed).await,
    Err(message) => ValidationOutcome::validation_error(message),
  };
  Ok(Json(outcome))
}
