//! Handlers for quest completion and scoring.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
};
use finquest_core::{progress::UserId, quest::QuestCompletionAnswer, store::ProgressStore};
use finquest_engine::{
  StreakGuard,
  quest::{QuestCompletion, QuestCompletionReport},
  scorer,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// `POST /users/:id/quests/complete` — body: [`QuestCompletion`].
///
/// An unreadable body yields a zero-score report with a `validation_error`
/// streak outcome; nothing is written.
pub async fn complete<S>(
  State(guard): State<Arc<StreakGuard<S>>>,
  Path(id): Path<String>,
  body: Result<Json<QuestCompletion>, JsonRejection>,
) -> Result<Json<QuestCompletionReport>, ApiError>
where
  S: ProgressStore + 'static,
{
  let user_id = UserId::new(id)?;
  let report = match body {
    Ok(Json(completion)) => guard.complete_quest(&user_id, completion).await,
    Err(rejection) => QuestCompletionReport::rejected(rejection.body_text()),
  };
  Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct ScoreBody {
  pub answers: Vec<QuestCompletionAnswer>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
  pub score: u8,
}

/// `POST /quests/score` — body: `{"answers":[...]}`
pub async fn score(Json(body): Json<ScoreBody>) -> Json<ScoreResponse> {
  Json(ScoreResponse { score: scorer::score(&body.answers) })
}
