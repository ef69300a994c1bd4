//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users` | Body: `{"user_id":"..."}`; 201, or 409 if it exists |
//! | `GET`  | `/users/:id` | 404 if not found |
//! | `GET`  | `/users/:id/incidents` | Oldest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use finquest_core::{
  incident::IncidentRecord,
  progress::{UserId, UserProgressRecord},
  store::ProgressStore,
};
use finquest_engine::StreakGuard;
use serde::Deserialize;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_id: String,
}

/// `POST /users` — body: `{"user_id":"..."}`
pub async fn create<S>(
  State(guard): State<Arc<StreakGuard<S>>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ProgressStore + 'static,
{
  let user_id = UserId::new(body.user_id)?;
  let store = guard.store();

  let existing = store
    .get_record(user_id.clone())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if existing.is_some() {
    return Err(ApiError::Conflict(format!("user {user_id} already has a record")));
  }

  let record = store
    .create_record(user_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /users/:id`
pub async fn get_one<S>(
  State(guard): State<Arc<StreakGuard<S>>>,
  Path(id): Path<String>,
) -> Result<Json<UserProgressRecord>, ApiError>
where
  S: ProgressStore + 'static,
{
  let user_id = UserId::new(id)?;
  let record = guard
    .store()
    .get_record(user_id.clone())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;
  Ok(Json(record))
}

// ─── Incidents ────────────────────────────────────────────────────────────────

/// `GET /users/:id/incidents`
pub async fn incidents<S>(
  State(guard): State<Arc<StreakGuard<S>>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<IncidentRecord>>, ApiError>
where
  S: ProgressStore + 'static,
{
  let incidents = guard
    .store()
    .list_incidents(UserId::new(id)?)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(incidents))
}
