use std::{sync::Arc, time::Duration};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use finquest_core::policy::StreakPolicy;
use finquest_engine::StreakGuard;
use finquest_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn make_guard() -> Arc<StreakGuard<SqliteStore>> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  Arc::new(StreakGuard::new(Arc::new(store), StreakPolicy::default()))
}

async fn send(
  guard: &Arc<StreakGuard<SqliteStore>>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = api_router(guard.clone())
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

/// Send `body` verbatim as JSON; for bodies `serde_json::Value` can't hold.
async fn send_raw(
  guard: &Arc<StreakGuard<SqliteStore>>,
  uri: &str,
  body: &str,
) -> (StatusCode, Value) {
  let req = Request::post(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_owned()))
    .unwrap();
  let resp = api_router(guard.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  (status, serde_json::from_slice(&bytes).unwrap())
}

fn assert_validation_error(body: &Value) {
  assert_eq!(body["accepted"], false, "{body}");
  assert_eq!(body["reason_code"], "validation_error", "{body}");
  assert_eq!(body["applied_value"], 0, "{body}");
}

async fn create(guard: &Arc<StreakGuard<SqliteStore>>, user: &str) {
  let (status, _) = send(guard, "POST", "/users", Some(json!({ "user_id": user }))).await;
  assert_eq!(status, StatusCode::CREATED);
}

// ── Records ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get_returns_baseline() {
  let guard = make_guard().await;
  create(&guard, "alice").await;

  let (status, body) = send(&guard, "GET", "/users/alice", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user_id"], "alice");
  assert_eq!(body["current_streak"], 0);
  assert_eq!(body["longest_streak"], 0);
  assert_eq!(body["last_streak_update_at"], Value::Null);
}

#[tokio::test]
async fn duplicate_create_is_409() {
  let guard = make_guard().await;
  create(&guard, "alice").await;

  let (status, body) = send(&guard, "POST", "/users", Some(json!({ "user_id": "alice" }))).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("alice"));
}

#[tokio::test]
async fn empty_user_id_is_400() {
  let guard = make_guard().await;
  let (status, _) = send(&guard, "POST", "/users", Some(json!({ "user_id": "" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_user_is_404() {
  let guard = make_guard().await;
  let (status, body) = send(&guard, "GET", "/users/nobody", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());
}

// ── Streak ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_advance_is_accepted_and_persisted() {
  let guard = make_guard().await;
  create(&guard, "alice").await;

  let (status, body) = send(
    &guard,
    "POST",
    "/users/alice/streak",
    Some(json!({ "proposed_streak": 1, "trigger_reason": "quest_completion" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["accepted"], true);
  assert_eq!(body["reason_code"], "valid");
  assert_eq!(body["applied_value"], 1);

  let (_, record) = send(&guard, "GET", "/users/alice", None).await;
  assert_eq!(record["current_streak"], 1);
  assert_eq!(record["longest_streak"], 1);
  assert_eq!(record["last_streak_update_reason"], "quest_completion");
}

#[tokio::test]
async fn jump_is_clamped_and_logged_as_incident() {
  let guard = make_guard().await;
  create(&guard, "alice").await;

  let (status, body) = send(
    &guard,
    "POST",
    "/users/alice/streak",
    Some(json!({ "proposed_streak": 10, "trigger_reason": "quest_completion" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["accepted"], false);
  assert_eq!(body["reason_code"], "increment_too_high");
  assert_eq!(body["applied_value"], 1);

  // The incident write runs off the request path.
  let mut incidents = Value::Null;
  for _ in 0..100 {
    let (_, list) = send(&guard, "GET", "/users/alice/incidents", None).await;
    if list.as_array().is_some_and(|a| !a.is_empty()) {
      incidents = list;
      break;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  let incidents = incidents.as_array().expect("incident was never recorded");
  assert_eq!(incidents.len(), 1);
  assert_eq!(incidents[0]["attempted_value"], 10);
  assert_eq!(incidents[0]["applied_value"], 1);
  assert_eq!(incidents[0]["reason_code"], "increment_too_high");
}

#[tokio::test]
async fn unknown_user_streak_is_validation_error() {
  let guard = make_guard().await;
  let (status, body) = send(
    &guard,
    "POST",
    "/users/ghost/streak",
    Some(json!({ "proposed_streak": 1, "trigger_reason": "quest_completion" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["accepted"], false);
  assert_eq!(body["reason_code"], "validation_error");
  assert_eq!(body["applied_value"], 0);
}

#[tokio::test]
async fn validate_route_does_not_write() {
  let guard = make_guard().await;
  create(&guard, "alice").await;

  let (status, body) = send(
    &guard,
    "POST",
    "/users/alice/streak/validate",
    Some(json!({ "proposed_streak": 1 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["accepted"], true);

  let (_, record) = send(&guard, "GET", "/users/alice", None).await;
  assert_eq!(record["current_streak"], 0);
  assert_eq!(record["revision"], 0);
}

#[tokio::test]
async fn malformed_proposals_are_outcomes_not_errors() {
  let guard = make_guard().await;
  create(&guard, "alice").await;

  for body in [
    r#"{"proposed_streak": 6.5, "trigger_reason": "quest_completion"}"#,
    r#"{"proposed_streak": "6", "trigger_reason": "quest_completion"}"#,
    r#"{"proposed_streak": 99999999999999999999999, "trigger_reason": "quest_completion"}"#,
    r#"{"trigger_reason": "quest_completion"}"#,
    r#"{"proposed_streak": 1}"#,
    r#"{"proposed_streak": 1, "trigger_reason": 7}"#,
    "not json",
  ] {
    let (status, outcome) = send_raw(&guard, "/users/alice/streak", body).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_validation_error(&outcome);
  }

  let (_, record) = send(&guard, "GET", "/users/alice", None).await;
  assert_eq!(record["current_streak"], 0);
  assert_eq!(record["revision"], 0);
}

#[tokio::test]
async fn negative_proposal_is_a_validation_error() {
  let guard = make_guard().await;
  create(&guard, "alice").await;

  let (status, outcome) = send_raw(
    &guard,
    "/users/alice/streak",
    r#"{"proposed_streak": -3, "trigger_reason": "quest_completion"}"#,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_validation_error(&outcome);
}

#[tokio::test]
async fn malformed_dry_run_is_a_validation_error() {
  let guard = make_guard().await;
  create(&guard, "alice").await;

  for body in [r#"{"proposed_streak": 1.5}"#, "{}", "42"] {
    let (status, outcome) = send_raw(&guard, "/users/alice/streak/validate", body).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_validation_error(&outcome);
  }
}

// ── Quests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn completing_a_quest_grants_xp_and_advances() {
  let guard = make_guard().await;
  create(&guard, "alice").await;

  let completion = json!({
    "steps": [
      { "step_index": 0, "step_type": "scored_choice", "correct_option": 1 },
      { "step_index": 1, "step_type": "scored_choice", "correct_option": 2 },
      { "step_index": 2, "step_type": "checklist" },
    ],
    "responses": [
      { "step_index": 0, "selected_option": 1 },
      { "step_index": 1, "selected_option": 0 },
    ],
    "xp_reward": 200,
  });
  let (status, report) =
    send(&guard, "POST", "/users/alice/quests/complete", Some(completion)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["score"], 50);
  assert_eq!(report["xp_awarded"], 100);
  assert_eq!(report["streak"]["accepted"], true);
  assert_eq!(report["streak"]["applied_value"], 1);

  let (_, record) = send(&guard, "GET", "/users/alice", None).await;
  assert_eq!(record["xp"], 100);
  assert_eq!(record["completed_quests_count"], 1);
  assert_eq!(record["current_streak"], 1);
}

#[tokio::test]
async fn score_route_rounds_to_whole_percent() {
  let guard = make_guard().await;
  let answers = json!({
    "answers": [
      { "step_index": 0, "step_type": "scored_choice", "is_correct": true },
      { "step_index": 1, "step_type": "scored_choice", "is_correct": true },
      { "step_index": 2, "step_type": "scored_choice", "is_correct": false },
      { "step_index": 3, "step_type": "free_form" },
    ]
  });
  let (status, body) = send(&guard, "POST", "/quests/score", Some(answers)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["score"], 67);
}

#[tokio::test]
async fn score_with_no_scored_steps_is_full_marks() {
  let guard = make_guard().await;
  let answers = json!({
    "answers": [{ "step_index": 0, "step_type": "checklist", "is_correct": false }]
  });
  let (_, body) = send(&guard, "POST", "/quests/score", Some(answers)).await;
  assert_eq!(body["score"], 100);
}

#[tokio::test]
async fn malformed_completion_is_a_zero_report() {
  let guard = make_guard().await;
  create(&guard, "alice").await;

  let (status, report) = send_raw(
    &guard,
    "/users/alice/quests/complete",
    r#"{"steps": "not a list", "xp_reward": 100}"#,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["score"], 0);
  assert_eq!(report["xp_awarded"], 0);
  assert_validation_error(&report["streak"]);

  let (_, record) = send(&guard, "GET", "/users/alice", None).await;
  assert_eq!(record["xp"], 0);
  assert_eq!(record["completed_quests_count"], 0);
}
