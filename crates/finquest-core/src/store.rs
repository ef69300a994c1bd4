//! The `ProgressStore` trait — the document store the engine runs against.
//!
//! The trait is implemented by storage backends (e.g.
//! `finquest-store-sqlite`). The engine depends on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use crate::{
  incident::{IncidentRecord, NewIncident},
  progress::{CommitResult, StreakPatch, UserId, UserProgressRecord},
};

/// Abstraction over a progress-record backend.
///
/// Records are keyed by [`UserId`] and carry a `revision` that the store bumps
/// on every write. Incidents are append-only.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ProgressStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Records ───────────────────────────────────────────────────────────

  /// Create a baseline (all-zero) record for `user_id`.
  ///
  /// Returns an error if the user already has a record.
  fn create_record(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<UserProgressRecord, Self::Error>> + Send + '_;

  /// Retrieve a record. Returns `None` if the user has none.
  fn get_record(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Option<UserProgressRecord>, Self::Error>>
  + Send
  + '_;

  /// Write every streak field of `patch` in one atomic statement, but only if
  /// the stored `revision` still equals `expected_revision`.
  ///
  /// Returns [`CommitResult::Stale`] when the record has moved on, and an
  /// error if the record does not exist.
  fn commit_streak(
    &self,
    user_id: UserId,
    expected_revision: u64,
    patch: StreakPatch,
  ) -> impl Future<Output = Result<CommitResult, Self::Error>> + Send + '_;

  /// Atomically add `xp_delta` to `xp` and increment
  /// `completed_quests_count`.
  fn record_quest_completion(
    &self,
    user_id: UserId,
    xp_delta: u64,
  ) -> impl Future<Output = Result<UserProgressRecord, Self::Error>> + Send + '_;

  // ── Incidents — append-only ───────────────────────────────────────────

  /// Append an incident. The key and `recorded_at` are set by the store.
  fn record_incident(
    &self,
    input: NewIncident,
  ) -> impl Future<Output = Result<IncidentRecord, Self::Error>> + Send + '_;

  /// All incidents for a user, oldest first.
  fn list_incidents(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Vec<IncidentRecord>, Self::Error>> + Send + '_;
}
