//! In-process test doubles: a `HashMap`-backed store with fault injection and
//! a hand-driven clock.

use std::{
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicBool, AtomicU32, Ordering},
  },
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use finquest_core::{
  clock::Clock,
  incident::{IncidentRecord, NewIncident, incident_key},
  progress::{CommitResult, StreakPatch, UserId, UserProgressRecord},
  store::ProgressStore,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("store unavailable")]
  Unavailable,
  #[error("record not found: {0}")]
  NotFound(UserId),
  #[error("record exists: {0}")]
  Exists(UserId),
}

#[derive(Default)]
pub struct MemoryStore {
  records:        Mutex<HashMap<UserId, UserProgressRecord>>,
  incidents:      Mutex<Vec<IncidentRecord>>,
  /// Every read fails.
  pub fail_reads:     AtomicBool,
  /// Every incident write fails.
  pub fail_incidents: AtomicBool,
  /// Reads hang for an hour.
  pub stall_reads:    AtomicBool,
  /// Commits hang for an hour.
  pub stall_commits:  AtomicBool,
  /// Number of upcoming commits that lose a race to another session's xp
  /// grant, which bumps the revision just before the commit lands.
  pub lose_races:     AtomicU32,
  /// Commits that reached the store, including stale ones.
  pub commit_calls:   AtomicU32,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Seed a record as-is, bypassing every rule.
  pub fn seed(&self, record: UserProgressRecord) {
    self
      .records
      .lock()
      .unwrap()
      .insert(record.user_id.clone(), record);
  }

  pub fn record(&self, user_id: &UserId) -> Option<UserProgressRecord> {
    self.records.lock().unwrap().get(user_id).cloned()
  }

  pub fn incidents(&self) -> Vec<IncidentRecord> { self.incidents.lock().unwrap().clone() }
}

impl ProgressStore for MemoryStore {
  type Error = MemoryError;

  async fn create_record(&self, user_id: UserId) -> Result<UserProgressRecord, MemoryError> {
    let mut records = self.records.lock().unwrap();
    if records.contains_key(&user_id) {
      return Err(MemoryError::Exists(user_id));
    }
    let record = UserProgressRecord::baseline(user_id.clone(), Utc::now());
    records.insert(user_id, record.clone());
    Ok(record)
  }

  async fn get_record(
    &self,
    user_id: UserId,
  ) -> Result<Option<UserProgressRecord>, MemoryError> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(MemoryError::Unavailable);
    }
    stall(&self.stall_reads).await;
    let record = self.record(&user_id);
    // Let other sessions in between this read and the caller's commit.
    tokio::task::yield_now().await;
    Ok(record)
  }

  async fn commit_streak(
    &self,
    user_id: UserId,
    expected_revision: u64,
    patch: StreakPatch,
  ) -> Result<CommitResult, MemoryError> {
    self.commit_calls.fetch_add(1, Ordering::SeqCst);
    stall(&self.stall_commits).await;
    tokio::task::yield_now().await;

    let mut records = self.records.lock().unwrap();
    let record = records
      .get_mut(&user_id)
      .ok_or_else(|| MemoryError::NotFound(user_id.clone()))?;

    if self.lose_races.load(Ordering::SeqCst) > 0 {
      self.lose_races.fetch_sub(1, Ordering::SeqCst);
      record.xp += 10;
      record.completed_quests_count += 1;
      record.revision += 1;
    }

    if record.revision != expected_revision {
      return Ok(CommitResult::Stale);
    }

    record.current_streak = patch.current_streak;
    record.longest_streak = patch.longest_streak;
    record.last_streak_update_at = Some(patch.last_streak_update_at);
    record.last_streak_update_reason = Some(patch.last_streak_update_reason);
    record.daily_streak_update_count = patch.daily_streak_update_count;
    record.revision += 1;
    record.updated_at = Utc::now();
    Ok(CommitResult::Committed(record.clone()))
  }

  async fn record_quest_completion(
    &self,
    user_id: UserId,
    xp_delta: u64,
  ) -> Result<UserProgressRecord, MemoryError> {
    let mut records = self.records.lock().unwrap();
    let record = records
      .get_mut(&user_id)
      .ok_or_else(|| MemoryError::NotFound(user_id.clone()))?;
    record.xp += xp_delta;
    record.completed_quests_count += 1;
    record.revision += 1;
    Ok(record.clone())
  }

  async fn record_incident(&self, input: NewIncident) -> Result<IncidentRecord, MemoryError> {
    if self.fail_incidents.load(Ordering::SeqCst) {
      return Err(MemoryError::Unavailable);
    }
    let recorded_at = Utc::now();
    let incident = IncidentRecord {
      incident_key: incident_key(&input.user_id, recorded_at),
      user_id: input.user_id,
      attempted_value: input.attempted_value,
      applied_value: input.applied_value,
      reason_code: input.reason_code,
      message: input.message,
      recorded_at,
    };
    self.incidents.lock().unwrap().push(incident.clone());
    Ok(incident)
  }

  async fn list_incidents(&self, user_id: UserId) -> Result<Vec<IncidentRecord>, MemoryError> {
    Ok(
      self
        .incidents()
        .into_iter()
        .filter(|i| i.user_id == user_id)
        .collect(),
    )
  }
}

async fn stall(flag: &AtomicBool) {
  if flag.load(Ordering::SeqCst) {
    tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
  }
}

/// A clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
  /// Starts at noon UTC, well clear of any day boundary.
  pub fn new() -> Self {
    Self(Mutex::new(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()))
  }

  pub fn advance(&self, by: Duration) { *self.0.lock().unwrap() += by; }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> { *self.0.lock().unwrap() }
}

pub fn user(raw: &str) -> UserId { UserId::new(raw).unwrap() }

/// A record as of `clock.now()`, last updated `hours_ago` (if ever).
pub fn record_at(
  clock: &ManualClock,
  raw_user: &str,
  current: u32,
  longest: u32,
  hours_ago: Option<i64>,
) -> UserProgressRecord {
  let now = clock.now();
  let mut r = UserProgressRecord::baseline(user(raw_user), now);
  r.current_streak = current;
  r.longest_streak = longest;
  r.last_streak_update_at = hours_ago.map(|h| now - Duration::hours(h));
  r.daily_streak_update_count = u32::from(hours_ago.is_some());
  r
}

/// Let spawned best-effort tasks run, then return the incidents they wrote.
pub async fn settled_incidents(store: &MemoryStore, at_least: usize) -> Vec<IncidentRecord> {
  for _ in 0..1000 {
    if store.incidents().len() >= at_least {
      break;
    }
    tokio::task::yield_now().await;
  }
  // One more round so a surplus incident would show up too.
  for _ in 0..10 {
    tokio::task::yield_now().await;
  }
  store.incidents()
}
