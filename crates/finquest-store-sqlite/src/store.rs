//! [`SqliteStore`] — the SQLite implementation of [`ProgressStore`].

use std::path::Path;

use chrono::Utc;
use finquest_core::{
  incident::{IncidentRecord, NewIncident, incident_key},
  progress::{CommitResult, StreakPatch, UserId, UserProgressRecord},
  store::ProgressStore,
};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{RECORD_COLUMNS, RawIncident, RawRecord, encode_dt, encode_u64},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A finquest progress store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn select_record(
  conn: &rusqlite::Connection,
  user_id: &str,
) -> rusqlite::Result<Option<RawRecord>> {
  conn
    .query_row(
      &format!("SELECT {RECORD_COLUMNS} FROM users WHERE user_id = ?1"),
      rusqlite::params![user_id],
      RawRecord::from_row,
    )
    .optional()
}

// ─── ProgressStore impl ──────────────────────────────────────────────────────

impl ProgressStore for SqliteStore {
  type Error = Error;

  // ── Records ───────────────────────────────────────────────────────────────

  async fn create_record(&self, user_id: UserId) -> Result<UserProgressRecord> {
    let record = UserProgressRecord::baseline(user_id.clone(), Utc::now());

    let id_str = record.user_id.as_str().to_owned();
    let at_str = encode_dt(record.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO users (user_id, created_at, updated_at)
           VALUES (?1, ?2, ?2)
           ON CONFLICT (user_id) DO NOTHING",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(changed)
      })
      .await?;

    if inserted == 0 {
      return Err(Error::RecordExists(user_id));
    }
    Ok(record)
  }

  async fn get_record(&self, user_id: UserId) -> Result<Option<UserProgressRecord>> {
    let id_str = user_id.as_str().to_owned();

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| Ok(select_record(conn, &id_str)?))
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn commit_streak(
    &self,
    user_id:           UserId,
    expected_revision: u64,
    patch:             StreakPatch,
  ) -> Result<CommitResult> {
    let id_str       = user_id.as_str().to_owned();
    let last_at_str  = encode_dt(patch.last_streak_update_at);
    let updated_str  = encode_dt(Utc::now());
    let expected_rev = encode_u64(expected_revision);

    let (changed, raw) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE users SET
             current_streak            = ?1,
             longest_streak            = ?2,
             last_streak_update_at     = ?3,
             last_streak_update_reason = ?4,
             daily_streak_update_count = ?5,
             revision                  = revision + 1,
             updated_at                = ?6
           WHERE user_id = ?7 AND revision = ?8",
          rusqlite::params![
            i64::from(patch.current_streak),
            i64::from(patch.longest_streak),
            last_at_str,
            patch.last_streak_update_reason,
            i64::from(patch.daily_streak_update_count),
            updated_str,
            id_str,
            expected_rev,
          ],
        )?;
        let raw = select_record(&tx, &id_str)?;
        tx.commit()?;
        Ok((changed, raw))
      })
      .await?;

    match raw {
      None => Err(Error::RecordNotFound(user_id)),
      Some(_) if changed == 0 => Ok(CommitResult::Stale),
      Some(raw) => Ok(CommitResult::Committed(raw.into_record()?)),
    }
  }

  async fn record_quest_completion(
    &self,
    user_id:  UserId,
    xp_delta: u64,
  ) -> Result<UserProgressRecord> {
    let id_str      = user_id.as_str().to_owned();
    let updated_str = encode_dt(Utc::now());
    let delta       = encode_u64(xp_delta);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE users SET
             xp                     = xp + ?1,
             completed_quests_count = completed_quests_count + 1,
             revision               = revision + 1,
             updated_at             = ?2
           WHERE user_id = ?3",
          rusqlite::params![delta, updated_str, id_str],
        )?;
        let raw = select_record(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw
      .ok_or(Error::RecordNotFound(user_id))
      .and_then(RawRecord::into_record)
  }

  // ── Incidents — append-only ───────────────────────────────────────────────

  async fn record_incident(&self, input: NewIncident) -> Result<IncidentRecord> {
    let recorded_at = Utc::now();
    let incident = IncidentRecord {
      incident_key:    incident_key(&input.user_id, recorded_at),
      user_id:         input.user_id,
      attempted_value: input.attempted_value,
      applied_value:   input.applied_value,
      reason_code:     input.reason_code,
      message:         input.message,
      recorded_at,
    };

    let key_str     = incident.incident_key.clone();
    let user_str    = incident.user_id.as_str().to_owned();
    let attempted   = incident.attempted_value;
    let applied     = i64::from(incident.applied_value);
    let reason_str  = incident.reason_code.as_str();
    let message     = incident.message.clone();
    let at_str      = encode_dt(incident.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO streak_incidents (
             incident_key, user_id, attempted_value, applied_value,
             reason_code, message, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            key_str, user_str, attempted, applied, reason_str, message, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(incident)
  }

  async fn list_incidents(&self, user_id: UserId) -> Result<Vec<IncidentRecord>> {
    let id_str = user_id.as_str().to_owned();

    let raws: Vec<RawIncident> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT incident_key, user_id, attempted_value, applied_value,
                  reason_code, message, recorded_at
           FROM streak_incidents
           WHERE user_id = ?1
           ORDER BY seq",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawIncident {
              incident_key:    row.get(0)?,
              user_id:         row.get(1)?,
              attempted_value: row.get(2)?,
              applied_value:   row.get(3)?,
              reason_code:     row.get(4)?,
              message:         row.get(5)?,
              recorded_at:     row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIncident::into_incident).collect()
  }
}
