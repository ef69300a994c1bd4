//! Error type for `finquest-store-sqlite`.

use finquest_core::progress::UserId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] finquest_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("column {column} out of range: {value}")]
  OutOfRange { column: &'static str, value: i64 },

  #[error("progress record not found: {0}")]
  RecordNotFound(UserId),

  #[error("progress record already exists: {0}")]
  RecordExists(UserId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
