//! Error types for `finquest-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("user id must not be empty")]
  EmptyUserId,

  #[error("unknown reason code: {0:?}")]
  UnknownReasonCode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
