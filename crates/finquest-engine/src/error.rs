//! Error type for `finquest-engine`.
//!
//! These never leave the crate's public entry points: the executor converts
//! every one of them into a `validation_error` outcome.

use finquest_core::progress::UserId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no progress record for user {0}")]
  RecordNotFound(UserId),

  #[error("proposed streak {0} is negative")]
  NegativeProposal(i64),

  #[error("trigger reason must not be empty")]
  EmptyTriggerReason,

  #[error("store {0} timed out")]
  Timeout(&'static str),

  #[error("record for {0} kept changing; gave up after {1} attempts")]
  Contended(UserId, u32),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
