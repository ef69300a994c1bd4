//! Fire-and-forget telemetry for update outcomes.
//!
//! Sinks are called synchronously on the request path and must not block.
//! The engine discards every sink error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{outcome::ReasonCode, progress::UserId};

/// One event per protected-update outcome, accepted or rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
  pub event_id:        Uuid,
  pub user_id:         UserId,
  pub accepted:        bool,
  pub reason_code:     ReasonCode,
  pub attempted_value: i64,
  pub applied_value:   u32,
  pub trigger_reason:  String,
  pub occurred_at:     DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SinkError {
  #[error("analytics sink is closed")]
  Closed,

  #[error("analytics sink is full")]
  Full,
}

pub trait AnalyticsSink: Send + Sync {
  fn emit(&self, event: AnalyticsEvent) -> Result<(), SinkError>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AnalyticsSink for NullSink {
  fn emit(&self, _event: AnalyticsEvent) -> Result<(), SinkError> { Ok(()) }
}
