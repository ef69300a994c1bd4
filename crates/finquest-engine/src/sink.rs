//! Built-in [`AnalyticsSink`] implementations.

use finquest_core::analytics::{AnalyticsEvent, AnalyticsSink, SinkError};
use tokio::sync::mpsc;
use tracing::info;

/// Logs each event as a structured `tracing` record under the
/// `finquest::analytics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
  fn emit(&self, event: AnalyticsEvent) -> Result<(), SinkError> {
    info!(
      target: "finquest::analytics",
      event_id = %event.event_id,
      user_id = %event.user_id,
      accepted = event.accepted,
      reason = %event.reason_code,
      attempted = event.attempted_value,
      applied = event.applied_value,
      trigger = %event.trigger_reason,
      "streak_update"
    );
    Ok(())
  }
}

/// Hands events to a collector task over a bounded channel. Never waits:
/// events are dropped when the channel is full or the collector is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
  tx: mpsc::Sender<AnalyticsEvent>,
}

impl ChannelSink {
  pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AnalyticsEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Self { tx }, rx)
  }
}

impl AnalyticsSink for ChannelSink {
  fn emit(&self, event: AnalyticsEvent) -> Result<(), SinkError> {
    self.tx.try_send(event).map_err(|e| match e {
      mpsc::error::TrySendError::Full(_) => SinkError::Full,
      mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
    })
  }
}
