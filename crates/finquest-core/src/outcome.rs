//! Per-request validation outcomes.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Why a proposed streak value was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
  Valid,
  IncrementTooHigh,
  ValueTooHigh,
  UpdateTooSoon,
  DailyQuotaExceeded,
  AnomalyDetected,
  ValidationError,
}

impl ReasonCode {
  /// The discriminant string stored in the `reason_code` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Valid => "valid",
      Self::IncrementTooHigh => "increment_too_high",
      Self::ValueTooHigh => "value_too_high",
      Self::UpdateTooSoon => "update_too_soon",
      Self::DailyQuotaExceeded => "daily_quota_exceeded",
      Self::AnomalyDetected => "anomaly_detected",
      Self::ValidationError => "validation_error",
    }
  }

  /// Rejections whose fallback leaves `current_streak` untouched.
  pub fn is_no_op(self) -> bool {
    matches!(
      self,
      Self::UpdateTooSoon | Self::DailyQuotaExceeded | Self::ValidationError
    )
  }
}

impl fmt::Display for ReasonCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ReasonCode {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "valid" => Ok(Self::Valid),
      "increment_too_high" => Ok(Self::IncrementTooHigh),
      "value_too_high" => Ok(Self::ValueTooHigh),
      "update_too_soon" => Ok(Self::UpdateTooSoon),
      "daily_quota_exceeded" => Ok(Self::DailyQuotaExceeded),
      "anomaly_detected" => Ok(Self::AnomalyDetected),
      "validation_error" => Ok(Self::ValidationError),
      other => Err(Error::UnknownReasonCode(other.to_owned())),
    }
  }
}

/// The decision for one proposed streak value.
///
/// `applied_value` is always safe to display and persist, whether or not the
/// proposal was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
  pub accepted:      bool,
  pub reason_code:   ReasonCode,
  pub applied_value: u32,
  /// Human-readable detail for rejections; carried into the incident record.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message:       Option<String>,
}

impl ValidationOutcome {
  pub fn accept(value: u32) -> Self {
    Self {
      accepted:      true,
      reason_code:   ReasonCode::Valid,
      applied_value: value,
      message:       None,
    }
  }

  pub fn reject(
    reason_code: ReasonCode,
    applied_value: u32,
    message: impl Into<String>,
  ) -> Self {
    Self {
      accepted: false,
      reason_code,
      applied_value,
      message: Some(message.into()),
    }
  }

  /// The fully-failed outcome: rejected with `validation_error` and a
  /// displayable value of zero.
  pub fn validation_error(message: impl Into<String>) -> Self {
    Self::reject(ReasonCode::ValidationError, 0, message)
  }
}
