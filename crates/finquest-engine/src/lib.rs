//! The progress-integrity engine.
//!
//! Decides whether a client-reported streak value is accepted, clamped, or
//! rejected, and owns every write to the streak fields of a
//! [`UserProgressRecord`](finquest_core::progress::UserProgressRecord).
//!
//! - [`anomaly`] flags implausible jumps.
//! - [`rules`] holds the ordered rule set and its dispatcher.
//! - [`validator`] runs the rules against a stored record.
//! - [`executor`] commits validated (or clamped) updates and audits
//!   rejections.
//! - [`scorer`] and [`quest`] turn a finished quest into a score, xp, and a
//!   streak proposal.

pub mod anomaly;
pub mod error;
pub mod executor;
pub mod quest;
pub mod rules;
pub mod scorer;
pub mod sink;
pub mod validator;

pub use error::{Error, Result};
pub use executor::StreakGuard;
pub use validator::Validator;

#[cfg(test)]
mod testing;
