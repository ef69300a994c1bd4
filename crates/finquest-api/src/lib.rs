//! JSON REST API for finquest progress records.
//!
//! Exposes an axum [`Router`] backed by a [`StreakGuard`] over any
//! [`finquest_core::store::ProgressStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", finquest_api::api_router(guard.clone()))
//! ```

pub mod error;
pub mod quests;
pub mod streak;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use finquest_core::store::ProgressStore;
use finquest_engine::StreakGuard;

pub use error::ApiError;

/// Build a fully-materialised API router for `guard`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(guard: Arc<StreakGuard<S>>) -> Router<()>
where
  S: ProgressStore + 'static,
{
  Router::new()
    // Records
    .route("/users", post(users::create::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    .route("/users/{id}/incidents", get(users::incidents::<S>))
    // Streak
    .route("/users/{id}/streak", post(streak::apply::<S>))
    .route("/users/{id}/streak/validate", post(streak::validate::<S>))
    // Quests
    .route("/users/{id}/quests/complete", post(quests::complete::<S>))
    .route("/quests/score", post(quests::score))
    .with_state(guard)
}

#[cfg(test)]
mod tests;
