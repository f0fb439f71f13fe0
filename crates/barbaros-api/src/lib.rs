//! JSON REST API for Barbaros.
//!
//! Exposes an axum [`Router`] backed by any [`ClientRepository`]. Identity
//! comes from HTTP Basic credentials checked against the store; TLS and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", barbaros_api::api_router(state))
//! ```

pub mod accounts;
pub mod auth;
pub mod badges;
pub mod clients;
pub mod error;
pub mod rewards;
pub mod scan;
pub mod services;
pub mod visits;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use barbaros_core::{loyalty::DEFAULT_VISITS_PER_REWARD, store::ClientRepository};
use barbaros_qr::still::DEFAULT_MAX_UPLOAD_BYTES;
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Behaviour knobs for the API, usually lifted from the server config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub visits_per_reward: u32,
  /// Largest image accepted by `POST /scan`, in bytes.
  pub max_upload_bytes:  usize,
  /// Edge length of rendered badges, in pixels.
  pub badge_width:       u32,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      visits_per_reward: DEFAULT_VISITS_PER_REWARD,
      max_upload_bytes:  DEFAULT_MAX_UPLOAD_BYTES,
      badge_width:       300,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: ClientRepository> {
  pub store:  Arc<S>,
  pub config: Arc<ApiConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: ClientRepository + Clone + 'static,
{
  let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

  Router::new()
    // Accounts
    .route("/register", post(accounts::register::<S>))
    .route("/login", post(accounts::login::<S>))
    .route("/me", get(accounts::me::<S>))
    // Clients
    .route("/clients", get(clients::list::<S>).post(clients::create::<S>))
    .route("/clients/search", get(clients::search::<S>))
    .route("/clients/lookup", get(clients::lookup::<S>))
    .route(
      "/clients/{id}",
      get(clients::get_one::<S>)
        .put(clients::update::<S>)
        .delete(clients::delete_one::<S>),
    )
    // Badges
    .route("/clients/{id}/qrcode", get(badges::issue::<S>).post(badges::rotate::<S>))
    // Visits and loyalty
    .route("/clients/{id}/visits", get(visits::list::<S>).post(visits::record::<S>))
    .route("/visits", get(visits::between::<S>))
    .route("/visits/{id}", put(visits::update::<S>).delete(visits::delete_one::<S>))
    .route("/clients/{id}/rewards", get(rewards::status::<S>))
    .route("/clients/{id}/rewards/redeem", post(rewards::redeem::<S>))
    // Service catalog
    .route("/services", get(services::list::<S>).post(services::create::<S>))
    .route(
      "/services/{id}",
      get(services::get_one::<S>)
        .put(services::update::<S>)
        .delete(services::delete_one::<S>),
    )
    .route(
      "/service-categories",
      get(services::categories::<S>).post(services::create_category::<S>),
    )
    .route("/service-categories/{id}/services", get(services::by_category::<S>))
    // Scanning
    .route("/scan", post(scan::image::<S>).layer(upload_limit))
    .route("/scan/text", post(scan::text::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
