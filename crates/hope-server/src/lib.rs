//! RPC surface for Hope over HTTP/JSON.
//!
//! Exposes an axum [`Router`] with one `POST` route per method, named
//! `/hope.v1.<Service>/<Method>`, backed by any [`Store`]. Every route except
//! the configured public methods sits behind the identity gate in
//! [`auth::gate`].

pub mod auth;
pub mod deadline;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware, routing::post};
use hope_core::{
  lifecycle::MatchEngine,
  matching::CompletionPolicy,
  presence::PresenceService,
  rides::RideService,
  store::Store,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{Gate, GoogleVerifier, LoginPolicy, LoginService, SessionKeys, google};
use handlers::{matches, rides, users};

pub const LOGIN_METHOD: &str = "/hope.v1.AuthService/Login";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `HOPE_*`
/// environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  pub store_path:           PathBuf,
  pub jwt_secret:           String,
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours:    u32,
  pub google_client_id:     String,
  #[serde(default = "default_tokeninfo_url")]
  pub google_tokeninfo_url: String,
  #[serde(default)]
  pub allowed_domains:      Vec<String>,
  #[serde(default = "default_public_methods")]
  pub public_methods:       Vec<String>,
  #[serde(default)]
  pub completion_policy:    CompletionPolicy,
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_session_ttl_hours() -> u32 { 24 }
fn default_tokeninfo_url() -> String { google::DEFAULT_TOKENINFO_URL.to_owned() }
fn default_public_methods() -> Vec<String> { vec![LOGIN_METHOD.to_owned()] }
fn default_request_timeout_secs() -> u64 { 30 }

impl ServerConfig {
  pub fn session_keys(&self) -> SessionKeys {
    SessionKeys::new(
      self.jwt_secret.as_bytes(),
      chrono::Duration::hours(i64::from(self.session_ttl_hours)),
    )
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub engine:          MatchEngine<S>,
  pub rides:           RideService<S>,
  pub presence:        PresenceService<S>,
  pub login:           Arc<LoginService<S>>,
  pub gate:            Arc<Gate>,
  pub request_timeout: Duration,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      engine:          self.engine.clone(),
      rides:           self.rides.clone(),
      presence:        self.presence.clone(),
      login:           Arc::clone(&self.login),
      gate:            Arc::clone(&self.gate),
      request_timeout: self.request_timeout,
    }
  }
}

impl<S: Store> AppState<S> {
  /// Wire every service to `store`. Secrets, the allowlist and the client id
  /// come from `config` and are fixed for the life of the state.
  pub fn new(store: Arc<S>, config: &ServerConfig, verifier: GoogleVerifier) -> Self {
    let keys = Arc::new(config.session_keys());
    let gate = Gate::new(Arc::clone(&keys), config.public_methods.iter().cloned());
    let policy = LoginPolicy::new(config.google_client_id.clone(), &config.allowed_domains);

    Self {
      engine:          MatchEngine::new(Arc::clone(&store), config.completion_policy),
      rides:           RideService::new(Arc::clone(&store)),
      presence:        PresenceService::new(Arc::clone(&store)),
      login:           Arc::new(LoginService::new(store, verifier, policy, keys)),
      gate:            Arc::new(gate),
      request_timeout: Duration::from_secs(config.request_timeout_secs),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for every RPC method.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: Store + 'static,
{
  let gate = Arc::clone(&state.gate);
  let timeout = state.request_timeout;

  Router::new()
    .route(LOGIN_METHOD,                                     post(handlers::auth::login::<S>))
    // Matches
    .route("/hope.v1.MatchService/RequestToJoin",            post(matches::request_to_join::<S>))
    .route("/hope.v1.MatchService/AcceptRideRequest",        post(matches::accept_ride_request::<S>))
    .route("/hope.v1.MatchService/AcceptRequest",            post(matches::accept_request::<S>))
    .route("/hope.v1.MatchService/RejectRequest",            post(matches::reject_request::<S>))
    .route("/hope.v1.MatchService/CompleteMatch",            post(matches::complete_match::<S>))
    .route("/hope.v1.MatchService/GetMatch",                 post(matches::get_match::<S>))
    .route("/hope.v1.MatchService/ListMatchesByRide",        post(matches::list_matches_by_ride::<S>))
    .route("/hope.v1.MatchService/ListMatchesByRider",       post(matches::list_matches_by_rider::<S>))
    .route("/hope.v1.MatchService/ListMyMatches",            post(matches::list_my_matches::<S>))
    // Rides
    .route("/hope.v1.RideService/CreateOffer",               post(rides::create_offer::<S>))
    .route("/hope.v1.RideService/GetOffer",                  post(rides::get_offer::<S>))
    .route("/hope.v1.RideService/CreateRequest",             post(rides::create_request::<S>))
    .route("/hope.v1.RideService/GetRequest",                post(rides::get_request::<S>))
    // Users
    .route("/hope.v1.UserService/GetMe",                     post(users::get_me::<S>))
    .route("/hope.v1.UserService/TouchLastSeen",             post(users::touch_last_seen::<S>))
    .route_layer(middleware::from_fn_with_state(gate, auth::gate::authenticate))
    .layer(middleware::from_fn_with_state(timeout, deadline::enforce))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support;
