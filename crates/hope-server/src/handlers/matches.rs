//! `hope.v1.MatchService`.
//!
//! | Method | Body | Reply |
//! |--------|------|-------|
//! | `RequestToJoin` | `{ride_id}` | `{match}` |
//! | `AcceptRideRequest` | `{request_id}` | `{match, offer}` |
//! | `AcceptRequest` / `RejectRequest` | `{match_id}` | `{match}` |
//! | `CompleteMatch` | `{match_id}` | `{match}` |
//! | `GetMatch` | `{match_id}` | `{match}` |
//! | `ListMatchesByRide` | `{ride_id}` | `{matches}` |
//! | `ListMatchesByRider` | `{rider_id}` | `{matches}` |
//! | `ListMyMatches` | `{}` | `{matches}` |

use axum::extract::State;
use hope_core::{
  matching::{Accepted, Match},
  store::Store,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Rpc;
use crate::{AppState, auth::Caller, error::ApiError};

// ─── Bodies ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RideIdBody {
  pub ride_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RequestIdBody {
  pub request_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct MatchIdBody {
  pub match_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RiderIdBody {
  pub rider_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MatchReply {
  #[serde(rename = "match")]
  pub record: Match,
}

#[derive(Debug, Serialize)]
pub struct MatchesReply {
  pub matches: Vec<Match>,
}

// ─── Writes ──────────────────────────────────────────────────────────────────

pub async fn request_to_join<S: Store>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Rpc(body): Rpc<RideIdBody>,
) -> Result<Rpc<MatchReply>, ApiError> {
  let record = state.engine.request_to_join(&caller, body.ride_id).await?;
  Ok(Rpc(MatchReply { record }))
}

pub async fn accept_ride_request<S: Store>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Rpc(body): Rpc<RequestIdBody>,
) -> Result<Rpc<Accepted>, ApiError> {
  let accepted = state.engine.accept_ride_request(&caller, body.request_id).await?;
  Ok(Rpc(accepted))
}

pub async fn accept_request<S: Store>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Rpc(body): Rpc<MatchIdBody>,
) -> Result<Rpc<MatchReply>, ApiError> {
  let record = state.engine.accept_request(&caller, body.match_id).await?;
  Ok(Rpc(MatchReply { record }))
}

pub async fn reject_request<S: Store>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Rpc(body): Rpc<MatchIdBody>,
) -> Result<Rpc<MatchReply>, ApiError> {
  let record = state.engine.reject_request(&caller, body.match_id).await?;
  Ok(Rpc(MatchReply { record }))
}

pub async fn complete_match<S: Store>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Rpc(body): Rpc<MatchIdBody>,
) -> Result<Rpc<MatchReply>, ApiError> {
  let record = state.engine.complete_match(&caller, body.match_id).await?;
  Ok(Rpc(MatchReply { record }))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub async fn get_match<S: Store>(
  State(state): State<AppState<S>>,
  Caller(_): Caller,
  Rpc(body): Rpc<MatchIdBody>,
) -> Result<Rpc<MatchReply>, ApiError> {
  let record = state.engine.get_match(body.match_id).await?;
  Ok(Rpc(MatchReply { record }))
}

pub async fn list_matches_by_ride<S: Store>(
  State(state): State<AppState<S>>,
  Caller(_): Caller,
  Rpc(body): Rpc<RideIdBody>,
) -> Result<Rpc<MatchesReply>, ApiError> {
  let matches = state.engine.list_matches_by_ride(body.ride_id).await?;
  Ok(Rpc(MatchesReply { matches }))
}

pub async fn list_matches_by_rider<S: Store>(
  State(state): State<AppState<S>>,
  Caller(_): Caller,
  Rpc(body): Rpc<RiderIdBody>,
) -> Result<Rpc<MatchesReply>, ApiError> {
  let matches = state.engine.list_matches_by_rider(body.rider_id).await?;
  Ok(Rpc(MatchesReply { matches }))
}

pub async fn list_my_matches<S: Store>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
) -> Result<Rpc<MatchesReply>, ApiError> {
  let matches = state.engine.list_my_matches(&caller).await?;
  Ok(Rpc(MatchesReply { matches }))
}
