//! `hope.v1.RideService`. The caller is always the owner of what they publish.

use axum::extract::State;
use hope_core::{
  ride::{OfferDraft, RequestDraft, RideOffer, RideRequest},
  store::Store,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Rpc;
use crate::{AppState, auth::Caller, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct OfferIdBody {
  pub offer_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RequestIdBody {
  pub request_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OfferReply {
  pub offer: RideOffer,
}

#[derive(Debug, Serialize)]
pub struct RequestReply {
  pub request: RideRequest,
}

pub async fn create_offer<S: Store>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Rpc(draft): Rpc<OfferDraft>,
) -> Result<Rpc<OfferReply>, ApiError> {
  let offer = state.rides.create_offer(&caller, draft).await?;
  Ok(Rpc(OfferReply { offer }))
}

pub async fn get_offer<S: Store>(
  State(state): State<AppState<S>>,
  Caller(_): Caller,
  Rpc(body): Rpc<OfferIdBody>,
) -> Result<Rpc<OfferReply>, ApiError> {
  let offer = state.rides.get_offer(body.offer_id).await?;
  Ok(Rpc(OfferReply { offer }))
}

pub async fn create_request<S: Store>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Rpc(draft): Rpc<RequestDraft>,
) -> Result<Rpc<RequestReply>, ApiError> {
  let request = state.rides.create_request(&caller, draft).await?;
  Ok(Rpc(RequestReply { request }))
}

pub async fn get_request<S: Store>(
  State(state): State<AppState<S>>,
  Caller(_): Caller,
  Rpc(body): Rpc<RequestIdBody>,
) -> Result<Rpc<RequestReply>, ApiError> {
  let request = state.rides.get_request(body.request_id).await?;
  Ok(Rpc(RequestReply { request }))
}
