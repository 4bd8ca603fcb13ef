//! RPC handlers, one module per service.
//!
//! Every method is a `POST` to `/hope.v1.<Service>/<Method>` with a JSON
//! object body and a JSON object reply.

pub mod auth;
pub mod matches;
pub mod rides;
pub mod users;

use axum::{
  Json,
  extract::FromRequest,
  response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::ApiError;

/// JSON in and out; body rejections become `invalid_argument`.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct Rpc<T>(pub T);

impl<T: Serialize> IntoResponse for Rpc<T> {
  fn into_response(self) -> Response { Json(self.0).into_response() }
}
