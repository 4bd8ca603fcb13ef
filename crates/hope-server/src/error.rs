//! The wire error and its [`IntoResponse`] implementation.
//!
//! Every failure leaves the server as `{"code": ..., "message": ...}` with
//! the HTTP status of its taxonomy code. Internal failures are logged here
//! and replaced by an opaque message.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use hope_core::ErrorCode;
use serde_json::json;
use thiserror::Error;

use crate::auth::{GateError, LoginError};

#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
  pub code:    ErrorCode,
  pub message: String,
}

impl ApiError {
  pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
    Self { code, message: message.into() }
  }

  pub fn invalid_argument(message: impl Into<String>) -> Self {
    Self::new(ErrorCode::InvalidArgument, message)
  }

  pub fn unauthenticated(message: impl Into<String>) -> Self {
    Self::new(ErrorCode::Unauthenticated, message)
  }

  /// Log `err` and return an opaque internal error.
  pub fn internal(err: &dyn std::error::Error) -> Self {
    tracing::error!(error = %err, "internal error");
    Self::new(ErrorCode::Internal, "internal error")
  }

  pub fn status(&self) -> StatusCode { status_for(self.code) }
}

pub fn status_for(code: ErrorCode) -> StatusCode {
  match code {
    ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
    ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
    ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
    ErrorCode::NotFound => StatusCode::NOT_FOUND,
    ErrorCode::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
    ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    ErrorCode::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
  }
}

impl From<hope_core::Error> for ApiError {
  fn from(err: hope_core::Error) -> Self {
    match err.code() {
      ErrorCode::Internal => Self::internal(&err),
      code => Self::new(code, err.to_string()),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::invalid_argument(rejection.body_text()) }
}

impl From<GateError> for ApiError {
  fn from(err: GateError) -> Self { Self::unauthenticated(err.to_string()) }
}

impl From<LoginError> for ApiError {
  fn from(err: LoginError) -> Self {
    if err.is_rejection() {
      Self::unauthenticated(format!("login failed: {err}"))
    } else {
      Self::internal(&err)
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    (status, Json(json!({ "code": self.code, "message": self.message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use hope_core::{Error, error::Entity, matching::MatchStatus};
  use uuid::Uuid;

  use super::*;

  #[test]
  fn codes_map_to_statuses() {
    let id = Uuid::new_v4();
    let cases = [
      (Error::Validation("bad".into()), StatusCode::BAD_REQUEST),
      (Error::Forbidden("no".into()), StatusCode::FORBIDDEN),
      (Error::not_found(Entity::Match, id), StatusCode::NOT_FOUND),
      (Error::NotActive(id), StatusCode::PRECONDITION_FAILED),
      (
        Error::InvalidState {
          id,
          expected: MatchStatus::Requested,
          actual: MatchStatus::Rejected,
        },
        StatusCode::PRECONDITION_FAILED,
      ),
      (Error::SelfMatch, StatusCode::BAD_REQUEST),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).status(), status);
    }
    assert_eq!(status_for(ErrorCode::DeadlineExceeded), StatusCode::GATEWAY_TIMEOUT);
  }

  #[test]
  fn store_failures_are_opaque() {
    let err = ApiError::from(Error::store(std::io::Error::other("disk on fire")));
    assert_eq!(err.code, ErrorCode::Internal);
    assert_eq!(err.message, "internal error");
  }

  #[test]
  fn login_rejections_explain_themselves() {
    let err = ApiError::from(LoginError::UnauthorizedDomain);
    assert_eq!(err.code, ErrorCode::Unauthenticated);
    assert_eq!(err.message, "login failed: unauthorized email domain");
  }
}
