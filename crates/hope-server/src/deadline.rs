//! Per-request deadline.

use std::time::Duration;

use axum::{
  extract::{Request, State},
  middleware::Next,
  response::Response,
};
use hope_core::ErrorCode;

use crate::error::ApiError;

/// Axum middleware: drop the inner call once `limit` has passed and answer
/// `deadline_exceeded`. Dropping the call cancels any store write it still
/// has queued.
pub async fn enforce(
  State(limit): State<Duration>,
  request: Request,
  next: Next,
) -> Result<Response, ApiError> {
  let path = request.uri().path().to_owned();
  match tokio::time::timeout(limit, next.run(request)).await {
    Ok(response) => Ok(response),
    Err(_) => {
      tracing::warn!(%path, timeout_ms = limit.as_millis() as u64, "request timed out");
      Err(ApiError::new(
        ErrorCode::DeadlineExceeded,
        format!("request exceeded its {} ms deadline", limit.as_millis()),
      ))
    }
  }
}
