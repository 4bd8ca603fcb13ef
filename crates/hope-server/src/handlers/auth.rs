//! `hope.v1.AuthService`.

use axum::extract::State;
use hope_core::store::Store;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Rpc;
use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginReply {
  pub jwt:       String,
  pub user_id:   Uuid,
  pub email:     String,
  pub photo_url: Option<String>,
}

/// `Login`. Public; no session token required.
pub async fn login<S: Store>(
  State(state): State<AppState<S>>,
  Rpc(body): Rpc<LoginBody>,
) -> Result<Rpc<LoginReply>, ApiError> {
  if body.id_token.trim().is_empty() {
    return Err(ApiError::invalid_argument("id_token is required"));
  }

  let outcome = state.login.login(body.id_token.trim()).await?;
  Ok(Rpc(LoginReply {
    jwt:       outcome.jwt,
    user_id:   outcome.user.user_id,
    email:     outcome.user.email,
    photo_url: outcome.user.photo_url,
  }))
}
