//! `hope.v1.UserService`.

use axum::extract::State;
use hope_core::{store::Store, user::User};
use serde::Serialize;

use super::Rpc;
use crate::{AppState, auth::Caller, error::ApiError};

#[derive(Debug, Serialize)]
pub struct UserReply {
  pub user: User,
}

pub async fn get_me<S: Store>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
) -> Result<Rpc<UserReply>, ApiError> {
  let user = state.presence.me(&caller).await?;
  Ok(Rpc(UserReply { user }))
}

/// Fails with `failed_precondition` if another session moved `last_seen`
/// between the read and the write; the client re-issues the call.
pub async fn touch_last_seen<S: Store>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
) -> Result<Rpc<UserReply>, ApiError> {
  let user = state.presence.touch(&caller).await?;
  Ok(Rpc(UserReply { user }))
}
