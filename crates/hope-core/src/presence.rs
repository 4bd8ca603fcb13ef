//! Last-seen tracking.
//!
//! `last_seen` is written by concurrent sessions of the same user, so it is
//! only ever advanced with a compare-and-swap against the value just read.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound as _, Utc};
use tracing::warn;

use crate::{
  Error, Result,
  error::Entity,
  identity::Identity,
  store::UserStore,
  user::User,
};

pub struct PresenceService<S> {
  store: Arc<S>,
}

impl<S> Clone for PresenceService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: UserStore> PresenceService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn me(&self, caller: &Identity) -> Result<User> {
    self
      .store
      .get_user(caller.subject_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(Entity::User, caller.subject_id))
  }

  /// Advance the caller's `last_seen` to now.
  ///
  /// Fails with `Conflict` if another writer changed it after it was read;
  /// the caller is expected to re-read and retry.
  pub async fn touch(&self, caller: &Identity) -> Result<User> {
    self.touch_at(caller, Utc::now()).await
  }

  pub async fn touch_at(&self, caller: &Identity, now: DateTime<Utc>) -> Result<User> {
    let user = self.me(caller).await?;
    let now = now.trunc_subsecs(0);

    let swap = self
      .store
      .swap_last_seen(user.user_id, user.last_seen, now)
      .await
      .map_err(Error::store)?;

    if !swap.applied() {
      warn!(user_id = %user.user_id, "last_seen changed concurrently");
      return Err(Error::Conflict("user last_seen changed concurrently".into()));
    }
    Ok(User { last_seen: now, ..user })
  }
}
