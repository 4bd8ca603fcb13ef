//! Exchange a Google ID token for a session token, creating the user on
//! first login.

use std::sync::Arc;

use hope_core::{
  store::UserStore,
  user::{NewUser, User},
};
use tracing::info;

use super::{
  google::{GoogleVerifier, LoginError, LoginPolicy},
  session::SessionKeys,
};

pub struct LoginOutcome {
  pub jwt:  String,
  pub user: User,
}

pub struct LoginService<S> {
  store:    Arc<S>,
  verifier: GoogleVerifier,
  policy:   LoginPolicy,
  keys:     Arc<SessionKeys>,
}

impl<S: UserStore> LoginService<S> {
  pub fn new(
    store: Arc<S>,
    verifier: GoogleVerifier,
    policy: LoginPolicy,
    keys: Arc<SessionKeys>,
  ) -> Self {
    Self { store, verifier, policy, keys }
  }

  pub async fn login(&self, id_token: &str) -> Result<LoginOutcome, LoginError> {
    let info = self.verifier.introspect(id_token).await?;
    self.policy.check(&info)?;

    let email = info.email.to_lowercase();
    let existing = self
      .store
      .find_user_by_email(email.clone())
      .await
      .map_err(|e| LoginError::Store(Box::new(e)))?;

    let user = match existing {
      Some(user) => user,
      None => {
        let user = self
          .store
          .create_user(NewUser {
            email,
            name: info.name,
            photo_url: info.picture.filter(|p| !p.is_empty()),
          })
          .await
          .map_err(|e| LoginError::Store(Box::new(e)))?;
        info!(user_id = %user.user_id, "user created on first login");
        user
      }
    };

    let jwt = self.keys.issue(&user)?;
    info!(user_id = %user.user_id, "login");
    Ok(LoginOutcome { jwt, user })
  }
}
