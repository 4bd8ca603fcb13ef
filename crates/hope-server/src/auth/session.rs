//! Backend-issued session tokens.
//!
//! HS256 JWTs signed with the server secret. Validation accepts no other
//! algorithm and applies no leeway to `exp`. Every failure other than a
//! missing subject collapses into [`AuthError::InvalidOrExpired`].

use chrono::{Duration, Utc};
use hope_core::{identity::Identity, user::User};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
  #[error("invalid or expired token")]
  InvalidOrExpired,

  #[error("token has no subject")]
  MissingSubject,

  #[error("failed to sign session token: {0}")]
  Signing(#[source] jsonwebtoken::errors::Error),
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sub:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:  Option<String>,
  pub iat:   i64,
  pub exp:   i64,
}

impl SessionClaims {
  pub fn for_user(user: &User, ttl: Duration) -> Self {
    let now = Utc::now();
    Self {
      sub:   Some(user.user_id.to_string()),
      email: Some(user.email.clone()),
      name:  Some(user.name.clone()),
      iat:   now.timestamp(),
      exp:   (now + ttl).timestamp(),
    }
  }
}

pub struct SessionKeys {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        Duration,
}

impl SessionKeys {
  pub fn new(secret: &[u8], ttl: Duration) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      ttl,
    }
  }

  /// Issue a session token for `user`, valid for the configured lifetime.
  pub fn issue(&self, user: &User) -> Result<String, AuthError> {
    self.sign(&SessionClaims::for_user(user, self.ttl))
  }

  pub fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
    encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(AuthError::Signing)
  }

  /// Verify `token` and derive the caller's identity from it.
  pub fn validate(&self, token: &str) -> Result<Identity, AuthError> {
    let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(|e| {
      tracing::debug!(reason = %e, "session token rejected");
      AuthError::InvalidOrExpired
    })?;

    let subject = data
      .claims
      .sub
      .filter(|s| !s.is_empty())
      .ok_or(AuthError::MissingSubject)?;
    let subject_id = Uuid::parse_str(&subject).map_err(|_| AuthError::InvalidOrExpired)?;

    Ok(Identity::new(subject_id, data.claims.email))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn keys() -> SessionKeys { SessionKeys::new(b"test-secret", Duration::hours(24)) }

  fn user() -> User {
    User {
      user_id:   Uuid::new_v4(),
      email:     "asha@example.com".into(),
      name:      "Asha".into(),
      photo_url: None,
      geohash:   None,
      last_seen: Utc::now(),
    }
  }

  fn claims(sub: Option<String>, exp_offset: Duration) -> SessionClaims {
    let now = Utc::now();
    SessionClaims {
      sub,
      email: Some("asha@example.com".into()),
      name: None,
      iat: now.timestamp(),
      exp: (now + exp_offset).timestamp(),
    }
  }

  #[test]
  fn issued_token_validates_to_its_user() {
    let keys = keys();
    let user = user();
    let identity = keys.validate(&keys.issue(&user).unwrap()).unwrap();
    assert_eq!(identity.subject_id, user.user_id);
    assert_eq!(identity.email.as_deref(), Some("asha@example.com"));
  }

  #[test]
  fn expired_token_is_rejected() {
    let keys = keys();
    let token = keys
      .sign(&claims(Some(Uuid::new_v4().to_string()), Duration::seconds(-5)))
      .unwrap();
    assert!(matches!(keys.validate(&token), Err(AuthError::InvalidOrExpired)));
  }

  #[test]
  fn other_algorithm_is_rejected() {
    let c = claims(Some(Uuid::new_v4().to_string()), Duration::hours(1));
    let token = encode(
      &Header::new(Algorithm::HS512),
      &c,
      &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap();
    assert!(matches!(keys().validate(&token), Err(AuthError::InvalidOrExpired)));
  }

  #[test]
  fn foreign_secret_is_rejected() {
    let other = SessionKeys::new(b"someone-else", Duration::hours(1));
    let token = other.issue(&user()).unwrap();
    assert!(matches!(keys().validate(&token), Err(AuthError::InvalidOrExpired)));
  }

  #[test]
  fn missing_subject_is_its_own_error() {
    let keys = keys();
    let token = keys.sign(&claims(None, Duration::hours(1))).unwrap();
    assert!(matches!(keys.validate(&token), Err(AuthError::MissingSubject)));

    let token = keys.sign(&claims(Some(String::new()), Duration::hours(1))).unwrap();
    assert!(matches!(keys.validate(&token), Err(AuthError::MissingSubject)));
  }

  #[test]
  fn non_uuid_subject_is_invalid() {
    let keys = keys();
    let token = keys.sign(&claims(Some("1234".into()), Duration::hours(1))).unwrap();
    assert!(matches!(keys.validate(&token), Err(AuthError::InvalidOrExpired)));
  }

  #[test]
  fn garbage_is_invalid() {
    assert!(matches!(keys().validate("not.a.jwt"), Err(AuthError::InvalidOrExpired)));
  }

  #[test]
  fn empty_email_claim_is_dropped() {
    let keys = keys();
    let mut c = claims(Some(Uuid::new_v4().to_string()), Duration::hours(1));
    c.email = Some(String::new());
    let identity = keys.validate(&keys.sign(&c).unwrap()).unwrap();
    assert_eq!(identity.email, None);
  }
}
