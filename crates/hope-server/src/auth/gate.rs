//! Per-call identity gate.
//!
//! Runs in front of every routed method. Public methods pass straight
//! through; everything else needs exactly one `authorization: Bearer <token>`
//! header whose token validates. The resulting [`Identity`] is attached to
//! the request extensions, where handlers read it through [`Caller`].

use std::{collections::HashSet, sync::Arc};

use axum::{
  extract::{FromRequestParts, Request, State},
  http::{HeaderMap, header, request::Parts},
  middleware::Next,
  response::Response,
};
use hope_core::identity::Identity;
use thiserror::Error;

use super::session::{AuthError, SessionKeys};
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum GateError {
  #[error("missing authorization header")]
  Missing,

  #[error("more than one authorization header")]
  Ambiguous,

  #[error("authorization header must be `Bearer <token>`")]
  Malformed,

  #[error(transparent)]
  Rejected(#[from] AuthError),
}

pub struct Gate {
  keys:           Arc<SessionKeys>,
  public_methods: HashSet<String>,
}

impl Gate {
  pub fn new(keys: Arc<SessionKeys>, public_methods: impl IntoIterator<Item = String>) -> Self {
    Self { keys, public_methods: public_methods.into_iter().collect() }
  }

  /// Whether `method` (the full `/<package>.<Service>/<Method>` path) skips
  /// authentication.
  pub fn is_public(&self, method: &str) -> bool { self.public_methods.contains(method) }

  pub fn identify(&self, headers: &HeaderMap) -> Result<Identity, GateError> {
    let mut values = headers.get_all(header::AUTHORIZATION).iter();
    let value = values.next().ok_or(GateError::Missing)?;
    if values.next().is_some() {
      return Err(GateError::Ambiguous);
    }

    let value = value.to_str().map_err(|_| GateError::Malformed)?;
    let token = bearer_token(value).ok_or(GateError::Malformed)?;
    Ok(self.keys.validate(token)?)
  }
}

fn bearer_token(value: &str) -> Option<&str> {
  let mut fields = value.split_whitespace();
  let (scheme, token) = (fields.next()?, fields.next()?);
  if fields.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
    return None;
  }
  Some(token)
}

/// Middleware: admit public methods, otherwise attach the caller's identity.
pub async fn authenticate(
  State(gate): State<Arc<Gate>>,
  mut req: Request,
  next: Next,
) -> Result<Response, ApiError> {
  if gate.is_public(req.uri().path()) {
    return Ok(next.run(req).await);
  }

  let identity = gate.identify(req.headers()).inspect_err(|e| {
    tracing::debug!(method = %req.uri().path(), reason = %e, "call not authenticated");
  })?;
  req.extensions_mut().insert(identity);
  Ok(next.run(req).await)
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller, as attached by [`authenticate`].
pub struct Caller(pub Identity);

impl<S> FromRequestParts<S> for Caller
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Identity>()
      .cloned()
      .map(Caller)
      .ok_or_else(|| ApiError::unauthenticated("no authenticated caller"))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;
  use chrono::{Duration, Utc};
  use hope_core::user::User;
  use uuid::Uuid;

  use super::*;
  use crate::LOGIN_METHOD;

  fn gate() -> (Gate, Arc<SessionKeys>) {
    let keys = Arc::new(SessionKeys::new(b"gate-secret", Duration::hours(1)));
    (Gate::new(Arc::clone(&keys), [LOGIN_METHOD.to_owned()]), keys)
  }

  fn token(keys: &SessionKeys) -> (Uuid, String) {
    let user = User {
      user_id:   Uuid::new_v4(),
      email:     "gate@example.com".into(),
      name:      "Gate".into(),
      photo_url: None,
      geohash:   None,
      last_seen: Utc::now(),
    };
    (user.user_id, keys.issue(&user).unwrap())
  }

  fn headers(values: &[&str]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for v in values {
      map.append(header::AUTHORIZATION, HeaderValue::from_str(v).unwrap());
    }
    map
  }

  #[test]
  fn allowlist_is_exact() {
    let (gate, _) = gate();
    assert!(gate.is_public(LOGIN_METHOD));
    assert!(!gate.is_public("/hope.v1.AuthService/LoginX"));
    assert!(!gate.is_public("/hope.v1.MatchService/GetMatch"));
  }

  #[test]
  fn bearer_any_case_is_accepted() {
    let (gate, keys) = gate();
    let (id, t) = token(&keys);
    for scheme in ["Bearer", "bearer", "BEARER"] {
      let identity = gate.identify(&headers(&[format!("{scheme} {t}").as_str()])).unwrap();
      assert_eq!(identity.subject_id, id);
    }
  }

  #[test]
  fn missing_header() {
    let (gate, _) = gate();
    assert!(matches!(gate.identify(&HeaderMap::new()), Err(GateError::Missing)));
  }

  #[test]
  fn two_headers_are_ambiguous() {
    let (gate, keys) = gate();
    let (_, t) = token(&keys);
    let bearer = format!("Bearer {t}");
    assert!(matches!(
      gate.identify(&headers(&[bearer.as_str(), bearer.as_str()])),
      Err(GateError::Ambiguous)
    ));
  }

  #[test]
  fn malformed_shapes() {
    let (gate, keys) = gate();
    let (_, t) = token(&keys);
    for v in [t.clone(), format!("Basic {t}"), "Bearer".into(), format!("Bearer {t} extra")] {
      assert!(
        matches!(gate.identify(&headers(&[v.as_str()])), Err(GateError::Malformed)),
        "accepted {v:?}"
      );
    }
  }

  #[test]
  fn verifier_errors_pass_through() {
    let (gate, _) = gate();
    assert!(matches!(
      gate.identify(&headers(&["Bearer abc.def.ghi"])),
      Err(GateError::Rejected(AuthError::InvalidOrExpired))
    ));
  }
}
