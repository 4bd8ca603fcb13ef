//! Google ID-token introspection, used only at login.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::session::AuthError;

pub const DEFAULT_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Every way a login can fail. The first four are returned to the caller
/// verbatim; the rest are internal.
#[derive(Debug, Error)]
pub enum LoginError {
  #[error("invalid token")]
  InvalidToken,

  #[error("invalid audience")]
  InvalidAudience,

  #[error("email not verified")]
  EmailNotVerified,

  #[error("unauthorized email domain")]
  UnauthorizedDomain,

  #[error("token introspection failed: {0}")]
  Introspection(#[source] reqwest::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error(transparent)]
  Session(#[from] AuthError),
}

impl LoginError {
  /// Whether the failure is about the presented credential rather than
  /// about this server.
  pub fn is_rejection(&self) -> bool {
    matches!(
      self,
      Self::InvalidToken | Self::InvalidAudience | Self::EmailNotVerified | Self::UnauthorizedDomain
    )
  }
}

/// The payload of Google's tokeninfo endpoint. Google encodes booleans as
/// strings here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TokenInfo {
  pub aud:            String,
  pub email:          String,
  pub email_verified: String,
  pub name:           String,
  pub picture:        Option<String>,
  pub sub:            String,
}

// ─── Introspection ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GoogleVerifier {
  client:        reqwest::Client,
  tokeninfo_url: String,
}

impl GoogleVerifier {
  pub fn new(tokeninfo_url: impl Into<String>) -> reqwest::Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(10))
      .build()?;
    Ok(Self { client, tokeninfo_url: tokeninfo_url.into() })
  }

  pub async fn introspect(&self, id_token: &str) -> Result<TokenInfo, LoginError> {
    let response = self
      .client
      .get(&self.tokeninfo_url)
      .query(&[("id_token", id_token)])
      .send()
      .await
      .map_err(LoginError::Introspection)?;

    if !response.status().is_success() {
      tracing::debug!(status = %response.status(), "tokeninfo rejected id token");
      return Err(LoginError::InvalidToken);
    }

    response.json().await.map_err(LoginError::Introspection)
  }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Who may log in: tokens minted for our client id, with a verified email in
/// one of the allowed domains.
#[derive(Debug, Clone)]
pub struct LoginPolicy {
  client_id:       String,
  allowed_domains: Vec<String>,
}

impl LoginPolicy {
  pub fn new(client_id: impl Into<String>, allowed_domains: &[String]) -> Self {
    Self {
      client_id:       client_id.into(),
      allowed_domains: allowed_domains
        .iter()
        .map(|d| d.trim().trim_start_matches('@').to_lowercase())
        .filter(|d| !d.is_empty())
        .collect(),
    }
  }

  pub fn check(&self, info: &TokenInfo) -> Result<(), LoginError> {
    if info.aud != self.client_id {
      return Err(LoginError::InvalidAudience);
    }
    if info.email_verified != "true" {
      return Err(LoginError::EmailNotVerified);
    }

    let email = info.email.to_lowercase();
    let allowed = self
      .allowed_domains
      .iter()
      .any(|domain| email.ends_with(&format!("@{domain}")));
    if !allowed {
      return Err(LoginError::UnauthorizedDomain);
    }
    Ok(())
  }
}
