//! The verified caller.
//!
//! An [`Identity`] is derived per call from a signed session token and lives
//! only as long as that call. It is never persisted, and handlers never build
//! one from request payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub subject_id: Uuid,
  pub email:      Option<String>,
}

impl Identity {
  pub fn new(subject_id: Uuid, email: Option<String>) -> Self {
    Self {
      subject_id,
      email: email.filter(|e| !e.is_empty()),
    }
  }
}
