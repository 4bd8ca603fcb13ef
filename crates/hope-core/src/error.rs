//! Error types for `hope-core`.
//!
//! Every failure carries its taxonomy [`ErrorCode`], decided where the failure
//! happens. Transports map the code onto their own status vocabulary; nothing
//! downstream inspects message text.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::matching::MatchStatus;

// ─── Taxonomy ────────────────────────────────────────────────────────────────

/// Stable, machine-readable failure category.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
  /// Malformed or missing input; always caller-fixable.
  InvalidArgument,
  /// Missing, malformed, invalid or expired credential.
  Unauthenticated,
  /// The caller is not the owner/driver the operation requires.
  PermissionDenied,
  /// No record with the given id.
  NotFound,
  /// Wrong status for the transition, or an optimistic-update mismatch.
  FailedPrecondition,
  /// Storage or dependency failure; opaque to callers.
  Internal,
  /// The call ran past the server's per-request deadline.
  DeadlineExceeded,
}

// ─── Error ───────────────────────────────────────────────────────────────────

/// The kind of record an id refers to, used in `NotFound` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  User,
  RideOffer,
  RideRequest,
  Match,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Unauthenticated(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("{entity} {id} not found")]
  NotFound { entity: Entity, id: Uuid },

  #[error("ride request {0} is not active")]
  NotActive(Uuid),

  #[error("a user cannot be matched with themselves")]
  SelfMatch,

  #[error("ride offer {0} has no driver")]
  MissingDriver(Uuid),

  #[error("match {id} is {actual}, expected {expected}")]
  InvalidState {
    id:       Uuid,
    expected: MatchStatus,
    actual:   MatchStatus,
  },

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  pub fn not_found(entity: Entity, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }

  /// The taxonomy code of this error.
  pub fn code(&self) -> ErrorCode {
    match self {
      Self::Validation(_) | Self::SelfMatch => ErrorCode::InvalidArgument,
      Self::Unauthenticated(_) => ErrorCode::Unauthenticated,
      Self::Forbidden(_) => ErrorCode::PermissionDenied,
      Self::NotFound { .. } => ErrorCode::NotFound,
      Self::NotActive(_)
      | Self::MissingDriver(_)
      | Self::InvalidState { .. }
      | Self::Conflict(_) => ErrorCode::FailedPrecondition,
      Self::Store(_) => ErrorCode::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
