//! Match records: the binding of one rider and one driver to one ride offer.
//!
//! `rider_id`, `driver_id` and `ride_id` are fixed at creation. Only `status`
//! ever changes, and only through [`crate::lifecycle::MatchEngine`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ride::{RideOffer, RideRequest};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchStatus {
  Requested,
  Accepted,
  Rejected,
  Completed,
}

impl MatchStatus {
  /// Whether the driver may still accept or reject.
  pub fn is_pending(self) -> bool { matches!(self, Self::Requested) }

  /// Whether `self -> next` is an edge of the driver-resolution machine.
  /// Completion is governed separately by [`CompletionPolicy`].
  pub fn can_resolve_to(self, next: Self) -> bool {
    matches!(
      (self, next),
      (Self::Requested, Self::Accepted) | (Self::Requested, Self::Rejected)
    )
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
  pub match_id:   Uuid,
  pub rider_id:   Uuid,
  pub driver_id:  Uuid,
  /// The ride offer this match is attached to.
  pub ride_id:    Uuid,
  pub status:     MatchStatus,
  pub created_at: DateTime<Utc>,
}

impl Match {
  pub fn involves(&self, user_id: Uuid) -> bool {
    self.rider_id == user_id || self.driver_id == user_id
  }
}

/// Input to [`crate::store::MatchStore::create_match`]. The id and
/// `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMatch {
  pub rider_id:  Uuid,
  pub driver_id: Uuid,
  pub ride_id:   Uuid,
  pub status:    MatchStatus,
}

// ─── Completion ──────────────────────────────────────────────────────────────

/// Who may complete a match, and from which state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
  /// Any authenticated caller, from any state.
  #[default]
  Unrestricted,
  /// Only the rider or driver of the match, and only from `accepted`.
  Participants,
}

// ─── Accepting an open ride request ─────────────────────────────────────────

/// The writes a driver's acceptance of an open ride request resolves into.
///
/// A store applies all of them in one transaction, in order: create the
/// offer, create the match, swap the request from `active` to `matched`.
#[derive(Debug, Clone)]
pub struct Acceptance {
  pub request_id: Uuid,
  pub rider_id:   Uuid,
  pub driver_id:  Uuid,
  pub from_geo:   String,
  pub to_geo:     String,
  pub depart_at:  DateTime<Utc>,
  /// Never zero.
  pub seats:      u32,
}

impl Acceptance {
  pub fn new(request: &RideRequest, driver_id: Uuid) -> Self {
    Self {
      request_id: request.request_id,
      rider_id: request.user_id,
      driver_id,
      from_geo: request.from_geo.clone(),
      to_geo: request.to_geo.clone(),
      depart_at: request.depart_at,
      seats: request.seats.max(1),
    }
  }
}

/// What a committed [`Acceptance`] produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accepted {
  pub offer:  RideOffer,
  #[serde(rename = "match")]
  pub record: Match,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ride::RequestStatus;

  #[test]
  fn only_requested_resolves() {
    use MatchStatus::*;
    assert!(Requested.can_resolve_to(Accepted));
    assert!(Requested.can_resolve_to(Rejected));
    for from in [Accepted, Rejected, Completed] {
      for to in [Requested, Accepted, Rejected, Completed] {
        assert!(!from.can_resolve_to(to), "{from} -> {to}");
      }
    }
    assert!(!Requested.can_resolve_to(Completed));
  }

  #[test]
  fn acceptance_floors_seats_and_copies_route() {
    let request = RideRequest {
      request_id: Uuid::new_v4(),
      user_id:    Uuid::new_v4(),
      from_geo:   "tdr1w".into(),
      to_geo:     "tdr1y".into(),
      depart_at:  Utc::now(),
      seats:      0,
      status:     RequestStatus::Active,
    };
    let driver = Uuid::new_v4();
    let acceptance = Acceptance::new(&request, driver);
    assert_eq!(acceptance.seats, 1);
    assert_eq!(acceptance.rider_id, request.user_id);
    assert_eq!(acceptance.driver_id, driver);
    assert_eq!(acceptance.from_geo, "tdr1w");
    assert_eq!(acceptance.depart_at, request.depart_at);
  }

  #[test]
  fn status_wire_form() {
    assert_eq!(MatchStatus::Requested.to_string(), "requested");
    assert_eq!("completed".parse::<MatchStatus>().unwrap(), MatchStatus::Completed);
  }
}
