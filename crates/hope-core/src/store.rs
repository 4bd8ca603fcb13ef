//! Store contracts consumed by the services in this crate.
//!
//! Each entity gets its own narrow, id-keyed contract. All contracts of one
//! backend share a single error type through [`StoreBackend`]. Composition
//! across entities is only atomic where a contract says so explicitly
//! ([`MatchingUnit`]).
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  matching::{Acceptance, Accepted, Match, MatchStatus, NewMatch},
  ride::{NewRideOffer, NewRideRequest, RequestStatus, RideOffer, RideRequest},
  user::{NewUser, User},
};

/// Outcome of a compare-and-swap write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Swap {
  /// The stored value matched the expected one and was replaced.
  Applied,
  /// No row held the expected value; nothing was written.
  Stale,
}

impl Swap {
  pub fn applied(self) -> bool { matches!(self, Self::Applied) }
}

/// The error type shared by every contract of one backend.
pub trait StoreBackend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub trait UserStore: StoreBackend {
  /// Persist a new user; `last_seen` is set to now by the store.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up by email. Emails are stored lower-cased.
  fn find_user_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Set `last_seen` to `new` only if it still equals `expected`.
  fn swap_last_seen(
    &self,
    id: Uuid,
    expected: DateTime<Utc>,
    new: DateTime<Utc>,
  ) -> impl Future<Output = Result<Swap, Self::Error>> + Send + '_;
}

// ─── Ride offers ─────────────────────────────────────────────────────────────

pub trait RideOfferStore: StoreBackend {
  fn create_offer(
    &self,
    input: NewRideOffer,
  ) -> impl Future<Output = Result<RideOffer, Self::Error>> + Send + '_;

  fn get_offer(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RideOffer>, Self::Error>> + Send + '_;
}

// ─── Ride requests ───────────────────────────────────────────────────────────

pub trait RideRequestStore: StoreBackend {
  /// Persist a new request in `active` state.
  fn create_request(
    &self,
    input: NewRideRequest,
  ) -> impl Future<Output = Result<RideRequest, Self::Error>> + Send + '_;

  fn get_request(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RideRequest>, Self::Error>> + Send + '_;

  fn swap_request_status(
    &self,
    id: Uuid,
    expected: RequestStatus,
    new: RequestStatus,
  ) -> impl Future<Output = Result<Swap, Self::Error>> + Send + '_;
}

// ─── Matches ─────────────────────────────────────────────────────────────────

pub trait MatchStore: StoreBackend {
  /// Persist a new match; the store assigns `match_id` and `created_at`.
  fn create_match(
    &self,
    input: NewMatch,
  ) -> impl Future<Output = Result<Match, Self::Error>> + Send + '_;

  fn get_match(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Match>, Self::Error>> + Send + '_;

  /// Matches attached to a ride offer, newest first. Empty if none.
  fn list_matches_by_ride(
    &self,
    ride_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Match>, Self::Error>> + Send + '_;

  /// Matches where `rider_id` is the rider, newest first. Empty if none.
  fn list_matches_by_rider(
    &self,
    rider_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Match>, Self::Error>> + Send + '_;

  /// Matches where the user is rider or driver, newest first.
  fn list_matches_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Match>, Self::Error>> + Send + '_;

  /// Atomically move `status` from `expected` to `new`.
  fn swap_match_status(
    &self,
    id: Uuid,
    expected: MatchStatus,
    new: MatchStatus,
  ) -> impl Future<Output = Result<Swap, Self::Error>> + Send + '_;

  /// Overwrite `status` regardless of its current value, in one statement.
  /// Returns the updated match, or `None` if the id is unknown.
  fn force_match_status(
    &self,
    id: Uuid,
    new: MatchStatus,
  ) -> impl Future<Output = Result<Option<Match>, Self::Error>> + Send + '_;
}

// ─── Cross-entity unit of work ───────────────────────────────────────────────

/// Backends that can apply an [`Acceptance`] atomically.
pub trait MatchingUnit: RideOfferStore + RideRequestStore + MatchStore {
  /// Create the offer and the accepted match, then swap the request from
  /// `active` to `matched`, all in one transaction.
  ///
  /// Returns `None` (and writes nothing) if the request was no longer
  /// `active` at commit time.
  fn accept_ride_request(
    &self,
    acceptance: Acceptance,
  ) -> impl Future<Output = Result<Option<Accepted>, Self::Error>> + Send + '_;
}

/// Everything the services need from one backend.
pub trait Store: UserStore + MatchingUnit {}

impl<T: UserStore + MatchingUnit> Store for T {}
