//! The match lifecycle engine.
//!
//! ```text
//!               accept (driver)
//!   requested ─────────────────▶ accepted ──┐
//!       │                                   │ complete
//!       │ reject (driver)                   ▼
//!       └────────────────────▶ rejected   completed
//! ```
//!
//! Every operation takes the caller's [`Identity`] as injected by the
//! transport's authentication layer; ownership is checked against it, never
//! against ids found in the request payload. Status writes are
//! compare-and-swap, so a transition that loses a race fails with
//! `InvalidState` instead of overwriting the winner.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  error::Entity,
  identity::Identity,
  matching::{Acceptance, Accepted, CompletionPolicy, Match, MatchStatus, NewMatch},
  ride::RequestStatus,
  store::MatchingUnit,
};

pub struct MatchEngine<S> {
  store:      Arc<S>,
  completion: CompletionPolicy,
}

impl<S> Clone for MatchEngine<S> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      completion: self.completion,
    }
  }
}

impl<S: MatchingUnit> MatchEngine<S> {
  pub fn new(store: Arc<S>, completion: CompletionPolicy) -> Self {
    Self { store, completion }
  }

  pub fn completion_policy(&self) -> CompletionPolicy { self.completion }

  // ── Creation ──────────────────────────────────────────────────────────────

  /// The caller asks to ride on an existing offer. The driver is taken from
  /// the offer.
  pub async fn request_to_join(&self, caller: &Identity, ride_id: Uuid) -> Result<Match> {
    let offer = self
      .store
      .get_offer(ride_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(Entity::RideOffer, ride_id))?;

    let driver_id = offer.driver_id.ok_or(Error::MissingDriver(ride_id))?;
    if driver_id == caller.subject_id {
      return Err(Error::SelfMatch);
    }

    let created = self
      .store
      .create_match(NewMatch {
        rider_id: caller.subject_id,
        driver_id,
        ride_id,
        status: MatchStatus::Requested,
      })
      .await
      .map_err(Error::store)?;

    info!(
      match_id = %created.match_id,
      rider_id = %created.rider_id,
      driver_id = %created.driver_id,
      ride_id = %ride_id,
      "join requested"
    );
    Ok(created)
  }

  /// The caller, as a driver, takes an open ride request: a new offer is
  /// published for the request's route and an accepted match links it to the
  /// request's owner.
  ///
  /// The offer, the match and the request's move to `matched` commit
  /// together or not at all. Of several concurrent acceptances of one
  /// request, exactly one succeeds; the others fail with `NotActive`.
  pub async fn accept_ride_request(
    &self,
    caller: &Identity,
    request_id: Uuid,
  ) -> Result<Accepted> {
    let request = self
      .store
      .get_request(request_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(Entity::RideRequest, request_id))?;

    if request.status != RequestStatus::Active {
      return Err(Error::NotActive(request_id));
    }
    if request.user_id == caller.subject_id {
      return Err(Error::SelfMatch);
    }

    let acceptance = Acceptance::new(&request, caller.subject_id);
    let accepted = self
      .store
      .accept_ride_request(acceptance)
      .await
      .map_err(Error::store)?;

    match accepted {
      Some(accepted) => {
        info!(
          match_id = %accepted.record.match_id,
          offer_id = %accepted.offer.offer_id,
          request_id = %request_id,
          driver_id = %caller.subject_id,
          "ride request accepted"
        );
        Ok(accepted)
      }
      None => {
        warn!(request_id = %request_id, "ride request taken concurrently");
        Err(Error::NotActive(request_id))
      }
    }
  }

  // ── Driver resolution ─────────────────────────────────────────────────────

  pub async fn accept_request(&self, caller: &Identity, match_id: Uuid) -> Result<Match> {
    self.resolve(caller, match_id, MatchStatus::Accepted).await
  }

  pub async fn reject_request(&self, caller: &Identity, match_id: Uuid) -> Result<Match> {
    self.resolve(caller, match_id, MatchStatus::Rejected).await
  }

  async fn resolve(
    &self,
    caller: &Identity,
    match_id: Uuid,
    next: MatchStatus,
  ) -> Result<Match> {
    let current = self.get_match(match_id).await?;

    if current.driver_id != caller.subject_id {
      warn!(match_id = %match_id, caller = %caller.subject_id, "resolve by non-driver");
      return Err(Error::Forbidden(format!(
        "only the driver can {} match {match_id}",
        verb(next)
      )));
    }
    if !current.status.can_resolve_to(next) {
      return Err(Error::InvalidState {
        id:       match_id,
        expected: MatchStatus::Requested,
        actual:   current.status,
      });
    }

    let swap = self
      .store
      .swap_match_status(match_id, current.status, next)
      .await
      .map_err(Error::store)?;

    if !swap.applied() {
      // Another call resolved it between our read and write.
      let actual = self.get_match(match_id).await?.status;
      warn!(match_id = %match_id, %actual, "resolve lost a race");
      return Err(Error::InvalidState {
        id: match_id,
        expected: MatchStatus::Requested,
        actual,
      });
    }

    info!(match_id = %match_id, status = %next, "match resolved");
    Ok(Match { status: next, ..current })
  }

  // ── Completion ────────────────────────────────────────────────────────────

  /// Mark a match completed, subject to the configured [`CompletionPolicy`].
  pub async fn complete_match(&self, caller: &Identity, match_id: Uuid) -> Result<Match> {
    match self.completion {
      CompletionPolicy::Unrestricted => {
        let updated = self
          .store
          .force_match_status(match_id, MatchStatus::Completed)
          .await
          .map_err(Error::store)?
          .ok_or_else(|| Error::not_found(Entity::Match, match_id))?;
        info!(match_id = %match_id, caller = %caller.subject_id, "match completed");
        Ok(updated)
      }
      CompletionPolicy::Participants => {
        let current = self.get_match(match_id).await?;
        if !current.involves(caller.subject_id) {
          return Err(Error::Forbidden(format!(
            "only the rider or driver can complete match {match_id}"
          )));
        }
        if current.status != MatchStatus::Accepted {
          return Err(Error::InvalidState {
            id:       match_id,
            expected: MatchStatus::Accepted,
            actual:   current.status,
          });
        }
        let swap = self
          .store
          .swap_match_status(match_id, MatchStatus::Accepted, MatchStatus::Completed)
          .await
          .map_err(Error::store)?;
        if !swap.applied() {
          let actual = self.get_match(match_id).await?.status;
          return Err(Error::InvalidState {
            id: match_id,
            expected: MatchStatus::Accepted,
            actual,
          });
        }
        info!(match_id = %match_id, caller = %caller.subject_id, "match completed");
        Ok(Match { status: MatchStatus::Completed, ..current })
      }
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get_match(&self, match_id: Uuid) -> Result<Match> {
    self
      .store
      .get_match(match_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::not_found(Entity::Match, match_id))
  }

  pub async fn list_matches_by_ride(&self, ride_id: Uuid) -> Result<Vec<Match>> {
    self.store.list_matches_by_ride(ride_id).await.map_err(Error::store)
  }

  pub async fn list_matches_by_rider(&self, rider_id: Uuid) -> Result<Vec<Match>> {
    self.store.list_matches_by_rider(rider_id).await.map_err(Error::store)
  }

  /// Matches where the caller is rider or driver.
  pub async fn list_my_matches(&self, caller: &Identity) -> Result<Vec<Match>> {
    self
      .store
      .list_matches_for_user(caller.subject_id)
      .await
      .map_err(Error::store)
  }
}

fn verb(status: MatchStatus) -> &'static str {
  match status {
    MatchStatus::Accepted => "accept",
    MatchStatus::Rejected => "reject",
    MatchStatus::Completed => "complete",
    MatchStatus::Requested => "request",
  }
}
