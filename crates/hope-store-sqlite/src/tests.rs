//! Integration tests for `SqliteStore` against an in-memory database.

use std::time::Duration as StdDuration;

use chrono::{Duration, SubsecRound as _, Utc};
use hope_core::{
  matching::{Acceptance, MatchStatus, NewMatch},
  ride::{NewRideOffer, NewRideRequest, OfferStatus, RequestStatus, RideRequest},
  store::{MatchStore, MatchingUnit, RideOfferStore, RideRequestStore, Swap, UserStore},
  user::{NewUser, User},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, email: &str) -> User {
  s.create_user(NewUser {
    email:     email.into(),
    name:      email.split('@').next().unwrap_or_default().into(),
    photo_url: None,
  })
  .await
  .unwrap()
}

fn offer_for(driver_id: Uuid) -> NewRideOffer {
  NewRideOffer {
    driver_id,
    from_geo: "tdr1w".into(),
    to_geo: "tdr1y".into(),
    fare: 80.0,
    depart_at: Utc::now() + Duration::hours(1),
    seats: 2,
    status: OfferStatus::Active,
  }
}

async fn request_for(s: &SqliteStore, rider_id: Uuid) -> RideRequest {
  s.create_request(NewRideRequest {
    user_id:   rider_id,
    from_geo:  "tdr1v".into(),
    to_geo:    "tdr4h".into(),
    depart_at: Utc::now() + Duration::hours(3),
    seats:     1,
  })
  .await
  .unwrap()
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_user() {
  let s = store().await;
  let created = user(&s, "Asha@Example.COM").await;
  assert_eq!(created.email, "asha@example.com");
  assert_eq!(created.last_seen, created.last_seen.trunc_subsecs(0));

  let fetched = s.get_user(created.user_id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn find_user_by_email_ignores_case() {
  let s = store().await;
  let created = user(&s, "ravi@example.com").await;

  let found = s.find_user_by_email("  RAVI@example.com".into()).await.unwrap();
  assert_eq!(found.map(|u| u.user_id), Some(created.user_id));

  assert!(s.find_user_by_email("nobody@example.com".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn get_user_missing_returns_none() {
  let s = store().await;
  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  user(&s, "dup@example.com").await;
  let second = s
    .create_user(NewUser {
      email:     "DUP@example.com".into(),
      name:      "Dup".into(),
      photo_url: None,
    })
    .await;
  assert!(second.is_err());
}

// ─── Compare-and-swap ────────────────────────────────────────────────────────

#[tokio::test]
async fn swap_last_seen_applies_once_then_goes_stale() {
  let s = store().await;
  let u = user(&s, "cas@example.com").await;
  let later = u.last_seen + Duration::seconds(30);

  let first = s.swap_last_seen(u.user_id, u.last_seen, later).await.unwrap();
  assert_eq!(first, Swap::Applied);

  // The value read before the first swap no longer matches.
  let second = s
    .swap_last_seen(u.user_id, u.last_seen, later + Duration::seconds(1))
    .await
    .unwrap();
  assert_eq!(second, Swap::Stale);

  let stored = s.get_user(u.user_id).await.unwrap().unwrap();
  assert_eq!(stored.last_seen, later);
}

#[tokio::test]
async fn concurrent_swaps_have_exactly_one_winner() {
  let s = store().await;
  let u = user(&s, "race@example.com").await;
  let a = u.last_seen + Duration::seconds(5);
  let b = u.last_seen + Duration::seconds(9);

  let (ra, rb) = tokio::join!(
    s.swap_last_seen(u.user_id, u.last_seen, a),
    s.swap_last_seen(u.user_id, u.last_seen, b),
  );
  let outcomes = [ra.unwrap(), rb.unwrap()];
  assert_eq!(outcomes.iter().filter(|o| o.applied()).count(), 1);

  let stored = s.get_user(u.user_id).await.unwrap().unwrap().last_seen;
  assert!(stored == a || stored == b);
}

#[tokio::test]
async fn swap_on_unknown_row_is_stale() {
  let s = store().await;
  let swap = s
    .swap_match_status(Uuid::new_v4(), MatchStatus::Requested, MatchStatus::Accepted)
    .await
    .unwrap();
  assert_eq!(swap, Swap::Stale);
}

// ─── Offers and requests ─────────────────────────────────────────────────────

#[tokio::test]
async fn offer_round_trips() {
  let s = store().await;
  let driver = user(&s, "driver@example.com").await;

  let offer = s.create_offer(offer_for(driver.user_id)).await.unwrap();
  let fetched = s.get_offer(offer.offer_id).await.unwrap().unwrap();
  assert_eq!(fetched, offer);
  assert_eq!(fetched.driver_id, Some(driver.user_id));
}

#[tokio::test]
async fn offer_for_unknown_driver_is_rejected() {
  let s = store().await;
  assert!(s.create_offer(offer_for(Uuid::new_v4())).await.is_err());
}

#[tokio::test]
async fn request_starts_active_and_swaps() {
  let s = store().await;
  let rider = user(&s, "rider@example.com").await;
  let request = request_for(&s, rider.user_id).await;
  assert_eq!(request.status, RequestStatus::Active);

  let swap = s
    .swap_request_status(request.request_id, RequestStatus::Active, RequestStatus::Completed)
    .await
    .unwrap();
  assert!(swap.applied());

  let fetched = s.get_request(request.request_id).await.unwrap().unwrap();
  assert_eq!(fetched.status, RequestStatus::Completed);
}

// ─── Matches ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn listings_are_newest_first_and_scoped() {
  let s = store().await;
  let driver = user(&s, "d@example.com").await;
  let r1 = user(&s, "r1@example.com").await;
  let r2 = user(&s, "r2@example.com").await;
  let offer = s.create_offer(offer_for(driver.user_id)).await.unwrap();

  let mut ids = Vec::new();
  for rider in [&r1, &r2, &r1] {
    let m = s
      .create_match(NewMatch {
        rider_id:  rider.user_id,
        driver_id: driver.user_id,
        ride_id:   offer.offer_id,
        status:    MatchStatus::Requested,
      })
      .await
      .unwrap();
    ids.push(m.match_id);
    tokio::time::sleep(StdDuration::from_millis(2)).await;
  }

  let by_ride = s.list_matches_by_ride(offer.offer_id).await.unwrap();
  let listed: Vec<_> = by_ride.iter().map(|m| m.match_id).collect();
  assert_eq!(listed, vec![ids[2], ids[1], ids[0]]);

  let by_r1 = s.list_matches_by_rider(r1.user_id).await.unwrap();
  assert_eq!(by_r1.len(), 2);
  assert!(by_r1.iter().all(|m| m.rider_id == r1.user_id));

  let for_driver = s.list_matches_for_user(driver.user_id).await.unwrap();
  assert_eq!(for_driver.len(), 3);
}

#[tokio::test]
async fn listings_for_unknown_keys_are_empty() {
  let s = store().await;
  assert!(s.list_matches_by_ride(Uuid::new_v4()).await.unwrap().is_empty());
  assert!(s.list_matches_by_rider(Uuid::new_v4()).await.unwrap().is_empty());
  assert!(s.list_matches_for_user(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn schema_rejects_self_match() {
  let s = store().await;
  let driver = user(&s, "solo@example.com").await;
  let offer = s.create_offer(offer_for(driver.user_id)).await.unwrap();

  let result = s
    .create_match(NewMatch {
      rider_id:  driver.user_id,
      driver_id: driver.user_id,
      ride_id:   offer.offer_id,
      status:    MatchStatus::Requested,
    })
    .await;
  assert!(result.is_err());
}

#[tokio::test]
async fn force_status_on_unknown_match_is_none() {
  let s = store().await;
  let result = s
    .force_match_status(Uuid::new_v4(), MatchStatus::Completed)
    .await
    .unwrap();
  assert!(result.is_none());
}

// ─── Compound write ──────────────────────────────────────────────────────────

#[tokio::test]
async fn acceptance_commits_all_writes() {
  let s = store().await;
  let rider = user(&s, "rider@example.com").await;
  let driver = user(&s, "driver@example.com").await;
  let request = request_for(&s, rider.user_id).await;

  let accepted = s
    .accept_ride_request(Acceptance::new(&request, driver.user_id))
    .await
    .unwrap()
    .expect("request was active");

  assert_eq!(accepted.offer.status, OfferStatus::Matched);
  assert_eq!(accepted.offer.fare, 0.0);
  assert_eq!(accepted.offer.from_geo, request.from_geo);
  assert_eq!(accepted.record.ride_id, accepted.offer.offer_id);
  assert_eq!(accepted.record.status, MatchStatus::Accepted);

  let stored_offer = s.get_offer(accepted.offer.offer_id).await.unwrap().unwrap();
  assert_eq!(stored_offer, accepted.offer);
  let stored_match = s.get_match(accepted.record.match_id).await.unwrap().unwrap();
  assert_eq!(stored_match, accepted.record);
  let stored_request = s.get_request(request.request_id).await.unwrap().unwrap();
  assert_eq!(stored_request.status, RequestStatus::Matched);
}

#[tokio::test]
async fn stale_acceptance_writes_nothing() {
  let s = store().await;
  let rider = user(&s, "rider@example.com").await;
  let driver = user(&s, "driver@example.com").await;
  let request = request_for(&s, rider.user_id).await;

  let first = s
    .accept_ride_request(Acceptance::new(&request, driver.user_id))
    .await
    .unwrap();
  assert!(first.is_some());

  let second = s
    .accept_ride_request(Acceptance::new(&request, driver.user_id))
    .await
    .unwrap();
  assert!(second.is_none());

  // The rolled-back attempt left no offer or match behind.
  let matches = s.list_matches_for_user(driver.user_id).await.unwrap();
  assert_eq!(matches.len(), 1);
}

#[tokio::test]
async fn acceptance_by_unknown_driver_fails_without_writes() {
  let s = store().await;
  let rider = user(&s, "rider@example.com").await;
  let request = request_for(&s, rider.user_id).await;

  let result = s
    .accept_ride_request(Acceptance::new(&request, Uuid::new_v4()))
    .await;
  assert!(result.is_err());

  let stored = s.get_request(request.request_id).await.unwrap().unwrap();
  assert_eq!(stored.status, RequestStatus::Active);
  assert!(s.list_matches_by_rider(rider.user_id).await.unwrap().is_empty());
}

// ─── Abandoned calls ─────────────────────────────────────────────────────────

/// Queue a 300 ms stall on the connection thread and let it start.
async fn stall(s: &SqliteStore) -> tokio::task::JoinHandle<()> {
  let busy = tokio::spawn({
    let s = s.clone();
    async move { s.hold_connection(StdDuration::from_millis(300)).await }
  });
  tokio::time::sleep(StdDuration::from_millis(20)).await;
  busy
}

#[tokio::test]
async fn timed_out_acceptance_writes_nothing() {
  let s = store().await;
  let rider = user(&s, "rider@example.com").await;
  let driver = user(&s, "driver@example.com").await;
  let request = request_for(&s, rider.user_id).await;

  let busy = stall(&s).await;
  let outcome = tokio::time::timeout(
    StdDuration::from_millis(50),
    s.accept_ride_request(Acceptance::new(&request, driver.user_id)),
  )
  .await;
  assert!(outcome.is_err(), "acceptance should still be queued");
  busy.await.unwrap();

  // Reads queue behind the abandoned write, so it has had its turn.
  let stored = s.get_request(request.request_id).await.unwrap().unwrap();
  assert_eq!(stored.status, RequestStatus::Active);
  assert!(s.list_matches_for_user(driver.user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn timed_out_swap_leaves_row_unchanged() {
  let s = store().await;
  let u = user(&s, "asha@example.com").await;
  let later = u.last_seen + Duration::seconds(30);

  let busy = stall(&s).await;
  let outcome = tokio::time::timeout(
    StdDuration::from_millis(50),
    s.swap_last_seen(u.user_id, u.last_seen, later),
  )
  .await;
  assert!(outcome.is_err());
  busy.await.unwrap();

  let stored = s.get_user(u.user_id).await.unwrap().unwrap();
  assert_eq!(stored.last_seen, u.last_seen);
}
