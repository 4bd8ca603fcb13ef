//! Ride offers (published by drivers) and ride requests (published by riders).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OfferStatus {
  #[default]
  Active,
  Matched,
  Completed,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
  /// The only state from which a request can be accepted by a driver.
  #[default]
  Active,
  Matched,
  Completed,
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideOffer {
  pub offer_id:  Uuid,
  /// `None` once the driver's account is gone.
  pub driver_id: Option<Uuid>,
  pub from_geo:  String,
  pub to_geo:    String,
  pub fare:      f64,
  pub depart_at: DateTime<Utc>,
  pub seats:     u32,
  pub status:    OfferStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRequest {
  pub request_id: Uuid,
  /// The rider who owns the request.
  pub user_id:    Uuid,
  pub from_geo:   String,
  pub to_geo:     String,
  pub depart_at:  DateTime<Utc>,
  pub seats:      u32,
  pub status:     RequestStatus,
}

/// Input to [`crate::store::RideOfferStore::create_offer`].
#[derive(Debug, Clone)]
pub struct NewRideOffer {
  pub driver_id: Uuid,
  pub from_geo:  String,
  pub to_geo:    String,
  pub fare:      f64,
  pub depart_at: DateTime<Utc>,
  pub seats:     u32,
  pub status:    OfferStatus,
}

/// Input to [`crate::store::RideRequestStore::create_request`].
#[derive(Debug, Clone)]
pub struct NewRideRequest {
  pub user_id:   Uuid,
  pub from_geo:  String,
  pub to_geo:    String,
  pub depart_at: DateTime<Utc>,
  pub seats:     u32,
}

// ─── Caller drafts ───────────────────────────────────────────────────────────

/// What a caller supplies when publishing an offer. The driver is always the
/// authenticated caller and is not part of the draft.
#[derive(Debug, Clone, Deserialize)]
pub struct OfferDraft {
  pub from_geo:  String,
  pub to_geo:    String,
  #[serde(default)]
  pub fare:      f64,
  pub depart_at: DateTime<Utc>,
  pub seats:     u32,
}

/// What a caller supplies when publishing a request.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestDraft {
  pub from_geo:  String,
  pub to_geo:    String,
  pub depart_at: DateTime<Utc>,
  pub seats:     u32,
}

fn required_geo(field: &str, value: &str) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::Validation(format!("{field} is required")));
  }
  Ok(trimmed.to_owned())
}

fn check_schedule(depart_at: DateTime<Utc>, seats: u32, now: DateTime<Utc>) -> Result<()> {
  if depart_at < now {
    return Err(Error::Validation("time cannot be in the past".into()));
  }
  if seats == 0 {
    return Err(Error::Validation("seats must be positive".into()));
  }
  Ok(())
}

impl OfferDraft {
  /// Validate against `now` and bind to `driver_id`.
  pub fn into_new(self, driver_id: Uuid, now: DateTime<Utc>) -> Result<NewRideOffer> {
    let from_geo = required_geo("from_geo", &self.from_geo)?;
    let to_geo = required_geo("to_geo", &self.to_geo)?;
    check_schedule(self.depart_at, self.seats, now)?;
    if !self.fare.is_finite() || self.fare < 0.0 {
      return Err(Error::Validation("fare must be a non-negative number".into()));
    }
    Ok(NewRideOffer {
      driver_id,
      from_geo,
      to_geo,
      fare: self.fare,
      depart_at: self.depart_at,
      seats: self.seats,
      status: OfferStatus::Active,
    })
  }
}

impl RequestDraft {
  /// Validate against `now` and bind to the requesting rider.
  pub fn into_new(self, user_id: Uuid, now: DateTime<Utc>) -> Result<NewRideRequest> {
    let from_geo = required_geo("from_geo", &self.from_geo)?;
    let to_geo = required_geo("to_geo", &self.to_geo)?;
    check_schedule(self.depart_at, self.seats, now)?;
    Ok(NewRideRequest {
      user_id,
      from_geo,
      to_geo,
      depart_at: self.depart_at,
      seats: self.seats,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn draft() -> OfferDraft {
    OfferDraft {
      from_geo:  "  tdr1w ".into(),
      to_geo:    "tdr1y".into(),
      fare:      120.0,
      depart_at: Utc::now() + Duration::hours(2),
      seats:     3,
    }
  }

  #[test]
  fn offer_draft_trims_and_starts_active() {
    let driver = Uuid::new_v4();
    let offer = draft().into_new(driver, Utc::now()).unwrap();
    assert_eq!(offer.from_geo, "tdr1w");
    assert_eq!(offer.driver_id, driver);
    assert_eq!(offer.status, OfferStatus::Active);
  }

  #[test]
  fn offer_draft_rejects_blank_geo() {
    let mut d = draft();
    d.to_geo = "   ".into();
    let err = d.into_new(Uuid::new_v4(), Utc::now()).unwrap_err();
    assert_eq!(err.to_string(), "to_geo is required");
  }

  #[test]
  fn offer_draft_rejects_past_time_and_zero_seats() {
    let mut d = draft();
    d.depart_at = Utc::now() - Duration::minutes(5);
    assert!(matches!(
      d.into_new(Uuid::new_v4(), Utc::now()),
      Err(Error::Validation(_))
    ));

    let mut d = draft();
    d.seats = 0;
    assert!(matches!(
      d.into_new(Uuid::new_v4(), Utc::now()),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn offer_draft_rejects_negative_fare() {
    let mut d = draft();
    d.fare = -1.0;
    assert!(d.into_new(Uuid::new_v4(), Utc::now()).is_err());
  }

  #[test]
  fn request_status_round_trips_through_text() {
    assert_eq!(RequestStatus::Matched.to_string(), "matched");
    assert_eq!("active".parse::<RequestStatus>().unwrap(), RequestStatus::Active);
    assert!("pending".parse::<RequestStatus>().is_err());
  }
}
