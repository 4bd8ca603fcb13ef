//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with a fixed microsecond width and a `Z`
//! suffix, so lexical order is time order. `last_seen` is whole unix seconds.
//! UUIDs are hyphenated lowercase strings; statuses are their snake_case names.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use hope_core::{
  matching::{Match, MatchStatus},
  ride::{OfferStatus, RequestStatus, RideOffer, RideRequest},
  user::User,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_unix(dt: DateTime<Utc>) -> i64 { dt.timestamp() }

pub fn decode_unix(secs: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp(secs, 0)
    .ok_or_else(|| Error::DateParse(format!("unix timestamp out of range: {secs}")))
}

pub fn decode_status<T>(s: &str) -> Result<T>
where
  T: FromStr,
{
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown status: {s:?}")))
}

pub fn decode_seats(n: i64) -> Result<u32> {
  u32::try_from(n).map_err(|_| Error::Decode(format!("seat count out of range: {n}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, email, name, photo_url, geohash, last_seen";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:   String,
  pub email:     String,
  pub name:      String,
  pub photo_url: Option<String>,
  pub geohash:   Option<String>,
  pub last_seen: i64,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:   row.get(0)?,
      email:     row.get(1)?,
      name:      row.get(2)?,
      photo_url: row.get(3)?,
      geohash:   row.get(4)?,
      last_seen: row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:   decode_uuid(&self.user_id)?,
      email:     self.email,
      name:      self.name,
      photo_url: self.photo_url,
      geohash:   self.geohash,
      last_seen: decode_unix(self.last_seen)?,
    })
  }
}

pub const OFFER_COLUMNS: &str =
  "offer_id, driver_id, from_geo, to_geo, fare, depart_at, seats, status";

/// Raw values read directly from a `ride_offers` row.
pub struct RawOffer {
  pub offer_id:  String,
  pub driver_id: Option<String>,
  pub from_geo:  String,
  pub to_geo:    String,
  pub fare:      f64,
  pub depart_at: String,
  pub seats:     i64,
  pub status:    String,
}

impl RawOffer {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      offer_id:  row.get(0)?,
      driver_id: row.get(1)?,
      from_geo:  row.get(2)?,
      to_geo:    row.get(3)?,
      fare:      row.get(4)?,
      depart_at: row.get(5)?,
      seats:     row.get(6)?,
      status:    row.get(7)?,
    })
  }

  pub fn into_offer(self) -> Result<RideOffer> {
    Ok(RideOffer {
      offer_id:  decode_uuid(&self.offer_id)?,
      driver_id: self.driver_id.as_deref().map(decode_uuid).transpose()?,
      from_geo:  self.from_geo,
      to_geo:    self.to_geo,
      fare:      self.fare,
      depart_at: decode_dt(&self.depart_at)?,
      seats:     decode_seats(self.seats)?,
      status:    decode_status::<OfferStatus>(&self.status)?,
    })
  }
}

pub const REQUEST_COLUMNS: &str =
  "request_id, user_id, from_geo, to_geo, depart_at, seats, status";

/// Raw values read directly from a `ride_requests` row.
pub struct RawRequest {
  pub request_id: String,
  pub user_id:    String,
  pub from_geo:   String,
  pub to_geo:     String,
  pub depart_at:  String,
  pub seats:      i64,
  pub status:     String,
}

impl RawRequest {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id: row.get(0)?,
      user_id:    row.get(1)?,
      from_geo:   row.get(2)?,
      to_geo:     row.get(3)?,
      depart_at:  row.get(4)?,
      seats:      row.get(5)?,
      status:     row.get(6)?,
    })
  }

  pub fn into_request(self) -> Result<RideRequest> {
    Ok(RideRequest {
      request_id: decode_uuid(&self.request_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      from_geo:   self.from_geo,
      to_geo:     self.to_geo,
      depart_at:  decode_dt(&self.depart_at)?,
      seats:      decode_seats(self.seats)?,
      status:     decode_status::<RequestStatus>(&self.status)?,
    })
  }
}

pub const MATCH_COLUMNS: &str = "match_id, rider_id, driver_id, ride_id, status, created_at";

/// Raw values read directly from a `matches` row.
pub struct RawMatch {
  pub match_id:   String,
  pub rider_id:   String,
  pub driver_id:  String,
  pub ride_id:    String,
  pub status:     String,
  pub created_at: String,
}

impl RawMatch {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      match_id:   row.get(0)?,
      rider_id:   row.get(1)?,
      driver_id:  row.get(2)?,
      ride_id:    row.get(3)?,
      status:     row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_match(self) -> Result<Match> {
    Ok(Match {
      match_id:   decode_uuid(&self.match_id)?,
      rider_id:   decode_uuid(&self.rider_id)?,
      driver_id:  decode_uuid(&self.driver_id)?,
      ride_id:    decode_uuid(&self.ride_id)?,
      status:     decode_status::<MatchStatus>(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
