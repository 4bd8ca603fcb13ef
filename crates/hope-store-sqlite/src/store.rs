//! The SQLite implementation of the Hope store contracts.

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{Connection, OptionalExtension as _};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use hope_core::{
  matching::{Acceptance, Accepted, Match, MatchStatus, NewMatch},
  ride::{NewRideOffer, NewRideRequest, OfferStatus, RequestStatus, RideOffer, RideRequest},
  store::{MatchStore, MatchingUnit, RideOfferStore, RideRequestStore, StoreBackend, Swap, UserStore},
  user::{NewUser, User},
};

use crate::{
  Result,
  cas::{Guarded, compare_and_swap},
  error::Abandoned,
  encode::{
    MATCH_COLUMNS, OFFER_COLUMNS, REQUEST_COLUMNS, RawMatch, RawOffer, RawRequest, RawUser,
    USER_COLUMNS, encode_dt, encode_unix, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// All Hope stores backed by a single SQLite file.
///
/// Clones share one connection. Every call runs on the connection's own
/// thread, one at a time. A write whose caller has gone away by the time its
/// turn comes (or before it commits) is skipped.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("sqlite schema ready");
    Ok(())
  }

  /// Run a write on the connection thread.
  ///
  /// `f` receives a token that is cancelled once the returned future is
  /// dropped. It must pass [`still_wanted`] before its first statement and
  /// again before committing.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut Connection, &CancellationToken) -> tokio_rusqlite::Result<T>
      + Send
      + 'static,
  {
    let token = CancellationToken::new();
    let _cancel_on_drop = token.clone().drop_guard();
    Ok(self.conn.call(move |conn| f(conn, &token)).await?)
  }

  /// Run a match listing keyed on one text parameter.
  async fn query_matches(&self, sql: String, key: Uuid) -> Result<Vec<Match>> {
    let key_str = encode_uuid(key);

    let raws: Vec<RawMatch> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![key_str], RawMatch::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMatch::into_match).collect()
  }
}

// ─── Row writers ─────────────────────────────────────────────────────────────

fn still_wanted(token: &CancellationToken) -> tokio_rusqlite::Result<()> {
  if token.is_cancelled() {
    tracing::debug!("caller went away; write skipped");
    return Err(tokio_rusqlite::Error::Other(Box::new(Abandoned)));
  }
  Ok(())
}

fn insert_offer(conn: &Connection, offer: &RideOffer) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO ride_offers (
       offer_id, driver_id, from_geo, to_geo, fare, depart_at, seats, status
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      encode_uuid(offer.offer_id),
      offer.driver_id.map(encode_uuid),
      offer.from_geo,
      offer.to_geo,
      offer.fare,
      encode_dt(offer.depart_at),
      i64::from(offer.seats),
      offer.status.to_string(),
    ],
  )?;
  Ok(())
}

fn insert_match(conn: &Connection, record: &Match) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO matches (match_id, rider_id, driver_id, ride_id, status, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      encode_uuid(record.match_id),
      encode_uuid(record.rider_id),
      encode_uuid(record.driver_id),
      encode_uuid(record.ride_id),
      record.status.to_string(),
      encode_dt(record.created_at),
    ],
  )?;
  Ok(())
}

impl StoreBackend for SqliteStore {
  type Error = crate::Error;
}

// ─── Users ───────────────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  async fn create_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:   Uuid::new_v4(),
      email:     input.email.trim().to_lowercase(),
      name:      input.name,
      photo_url: input.photo_url,
      geohash:   None,
      last_seen: Utc::now().trunc_subsecs(0),
    };

    let id_str    = encode_uuid(user.user_id);
    let email     = user.email.clone();
    let name      = user.name.clone();
    let photo_url = user.photo_url.clone();
    let last_seen = encode_unix(user.last_seen);

    self
      .write(move |conn, live| {
        still_wanted(live)?;
        conn.execute(
          "INSERT INTO users (user_id, email, name, photo_url, geohash, last_seen)
           VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
          rusqlite::params![id_str, email, name, photo_url, last_seen],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_email(&self, email: String) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            rusqlite::params![email],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn swap_last_seen(
    &self,
    id:       Uuid,
    expected: DateTime<Utc>,
    new:      DateTime<Utc>,
  ) -> Result<Swap> {
    let id_str   = encode_uuid(id);
    let expected = encode_unix(expected);
    let new      = encode_unix(new);

    let swap = self
      .write(move |conn, live| {
        still_wanted(live)?;
        Ok(compare_and_swap(conn, Guarded::UserLastSeen, &id_str, &expected, &new)?)
      })
      .await?;
    Ok(swap)
  }
}

// ─── Ride offers ─────────────────────────────────────────────────────────────

impl RideOfferStore for SqliteStore {
  async fn create_offer(&self, input: NewRideOffer) -> Result<RideOffer> {
    let offer = RideOffer {
      offer_id:  Uuid::new_v4(),
      driver_id: Some(input.driver_id),
      from_geo:  input.from_geo,
      to_geo:    input.to_geo,
      fare:      input.fare,
      depart_at: input.depart_at.trunc_subsecs(6),
      seats:     input.seats,
      status:    input.status,
    };

    let row = offer.clone();
    self
      .write(move |conn, live| {
        still_wanted(live)?;
        insert_offer(conn, &row)?;
        Ok(())
      })
      .await?;

    Ok(offer)
  }

  async fn get_offer(&self, id: Uuid) -> Result<Option<RideOffer>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawOffer> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {OFFER_COLUMNS} FROM ride_offers WHERE offer_id = ?1"),
            rusqlite::params![id_str],
            RawOffer::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawOffer::into_offer).transpose()
  }
}

// ─── Ride requests ───────────────────────────────────────────────────────────

impl RideRequestStore for SqliteStore {
  async fn create_request(&self, input: NewRideRequest) -> Result<RideRequest> {
    let request = RideRequest {
      request_id: Uuid::new_v4(),
      user_id:    input.user_id,
      from_geo:   input.from_geo,
      to_geo:     input.to_geo,
      depart_at:  input.depart_at.trunc_subsecs(6),
      seats:      input.seats,
      status:     RequestStatus::Active,
    };

    let id_str    = encode_uuid(request.request_id);
    let user_str  = encode_uuid(request.user_id);
    let from_geo  = request.from_geo.clone();
    let to_geo    = request.to_geo.clone();
    let depart_at = encode_dt(request.depart_at);
    let seats     = i64::from(request.seats);
    let status    = request.status.to_string();

    self
      .write(move |conn, live| {
        still_wanted(live)?;
        conn.execute(
          "INSERT INTO ride_requests (
             request_id, user_id, from_geo, to_geo, depart_at, seats, status
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, user_str, from_geo, to_geo, depart_at, seats, status],
        )?;
        Ok(())
      })
      .await?;

    Ok(request)
  }

  async fn get_request(&self, id: Uuid) -> Result<Option<RideRequest>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {REQUEST_COLUMNS} FROM ride_requests WHERE request_id = ?1"),
            rusqlite::params![id_str],
            RawRequest::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRequest::into_request).transpose()
  }

  async fn swap_request_status(
    &self,
    id:       Uuid,
    expected: RequestStatus,
    new:      RequestStatus,
  ) -> Result<Swap> {
    let id_str   = encode_uuid(id);
    let expected = expected.to_string();
    let new      = new.to_string();

    let swap = self
      .write(move |conn, live| {
        still_wanted(live)?;
        Ok(compare_and_swap(conn, Guarded::RequestStatus, &id_str, &expected, &new)?)
      })
      .await?;
    Ok(swap)
  }
}

// ─── Matches ─────────────────────────────────────────────────────────────────

impl MatchStore for SqliteStore {
  async fn create_match(&self, input: NewMatch) -> Result<Match> {
    let record = Match {
      match_id:   Uuid::new_v4(),
      rider_id:   input.rider_id,
      driver_id:  input.driver_id,
      ride_id:    input.ride_id,
      status:     input.status,
      created_at: Utc::now().trunc_subsecs(6),
    };

    let row = record.clone();
    self
      .write(move |conn, live| {
        still_wanted(live)?;
        insert_match(conn, &row)?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn get_match(&self, id: Uuid) -> Result<Option<Match>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawMatch> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {MATCH_COLUMNS} FROM matches WHERE match_id = ?1"),
            rusqlite::params![id_str],
            RawMatch::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawMatch::into_match).transpose()
  }

  async fn list_matches_by_ride(&self, ride_id: Uuid) -> Result<Vec<Match>> {
    self
      .query_matches(
        format!(
          "SELECT {MATCH_COLUMNS} FROM matches WHERE ride_id = ?1 ORDER BY created_at DESC"
        ),
        ride_id,
      )
      .await
  }

  async fn list_matches_by_rider(&self, rider_id: Uuid) -> Result<Vec<Match>> {
    self
      .query_matches(
        format!(
          "SELECT {MATCH_COLUMNS} FROM matches WHERE rider_id = ?1 ORDER BY created_at DESC"
        ),
        rider_id,
      )
      .await
  }

  async fn list_matches_for_user(&self, user_id: Uuid) -> Result<Vec<Match>> {
    self
      .query_matches(
        format!(
          "SELECT {MATCH_COLUMNS} FROM matches
           WHERE rider_id = ?1 OR driver_id = ?1
           ORDER BY created_at DESC"
        ),
        user_id,
      )
      .await
  }

  async fn swap_match_status(
    &self,
    id:       Uuid,
    expected: MatchStatus,
    new:      MatchStatus,
  ) -> Result<Swap> {
    let id_str   = encode_uuid(id);
    let expected = expected.to_string();
    let new      = new.to_string();

    let swap = self
      .write(move |conn, live| {
        still_wanted(live)?;
        Ok(compare_and_swap(conn, Guarded::MatchStatus, &id_str, &expected, &new)?)
      })
      .await?;
    Ok(swap)
  }

  async fn force_match_status(&self, id: Uuid, new: MatchStatus) -> Result<Option<Match>> {
    let id_str = encode_uuid(id);
    let status = new.to_string();

    let raw: Option<RawMatch> = self
      .write(move |conn, live| {
        still_wanted(live)?;
        Ok(conn
          .query_row(
            &format!(
              "UPDATE matches SET status = ?2 WHERE match_id = ?1 RETURNING {MATCH_COLUMNS}"
            ),
            rusqlite::params![id_str, status],
            RawMatch::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawMatch::into_match).transpose()
  }
}

// ─── Compound write ──────────────────────────────────────────────────────────

impl MatchingUnit for SqliteStore {
  async fn accept_ride_request(&self, acceptance: Acceptance) -> Result<Option<Accepted>> {
    let offer = RideOffer {
      offer_id:  Uuid::new_v4(),
      driver_id: Some(acceptance.driver_id),
      from_geo:  acceptance.from_geo,
      to_geo:    acceptance.to_geo,
      fare:      0.0,
      depart_at: acceptance.depart_at.trunc_subsecs(6),
      seats:     acceptance.seats,
      status:    OfferStatus::Matched,
    };
    let record = Match {
      match_id:   Uuid::new_v4(),
      rider_id:   acceptance.rider_id,
      driver_id:  acceptance.driver_id,
      ride_id:    offer.offer_id,
      status:     MatchStatus::Accepted,
      created_at: Utc::now().trunc_subsecs(6),
    };

    let request_str = encode_uuid(acceptance.request_id);
    let offer_row   = offer.clone();
    let match_row   = record.clone();

    let committed = self
      .write(move |conn, live| {
        still_wanted(live)?;
        let tx = conn.transaction()?;
        insert_offer(&tx, &offer_row)?;
        insert_match(&tx, &match_row)?;
        let swap = compare_and_swap(
          &tx,
          Guarded::RequestStatus,
          &request_str,
          &RequestStatus::Active.to_string(),
          &RequestStatus::Matched.to_string(),
        )?;
        if !swap.applied() {
          // Dropping the transaction rolls back the offer and the match.
          return Ok(false);
        }
        still_wanted(live)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !committed {
      tracing::debug!(request_id = %acceptance.request_id, "acceptance rolled back");
      return Ok(None);
    }
    Ok(Some(Accepted { offer, record }))
  }
}

#[cfg(test)]
impl SqliteStore {
  /// Keep the connection thread busy for `pause`.
  pub(crate) async fn hold_connection(&self, pause: std::time::Duration) {
    let _ = self
      .conn
      .call(move |_| {
        std::thread::sleep(pause);
        Ok(())
      })
      .await;
  }

  /// Delete a user row outright; offers they drive lose their driver.
  pub(crate) async fn remove_user(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM users WHERE user_id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
