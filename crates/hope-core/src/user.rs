//! Users of the platform. Drivers and riders are both plain users; the role is
//! a property of each match, not of the account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub user_id:   Uuid,
  pub email:     String,
  pub name:      String,
  pub photo_url: Option<String>,
  /// Proximity key; not interpreted by this crate.
  pub geohash:   Option<String>,
  /// Second granularity, the precision the store compares on.
  pub last_seen: DateTime<Utc>,
}

/// Input to [`crate::store::UserStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:     String,
  pub name:      String,
  pub photo_url: Option<String>,
}
