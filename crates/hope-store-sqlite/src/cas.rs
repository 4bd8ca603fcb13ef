//! Single-row compare-and-swap.
//!
//! The update is conditioned on the stored value of one column still equal to
//! the value the caller last read. Zero affected rows means another writer got
//! there first (or the row is gone); the caller must re-read before retrying.

use hope_core::store::Swap;
use rusqlite::{Connection, ToSql};

/// The columns that may be updated through [`compare_and_swap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guarded {
  UserLastSeen,
  MatchStatus,
  RequestStatus,
}

impl Guarded {
  /// `?1` is the row id, `?2` the expected value, `?3` the new value.
  fn statement(self) -> &'static str {
    match self {
      Self::UserLastSeen => {
        "UPDATE users SET last_seen = ?3 WHERE user_id = ?1 AND last_seen = ?2"
      }
      Self::MatchStatus => {
        "UPDATE matches SET status = ?3 WHERE match_id = ?1 AND status = ?2"
      }
      Self::RequestStatus => {
        "UPDATE ride_requests SET status = ?3 WHERE request_id = ?1 AND status = ?2"
      }
    }
  }
}

/// Works on a plain connection or inside a transaction (which derefs to one).
pub fn compare_and_swap(
  conn: &Connection,
  column: Guarded,
  id: &str,
  expected: &dyn ToSql,
  new: &dyn ToSql,
) -> rusqlite::Result<Swap> {
  let changed = conn.execute(column.statement(), rusqlite::params![id, expected, new])?;
  Ok(if changed == 0 { Swap::Stale } else { Swap::Applied })
}
