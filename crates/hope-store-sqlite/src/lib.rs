//! SQLite backend for the Hope stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Implements every contract in
//! [`hope_core::store`], including the transactional [`MatchingUnit`].
//!
//! [`MatchingUnit`]: hope_core::store::MatchingUnit

mod cas;
mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
