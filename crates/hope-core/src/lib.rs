//! Core types and services for the Hope ride-matching backend.
//!
//! This crate has no HTTP or database dependencies. Storage
//! backends implement the contracts in [`store`]; transports call the services
//! ([`lifecycle::MatchEngine`], [`rides::RideService`],
//! [`presence::PresenceService`]) with an [`identity::Identity`] they have
//! already verified.

pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod matching;
pub mod presence;
pub mod ride;
pub mod rides;
pub mod store;
pub mod user;

pub use error::{Error, ErrorCode, Result};
