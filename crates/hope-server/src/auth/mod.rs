//! Credential verification and identity propagation.

pub mod gate;
pub mod google;
pub mod login;
pub mod session;

pub use gate::{Caller, Gate, GateError};
pub use google::{GoogleVerifier, LoginError, LoginPolicy};
pub use login::{LoginOutcome, LoginService};
pub use session::{AuthError, SessionKeys};
