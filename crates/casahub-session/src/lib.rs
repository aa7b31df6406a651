//! # casahub-session
//!
//! Authentication session management for CasaHub: the [`SessionStore`]
//! owning the single current session, identity, and profile; the
//! [`clock`] module for pure expiry math; and the [`LivenessMonitor`]
//! that keeps the session alive across tab backgrounding and network
//! interruption.
//!
//! [`SessionStore`]: store::SessionStore
//! [`LivenessMonitor`]: liveness::LivenessMonitor

pub mod clock;
pub mod liveness;
pub mod provider;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use liveness::{LivenessMonitor, LivenessSignal};
pub use provider::{AuthEvent, AuthProvider, AuthSession, Escalation, SignOutScope};
pub use store::{SessionSnapshot, SessionStore};
