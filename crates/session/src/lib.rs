//! Session identity for the dashboard.
//!
//! Real sign-in lives with the external auth service. This crate only
//! defines what the dashboard needs from it ([`AuthProvider`]) and an
//! in-memory [`SessionStore`] that front ends and tests drive directly.

mod store;

pub use store::SessionStore;

use filedrop_protocol::SessionIdentity;
use tokio::sync::watch;

/// Errors produced by session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("owner id must not be empty")]
    EmptyOwnerId,

    #[error("owner id must not contain '/': {0}")]
    InvalidOwnerId(String),
}

/// Source of the signed-in identity.
pub trait AuthProvider: Send + Sync {
    /// Identity of the current session, `None` when signed out.
    fn current(&self) -> Option<SessionIdentity>;

    /// Receiver that observes every sign-in and sign-out.
    fn subscribe(&self) -> watch::Receiver<Option<SessionIdentity>>;
}
