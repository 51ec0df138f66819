use filedrop_protocol::SessionIdentity;
use filedrop_protocol::constants::PATH_SEPARATOR;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{AuthProvider, SessionError};

/// In-memory session holder backed by a `watch` channel.
#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<Option<SessionIdentity>>,
}

impl SessionStore {
    /// Creates a signed-out store.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Creates a store that is already signed in.
    pub fn signed_in(identity: SessionIdentity) -> Result<Self, SessionError> {
        let store = Self::new();
        store.sign_in(identity)?;
        Ok(store)
    }

    /// Replaces the current identity and notifies subscribers.
    ///
    /// The owner id becomes a storage folder name, so it must be a single
    /// non-empty path segment.
    pub fn sign_in(&self, identity: SessionIdentity) -> Result<(), SessionError> {
        if identity.owner_id.is_empty() {
            return Err(SessionError::EmptyOwnerId);
        }
        if identity.owner_id.contains(PATH_SEPARATOR) {
            return Err(SessionError::InvalidOwnerId(identity.owner_id));
        }

        info!(owner = %identity.owner_id, "session started");
        self.tx.send_replace(Some(identity));
        Ok(())
    }

    /// Clears the session. Returns the identity that was signed in, if any.
    pub fn sign_out(&self) -> Option<SessionIdentity> {
        let previous = self.tx.send_replace(None);
        if let Some(ref identity) = previous {
            debug!(owner = %identity.owner_id, "session ended");
        }
        previous
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for SessionStore {
    fn current(&self) -> Option<SessionIdentity> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<SessionIdentity>> {
        self.tx.subscribe()
    }
}
