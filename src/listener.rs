//! Auth event listener — keeps the store consistent with the backend's
//! notion of session validity.
//!
//! DESIGN
//! ======
//! A background task consumes the backend's bounded session-event channel
//! one event at a time and drives the store. Sign-in, token-refresh, and
//! user-update events re-run the guarded resolution; sign-out clears state
//! directly — termination is certain, there is nothing to re-resolve.
//! Explicit `start`/`stop` so the owning store controls the lifecycle.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::SessionEvent;
use crate::store::AuthStore;

pub struct AuthListener {
    handle: JoinHandle<()>,
}

impl AuthListener {
    /// Spawn the consuming task. Installed through
    /// [`AuthStore::initialize_auth_listener`], which guarantees at most
    /// one listener per store lifetime.
    #[must_use]
    pub fn start(store: AuthStore, mut events: broadcast::Receiver<SessionEvent>) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => handle_event(&store, event).await,
                    Err(RecvError::Lagged(missed)) => {
                        // Events were dropped; the safe recovery is a fresh
                        // resolution rather than replaying what was missed.
                        warn!(missed, "session events lagged; forcing a re-check");
                        store.check_auth().await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("session event channel closed; listener exiting");
                        break;
                    }
                }
            }
        });
        Self { handle }
    }

    /// Stop consuming events. In-flight resolutions run to completion in
    /// the store; only the event loop is torn down.
    pub fn stop(self) {
        self.handle.abort();
    }
}

async fn handle_event(store: &AuthStore, event: SessionEvent) {
    debug!(?event, "session event received");
    match event {
        SessionEvent::SignedIn | SessionEvent::TokenRefreshed | SessionEvent::UserUpdated => {
            store.check_auth().await;
        }
        SessionEvent::SignedOut => store.clear_session(),
    }
}

#[cfg(test)]
#[path = "listener_test.rs"]
mod tests;
