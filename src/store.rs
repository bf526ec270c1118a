//! Auth state store — the single-writer session/identity state machine.
//!
//! ARCHITECTURE
//! ============
//! `AuthStore` is an explicit context object, not a process global:
//! construct one per application (or per test) and clone it freely — clones
//! share the same state. Consumers observe [`AuthSnapshot`] through a
//! `tokio::sync::watch` channel; every mutation flows through the store's
//! actions, so the watch sender is the single writer.
//!
//! CONCURRENCY
//! ===========
//! Distinct triggers (a manual `check_auth`, a token-refresh event) can
//! interleave. A compare-and-swap guard admits at most one in-flight
//! resolution; losing callers return immediately and rely on the winner's
//! completion for fresh state. In-flight resolutions are never cancelled.
//!
//! ERROR HANDLING
//! ==============
//! No backend fault escapes an action boundary. Resolution failures clear
//! `user` (never a half-populated or stale profile), and the loading flag
//! settles false on every exit path via a scope guard, panics included.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::IdentityBackend;
use crate::listener::AuthListener;
use crate::resolver::{self, ResolutionError};
use crate::storage::DurableStorage;
use crate::user::User;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Observable auth state. `current_church_id` mirrors `user.church_id` once
/// resolved but is independently persisted, so tenant context survives a
/// restart before the first resolution completes.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<User>,
    /// True exactly while a resolution attempt is in flight, and at
    /// construction before the first `check_auth` settles.
    pub is_loading: bool,
    pub current_church_id: Option<Uuid>,
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Arc<dyn IdentityBackend>,
    storage: Arc<dyn DurableStorage>,
    snapshot: watch::Sender<AuthSnapshot>,
    /// Re-entrancy guard: at most one resolution in flight. Outside the
    /// snapshot on purpose — the guard is not observable state.
    resolving: AtomicBool,
    listener: Mutex<Option<AuthListener>>,
}

impl AuthStore {
    /// Build a store over the given collaborators. The persisted tenant
    /// context is restored immediately; `user` stays absent until
    /// [`AuthStore::check_auth`] runs.
    #[must_use]
    pub fn new(backend: Arc<dyn IdentityBackend>, storage: Arc<dyn DurableStorage>) -> Self {
        let persisted = storage.load_church_id().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load persisted tenant context");
            None
        });
        let (snapshot, _) = watch::channel(AuthSnapshot {
            user: None,
            is_loading: true,
            current_church_id: persisted,
        });
        Self {
            inner: Arc::new(StoreInner {
                backend,
                storage,
                snapshot,
                resolving: AtomicBool::new(false),
                listener: Mutex::new(None),
            }),
        }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Reactive subscription surface. Receivers observe every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.inner.snapshot.subscribe()
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Exchange credentials for a session, then resolve the profile.
    ///
    /// Returns `false` on rejected credentials, leaving `user` untouched.
    /// Returns `true` whenever the credential exchange succeeds — even if
    /// the follow-up resolution finds no profile. Credential validity and
    /// profile existence are orthogonal concerns.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        self.set_loading(true);
        let accepted = match self.inner.backend.sign_in_with_password(email, password).await {
            Ok(session) => {
                info!(user_id = %session.user_id, "credential exchange succeeded");
                self.check_auth().await;
                true
            }
            Err(e) => {
                warn!(error = %e, "login rejected");
                false
            }
        };
        // Loading settles false no matter which branch ran.
        self.set_loading(false);
        accepted
    }

    /// Terminate the session. On success, `user` and the tenant context are
    /// cleared; on failure, `user` stays untouched but loading still clears.
    pub async fn logout(&self) {
        self.set_loading(true);
        match self.inner.backend.sign_out().await {
            Ok(()) => {
                info!("signed out");
                self.apply_resolved(None);
            }
            Err(e) => {
                error!(error = %e, "logout failed; session state left as-is");
            }
        }
        self.set_loading(false);
    }

    /// The central resolution entry point.
    ///
    /// Re-entrant calls are suppressed: if a resolution is already in
    /// flight, this returns immediately without touching state. Callers
    /// that need the result of their own fetch must not rely on a
    /// concurrent invocation completing one.
    pub async fn check_auth(&self) {
        if self
            .inner
            .resolving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("resolution already in flight; call ignored");
            return;
        }
        // Both flags must clear on every exit path, panics included.
        let _guard = ResolutionGuard { inner: &self.inner };
        self.set_loading(true);

        let resolved = match self.inner.backend.get_session().await {
            Ok(session) => resolver::resolve(self.inner.backend.as_ref(), session.as_ref()).await,
            Err(e) => Err(ResolutionError::Backend(e)),
        };

        match resolved {
            Ok(Some(user)) => {
                info!(user_id = %user.id, role = %user.role, "session resolved");
                self.apply_resolved(Some(user));
            }
            Ok(None) => {
                debug!("no active session");
                self.apply_resolved(None);
            }
            Err(e) => {
                warn!(error = %e, "session resolution failed; treating as signed out");
                self.apply_resolved(None);
            }
        }
    }

    /// Unconditional tenant-context setter, persisted on every change.
    /// Lets an operator switch tenants explicitly (super-admin
    /// impersonation).
    pub fn set_current_church_id(&self, church_id: Option<Uuid>) {
        debug!(?church_id, "tenant context set");
        self.inner.snapshot.send_modify(|s| s.current_church_id = church_id);
        self.persist_church_id(church_id);
    }

    /// Install the session-change listener, at most once per store
    /// lifetime. Subsequent calls are no-ops.
    pub fn initialize_auth_listener(&self) {
        let mut slot = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            debug!("auth listener already installed");
            return;
        }
        let receiver = self.inner.backend.subscribe();
        *slot = Some(AuthListener::start(self.clone(), receiver));
    }

    /// Stop the listener task. Idempotent; call on teardown.
    pub fn dispose(&self) {
        let listener = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.stop();
        }
    }

    // =========================================================================
    // INTERNAL TRANSITIONS
    // =========================================================================

    /// Direct clear for a certain sign-out notification: no re-resolution.
    pub(crate) fn clear_session(&self) {
        self.inner.snapshot.send_modify(|s| {
            s.user = None;
            s.current_church_id = None;
            s.is_loading = false;
        });
        self.persist_church_id(None);
    }

    fn set_loading(&self, is_loading: bool) {
        self.inner.snapshot.send_modify(|s| s.is_loading = is_loading);
    }

    /// Apply a resolution outcome: user and tenant context move together.
    fn apply_resolved(&self, user: Option<User>) {
        let church_id = user.as_ref().and_then(|u| u.church_id);
        self.inner.snapshot.send_modify(|s| {
            s.user = user;
            s.current_church_id = church_id;
        });
        self.persist_church_id(church_id);
    }

    /// Persistence is best-effort: a storage fault is logged, never a
    /// reason to fail the auth action that triggered it.
    fn persist_church_id(&self, church_id: Option<Uuid>) {
        if let Err(e) = self.inner.storage.save_church_id(church_id) {
            warn!(error = %e, "failed to persist tenant context");
        }
    }
}

/// Releases the re-entrancy guard and settles the loading flag when a
/// `check_auth` scope exits, on every path.
struct ResolutionGuard<'a> {
    inner: &'a StoreInner,
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        self.inner.resolving.store(false, Ordering::Release);
        self.inner.snapshot.send_modify(|s| s.is_loading = false);
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
