//! Identity backend seam — the hosted auth/registry service collaborator.
//!
//! ARCHITECTURE
//! ============
//! The store and resolver never talk HTTP directly; they consume an
//! [`IdentityBackend`] trait object. The bundled [`rest::RestBackend`]
//! implements it against a GoTrue/PostgREST-style deployment, and tests
//! substitute an in-memory mock. Session-change notifications flow through
//! a bounded broadcast channel so consumers process them one at a time.

pub mod rest;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity of the session-change event channel. Events are tiny and the
/// listener drains them promptly; lag past this depth forces a re-check.
pub const SESSION_EVENT_CAPACITY: usize = 32;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by identity backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The credential exchange was rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// There is no active session to operate on.
    #[error("no active session")]
    NoSession,

    /// The request never produced a response (network fault, timeout).
    #[error("request failed: {0}")]
    Request(String),

    /// The backend returned a non-success HTTP status.
    #[error("unexpected response: status {status}")]
    Response { status: u16, body: String },

    /// The response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Parse(String),
}

// =============================================================================
// SESSION & RECORDS
// =============================================================================

/// Backend-issued proof of authenticated identity. Minimal subset the
/// resolver needs; tokens stay inside the backend implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Subject id of the authenticated identity.
    pub user_id: Uuid,
    /// Email bound to the session.
    pub email: String,
    /// Account creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Row from the privileged-administrator registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdminRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
}

/// Row from the tenant-member registry, joined with the owning tenant's
/// display name. Role and status arrive raw; the resolver maps them through
/// the closed enumerations.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRecord {
    pub id: Uuid,
    pub full_name: String,
    pub role: String,
    pub church_id: Uuid,
    pub church_name: Option<String>,
    pub ministry: Option<String>,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub profile_complete: bool,
}

// =============================================================================
// SESSION EVENTS
// =============================================================================

/// Session-change notifications emitted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

// =============================================================================
// TRAIT
// =============================================================================

/// The identity service collaborator: credential exchange, session state,
/// registry lookups, and session-change notifications.
#[async_trait::async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Exchange credentials for a session. Rejected credentials surface as
    /// [`BackendError::InvalidCredentials`].
    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<Session, BackendError>;

    /// Terminate the current session.
    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Fetch the current session, if one is active.
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    /// Look up a subject id in the privileged-administrator registry.
    async fn find_super_admin(&self, user_id: Uuid) -> Result<Option<AdminRecord>, BackendError>;

    /// Look up a subject id in the tenant-member registry, joined with the
    /// owning tenant's display name.
    async fn find_member(&self, user_id: Uuid) -> Result<Option<MemberRecord>, BackendError>;

    /// Subscribe to session-change notifications.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use time::OffsetDateTime;
    use tokio::sync::broadcast;
    use uuid::Uuid;

    use super::*;

    /// Install a test subscriber so `tracing` output is visible under
    /// `cargo test -- --nocapture`. Safe to call from every test.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    /// Build a session for the given subject id.
    #[must_use]
    pub fn sample_session(user_id: Uuid) -> Session {
        Session {
            user_id,
            email: format!("{user_id}@example.com"),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    /// Build an administrator record.
    #[must_use]
    pub fn sample_admin(id: Uuid, full_name: &str) -> AdminRecord {
        AdminRecord { id, full_name: full_name.to_owned(), email: None }
    }

    /// Build a member record with the given raw role and tenant.
    #[must_use]
    pub fn sample_member(id: Uuid, role: &str, church_id: Uuid, church_name: &str) -> MemberRecord {
        MemberRecord {
            id,
            full_name: "Test Member".to_owned(),
            role: role.to_owned(),
            church_id,
            church_name: Some(church_name.to_owned()),
            ministry: None,
            status: "active".to_owned(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            profile_complete: true,
        }
    }

    /// In-memory [`IdentityBackend`] with failure toggles, call counters,
    /// and an injectable session-fetch delay for interleaving tests.
    pub struct MockBackend {
        pub session: Mutex<Option<Session>>,
        pub admins: Mutex<HashMap<Uuid, AdminRecord>>,
        pub members: Mutex<HashMap<Uuid, MemberRecord>>,
        /// Credentials accepted by `sign_in_with_password`, plus the session
        /// installed on success.
        pub accepted_login: Mutex<Option<(String, String, Session)>>,
        pub fail_session_fetch: AtomicBool,
        pub fail_registry: AtomicBool,
        pub fail_sign_out: AtomicBool,
        pub session_fetch_calls: AtomicUsize,
        pub session_fetch_delay: Mutex<Option<Duration>>,
        events: broadcast::Sender<SessionEvent>,
    }

    impl MockBackend {
        #[must_use]
        pub fn new() -> Self {
            let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
            Self {
                session: Mutex::new(None),
                admins: Mutex::new(HashMap::new()),
                members: Mutex::new(HashMap::new()),
                accepted_login: Mutex::new(None),
                fail_session_fetch: AtomicBool::new(false),
                fail_registry: AtomicBool::new(false),
                fail_sign_out: AtomicBool::new(false),
                session_fetch_calls: AtomicUsize::new(0),
                session_fetch_delay: Mutex::new(None),
                events,
            }
        }

        #[must_use]
        pub fn with_session(session: Session) -> Self {
            let backend = Self::new();
            *backend.session.lock().unwrap() = Some(session);
            backend
        }

        pub fn insert_admin(&self, record: AdminRecord) {
            self.admins.lock().unwrap().insert(record.id, record);
        }

        pub fn insert_member(&self, record: MemberRecord) {
            self.members.lock().unwrap().insert(record.id, record);
        }

        /// Number of live event subscribers.
        #[must_use]
        pub fn subscriber_count(&self) -> usize {
            self.events.receiver_count()
        }

        /// Emit a session-change event to subscribers.
        pub fn emit(&self, event: SessionEvent) {
            // No subscribers is fine; the send result only counts receivers.
            let _ = self.events.send(event);
        }
    }

    impl Default for MockBackend {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait::async_trait]
    impl IdentityBackend for MockBackend {
        async fn sign_in_with_password(
            &self,
            email: &str,
            password: &str,
        ) -> Result<Session, BackendError> {
            let accepted = self.accepted_login.lock().unwrap().clone();
            match accepted {
                Some((ref e, ref p, ref session)) if e == email && p == password => {
                    *self.session.lock().unwrap() = Some(session.clone());
                    self.emit(SessionEvent::SignedIn);
                    Ok(session.clone())
                }
                _ => Err(BackendError::InvalidCredentials),
            }
        }

        async fn sign_out(&self) -> Result<(), BackendError> {
            if self.fail_sign_out.load(Ordering::Relaxed) {
                return Err(BackendError::Request("sign-out unavailable".to_owned()));
            }
            *self.session.lock().unwrap() = None;
            self.emit(SessionEvent::SignedOut);
            Ok(())
        }

        async fn get_session(&self) -> Result<Option<Session>, BackendError> {
            self.session_fetch_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.session_fetch_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_session_fetch.load(Ordering::Relaxed) {
                return Err(BackendError::Request("session fetch unavailable".to_owned()));
            }
            Ok(self.session.lock().unwrap().clone())
        }

        async fn find_super_admin(
            &self,
            user_id: Uuid,
        ) -> Result<Option<AdminRecord>, BackendError> {
            if self.fail_registry.load(Ordering::Relaxed) {
                return Err(BackendError::Request("registry unavailable".to_owned()));
            }
            Ok(self.admins.lock().unwrap().get(&user_id).cloned())
        }

        async fn find_member(&self, user_id: Uuid) -> Result<Option<MemberRecord>, BackendError> {
            if self.fail_registry.load(Ordering::Relaxed) {
                return Err(BackendError::Request("registry unavailable".to_owned()));
            }
            Ok(self.members.lock().unwrap().get(&user_id).cloned())
        }

        fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
            self.events.subscribe()
        }
    }
}
