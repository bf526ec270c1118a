//! REST identity backend — GoTrue-style auth endpoints plus
//! PostgREST-style registry lookups.
//!
//! DESIGN
//! ======
//! Tokens live inside this client: `get_session` answers from the local
//! token cache (expired tokens read as no session), and the client emits
//! session events on its own transitions, mirroring how the hosted SDKs
//! behave. Requests carry a bounded timeout so a hung backend cannot hold
//! the store's loading flag forever.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::BackendConfig;

use super::{
    AdminRecord, BackendError, IdentityBackend, MemberRecord, SESSION_EVENT_CAPACITY, Session,
    SessionEvent,
};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

const ADMIN_SELECT: &str = "id,full_name,email";
const MEMBER_SELECT: &str =
    "id,full_name,role,church_id,status,created_at,profile_complete,ministry,churches(name)";

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
    user: SessionPayload,
}

#[derive(Debug, Deserialize)]
struct SessionPayload {
    id: Uuid,
    email: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl SessionPayload {
    fn into_session(self) -> Session {
        Session {
            user_id: self.id,
            email: self.email.unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MemberRow {
    id: Uuid,
    full_name: String,
    role: String,
    church_id: Uuid,
    status: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    profile_complete: bool,
    ministry: Option<String>,
    churches: Option<ChurchEmbed>,
}

#[derive(Debug, Deserialize)]
struct ChurchEmbed {
    name: String,
}

impl MemberRow {
    fn into_record(self) -> MemberRecord {
        MemberRecord {
            id: self.id,
            full_name: self.full_name,
            role: self.role,
            church_id: self.church_id,
            church_name: self.churches.map(|c| c.name),
            ministry: self.ministry,
            status: self.status,
            created_at: self.created_at,
            profile_complete: self.profile_complete,
        }
    }
}

/// Cached token material for the active session.
#[derive(Debug, Clone)]
struct TokenSet {
    access_token: String,
    refresh_token: String,
    session: Session,
    expires_at: OffsetDateTime,
}

impl TokenSet {
    fn from_response(response: TokenResponse, now: OffsetDateTime) -> Self {
        let expires_at = now + Duration::from_secs(response.expires_in);
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            session: response.user.into_session(),
            expires_at,
        }
    }

    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    tokens: Mutex<Option<TokenSet>>,
    events: broadcast::Sender<SessionEvent>,
}

impl RestBackend {
    /// Build a client for the configured deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Ok(Self {
            http,
            base_url: config.base_url,
            api_key: config.api_key,
            tokens: Mutex::new(None),
            events,
        })
    }

    /// Exchange the cached refresh token for fresh session tokens and emit
    /// [`SessionEvent::TokenRefreshed`].
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSession`] when nothing is cached, or the
    /// underlying request/parse error.
    pub async fn refresh_session(&self) -> Result<Session, BackendError> {
        let refresh_token = self
            .lock_tokens()
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .ok_or(BackendError::NoSession)?;

        let url = format!("{}/auth/v1/token?grant_type=refresh_token", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let token = read_token_response(response).await?;
        let session = self.install_tokens(token);
        self.emit(SessionEvent::TokenRefreshed);
        Ok(session)
    }

    fn lock_tokens(&self) -> std::sync::MutexGuard<'_, Option<TokenSet>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn install_tokens(&self, response: TokenResponse) -> Session {
        let tokens = TokenSet::from_response(response, OffsetDateTime::now_utc());
        let session = tokens.session.clone();
        *self.lock_tokens() = Some(tokens);
        session
    }

    /// Registry requests authenticate with the session token when one is
    /// cached, falling back to the service key.
    fn bearer_token(&self) -> String {
        self.lock_tokens()
            .as_ref()
            .map_or_else(|| self.api_key.clone(), |t| t.access_token.clone())
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; the send result only counts receivers.
        let _ = self.events.send(event);
    }

    /// Fetch at most one row from a registry table filtered by subject id.
    async fn fetch_single<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        user_id: Uuid,
    ) -> Result<Option<T>, BackendError> {
        let url = format!("{}/rest/v1/{table}", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer_token())
            .query(&[
                ("id", format!("eq.{user_id}")),
                ("select", select.to_owned()),
                ("limit", "1".to_owned()),
            ])
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Response { status, body });
        }
        let rows: Vec<T> = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;
        Ok(rows.into_iter().next())
    }
}

/// Map a token-endpoint response, distinguishing rejected credentials from
/// other failures.
async fn read_token_response(response: reqwest::Response) -> Result<TokenResponse, BackendError> {
    let status = response.status();
    if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(BackendError::InvalidCredentials);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Response { status: status.as_u16(), body });
    }
    response
        .json()
        .await
        .map_err(|e| BackendError::Parse(e.to_string()))
}

#[async_trait::async_trait]
impl IdentityBackend for RestBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let token = read_token_response(response).await?;
        let session = self.install_tokens(token);
        self.emit(SessionEvent::SignedIn);
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let Some(access_token) = self.lock_tokens().as_ref().map(|t| t.access_token.clone())
        else {
            // Nothing to terminate.
            return Ok(());
        };

        let url = format!("{}/auth/v1/logout", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Response { status, body });
        }

        *self.lock_tokens() = None;
        self.emit(SessionEvent::SignedOut);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .lock_tokens()
            .as_ref()
            .filter(|t| !t.is_expired(now))
            .map(|t| t.session.clone()))
    }

    async fn find_super_admin(&self, user_id: Uuid) -> Result<Option<AdminRecord>, BackendError> {
        self.fetch_single("super_admins", ADMIN_SELECT, user_id).await
    }

    async fn find_member(&self, user_id: Uuid) -> Result<Option<MemberRecord>, BackendError> {
        let row: Option<MemberRow> = self.fetch_single("members", MEMBER_SELECT, user_id).await?;
        Ok(row.map(MemberRow::into_record))
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
