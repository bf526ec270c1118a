//! Session resolver — maps a raw backend session to a typed [`User`].
//!
//! DESIGN
//! ======
//! Pure read: two registry lookups, no state mutation. The privileged
//! administrator registry wins over the tenant-member registry. Errors are
//! returned as values; the store decides the state transition.
//!
//! ERROR HANDLING
//! ==============
//! Role or status values outside the closed enumerations are a
//! data-integrity fault in the backend: they are logged and fail the
//! resolution rather than being coerced to a default.

use tracing::warn;
use uuid::Uuid;

use crate::backend::{BackendError, IdentityBackend, Session};
use crate::user::{Role, User, UserStatus};

/// Display name synthesized for super admins, who sit outside any tenant.
pub const MASTER_PANEL_NAME: &str = "Master Panel";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// Authenticated identity with no administrator or member record.
    #[error("no member or administrator profile for subject {user_id}")]
    ProfileNotFound { user_id: Uuid },

    /// Member record carries a role outside the closed enumeration.
    #[error("member {user_id} carries unknown role {value:?}")]
    InvalidRole { user_id: Uuid, value: String },

    /// Member record carries a status outside the closed enumeration.
    #[error("member {user_id} carries unknown status {value:?}")]
    InvalidStatus { user_id: Uuid, value: String },

    /// A registry or session query failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolve a raw session into a typed user profile.
///
/// An absent session is a valid terminal state and resolves to `Ok(None)`,
/// not an error.
///
/// # Errors
///
/// Returns [`ResolutionError`] when the identity has no registry record,
/// when record fields fall outside the closed enumerations, or when any
/// backend query fails.
pub async fn resolve(
    backend: &dyn IdentityBackend,
    session: Option<&Session>,
) -> Result<Option<User>, ResolutionError> {
    let Some(session) = session else {
        return Ok(None);
    };

    if let Some(admin) = backend.find_super_admin(session.user_id).await? {
        return Ok(Some(User {
            id: session.user_id,
            name: admin.full_name,
            email: session.email.clone(),
            role: Role::SuperAdmin,
            church_id: None,
            church_name: Some(MASTER_PANEL_NAME.to_owned()),
            ministry: None,
            status: UserStatus::Active,
            created_at: session.created_at,
            profile_complete: true,
        }));
    }

    let member = backend
        .find_member(session.user_id)
        .await?
        .ok_or(ResolutionError::ProfileNotFound { user_id: session.user_id })?;

    let role: Role = member.role.parse().map_err(|e: crate::user::RoleParseError| {
        warn!(user_id = %session.user_id, value = %e.value, "member record carries unknown role");
        ResolutionError::InvalidRole { user_id: session.user_id, value: e.value }
    })?;
    let status: UserStatus = member.status.parse().map_err(|e: crate::user::StatusParseError| {
        warn!(user_id = %session.user_id, value = %e.value, "member record carries unknown status");
        ResolutionError::InvalidStatus { user_id: session.user_id, value: e.value }
    })?;

    Ok(Some(User {
        id: session.user_id,
        name: member.full_name,
        email: session.email.clone(),
        role,
        church_id: Some(member.church_id),
        church_name: member.church_name,
        ministry: member.ministry,
        status,
        created_at: member.created_at,
        profile_complete: member.profile_complete,
    }))
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
