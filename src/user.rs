//! Typed user profile — the resolved identity record plus its closed
//! role and status enumerations.
//!
//! DESIGN
//! ======
//! `User` is derived state: it is only ever produced by the session
//! resolver from backend records, never hand-edited. Role and status are
//! closed enums with fallible parsing — a value outside the enumeration is
//! a data-integrity fault in the backend and fails loudly instead of being
//! coerced to a guess.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// ROLE
// =============================================================================

/// Function a member holds within their church, or [`Role::SuperAdmin`]
/// for cross-tenant operators outside any church.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    MinistryLeader,
    Pastor,
    Admin,
    Finance,
    Volunteer,
    MediaTech,
    Integration,
    SuperAdmin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::MinistryLeader => "ministry_leader",
            Role::Pastor => "pastor",
            Role::Admin => "admin",
            Role::Finance => "finance",
            Role::Volunteer => "volunteer",
            Role::MediaTech => "media_tech",
            Role::Integration => "integration",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role value outside the closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {value:?}")]
pub struct RoleParseError {
    pub value: String,
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "ministry_leader" => Ok(Role::MinistryLeader),
            "pastor" => Ok(Role::Pastor),
            "admin" => Ok(Role::Admin),
            "finance" => Ok(Role::Finance),
            "volunteer" => Ok(Role::Volunteer),
            "media_tech" => Ok(Role::MediaTech),
            "integration" => Ok(Role::Integration),
            "super_admin" => Ok(Role::SuperAdmin),
            _ => Err(RoleParseError { value: s.to_owned() }),
        }
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Membership lifecycle status, authoritative from the backend record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Pending,
    Inactive,
}

impl UserStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Pending => "pending",
            UserStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status value outside the closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {value:?}")]
pub struct StatusParseError {
    pub value: String,
}

impl std::str::FromStr for UserStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "pending" => Ok(UserStatus::Pending),
            "inactive" => Ok(UserStatus::Inactive),
            _ => Err(StatusParseError { value: s.to_owned() }),
        }
    }
}

// =============================================================================
// USER
// =============================================================================

/// The resolved, role-aware user profile.
///
/// Invariant: `role == SuperAdmin` implies `church_id == None` and
/// `profile_complete == true`. For every other role `church_id` is present
/// whenever a member record exists, and `profile_complete` comes straight
/// from that record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Backend subject id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email from the session.
    pub email: String,
    /// Closed role enumeration.
    pub role: Role,
    /// Tenant id; `None` only for super admins.
    pub church_id: Option<Uuid>,
    /// Tenant display name, if known.
    pub church_name: Option<String>,
    /// Recommended-ministry tag, if any.
    pub ministry: Option<String>,
    /// Membership lifecycle status.
    pub status: UserStatus,
    /// Creation timestamp from the backend.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Whether required onboarding data entry is finished.
    pub profile_complete: bool,
}

impl User {
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Whether the profile-completion interstitial applies to this user.
    /// Super admins have no tenant profile to complete.
    #[must_use]
    pub fn needs_profile_completion(&self) -> bool {
        !self.is_super_admin() && !self.profile_complete
    }
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
