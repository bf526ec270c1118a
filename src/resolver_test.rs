use uuid::Uuid;

use crate::backend::test_helpers::{MockBackend, sample_admin, sample_member, sample_session};
use crate::user::{Role, UserStatus};

use super::*;

// =============================================================================
// No session
// =============================================================================

#[tokio::test]
async fn absent_session_resolves_to_no_user() {
    let backend = MockBackend::new();
    let resolved = resolve(&backend, None).await.unwrap();
    assert!(resolved.is_none());
}

// =============================================================================
// Super admin branch
// =============================================================================

#[tokio::test]
async fn admin_record_resolves_to_super_admin() {
    let user_id = Uuid::new_v4();
    let backend = MockBackend::new();
    backend.insert_admin(sample_admin(user_id, "Ana"));
    let session = sample_session(user_id);

    let user = resolve(&backend, Some(&session)).await.unwrap().unwrap();

    assert_eq!(user.id, user_id);
    assert_eq!(user.name, "Ana");
    assert_eq!(user.email, session.email);
    assert_eq!(user.role, Role::SuperAdmin);
    assert_eq!(user.church_id, None);
    assert_eq!(user.church_name.as_deref(), Some(MASTER_PANEL_NAME));
    assert_eq!(user.status, UserStatus::Active);
    assert!(user.profile_complete);
}

#[tokio::test]
async fn admin_registry_wins_over_member_registry() {
    let user_id = Uuid::new_v4();
    let backend = MockBackend::new();
    backend.insert_admin(sample_admin(user_id, "Ana"));
    backend.insert_member(sample_member(user_id, "pastor", Uuid::new_v4(), "Grace Chapel"));

    let user = resolve(&backend, Some(&sample_session(user_id))).await.unwrap().unwrap();
    assert_eq!(user.role, Role::SuperAdmin);
    assert_eq!(user.church_id, None);
}

// =============================================================================
// Member branch
// =============================================================================

#[tokio::test]
async fn member_record_resolves_with_mapped_fields() {
    let user_id = Uuid::new_v4();
    let church_id = Uuid::new_v4();
    let backend = MockBackend::new();
    let mut record = sample_member(user_id, "pastor", church_id, "Grace Chapel");
    record.profile_complete = false;
    record.ministry = Some("worship".into());
    backend.insert_member(record);

    let user = resolve(&backend, Some(&sample_session(user_id))).await.unwrap().unwrap();

    assert_eq!(user.role, Role::Pastor);
    assert_eq!(user.church_id, Some(church_id));
    assert_eq!(user.church_name.as_deref(), Some("Grace Chapel"));
    assert_eq!(user.ministry.as_deref(), Some("worship"));
    assert_eq!(user.status, UserStatus::Active);
    assert!(!user.profile_complete);
}

#[tokio::test]
async fn missing_profile_is_profile_not_found() {
    let user_id = Uuid::new_v4();
    let backend = MockBackend::with_session(sample_session(user_id));

    let err = resolve(&backend, Some(&sample_session(user_id))).await.unwrap_err();
    assert!(matches!(err, ResolutionError::ProfileNotFound { user_id: id } if id == user_id));
}

#[tokio::test]
async fn unknown_role_fails_resolution() {
    let user_id = Uuid::new_v4();
    let backend = MockBackend::new();
    backend.insert_member(sample_member(user_id, "deacon", Uuid::new_v4(), "Grace Chapel"));

    let err = resolve(&backend, Some(&sample_session(user_id))).await.unwrap_err();
    assert!(matches!(err, ResolutionError::InvalidRole { ref value, .. } if value == "deacon"));
}

#[tokio::test]
async fn unknown_status_fails_resolution() {
    let user_id = Uuid::new_v4();
    let backend = MockBackend::new();
    let mut record = sample_member(user_id, "member", Uuid::new_v4(), "Grace Chapel");
    record.status = "suspended".into();
    backend.insert_member(record);

    let err = resolve(&backend, Some(&sample_session(user_id))).await.unwrap_err();
    assert!(matches!(err, ResolutionError::InvalidStatus { ref value, .. } if value == "suspended"));
}

// =============================================================================
// Backend faults
// =============================================================================

#[tokio::test]
async fn registry_fault_short_circuits() {
    let user_id = Uuid::new_v4();
    let backend = MockBackend::new();
    backend.fail_registry.store(true, std::sync::atomic::Ordering::Relaxed);

    let err = resolve(&backend, Some(&sample_session(user_id))).await.unwrap_err();
    assert!(matches!(err, ResolutionError::Backend(_)));
}
