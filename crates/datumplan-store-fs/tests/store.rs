// crates/datumplan-store-fs/tests/store.rs
// ============================================================================
// Module: Filesystem Store Tests
// Description: Tests for write-once versions, audit logs, and id hygiene.
// ============================================================================
//! ## Overview
//! Validates exclusive version writes, on-disk immutability, semver-ordered
//! profile versions, append-only audit logs, and path-component validation.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use datumplan_core::ActorId;
use datumplan_core::AuditEntityKind;
use datumplan_core::AuditEvent;
use datumplan_core::AuditLog;
use datumplan_core::AuditResult;
use datumplan_core::ConflictPolicy;
use datumplan_core::OverrideMode;
use datumplan_core::PlanId;
use datumplan_core::PlanState;
use datumplan_core::PlanStore;
use datumplan_core::ProfileId;
use datumplan_core::ProfileMetadata;
use datumplan_core::ProfileState;
use datumplan_core::ProfileStore;
use datumplan_core::ProfileType;
use datumplan_core::QuoteId;
use datumplan_core::Role;
use datumplan_core::StandardsProfile;
use datumplan_core::StoreError;
use datumplan_core::Timestamp;
use datumplan_store_fs::FsStore;

fn plan(version: u32) -> datumplan_core::DatumPlan {
    datumplan_core::DatumPlan {
        plan_id: PlanId::new("plan_0001"),
        quote_id: QuoteId::new("quote-001"),
        version,
        parent_version: (version > 1).then(|| version - 1),
        plan_revision: "A".to_string(),
        state: PlanState::Draft,
        locked: false,
        tier: 1,
        steps: Vec::new(),
        tests: Vec::new(),
        evidence_intent: Vec::new(),
        soe_run_id: None,
        soe_decision_ids: Vec::new(),
        notes: None,
        edit_metadata: Vec::new(),
        approved_by: None,
        approved_at: None,
        created_at: Timestamp::Logical(1),
        updated_at: Timestamp::Logical(1),
    }
}

fn profile(version: &str) -> StandardsProfile {
    StandardsProfile {
        profile_id: ProfileId::new("BASE_IPC"),
        name: None,
        profile_type: ProfileType::Base,
        parent_profile_ids: Vec::new(),
        default_packs: Vec::new(),
        override_mode: OverrideMode::Additive,
        conflict_policy: ConflictPolicy::Error,
        state: ProfileState::Draft,
        version: version.to_string(),
        parent_version: None,
        metadata: ProfileMetadata::default(),
    }
}

// ============================================================================
// SECTION: Plan Versions
// ============================================================================

/// Tests version writes are exclusive and readable.
#[test]
fn test_plan_versions_are_write_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::open(dir.path()).unwrap();

    let v1 = plan(1);
    PlanStore::create_version(&store, &v1).unwrap();

    let conflict = PlanStore::create_version(&store, &v1).unwrap_err();
    assert!(matches!(conflict, StoreError::VersionConflict { .. }));

    let mut v2 = plan(2);
    v2.notes = Some("second".to_string());
    PlanStore::create_version(&store, &v2).unwrap();

    let latest = PlanStore::latest(&store, &v1.plan_id).unwrap().unwrap();
    assert_eq!(latest.version, 2);
    assert_eq!(PlanStore::versions(&store, &v1.plan_id).unwrap(), vec![1, 2]);

    // Version 1 on disk is unchanged by the later write.
    let original = store.load(&v1.plan_id, 1).unwrap().unwrap();
    assert!(original.notes.is_none());
}

/// Tests state updates require an existing version.
#[test]
fn test_update_state_requires_existing_version() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::open(dir.path()).unwrap();

    let missing = PlanStore::update_state(&store, &plan(1)).unwrap_err();
    assert!(matches!(missing, StoreError::VersionNotFound { .. }));

    PlanStore::create_version(&store, &plan(1)).unwrap();
    let mut approved = plan(1);
    approved.state = PlanState::Approved;
    approved.locked = true;
    PlanStore::update_state(&store, &approved).unwrap();

    let reloaded = store.load(&approved.plan_id, 1).unwrap().unwrap();
    assert_eq!(reloaded.state, PlanState::Approved);
    assert!(reloaded.locked);
}

// ============================================================================
// SECTION: Profile Versions
// ============================================================================

/// Tests profile versions sort by semver, not lexicographically.
#[test]
fn test_profile_versions_sort_by_semver() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::open(dir.path()).unwrap();

    for version in ["1.0.0", "1.10.0", "1.2.0"] {
        ProfileStore::create_version(&store, &profile(version)).unwrap();
    }

    let profile_id = ProfileId::new("BASE_IPC");
    assert_eq!(
        ProfileStore::versions(&store, &profile_id).unwrap(),
        vec!["1.0.0".to_string(), "1.2.0".to_string(), "1.10.0".to_string()]
    );
    let latest = ProfileStore::latest(&store, &profile_id).unwrap().unwrap();
    assert_eq!(latest.version, "1.10.0");
}

// ============================================================================
// SECTION: Audit Log
// ============================================================================

/// Tests the audit log appends and preserves order.
#[test]
fn test_audit_log_is_append_only() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::open(dir.path()).unwrap();

    for (index, action) in ["submit", "approve"].iter().enumerate() {
        store
            .append(&AuditEvent {
                timestamp: Timestamp::Logical(index as u64),
                actor: ActorId::new("ops-1"),
                role: Role::Ops,
                entity_kind: AuditEntityKind::DatumPlan,
                entity_id: "plan_0001".to_string(),
                action: (*action).to_string(),
                from_state: "draft".to_string(),
                to_state: "submitted".to_string(),
                result: AuditResult::Applied,
                reason: None,
            })
            .unwrap();
    }

    let events = store.events("plan_0001").unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].action, "submit");
    assert_eq!(events[1].action, "approve");
    assert!(store.events("plan_9999").unwrap().is_empty());
}

// ============================================================================
// SECTION: Id Hygiene
// ============================================================================

/// Tests ids that escape their directory are rejected.
#[test]
fn test_path_escaping_ids_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::open(dir.path()).unwrap();

    let mut evil = plan(1);
    evil.plan_id = PlanId::new("../escape");
    assert!(matches!(PlanStore::create_version(&store, &evil).unwrap_err(), StoreError::Backend(_)));

    assert!(matches!(store.events("a/b").unwrap_err(), StoreError::Backend(_)));
}
