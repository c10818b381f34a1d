// crates/datumplan-core/tests/lifecycle.rs
// ============================================================================
// Module: Profile Lifecycle Tests
// Description: Tests for the profile state machine, versioning, and bundles.
// ============================================================================
//! ## Overview
//! Validates profile governance: state transitions, approved immutability,
//! semver version creation, version comparison, and bundle resolution.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use datumplan_core::ActorId;
use datumplan_core::BundleId;
use datumplan_core::ConflictPolicy;
use datumplan_core::InMemoryAuditLog;
use datumplan_core::InMemoryProfileStore;
use datumplan_core::ProfileBundle;
use datumplan_core::ProfileId;
use datumplan_core::ProfileState;
use datumplan_core::ProfileStore;
use datumplan_core::ProfileType;
use datumplan_core::Role;
use datumplan_core::Timestamp;
use datumplan_core::runtime::approve_profile;
use datumplan_core::runtime::compare_profile_versions;
use datumplan_core::runtime::create_bundle;
use datumplan_core::runtime::create_profile_version;
use datumplan_core::runtime::deprecate_profile;
use datumplan_core::runtime::list_profile_versions;
use datumplan_core::runtime::parse_semver;
use datumplan_core::runtime::reject_profile;
use datumplan_core::runtime::submit_profile;

use common::profile;

const T0: Timestamp = Timestamp::Logical(100);

fn admin() -> ActorId {
    ActorId::new("admin-1")
}

/// Seeds a store with a draft BASE profile.
fn seeded_store() -> (InMemoryProfileStore, InMemoryAuditLog, ProfileId) {
    let store = InMemoryProfileStore::new();
    let mut draft =
        profile("BASE_IPC", ProfileType::Base, &[], &["IPC_PACK"], ConflictPolicy::Error);
    draft.state = ProfileState::Draft;
    store.create_version(&draft).unwrap();
    (store, InMemoryAuditLog::new(), draft.profile_id)
}

// ============================================================================
// SECTION: State Machine
// ============================================================================

/// Tests the full draft -> submitted -> approved path.
#[test]
fn test_submit_then_approve() {
    let (store, audit, profile_id) = seeded_store();

    let submitted =
        submit_profile(&store, &audit, &profile_id, &admin(), Role::Admin, "review", T0).unwrap();
    assert_eq!(submitted.state, ProfileState::Submitted);

    let approved = approve_profile(
        &store,
        &audit,
        &profile_id,
        &admin(),
        Role::Admin,
        "meets program needs",
        Timestamp::Logical(101),
    )
    .unwrap();
    assert_eq!(approved.state, ProfileState::Approved);
    assert_eq!(approved.metadata.state_updated_by.as_ref().unwrap().as_str(), "admin-1");
}

/// Tests approving a draft profile directly fails.
#[test]
fn test_approve_requires_submission() {
    let (store, audit, profile_id) = seeded_store();
    let error =
        approve_profile(&store, &audit, &profile_id, &admin(), Role::Admin, "skip", T0).unwrap_err();
    assert_eq!(error.code(), "PROFILE_STATE_TRANSITION_INVALID");
}

/// Tests rejection requires a reason and lands in rejected.
#[test]
fn test_reject_requires_reason() {
    let (store, audit, profile_id) = seeded_store();
    submit_profile(&store, &audit, &profile_id, &admin(), Role::Admin, "review", T0).unwrap();

    let error =
        reject_profile(&store, &audit, &profile_id, &admin(), Role::Admin, " ", T0).unwrap_err();
    assert_eq!(error.code(), "REASON_REQUIRED");

    let rejected = reject_profile(
        &store,
        &audit,
        &profile_id,
        &admin(),
        Role::Admin,
        "pack list incomplete",
        T0,
    )
    .unwrap();
    assert_eq!(rejected.state, ProfileState::Rejected);

    // A rejected profile may be resubmitted.
    let resubmitted =
        submit_profile(&store, &audit, &profile_id, &admin(), Role::Admin, "fixed", T0).unwrap();
    assert_eq!(resubmitted.state, ProfileState::Submitted);
}

/// Tests an approved profile cannot move except to deprecated.
#[test]
fn test_approved_profile_only_deprecates() {
    let (store, audit, profile_id) = seeded_store();
    submit_profile(&store, &audit, &profile_id, &admin(), Role::Admin, "review", T0).unwrap();
    approve_profile(&store, &audit, &profile_id, &admin(), Role::Admin, "ok", T0).unwrap();

    let error =
        submit_profile(&store, &audit, &profile_id, &admin(), Role::Admin, "again", T0).unwrap_err();
    assert_eq!(error.code(), "PROFILE_APPROVED_IMMUTABLE");

    let successor = ProfileId::new("BASE_IPC_V2");
    let deprecated = deprecate_profile(
        &store,
        &audit,
        &profile_id,
        &admin(),
        Role::Admin,
        "superseded by rev 2",
        Some(&successor),
        Timestamp::Logical(102),
    )
    .unwrap();
    assert_eq!(deprecated.state, ProfileState::Deprecated);
    assert_eq!(deprecated.metadata.superseded_by, vec![successor]);
}

// ============================================================================
// SECTION: Versioning
// ============================================================================

/// Tests semver parsing accepts X.Y.Z only.
#[test]
fn test_parse_semver() {
    assert_eq!(parse_semver("1.2.3"), Some((1, 2, 3)));
    assert_eq!(parse_semver("10.0.0"), Some((10, 0, 0)));
    assert_eq!(parse_semver("1.2"), None);
    assert_eq!(parse_semver("1.2.3.4"), None);
    assert_eq!(parse_semver("1.x.3"), None);
}

/// Tests version creation clones into a draft with a parent pointer.
#[test]
fn test_create_version_clones_as_draft() {
    let (store, audit, profile_id) = seeded_store();
    submit_profile(&store, &audit, &profile_id, &admin(), Role::Admin, "review", T0).unwrap();
    approve_profile(&store, &audit, &profile_id, &admin(), Role::Admin, "ok", T0).unwrap();

    let next = create_profile_version(&store, &audit, &profile_id, "1.1.0", &admin(), Role::Admin, T0)
        .unwrap();
    assert_eq!(next.version, "1.1.0");
    assert_eq!(next.parent_version.as_deref(), Some("1.0.0"));
    assert_eq!(next.state, ProfileState::Draft);

    // The approved 1.0.0 is still the stored version at its coordinate.
    let original = store.load_version(&profile_id, "1.0.0").unwrap().unwrap();
    assert_eq!(original.state, ProfileState::Approved);

    // Non-advancing versions are rejected.
    let error =
        create_profile_version(&store, &audit, &profile_id, "1.0.0", &admin(), Role::Admin, T0)
            .unwrap_err();
    assert_eq!(error.code(), "PROFILE_VERSION_INVALID");

    let history = list_profile_versions(&store, &profile_id).unwrap();
    let versions: Vec<&str> = history.iter().map(|info| info.version.as_str()).collect();
    assert_eq!(versions, vec!["1.0.0", "1.1.0"]);
}

/// Tests version comparison reports pack deltas.
#[test]
fn test_compare_versions_reports_pack_changes() {
    let (store, audit, profile_id) = seeded_store();
    submit_profile(&store, &audit, &profile_id, &admin(), Role::Admin, "review", T0).unwrap();
    approve_profile(&store, &audit, &profile_id, &admin(), Role::Admin, "ok", T0).unwrap();

    let mut next = create_profile_version(&store, &audit, &profile_id, "2.0.0", &admin(), Role::Admin, T0)
        .unwrap();
    next.default_packs.push(datumplan_core::PackId::new("NEW_PACK"));
    store.update_state(&next).unwrap();

    let diff = compare_profile_versions(&store, &profile_id, "1.0.0", "2.0.0").unwrap();
    assert_eq!(diff.packs_added, vec!["NEW_PACK".to_string()]);
    assert!(diff.packs_removed.is_empty());
    assert!(diff.field_changes.iter().any(|change| change.field == "state"));
}

// ============================================================================
// SECTION: Bundles
// ============================================================================

/// Tests bundle creation and order-preserving deduplicated resolution.
#[test]
fn test_bundle_resolution_deduplicates() {
    let (store, audit, _) = seeded_store();

    let bundle = ProfileBundle {
        bundle_id: BundleId::new("PROGRAM_ARTEMIS"),
        name: Some("Artemis program".to_string()),
        profile_ids: vec![
            ProfileId::new("BASE_IPC"),
            ProfileId::new("AS9100_DOMAIN"),
            ProfileId::new("BASE_IPC"),
        ],
        program_id: Some("artemis".to_string()),
        customer_id: None,
        contract_id: None,
    };
    create_bundle(&store, &audit, &bundle, &admin(), Role::Admin, T0).unwrap();

    let stored = store.bundle(&bundle.bundle_id).unwrap().unwrap();
    assert_eq!(
        stored.resolve(),
        vec![ProfileId::new("BASE_IPC"), ProfileId::new("AS9100_DOMAIN")]
    );

    // Re-creating the same bundle conflicts.
    let error = create_bundle(&store, &audit, &bundle, &admin(), Role::Admin, T0).unwrap_err();
    assert_eq!(error.code(), "VERSION_CONFLICT");

    // Empty bundles are rejected.
    let empty = ProfileBundle {
        bundle_id: BundleId::new("EMPTY"),
        name: None,
        profile_ids: Vec::new(),
        program_id: None,
        customer_id: None,
        contract_id: None,
    };
    let error = create_bundle(&store, &audit, &empty, &admin(), Role::Admin, T0).unwrap_err();
    assert_eq!(error.code(), "BUNDLE_INVALID");
}
