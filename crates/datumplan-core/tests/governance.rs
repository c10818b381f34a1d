// crates/datumplan-core/tests/governance.rs
// ============================================================================
// Module: Plan Governance Tests
// Description: Tests for editing, overrides, approval, and optimization.
// ============================================================================
//! ## Overview
//! Validates the edit constraint policy, override-with-justification,
//! the approval state machine, version monotonicity, and the optimizer's
//! constraint preservation.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use datumplan_core::ActorId;
use datumplan_core::AuditLog;
use datumplan_core::AuditResult;
use datumplan_core::DatumPlan;
use datumplan_core::InMemoryAuditLog;
use datumplan_core::InMemoryPlanStore;
use datumplan_core::Objective;
use datumplan_core::OverrideRequest;
use datumplan_core::PlanEdits;
use datumplan_core::PlanState;
use datumplan_core::PlanStore;
use datumplan_core::Role;
use datumplan_core::Timestamp;
use datumplan_core::runtime::approve_plan;
use datumplan_core::runtime::diff_plans;
use datumplan_core::runtime::edit_plan;
use datumplan_core::runtime::evaluate;
use datumplan_core::runtime::generate_plan;
use datumplan_core::runtime::new_draft_from;
use datumplan_core::runtime::optimization_summary;
use datumplan_core::runtime::optimize_plan;
use datumplan_core::runtime::reject_plan;
use datumplan_core::runtime::remove_step_constraint;
use datumplan_core::runtime::submit_plan;

use common::quote;
use common::seeded_catalog;
use common::space_flight_request;

const T0: Timestamp = Timestamp::Logical(10);

fn ops() -> ActorId {
    ActorId::new("ops-1")
}

/// Generates the polymerics plan and seeds a store with it.
fn seeded_plan() -> (InMemoryPlanStore, InMemoryAuditLog, DatumPlan) {
    let catalog = seeded_catalog();
    let run = evaluate(&catalog, &space_flight_request()).unwrap();
    let plan = generate_plan(&quote(2), Some(&run), &[], T0).unwrap();

    let store = InMemoryPlanStore::new();
    store.create_version(&plan).unwrap();
    (store, InMemoryAuditLog::new(), plan)
}

// ============================================================================
// SECTION: Editing
// ============================================================================

/// Tests a free edit writes version 2 with appended edit metadata.
#[test]
fn test_edit_writes_new_version() {
    let (store, audit, plan) = seeded_plan();

    let edits = PlanEdits {
        notes: Some("panelize 2x2".to_string()),
        ..PlanEdits::default()
    };
    let edited = edit_plan(
        &store,
        &audit,
        &plan.plan_id,
        &edits,
        &ops(),
        Role::Ops,
        "add panelization note",
        &[],
        Timestamp::Logical(11),
    )
    .unwrap();

    assert_eq!(edited.version, 2);
    assert_eq!(edited.parent_version, Some(1));
    assert_eq!(edited.state, PlanState::Draft);
    assert_eq!(edited.edit_metadata.len(), 1);
    assert_eq!(edited.edit_metadata[0].edit_reason, "add panelization note");

    // Version 1 is untouched in the store.
    let original = store.load(&plan.plan_id, 1).unwrap().unwrap();
    assert!(original.notes.is_none());
}

/// Tests removing an SOE-locked step without an override is rejected.
#[test]
fn test_remove_locked_step_requires_override() {
    let (store, audit, plan) = seeded_plan();

    let kept: Vec<_> = plan
        .steps
        .iter()
        .filter(|step| step.step_type != "BAKE")
        .cloned()
        .collect();
    let edits = PlanEdits {
        steps: Some(kept),
        ..PlanEdits::default()
    };

    let error = edit_plan(
        &store,
        &audit,
        &plan.plan_id,
        &edits,
        &ops(),
        Role::Ops,
        "drop bake",
        &[],
        Timestamp::Logical(11),
    )
    .unwrap_err();
    assert_eq!(error.code(), "PLAN_INVALID_EDIT");

    // The denied attempt is audited with an unchanged state.
    let events = audit.events(plan.plan_id.as_str()).unwrap();
    assert_eq!(events.last().unwrap().result, AuditResult::Denied);
    assert_eq!(events.last().unwrap().from_state, events.last().unwrap().to_state);
}

/// Tests an override with an empty reason is rejected.
#[test]
fn test_override_requires_reason() {
    let (store, audit, plan) = seeded_plan();

    let bake = plan.steps.iter().find(|step| step.step_type == "BAKE").unwrap();
    let kept: Vec<_> = plan
        .steps
        .iter()
        .filter(|step| step.step_id != bake.step_id)
        .cloned()
        .collect();
    let edits = PlanEdits {
        steps: Some(kept),
        ..PlanEdits::default()
    };
    let overrides = vec![OverrideRequest {
        constraint: remove_step_constraint(bake.step_id.as_str()),
        reason: "  ".to_string(),
    }];

    let error = edit_plan(
        &store,
        &audit,
        &plan.plan_id,
        &edits,
        &ops(),
        Role::Ops,
        "drop bake",
        &overrides,
        Timestamp::Logical(11),
    )
    .unwrap_err();
    assert_eq!(error.code(), "OVERRIDE_MISSING_REASON");
}

/// Tests a justified override removes the step and records the deviation.
#[test]
fn test_override_with_reason_is_recorded() {
    let (store, audit, plan) = seeded_plan();

    let bake = plan.steps.iter().find(|step| step.step_type == "BAKE").unwrap().clone();
    let kept: Vec<_> = plan
        .steps
        .iter()
        .filter(|step| step.step_id != bake.step_id)
        .cloned()
        .collect();
    let edits = PlanEdits {
        steps: Some(kept),
        ..PlanEdits::default()
    };
    let overrides = vec![
        OverrideRequest {
            constraint: remove_step_constraint(bake.step_id.as_str()),
            reason: "bake performed by qualified subcontractor".to_string(),
        },
        OverrideRequest {
            constraint: datumplan_core::runtime::REORDER_LOCKED_SEQUENCE.to_string(),
            reason: "bake removal shortens the locked block".to_string(),
        },
    ];

    let edited = edit_plan(
        &store,
        &audit,
        &plan.plan_id,
        &edits,
        &ops(),
        Role::Ops,
        "subcontracted bake",
        &overrides,
        Timestamp::Logical(11),
    )
    .unwrap();

    assert_eq!(edited.version, 2);
    let recorded = &edited.edit_metadata[0].overrides;
    assert!(!recorded.is_empty());
    assert!(recorded.iter().any(|record| record.constraint.contains(bake.step_id.as_str())));
}

/// Tests reordering a locked sequence without an override is rejected.
#[test]
fn test_reorder_locked_sequence_requires_override() {
    let (store, audit, plan) = seeded_plan();

    let mut steps = plan.steps.clone();
    let clean_position = steps.iter().position(|step| step.step_type == "CLEAN").unwrap();
    let cure_position = steps.iter().position(|step| step.step_type == "CURE").unwrap();
    let clean_sequence = steps[clean_position].sequence;
    let cure_sequence = steps[cure_position].sequence;
    steps[clean_position].sequence = cure_sequence;
    steps[cure_position].sequence = clean_sequence;

    let edits = PlanEdits {
        steps: Some(steps),
        ..PlanEdits::default()
    };
    let error = edit_plan(
        &store,
        &audit,
        &plan.plan_id,
        &edits,
        &ops(),
        Role::Ops,
        "swap clean and cure",
        &[],
        Timestamp::Logical(11),
    )
    .unwrap_err();
    assert_eq!(error.code(), "PLAN_INVALID_EDIT");
}

/// Tests the structured diff is empty for identical versions.
#[test]
fn test_diff_of_identical_versions_is_empty() {
    let (_, _, plan) = seeded_plan();
    assert!(diff_plans(&plan, &plan).is_empty());
}

/// Tests concurrent writers lose with a version conflict.
#[test]
fn test_concurrent_edit_conflicts() {
    let (store, _, plan) = seeded_plan();

    let mut racer = plan.clone();
    racer.version = 2;
    racer.parent_version = Some(1);
    store.create_version(&racer).unwrap();
    let error = store.create_version(&racer).unwrap_err();
    assert!(matches!(error, datumplan_core::StoreError::VersionConflict { .. }));
}

// ============================================================================
// SECTION: Approval
// ============================================================================

/// Tests the submit/approve path locks the plan.
#[test]
fn test_submit_and_approve_locks_plan() {
    let (store, audit, plan) = seeded_plan();

    let submitted =
        submit_plan(&store, &audit, &plan.plan_id, &ops(), Role::Ops, "ready", Timestamp::Logical(11))
            .unwrap();
    assert_eq!(submitted.state, PlanState::Submitted);

    let approved = approve_plan(
        &store,
        &audit,
        &plan.plan_id,
        &ops(),
        Role::Admin,
        "reviewed",
        Timestamp::Logical(12),
    )
    .unwrap();
    assert_eq!(approved.state, PlanState::Approved);
    assert!(approved.locked);
    assert_eq!(approved.approved_by.as_ref().unwrap().as_str(), "ops-1");
    assert!(approved.approved_at.is_some());
}

/// Tests approving a non-submitted plan fails.
#[test]
fn test_approve_requires_submission() {
    let (store, audit, plan) = seeded_plan();
    let error = approve_plan(
        &store,
        &audit,
        &plan.plan_id,
        &ops(),
        Role::Ops,
        "too eager",
        Timestamp::Logical(11),
    )
    .unwrap_err();
    assert_eq!(error.code(), "PLAN_STATE_TRANSITION_INVALID");
}

/// Tests a CUSTOMER role may not approve.
#[test]
fn test_customer_cannot_approve() {
    let (store, audit, plan) = seeded_plan();
    submit_plan(&store, &audit, &plan.plan_id, &ops(), Role::Ops, "ready", Timestamp::Logical(11))
        .unwrap();
    let error = approve_plan(
        &store,
        &audit,
        &plan.plan_id,
        &ActorId::new("cust-1"),
        Role::Customer,
        "self-serve",
        Timestamp::Logical(12),
    )
    .unwrap_err();
    assert_eq!(error.code(), "FORBIDDEN");
}

/// Tests rejection returns the same version to draft with a recorded reason.
#[test]
fn test_reject_returns_to_draft() {
    let (store, audit, plan) = seeded_plan();
    submit_plan(&store, &audit, &plan.plan_id, &ops(), Role::Ops, "ready", Timestamp::Logical(11))
        .unwrap();
    let rejected = reject_plan(
        &store,
        &audit,
        &plan.plan_id,
        &ops(),
        Role::Ops,
        "missing cure profile parameters",
        Timestamp::Logical(12),
    )
    .unwrap();

    assert_eq!(rejected.state, PlanState::Draft);
    assert_eq!(rejected.version, 1);
    assert!(!rejected.locked);
    assert!(
        rejected
            .edit_metadata
            .last()
            .unwrap()
            .edit_reason
            .contains("missing cure profile parameters")
    );
}

/// Tests any write to an approved version fails and forking yields a draft.
#[test]
fn test_approved_plan_is_immutable_and_forkable() {
    let (store, audit, plan) = seeded_plan();
    submit_plan(&store, &audit, &plan.plan_id, &ops(), Role::Ops, "ready", Timestamp::Logical(11))
        .unwrap();
    approve_plan(&store, &audit, &plan.plan_id, &ops(), Role::Ops, "ok", Timestamp::Logical(12))
        .unwrap();

    let edits = PlanEdits {
        notes: Some("late change".to_string()),
        ..PlanEdits::default()
    };
    let error = edit_plan(
        &store,
        &audit,
        &plan.plan_id,
        &edits,
        &ops(),
        Role::Ops,
        "tweak",
        &[],
        Timestamp::Logical(13),
    )
    .unwrap_err();
    assert_eq!(error.code(), "PLAN_APPROVED_IMMUTABLE");

    let draft = new_draft_from(
        &store,
        &audit,
        &plan.plan_id,
        &ops(),
        Role::Ops,
        "rework after approval",
        Timestamp::Logical(14),
    )
    .unwrap();
    assert_eq!(draft.version, 2);
    assert_eq!(draft.parent_version, Some(1));
    assert_eq!(draft.state, PlanState::Draft);
    assert!(!draft.locked);
    assert!(draft.approved_by.is_none());
}

// ============================================================================
// SECTION: Optimizer
// ============================================================================

/// Tests optimization preserves locked blocks and creates a new version.
#[test]
fn test_optimizer_preserves_locked_blocks() {
    let (store, audit, plan) = seeded_plan();

    let optimized = optimize_plan(
        &store,
        &audit,
        &plan.plan_id,
        Objective::Throughput,
        &ops(),
        Role::Ops,
        Timestamp::Logical(11),
    )
    .unwrap();

    assert_eq!(optimized.version, 2);

    // Locked steps keep their relative order and contiguity.
    let mut ordered = optimized.steps.clone();
    ordered.sort_by_key(|step| step.sequence);
    let locked_types: Vec<&str> = ordered
        .iter()
        .filter(|step| step.locked_sequence)
        .map(|step| step.step_type.as_str())
        .collect();
    assert_eq!(locked_types, vec!["CLEAN", "BAKE", "POLYMER", "CURE", "INSPECT"]);

    let summary = optimization_summary(&plan, &optimized, Objective::Throughput);
    assert!(summary.constraints_preserved);
    assert_eq!(summary.steps_added, 0);
    assert_eq!(summary.steps_removed, 0);
}
