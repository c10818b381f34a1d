// crates/datumplan-core/tests/generator.rs
// ============================================================================
// Module: Plan Generator Tests
// Description: Tests for baseline sequencing and SOE-derived plan content.
// ============================================================================
//! ## Overview
//! Validates baseline step seeding, locked-sequence insertion, test and
//! evidence intent derivation, and byte-level determinism of generation.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use datumplan_core::BASELINE_RULE_ID;
use datumplan_core::PlanState;
use datumplan_core::Side;
use datumplan_core::canonical_json_bytes;
use datumplan_core::runtime::evaluate;
use datumplan_core::runtime::generate_plan;

use common::medical_request;
use common::quote;
use common::seeded_catalog;
use common::space_flight_request;

const T0: datumplan_core::Timestamp = datumplan_core::Timestamp::Logical(1);

// ============================================================================
// SECTION: Baseline Steps
// ============================================================================

/// Tests the baseline sequence for a top-side quote.
#[test]
fn test_baseline_sequence_without_soe() {
    let plan = generate_plan(&quote(1), None, &[], T0).unwrap();

    let types: Vec<&str> = plan.steps.iter().map(|step| step.step_type.as_str()).collect();
    assert_eq!(types, vec!["FAB", "SMT", "REFLOW", "INSPECT", "PACK"]);
    assert_eq!(plan.version, 1);
    assert_eq!(plan.state, PlanState::Draft);
    assert!(!plan.locked);
    assert_eq!(plan.plan_revision, "A");

    for step in &plan.steps {
        assert!(!step.source_rules.is_empty());
        assert_eq!(step.source_rules[0].rule_id.as_str(), BASELINE_RULE_ID);
        assert!(step.soe_decision_id.is_none());
    }
}

/// Tests bottom-side assembly adds a second SMT/reflow pair.
#[test]
fn test_double_sided_baseline() {
    let mut quote = quote(1);
    quote.assembly_sides = vec![Side::Top, Side::Bottom];
    let plan = generate_plan(&quote, None, &[], T0).unwrap();

    let types: Vec<&str> = plan.steps.iter().map(|step| step.step_type.as_str()).collect();
    assert_eq!(types, vec!["FAB", "SMT", "REFLOW", "SMT", "REFLOW", "INSPECT", "PACK"]);
}

/// Tests revision letters advance from existing history.
#[test]
fn test_revision_letters_advance() {
    let plan = generate_plan(&quote(1), None, &["A".to_string(), "B".to_string()], T0).unwrap();
    assert_eq!(plan.plan_revision, "C");

    let wrapped = generate_plan(&quote(1), None, &["Z".to_string()], T0).unwrap();
    assert_eq!(wrapped.plan_revision, "AA");

    let carried = generate_plan(&quote(1), None, &["AZ".to_string()], T0).unwrap();
    assert_eq!(carried.plan_revision, "BA");
}

// ============================================================================
// SECTION: SOE Integration
// ============================================================================

/// Tests the polymerics run inserts five contiguous locked steps in order.
#[test]
fn test_polymerics_locked_sequence_in_plan() {
    let catalog = seeded_catalog();
    let run = evaluate(&catalog, &space_flight_request()).unwrap();
    let plan = generate_plan(&quote(2), Some(&run), &[], T0).unwrap();

    let locked: Vec<(&str, u32)> = plan
        .steps
        .iter()
        .filter(|step| step.locked_sequence)
        .map(|step| (step.step_type.as_str(), step.sequence))
        .collect();
    let locked_types: Vec<&str> = locked.iter().map(|(step_type, _)| *step_type).collect();
    assert_eq!(locked_types, vec!["CLEAN", "BAKE", "POLYMER", "CURE", "INSPECT"]);

    // Contiguous sequence positions.
    let positions: Vec<u32> = locked.iter().map(|(_, sequence)| *sequence).collect();
    for pair in positions.windows(2) {
        assert_eq!(pair[1], pair[0] + 1);
    }

    for step in plan.steps.iter().filter(|step| step.locked_sequence) {
        assert!(step.soe_decision_id.is_some());
        assert!(step.soe_why.is_some());
        assert!(step.required);
    }

    assert_eq!(plan.soe_run_id.as_ref(), Some(&run.soe_run_id));
    assert_eq!(plan.soe_decision_ids.len(), 5);
    let mut sorted = plan.soe_decision_ids.clone();
    sorted.sort();
    assert_eq!(plan.soe_decision_ids, sorted);
}

/// Tests the medical run yields IQ/OQ/PQ tests and DHR/DMR evidence.
#[test]
fn test_medical_tests_and_evidence_intent() {
    let catalog = seeded_catalog();
    let run = evaluate(&catalog, &medical_request()).unwrap();
    let plan = generate_plan(&quote(1), Some(&run), &[], T0).unwrap();

    let test_types: Vec<&str> = plan.tests.iter().map(|test| test.test_type.as_str()).collect();
    assert_eq!(test_types, vec!["IQ", "OQ", "PQ"]);
    for test in &plan.tests {
        assert!(test.required);
        assert!(test.soe_decision_id.is_some());
    }

    let evidence_types: Vec<&str> = plan
        .evidence_intent
        .iter()
        .map(|evidence| evidence.evidence_type.as_str())
        .collect();
    assert_eq!(evidence_types, vec!["DHR", "DMR"]);
    for evidence in &plan.evidence_intent {
        assert_eq!(evidence.retention, "DEVICE_LIFETIME_PLUS_2Y");
        assert!(evidence.soe_decision_id.is_some());
        assert!(evidence.soe_why.is_some());
    }
}

// ============================================================================
// SECTION: Determinism
// ============================================================================

/// Tests generation is byte-identical for identical inputs.
#[test]
fn test_generation_is_byte_deterministic() {
    let catalog = seeded_catalog();
    let run = evaluate(&catalog, &space_flight_request()).unwrap();

    let plan_a = generate_plan(&quote(2), Some(&run), &[], T0).unwrap();
    let plan_b = generate_plan(&quote(2), Some(&run), &[], T0).unwrap();

    assert_eq!(
        canonical_json_bytes(&plan_a).unwrap(),
        canonical_json_bytes(&plan_b).unwrap()
    );
    assert_eq!(plan_a.plan_id, plan_b.plan_id);
}

/// Tests step identifiers are stable content hashes.
#[test]
fn test_step_ids_are_content_addressed() {
    let catalog = seeded_catalog();
    let run = evaluate(&catalog, &space_flight_request()).unwrap();
    let plan = generate_plan(&quote(2), Some(&run), &[], T0).unwrap();

    for step in &plan.steps {
        assert!(datumplan_core::is_content_id(step.step_id.as_str()));
    }
    // Distinct steps get distinct ids.
    let mut ids: Vec<&str> = plan.steps.iter().map(|step| step.step_id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), plan.steps.len());
}
