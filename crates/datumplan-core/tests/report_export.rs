// crates/datumplan-core/tests/report_export.rs
// ============================================================================
// Module: Report and Export Tests
// Description: Tests for compliance reports, hardened exports, and integrity.
// ============================================================================
//! ## Overview
//! Validates report gating and hashing, HTML escaping, export provenance and
//! tier gating, and the audit integrity check.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::collections::BTreeMap;

use datumplan_core::ActorId;
use datumplan_core::AuditLog;
use datumplan_core::CheckStatus;
use datumplan_core::ConflictPolicy;
use datumplan_core::DatumPlan;
use datumplan_core::InMemoryAuditLog;
use datumplan_core::InMemoryPlanStore;
use datumplan_core::PlanStore;
use datumplan_core::ProfileId;
use datumplan_core::ProfileState;
use datumplan_core::ProfileType;
use datumplan_core::Role;
use datumplan_core::SoeRun;
use datumplan_core::Timestamp;
use datumplan_core::runtime::ExportFormat;
use datumplan_core::runtime::ReportFormat;
use datumplan_core::runtime::approve_plan;
use datumplan_core::runtime::build_report;
use datumplan_core::runtime::check_audit_integrity;
use datumplan_core::runtime::evaluate;
use datumplan_core::runtime::export_csv;
use datumplan_core::runtime::export_json;
use datumplan_core::runtime::export_placement_csv;
use datumplan_core::runtime::generate_plan;
use datumplan_core::runtime::render_report;
use datumplan_core::runtime::submit_plan;

use common::profile;
use common::quote;
use common::seeded_catalog;
use common::space_flight_request;

const T0: Timestamp = Timestamp::Logical(50);

fn qa() -> ActorId {
    ActorId::new("qa-1")
}

/// Generates and approves the polymerics plan over a profile-backed stack.
fn approved_plan() -> (DatumPlan, SoeRun, InMemoryAuditLog) {
    let catalog = seeded_catalog();
    catalog
        .put_profile(profile(
            "SPACE_BASE",
            ProfileType::Base,
            &[],
            &["NASA_POLYMERICS"],
            ConflictPolicy::Error,
        ))
        .unwrap();

    let mut request = space_flight_request();
    request.active_profiles = Some(vec![ProfileId::new("SPACE_BASE")]);
    let run = evaluate(&catalog, &request).unwrap();

    let plan = generate_plan(&quote(3), Some(&run), &[], T0).unwrap();
    let store = InMemoryPlanStore::new();
    let audit = InMemoryAuditLog::new();
    store.create_version(&plan).unwrap();
    submit_plan(&store, &audit, &plan.plan_id, &qa(), Role::Ops, "ready", Timestamp::Logical(51))
        .unwrap();
    let approved = approve_plan(
        &store,
        &audit,
        &plan.plan_id,
        &qa(),
        Role::Admin,
        "release",
        Timestamp::Logical(52),
    )
    .unwrap();
    (approved, run, audit)
}

// ============================================================================
// SECTION: Compliance Reports
// ============================================================================

/// Tests reports refuse unapproved plans.
#[test]
fn test_report_requires_approved_plan() {
    let catalog = seeded_catalog();
    let run = evaluate(&catalog, &space_flight_request()).unwrap();
    let draft = generate_plan(&quote(3), Some(&run), &[], T0).unwrap();

    let error = build_report(&draft, Some(&run), &[], T0, &qa()).unwrap_err();
    assert_eq!(error.code(), "REPORT_REQUIRES_APPROVAL");
}

/// Tests the report hash is a stable full digest over the body.
#[test]
fn test_report_hash_is_stable() {
    let (plan, run, audit) = approved_plan();
    let events = audit.events(plan.plan_id.as_str()).unwrap();

    let report_a =
        build_report(&plan, Some(&run), &events, Timestamp::Logical(60), &qa()).unwrap();
    let report_b =
        build_report(&plan, Some(&run), &events, Timestamp::Logical(60), &qa()).unwrap();

    assert_eq!(report_a.report_hash.len(), 64);
    assert_eq!(report_a.report_hash, report_b.report_hash);
    assert_eq!(report_a.body.approvals_trail.events.len(), events.len());
    assert_eq!(report_a.body.profile_stack.profiles.len(), 1);
}

/// Tests only html is a valid report format.
#[test]
fn test_report_format_contract() {
    assert!(ReportFormat::parse("html").is_ok());
    let error = ReportFormat::parse("pdf").unwrap_err();
    assert_eq!(error.code(), "UNSUPPORTED_FORMAT");
}

/// Tests the HTML renderer emits all nine sections and the hash.
#[test]
fn test_html_report_sections() {
    let (plan, run, audit) = approved_plan();
    let events = audit.events(plan.plan_id.as_str()).unwrap();
    let report = build_report(&plan, Some(&run), &events, Timestamp::Logical(60), &qa()).unwrap();

    let html = render_report(&report, ReportFormat::Html).unwrap();
    for heading in [
        "1. Executive Summary",
        "2. Scope",
        "3. Standards Coverage",
        "4. Compliance Traceability",
        "5. Deviations &amp; Overrides",
        "6. Approvals Trail",
        "7. Profile Stack",
        "8. Evidence Requirements",
        "9. Audit Metadata",
    ] {
        assert!(html.contains(heading), "missing section heading: {heading}");
    }
    assert!(html.contains(&report.report_hash));
}

/// Tests interpolated values are HTML-escaped.
#[test]
fn test_html_report_escapes_values() {
    let (mut plan, run, audit) = approved_plan();
    plan.steps[0].title = "<script>alert('x')</script>".to_string();
    let events = audit.events(plan.plan_id.as_str()).unwrap();
    let report = build_report(&plan, Some(&run), &events, Timestamp::Logical(60), &qa()).unwrap();

    let html = render_report(&report, ReportFormat::Html).unwrap();
    assert!(!html.contains("<script>alert"));
    assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
}

// ============================================================================
// SECTION: Hardened Exports
// ============================================================================

/// Tests exports refuse unapproved plans.
#[test]
fn test_export_requires_approval() {
    let catalog = seeded_catalog();
    let run = evaluate(&catalog, &common::medical_request()).unwrap();
    let draft = generate_plan(&quote(1), Some(&run), &[], T0).unwrap();

    let error = export_csv(&draft).unwrap_err();
    assert_eq!(error.code(), "EXPORT_REQUIRES_APPROVAL");
    let error =
        export_json(&draft, &run.profile_stack, None, &[], Timestamp::Logical(60)).unwrap_err();
    assert_eq!(error.code(), "EXPORT_REQUIRES_APPROVAL");
}

/// Tests the JSON export content hash depends only on content.
#[test]
fn test_json_export_content_hash_is_content_only() {
    let (plan, run, _) = approved_plan();

    let export_a =
        export_json(&plan, &run.profile_stack, None, &[], Timestamp::Logical(60)).unwrap();
    let export_b =
        export_json(&plan, &run.profile_stack, None, &[], Timestamp::Logical(99)).unwrap();

    assert_eq!(export_a.content_hash.len(), 64);
    assert_eq!(export_a.content_hash, export_b.content_hash);
    assert_ne!(
        export_a.provenance.export_generated_at,
        export_b.provenance.export_generated_at
    );
    assert_eq!(export_a.provenance.approved_by, plan.approved_by);
    assert_eq!(export_a.provenance.plan_version, plan.version);
}

/// Tests execution outputs are tier-gated.
#[test]
fn test_execution_outputs_tier_gate() {
    let (mut plan, run, _) = approved_plan();
    plan.tier = 2;

    let outputs = serde_json::json!({"placements": []});
    let error = export_json(
        &plan,
        &run.profile_stack,
        Some(outputs.clone()),
        &[],
        Timestamp::Logical(60),
    )
    .unwrap_err();
    assert_eq!(error.code(), "TIER_INSUFFICIENT");

    plan.tier = 3;
    let export =
        export_json(&plan, &run.profile_stack, Some(outputs), &[], Timestamp::Logical(60)).unwrap();
    assert!(export.content.execution_outputs.is_some());
}

/// Tests CSV export contains step and test tables.
#[test]
fn test_csv_export_tables() {
    let (plan, _, _) = approved_plan();
    let csv = export_csv(&plan).unwrap();

    assert!(csv.starts_with("Plan Export,"));
    assert!(csv.contains("Steps\n"));
    assert!(csv.contains("Tests\n"));
    assert!(csv.contains("CLEAN"));
}

/// Tests placement CSV export and format parsing.
#[test]
fn test_placement_export_and_format_parse() {
    let (plan, _, _) = approved_plan();
    let placements = vec![datumplan_core::runtime::Placement {
        refdes: "U1".to_string(),
        x_mm: 10.5,
        y_mm: 22.0,
        rotation_deg: 90.0,
        side: "TOP".to_string(),
    }];
    let csv = export_placement_csv(&plan, &placements).unwrap();
    assert!(csv.contains("RefDes,X,Y,Rotation,Side"));
    assert!(csv.contains("U1,10.5,22,90,TOP"));

    assert_eq!(ExportFormat::parse("placement-csv").unwrap(), ExportFormat::PlacementCsv);
    assert_eq!(ExportFormat::parse("json").unwrap(), ExportFormat::Json);
    let error = ExportFormat::parse("xml").unwrap_err();
    assert_eq!(error.code(), "UNSUPPORTED_FORMAT");
}

// ============================================================================
// SECTION: Audit Integrity
// ============================================================================

/// Tests a clean approved plan passes the integrity check.
#[test]
fn test_audit_integrity_passes_clean_plan() {
    let (plan, run, _) = approved_plan();
    let mut states = BTreeMap::new();
    states.insert(ProfileId::new("SPACE_BASE"), ProfileState::Approved);

    let report = check_audit_integrity(&plan, Some(&run), &states);
    assert_eq!(report.overall, CheckStatus::Pass);
    assert!(report.warnings().is_empty());
}

/// Tests a deprecated profile surfaces as a warning that exports carry.
#[test]
fn test_deprecated_profile_warning_carried_into_export() {
    let (plan, run, _) = approved_plan();
    let mut states = BTreeMap::new();
    states.insert(ProfileId::new("SPACE_BASE"), ProfileState::Deprecated);

    let report = check_audit_integrity(&plan, Some(&run), &states);
    assert_eq!(report.overall, CheckStatus::Pass);
    let warnings = report.warnings();
    assert!(
        warnings
            .iter()
            .any(|finding| finding.check_id == "PROFILE_DEPRECATED_IN_ACTIVE_ARTIFACT")
    );

    let export =
        export_json(&plan, &run.profile_stack, None, &warnings, Timestamp::Logical(60)).unwrap();
    assert!(
        export
            .provenance
            .integrity_findings
            .iter()
            .any(|finding| finding.check_id == "PROFILE_DEPRECATED_IN_ACTIVE_ARTIFACT")
    );
}

/// Tests draft plans and broken references fail the check.
#[test]
fn test_audit_integrity_fails_on_broken_artifacts() {
    let catalog = seeded_catalog();
    let run = evaluate(&catalog, &space_flight_request()).unwrap();
    let draft = generate_plan(&quote(3), Some(&run), &[], T0).unwrap();

    let report = check_audit_integrity(&draft, Some(&run), &BTreeMap::new());
    assert_eq!(report.overall, CheckStatus::Fail);

    // Unresolvable SOE run reference.
    let (plan, _, _) = approved_plan();
    let report = check_audit_integrity(&plan, None, &BTreeMap::new());
    assert_eq!(report.overall, CheckStatus::Fail);
    assert!(report.findings.iter().any(|finding| finding.check_id == "soe_run_traceable"));
}
