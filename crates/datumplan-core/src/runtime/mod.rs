// crates/datumplan-core/src/runtime/mod.rs
// ============================================================================
// Module: Datum Runtime
// Description: Deterministic evaluation, generation, and governance machinery.
// Purpose: Expose the runtime entry points built on the core types.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime hosts the pure transformations (SOE evaluation, plan
//! generation, diff, trace, report, export, integrity check) and the
//! governed mutations (edit, optimize, approval, profile lifecycle) that
//! write versioned artifacts through the store interfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod approval;
pub mod audit_check;
pub mod editor;
pub mod engine;
pub mod export;
pub mod generator;
pub mod lifecycle;
pub mod optimizer;
pub mod report;
pub mod store;
pub mod trace;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use approval::approve_plan;
pub use approval::reject_plan;
pub use approval::submit_plan;
pub use audit_check::CheckStatus;
pub use audit_check::IntegrityFinding;
pub use audit_check::IntegrityReport;
pub use audit_check::check_audit_integrity;
pub use editor::ModifiedItem;
pub use editor::OverrideRequest;
pub use editor::PlanDiff;
pub use editor::PlanEdits;
pub use editor::PlanError;
pub use editor::REORDER_LOCKED_SEQUENCE;
pub use editor::SectionDiff;
pub use editor::diff_plans;
pub use editor::edit_plan;
pub use editor::new_draft_from;
pub use editor::plan_state_label;
pub use editor::remove_evidence_constraint;
pub use editor::remove_step_constraint;
pub use editor::remove_test_constraint;
pub use engine::SoeError;
pub use engine::audit_manifest;
pub use engine::evaluate;
pub use export::EXECUTION_OUTPUT_MIN_TIER;
pub use export::ExportError;
pub use export::ExportFormat;
pub use export::JsonExport;
pub use export::Placement;
pub use export::export_csv;
pub use export::export_json;
pub use export::export_placement_csv;
pub use generator::GenerateError;
pub use generator::generate_plan;
pub use lifecycle::LifecycleError;
pub use lifecycle::ProfileVersionDiff;
pub use lifecycle::ProfileVersionInfo;
pub use lifecycle::approve_profile;
pub use lifecycle::compare_profile_versions;
pub use lifecycle::create_bundle;
pub use lifecycle::create_profile_version;
pub use lifecycle::deprecate_profile;
pub use lifecycle::list_profile_versions;
pub use lifecycle::parse_semver;
pub use lifecycle::reject_profile;
pub use lifecycle::submit_profile;
pub use optimizer::Objective;
pub use optimizer::OptimizationSummary;
pub use optimizer::optimization_summary;
pub use optimizer::optimize_plan;
pub use report::ComplianceReport;
pub use report::ReportError;
pub use report::ReportFormat;
pub use report::build_report;
pub use report::render_report;
pub use store::InMemoryAuditLog;
pub use store::InMemoryCatalog;
pub use store::InMemoryPlanStore;
pub use store::InMemoryProfileStore;
pub use store::InMemorySoeRunStore;
pub use trace::ComplianceTrace;
pub use trace::TraceRef;
pub use trace::TracedItem;
pub use trace::trace_plan;
