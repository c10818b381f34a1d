// crates/datumplan-core/src/runtime/audit_check.rs
// ============================================================================
// Module: Datum Audit Integrity Check
// Description: Batch verification of an approved plan's provenance and refs.
// Purpose: Verify a plan's artifact chain is self-consistent for auditors.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The audit integrity check verifies that an approved plan's provenance,
//! references, and identifier shapes are self-consistent: the plan is
//! approved and locked, approval metadata exists, the SOE run resolves,
//! every profile in the stack is approved or deprecated, step-to-decision
//! references are intact, and decision ids have the canonical content-hash
//! shape. The result is a structured report, never a bare boolean — warnings
//! (such as a deprecated profile in an active artifact) survive into export
//! provenance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::DatumPlan;
use crate::core::PlanState;
use crate::core::ProfileId;
use crate::core::ProfileState;
use crate::core::SoeRun;
use crate::core::is_content_id;

// ============================================================================
// SECTION: Finding Types
// ============================================================================

/// Severity of one integrity finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Non-fatal inconsistency; artifacts remain usable.
    Warn,
    /// Fatal inconsistency.
    Fail,
    /// Informational note.
    Info,
}

/// One integrity finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityFinding {
    /// Stable check identifier.
    pub check_id: String,
    /// Finding severity.
    pub status: CheckStatus,
    /// Human-readable detail.
    pub detail: String,
}

/// Structured audit integrity report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Plan identifier.
    pub plan_id: String,
    /// Overall outcome: fail when any finding fails.
    pub overall: CheckStatus,
    /// Individual findings in check order.
    pub findings: Vec<IntegrityFinding>,
}

impl IntegrityReport {
    /// Returns the findings with warning severity.
    #[must_use]
    pub fn warnings(&self) -> Vec<IntegrityFinding> {
        self.findings
            .iter()
            .filter(|finding| finding.status == CheckStatus::Warn)
            .cloned()
            .collect()
    }
}

// ============================================================================
// SECTION: Integrity Check
// ============================================================================

/// Verifies an approved plan's artifact chain.
///
/// `soe_run` is the resolved run for `plan.soe_run_id` (or `None` when it
/// could not be resolved); `profile_states` maps each profile in the run's
/// stack to its current lifecycle state.
#[must_use]
pub fn check_audit_integrity(
    plan: &DatumPlan,
    soe_run: Option<&SoeRun>,
    profile_states: &BTreeMap<ProfileId, ProfileState>,
) -> IntegrityReport {
    let mut findings: Vec<IntegrityFinding> = Vec::new();

    // Plan approval and lock.
    if plan.state == PlanState::Approved && plan.locked {
        findings.push(pass("plan_approved", "plan is approved and locked"));
    } else {
        findings.push(fail(
            "plan_approved",
            "plan state must be approved and locked for audit readiness",
        ));
    }

    // Approval provenance.
    if plan.approved_by.is_some() && plan.approved_at.is_some() {
        findings.push(pass("plan_provenance", "approval provenance present"));
    } else {
        findings.push(IntegrityFinding {
            check_id: "plan_provenance".to_string(),
            status: CheckStatus::Warn,
            detail: "plan is missing approved_by/approved_at provenance".to_string(),
        });
    }

    // SOE run resolution.
    match (&plan.soe_run_id, soe_run) {
        (None, _) => findings.push(IntegrityFinding {
            check_id: "soe_run_traceable".to_string(),
            status: CheckStatus::Info,
            detail: "plan does not reference an SOE run".to_string(),
        }),
        (Some(soe_run_id), None) => findings.push(fail(
            "soe_run_traceable",
            format!("SOE run {soe_run_id} referenced but not resolvable"),
        )),
        (Some(soe_run_id), Some(run)) if &run.soe_run_id != soe_run_id => findings.push(fail(
            "soe_run_traceable",
            format!("resolved run {} does not match reference {soe_run_id}", run.soe_run_id),
        )),
        (Some(_), Some(run)) => findings.push(pass(
            "soe_run_traceable",
            format!("SOE run resolvable with {} decisions", run.decisions.len()),
        )),
    }

    // Profile states.
    if let Some(run) = soe_run {
        for entry in &run.profile_stack {
            match profile_states.get(&entry.profile_id) {
                None => findings.push(fail(
                    "profile_resolvable",
                    format!("profile {} in stack is not resolvable", entry.profile_id),
                )),
                Some(ProfileState::Approved) => {}
                Some(ProfileState::Deprecated) => findings.push(IntegrityFinding {
                    check_id: "PROFILE_DEPRECATED_IN_ACTIVE_ARTIFACT".to_string(),
                    status: CheckStatus::Warn,
                    detail: format!(
                        "profile {} is deprecated but referenced by an active artifact",
                        entry.profile_id
                    ),
                }),
                Some(state) => findings.push(fail(
                    "profile_states_valid",
                    format!("profile {} is {} in an approved artifact", entry.profile_id, state.as_str()),
                )),
            }
        }
        if run.profile_stack.iter().all(|entry| {
            matches!(
                profile_states.get(&entry.profile_id),
                Some(ProfileState::Approved | ProfileState::Deprecated)
            )
        }) {
            findings.push(pass(
                "profile_states_valid",
                format!("all {} stack profiles approved or deprecated", run.profile_stack.len()),
            ));
        }
    }

    // Step-to-decision reference integrity.
    if let Some(run) = soe_run {
        let mut broken = 0_usize;
        for step in &plan.steps {
            if let Some(decision_id) = &step.soe_decision_id
                && run.decision(decision_id).is_none()
            {
                broken += 1;
                findings.push(fail(
                    "step_decision_refs",
                    format!("step {} references unknown decision {decision_id}", step.step_id),
                ));
            }
        }
        for test in &plan.tests {
            if let Some(decision_id) = &test.soe_decision_id
                && run.decision(decision_id).is_none()
            {
                broken += 1;
                findings.push(fail(
                    "test_decision_refs",
                    format!("test {} references unknown decision {decision_id}", test.test_id),
                ));
            }
        }
        if broken == 0 {
            findings.push(pass("decision_refs", "all step and test decision references intact"));
        }

        // Decision id shape.
        let malformed: Vec<String> = run
            .decisions
            .iter()
            .filter(|decision| !is_content_id(decision.id.as_str()))
            .map(|decision| decision.id.to_string())
            .collect();
        if malformed.is_empty() {
            findings.push(pass(
                "decision_id_shape",
                format!("all {} decision ids have canonical shape", run.decisions.len()),
            ));
        } else {
            findings.push(fail(
                "decision_id_shape",
                format!("malformed decision ids: {}", malformed.join(", ")),
            ));
        }
    }

    let overall = if findings.iter().any(|finding| finding.status == CheckStatus::Fail) {
        CheckStatus::Fail
    } else {
        CheckStatus::Pass
    };

    IntegrityReport {
        plan_id: plan.plan_id.to_string(),
        overall,
        findings,
    }
}

/// Builds a passing finding.
fn pass(check_id: &str, detail: impl Into<String>) -> IntegrityFinding {
    IntegrityFinding {
        check_id: check_id.to_string(),
        status: CheckStatus::Pass,
        detail: detail.into(),
    }
}

/// Builds a failing finding.
fn fail(check_id: &str, detail: impl Into<String>) -> IntegrityFinding {
    IntegrityFinding {
        check_id: check_id.to_string(),
        status: CheckStatus::Fail,
        detail: detail.into(),
    }
}
