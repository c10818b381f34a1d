// crates/datumplan-core/src/runtime/approval.rs
// ============================================================================
// Module: Datum Plan Approval
// Description: Plan approval state machine with audit trail.
// Purpose: Govern draft -> submitted -> approved/rejected transitions.
// Dependencies: crate::{core, interfaces}, crate::runtime::editor
// ============================================================================

//! ## Overview
//! Plans move `draft -> submitted -> approved | rejected`. Approval locks the
//! version and captures approver identity; rejection returns the same version
//! to draft with the rejection recorded in edit metadata. Approved versions
//! are immutable — corrections fork a new draft. Every transition attempt,
//! including denied ones, appends an audit event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ActorId;
use crate::core::AuditResult;
use crate::core::DatumPlan;
use crate::core::PlanId;
use crate::core::PlanState;
use crate::core::Role;
use crate::core::Timestamp;
use crate::core::plan::EditMetadata;
use crate::interfaces::AuditLog;
use crate::interfaces::PlanStore;
use crate::runtime::editor::PlanError;
use crate::runtime::editor::plan_event;
use crate::runtime::editor::plan_state_label;

// ============================================================================
// SECTION: Transitions
// ============================================================================

/// Submits a draft plan for approval.
///
/// # Errors
///
/// Returns [`PlanError::StateTransitionInvalid`] when the plan is not a
/// draft, or [`PlanError::EmptyPlan`] when it has no steps.
pub fn submit_plan<S: PlanStore, A: AuditLog>(
    store: &S,
    audit: &A,
    plan_id: &PlanId,
    actor: &ActorId,
    role: Role,
    reason: &str,
    at: Timestamp,
) -> Result<DatumPlan, PlanError> {
    let mut plan =
        store.latest(plan_id)?.ok_or_else(|| PlanError::NotFound(plan_id.to_string()))?;

    if plan.state != PlanState::Draft {
        audit.append(&plan_event(&plan, "submit", &plan, AuditResult::Denied, actor, role, reason, at))?;
        return Err(PlanError::StateTransitionInvalid {
            plan_id: plan_id.to_string(),
            state: plan_state_label(plan.state).to_string(),
            expected: "draft".to_string(),
        });
    }
    if plan.steps.is_empty() {
        audit.append(&plan_event(&plan, "submit", &plan, AuditResult::Denied, actor, role, reason, at))?;
        return Err(PlanError::EmptyPlan(plan_id.to_string()));
    }

    let before = plan.clone();
    plan.state = PlanState::Submitted;
    plan.updated_at = at;
    store.update_state(&plan)?;
    audit.append(&plan_event(&before, "submit", &plan, AuditResult::Applied, actor, role, reason, at))?;
    Ok(plan)
}

/// Approves a submitted plan, locking the version.
///
/// # Errors
///
/// Returns [`PlanError::Forbidden`] when the role may not approve, or
/// [`PlanError::StateTransitionInvalid`] when the plan is not submitted.
pub fn approve_plan<S: PlanStore, A: AuditLog>(
    store: &S,
    audit: &A,
    plan_id: &PlanId,
    actor: &ActorId,
    role: Role,
    reason: &str,
    at: Timestamp,
) -> Result<DatumPlan, PlanError> {
    let mut plan =
        store.latest(plan_id)?.ok_or_else(|| PlanError::NotFound(plan_id.to_string()))?;

    if !role.can_approve() {
        audit.append(&plan_event(&plan, "approve", &plan, AuditResult::Denied, actor, role, reason, at))?;
        return Err(PlanError::Forbidden("approve"));
    }
    if plan.state != PlanState::Submitted {
        audit.append(&plan_event(&plan, "approve", &plan, AuditResult::Denied, actor, role, reason, at))?;
        return Err(PlanError::StateTransitionInvalid {
            plan_id: plan_id.to_string(),
            state: plan_state_label(plan.state).to_string(),
            expected: "submitted".to_string(),
        });
    }

    let before = plan.clone();
    plan.state = PlanState::Approved;
    plan.locked = true;
    plan.approved_by = Some(actor.clone());
    plan.approved_at = Some(at);
    plan.updated_at = at;
    store.update_state(&plan)?;
    audit.append(&plan_event(&before, "approve", &plan, AuditResult::Applied, actor, role, reason, at))?;
    Ok(plan)
}

/// Rejects a submitted plan, returning the same version to draft.
///
/// # Errors
///
/// Returns [`PlanError::ReasonRequired`] when the reason is empty, or
/// [`PlanError::StateTransitionInvalid`] when the plan is not submitted.
pub fn reject_plan<S: PlanStore, A: AuditLog>(
    store: &S,
    audit: &A,
    plan_id: &PlanId,
    actor: &ActorId,
    role: Role,
    reason: &str,
    at: Timestamp,
) -> Result<DatumPlan, PlanError> {
    let mut plan =
        store.latest(plan_id)?.ok_or_else(|| PlanError::NotFound(plan_id.to_string()))?;

    if !role.can_approve() {
        audit.append(&plan_event(&plan, "reject", &plan, AuditResult::Denied, actor, role, reason, at))?;
        return Err(PlanError::Forbidden("reject"));
    }
    if reason.trim().is_empty() {
        audit.append(&plan_event(&plan, "reject", &plan, AuditResult::Denied, actor, role, reason, at))?;
        return Err(PlanError::ReasonRequired("reject"));
    }
    if plan.state != PlanState::Submitted {
        audit.append(&plan_event(&plan, "reject", &plan, AuditResult::Denied, actor, role, reason, at))?;
        return Err(PlanError::StateTransitionInvalid {
            plan_id: plan_id.to_string(),
            state: plan_state_label(plan.state).to_string(),
            expected: "submitted".to_string(),
        });
    }

    let before = plan.clone();
    plan.state = PlanState::Draft;
    plan.updated_at = at;
    plan.edit_metadata.push(EditMetadata {
        edited_by: actor.clone(),
        edited_at: at,
        edit_reason: format!("rejected: {reason}"),
        overrides: Vec::new(),
    });
    store.update_state(&plan)?;
    audit.append(&plan_event(&before, "reject", &plan, AuditResult::Applied, actor, role, reason, at))?;
    Ok(plan)
}
