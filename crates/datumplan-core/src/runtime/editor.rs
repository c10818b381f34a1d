// crates/datumplan-core/src/runtime/editor.rs
// ============================================================================
// Module: Datum Plan Editor
// Description: Controlled plan editing with override-with-justification.
// Purpose: Create new plan versions while preserving SOE constraints.
// Dependencies: crate::{core, interfaces}, serde
// ============================================================================

//! ## Overview
//! Plan edits never mutate an existing version: each accepted edit writes
//! version `N+1` with `parent_version = N` and an appended edit-metadata
//! entry. Edits that remove or reorder SOE-locked items are rejected unless
//! covered by an override with a non-empty reason, and every attempt —
//! accepted or denied — emits an audit event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ActorId;
use crate::core::AuditEntityKind;
use crate::core::AuditEvent;
use crate::core::AuditResult;
use crate::core::DatumPlan;
use crate::core::EvidenceIntent;
use crate::core::HashError;
use crate::core::OverrideRecord;
use crate::core::PlanId;
use crate::core::PlanState;
use crate::core::PlanTest;
use crate::core::Role;
use crate::core::Step;
use crate::core::Timestamp;
use crate::core::plan::EditMetadata;
use crate::interfaces::AuditLog;
use crate::interfaces::PlanStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by plan governance operations.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Edit violated an invariant with no valid override supplied.
    #[error("invalid plan edit: {0}")]
    InvalidEdit(String),
    /// Override supplied without a reason.
    #[error("override for {0} requires a non-empty reason")]
    OverrideMissingReason(String),
    /// State machine rejected the transition.
    #[error("plan {plan_id} is {state}; operation requires {expected}")]
    StateTransitionInvalid {
        /// Plan identifier.
        plan_id: String,
        /// Current state label.
        state: String,
        /// Required state label.
        expected: String,
    },
    /// Write attempted on an approved version.
    #[error("approved plan versions are immutable; fork a new draft instead")]
    ApprovedImmutable,
    /// Plan has no steps and cannot be submitted.
    #[error("plan {0} has no steps and cannot be submitted")]
    EmptyPlan(String),
    /// Role is not allowed to perform the operation.
    #[error("role is not permitted to {0} plans")]
    Forbidden(&'static str),
    /// Operation requires a non-empty reason.
    #[error("a non-empty reason is required to {0}")]
    ReasonRequired(&'static str),
    /// Plan does not exist.
    #[error("plan not found: {0}")]
    NotFound(String),
    /// Versioned store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Canonicalization failed while deriving identifiers.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl PlanError {
    /// Returns the stable error code for the request boundary.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidEdit(_) => "PLAN_INVALID_EDIT",
            Self::OverrideMissingReason(_) => "OVERRIDE_MISSING_REASON",
            Self::StateTransitionInvalid {
                ..
            } => "PLAN_STATE_TRANSITION_INVALID",
            Self::ApprovedImmutable => "PLAN_APPROVED_IMMUTABLE",
            Self::EmptyPlan(_) => "PLAN_STATE_TRANSITION_INVALID",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::ReasonRequired(_) => "REASON_REQUIRED",
            Self::NotFound(_) => "PLAN_NOT_FOUND",
            Self::Store(StoreError::VersionConflict {
                ..
            }) => "VERSION_CONFLICT",
            Self::Store(_) => "STORE_ERROR",
            Self::Hash(_) => "CANONICALIZATION_FAILED",
        }
    }
}

/// Returns the wire label for a plan state.
#[must_use]
pub const fn plan_state_label(state: PlanState) -> &'static str {
    match state {
        PlanState::Draft => "draft",
        PlanState::Submitted => "submitted",
        PlanState::Approved => "approved",
        PlanState::Rejected => "rejected",
    }
}

// ============================================================================
// SECTION: Edit Requests
// ============================================================================

/// Partial plan update; absent sections are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanEdits {
    /// Replacement step list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
    /// Replacement test list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<PlanTest>>,
    /// Replacement evidence intent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_intent: Option<Vec<EvidenceIntent>>,
    /// Replacement operator notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Requested override covering one constrained change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRequest {
    /// Constraint key the override covers.
    pub constraint: String,
    /// Justification; must be non-empty.
    pub reason: String,
}

/// Constraint key for removing an SOE-locked step.
#[must_use]
pub fn remove_step_constraint(step_id: &str) -> String {
    format!("remove_step:{step_id}")
}

/// Constraint key for reordering or breaking a locked sequence.
pub const REORDER_LOCKED_SEQUENCE: &str = "reorder_locked_sequence";

/// Constraint key for removing an SOE-required test.
#[must_use]
pub fn remove_test_constraint(test_id: &str) -> String {
    format!("remove_test:{test_id}")
}

/// Constraint key for removing SOE-required evidence.
#[must_use]
pub fn remove_evidence_constraint(evidence_id: &str) -> String {
    format!("remove_evidence:{evidence_id}")
}

// ============================================================================
// SECTION: Edit Operation
// ============================================================================

/// Applies edits to the latest draft version, writing version `N+1`.
///
/// # Errors
///
/// Returns [`PlanError`] when the plan is not editable, a constraint lacks a
/// valid override, or the version write conflicts.
#[allow(clippy::too_many_arguments, reason = "edit requests carry full governance context")]
pub fn edit_plan<S: PlanStore, A: AuditLog>(
    store: &S,
    audit: &A,
    plan_id: &PlanId,
    edits: &PlanEdits,
    actor: &ActorId,
    role: Role,
    reason: &str,
    overrides: &[OverrideRequest],
    at: Timestamp,
) -> Result<DatumPlan, PlanError> {
    let latest = store.latest(plan_id)?.ok_or_else(|| PlanError::NotFound(plan_id.to_string()))?;

    let deny = |error: PlanError| -> Result<DatumPlan, PlanError> {
        audit.append(&plan_event(&latest, "edit", &latest, AuditResult::Denied, actor, role, reason, at))?;
        Err(error)
    };

    match latest.state {
        PlanState::Draft => {}
        PlanState::Approved => return deny(PlanError::ApprovedImmutable),
        other => {
            return deny(PlanError::StateTransitionInvalid {
                plan_id: plan_id.to_string(),
                state: plan_state_label(other).to_string(),
                expected: "draft".to_string(),
            });
        }
    }

    let mut candidate = latest.clone();
    if let Some(steps) = &edits.steps {
        candidate.steps = steps.clone();
    }
    if let Some(tests) = &edits.tests {
        candidate.tests = tests.clone();
    }
    if let Some(evidence) = &edits.evidence_intent {
        candidate.evidence_intent = evidence.clone();
    }
    if let Some(notes) = &edits.notes {
        candidate.notes = Some(notes.clone());
    }

    let required = match validate_edit(&latest, &candidate) {
        Ok(required) => required,
        Err(error) => return deny(error),
    };

    let mut override_records: Vec<OverrideRecord> = Vec::new();
    for constraint in &required {
        let Some(request) = overrides.iter().find(|request| &request.constraint == constraint)
        else {
            return deny(PlanError::InvalidEdit(format!("override required: {constraint}")));
        };
        if request.reason.trim().is_empty() {
            return deny(PlanError::OverrideMissingReason(constraint.clone()));
        }
        override_records.push(OverrideRecord {
            constraint: constraint.clone(),
            reason: request.reason.clone(),
            user_id: actor.clone(),
            timestamp: at,
        });
    }

    candidate.version = latest.version + 1;
    candidate.parent_version = Some(latest.version);
    candidate.state = PlanState::Draft;
    candidate.locked = false;
    candidate.approved_by = None;
    candidate.approved_at = None;
    candidate.created_at = at;
    candidate.updated_at = at;
    candidate.edit_metadata.push(EditMetadata {
        edited_by: actor.clone(),
        edited_at: at,
        edit_reason: reason.to_string(),
        overrides: override_records,
    });

    store.create_version(&candidate)?;
    audit.append(&plan_event(&latest, "edit", &candidate, AuditResult::Applied, actor, role, reason, at))?;
    Ok(candidate)
}

/// Forks a new draft version from the latest approved version.
///
/// # Errors
///
/// Returns [`PlanError::StateTransitionInvalid`] when the latest version is
/// not approved.
pub fn new_draft_from<S: PlanStore, A: AuditLog>(
    store: &S,
    audit: &A,
    plan_id: &PlanId,
    actor: &ActorId,
    role: Role,
    reason: &str,
    at: Timestamp,
) -> Result<DatumPlan, PlanError> {
    let latest = store.latest(plan_id)?.ok_or_else(|| PlanError::NotFound(plan_id.to_string()))?;
    if latest.state != PlanState::Approved {
        audit.append(&plan_event(&latest, "fork", &latest, AuditResult::Denied, actor, role, reason, at))?;
        return Err(PlanError::StateTransitionInvalid {
            plan_id: plan_id.to_string(),
            state: plan_state_label(latest.state).to_string(),
            expected: "approved".to_string(),
        });
    }

    let mut draft = latest.clone();
    draft.version = latest.version + 1;
    draft.parent_version = Some(latest.version);
    draft.state = PlanState::Draft;
    draft.locked = false;
    draft.approved_by = None;
    draft.approved_at = None;
    draft.created_at = at;
    draft.updated_at = at;
    draft.edit_metadata.push(EditMetadata {
        edited_by: actor.clone(),
        edited_at: at,
        edit_reason: reason.to_string(),
        overrides: Vec::new(),
    });

    store.create_version(&draft)?;
    audit.append(&plan_event(&latest, "fork", &draft, AuditResult::Applied, actor, role, reason, at))?;
    Ok(draft)
}

// ============================================================================
// SECTION: Edit Validation
// ============================================================================

/// Validates an edit, returning the override constraints it requires.
///
/// Non-overridable violations (stripping SOE references from a surviving
/// step) are rejected outright.
fn validate_edit(original: &DatumPlan, edited: &DatumPlan) -> Result<Vec<String>, PlanError> {
    let mut required: Vec<String> = Vec::new();

    for step in &original.steps {
        let survivor = edited.step(&step.step_id);
        match survivor {
            None => {
                if step.is_soe_locked() {
                    required.push(remove_step_constraint(step.step_id.as_str()));
                }
            }
            Some(edited_step) => {
                if step.soe_decision_id.is_some()
                    && edited_step.soe_decision_id != step.soe_decision_id
                {
                    return Err(PlanError::InvalidEdit(format!(
                        "step {} may not drop its SOE decision reference",
                        step.step_id
                    )));
                }
            }
        }
    }

    if locked_sequences_disturbed(original, edited) {
        required.push(REORDER_LOCKED_SEQUENCE.to_string());
    }

    for test in &original.tests {
        if test.is_soe_locked()
            && !edited.tests.iter().any(|candidate| candidate.test_id == test.test_id)
        {
            required.push(remove_test_constraint(test.test_id.as_str()));
        }
    }

    for evidence in &original.evidence_intent {
        if evidence.is_soe_locked()
            && !edited
                .evidence_intent
                .iter()
                .any(|candidate| candidate.evidence_id == evidence.evidence_id)
        {
            required.push(remove_evidence_constraint(evidence.evidence_id.as_str()));
        }
    }

    Ok(required)
}

/// Returns true when any locked sequence block lost its order or contiguity.
fn locked_sequences_disturbed(original: &DatumPlan, edited: &DatumPlan) -> bool {
    for group in locked_groups(original) {
        let surviving: Vec<&Step> = {
            let mut steps: Vec<&Step> = edited
                .steps
                .iter()
                .filter(|step| group.contains(&step.step_id))
                .collect();
            steps.sort_by_key(|step| step.sequence);
            steps
        };
        if surviving.is_empty() {
            continue;
        }

        // Relative order must match the original block order.
        let original_order: Vec<&crate::core::StepId> = group
            .iter()
            .filter(|step_id| surviving.iter().any(|step| &&step.step_id == step_id))
            .collect();
        let edited_order: Vec<&crate::core::StepId> =
            surviving.iter().map(|step| &step.step_id).collect();
        if original_order != edited_order {
            return true;
        }

        // Surviving members must stay contiguous in the edited plan.
        let mut ordered: Vec<&Step> = edited.steps.iter().collect();
        ordered.sort_by_key(|step| step.sequence);
        let positions: Vec<usize> = ordered
            .iter()
            .enumerate()
            .filter(|(_, step)| group.contains(&step.step_id))
            .map(|(position, _)| position)
            .collect();
        if positions.windows(2).any(|pair| pair[1] != pair[0] + 1) {
            return true;
        }
    }
    false
}

/// Collects locked sequence blocks as ordered id groups.
fn locked_groups(plan: &DatumPlan) -> Vec<Vec<crate::core::StepId>> {
    let mut ordered: Vec<&Step> = plan.steps.iter().collect();
    ordered.sort_by_key(|step| step.sequence);

    let mut groups: Vec<Vec<crate::core::StepId>> = Vec::new();
    let mut current: Vec<crate::core::StepId> = Vec::new();
    for step in ordered {
        if step.locked_sequence {
            current.push(step.step_id.clone());
        } else if !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

// ============================================================================
// SECTION: Structured Diff
// ============================================================================

/// Per-section structural diff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionDiff<T> {
    /// Items present only in the newer version.
    pub added: Vec<T>,
    /// Items present only in the older version.
    pub removed: Vec<T>,
    /// Items present in both but changed.
    pub modified: Vec<ModifiedItem<T>>,
}

impl<T> Default for SectionDiff<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            modified: Vec::new(),
        }
    }
}

impl<T> SectionDiff<T> {
    /// Returns true when the section is unchanged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Modified item pairing old and new values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifiedItem<T> {
    /// Stable item identifier.
    pub id: String,
    /// Value in the older version.
    pub from: T,
    /// Value in the newer version.
    pub to: T,
}

/// Structured diff between two plan versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanDiff {
    /// Step changes.
    pub steps: SectionDiff<Step>,
    /// Test changes.
    pub tests: SectionDiff<PlanTest>,
    /// Evidence changes.
    pub evidence: SectionDiff<EvidenceIntent>,
}

impl Default for PlanDiff {
    fn default() -> Self {
        Self {
            steps: SectionDiff::default(),
            tests: SectionDiff::default(),
            evidence: SectionDiff::default(),
        }
    }
}

impl PlanDiff {
    /// Returns true when the versions are identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.tests.is_empty() && self.evidence.is_empty()
    }
}

/// Computes the deterministic structural diff between two versions.
#[must_use]
pub fn diff_plans(older: &DatumPlan, newer: &DatumPlan) -> PlanDiff {
    PlanDiff {
        steps: diff_section(&older.steps, &newer.steps, |step| step.step_id.to_string()),
        tests: diff_section(&older.tests, &newer.tests, |test| test.test_id.to_string()),
        evidence: diff_section(&older.evidence_intent, &newer.evidence_intent, |evidence| {
            evidence.evidence_id.to_string()
        }),
    }
}

/// Diffs one keyed section.
fn diff_section<T: Clone + PartialEq>(
    older: &[T],
    newer: &[T],
    key: impl Fn(&T) -> String,
) -> SectionDiff<T> {
    let mut diff = SectionDiff::default();
    for item in newer {
        match older.iter().find(|candidate| key(candidate) == key(item)) {
            None => diff.added.push(item.clone()),
            Some(previous) if previous != item => diff.modified.push(ModifiedItem {
                id: key(item),
                from: previous.clone(),
                to: item.clone(),
            }),
            Some(_) => {}
        }
    }
    for item in older {
        if !newer.iter().any(|candidate| key(candidate) == key(item)) {
            diff.removed.push(item.clone());
        }
    }
    diff
}

// ============================================================================
// SECTION: Audit Helper
// ============================================================================

/// Builds a plan audit event for an attempt.
#[allow(clippy::too_many_arguments, reason = "audit events capture full mutation context")]
pub(crate) fn plan_event(
    before: &DatumPlan,
    action: &str,
    after: &DatumPlan,
    result: AuditResult,
    actor: &ActorId,
    role: Role,
    reason: &str,
    at: Timestamp,
) -> AuditEvent {
    AuditEvent {
        timestamp: at,
        actor: actor.clone(),
        role,
        entity_kind: AuditEntityKind::DatumPlan,
        entity_id: before.plan_id.to_string(),
        action: action.to_string(),
        from_state: plan_state_label(before.state).to_string(),
        to_state: plan_state_label(if matches!(result, AuditResult::Denied) {
            before.state
        } else {
            after.state
        })
        .to_string(),
        result,
        reason: if reason.is_empty() { None } else { Some(reason.to_string()) },
    }
}
