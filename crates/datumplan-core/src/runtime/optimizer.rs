// crates/datumplan-core/src/runtime/optimizer.rs
// ============================================================================
// Module: Datum Plan Optimizer
// Description: Objective-driven reordering of unlocked plan steps.
// Purpose: Reorder free steps while preserving every SOE constraint.
// Dependencies: crate::{core, interfaces}, crate::runtime::editor
// ============================================================================

//! ## Overview
//! The optimizer reorders only steps that carry no SOE lock: locked sequence
//! blocks keep their positions and internal order, and SOE-derived steps
//! never move. Unlocked steps are stably reordered among the positions they
//! already occupy, so the result is deterministic and always passes edit
//! validation. Optimization writes a new draft version through the editor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::ActorId;
use crate::core::DatumPlan;
use crate::core::PlanId;
use crate::core::Role;
use crate::core::Step;
use crate::core::Timestamp;
use crate::interfaces::AuditLog;
use crate::interfaces::PlanStore;
use crate::runtime::editor::PlanEdits;
use crate::runtime::editor::PlanError;
use crate::runtime::editor::diff_plans;
use crate::runtime::editor::edit_plan;

// ============================================================================
// SECTION: Objectives
// ============================================================================

/// Declared optimization objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Group compatible step types to reduce machine changeover.
    Throughput,
    /// Order failure-prone steps early; currently preserves declared order.
    Cost,
    /// Balance station load; currently preserves declared order.
    Resource,
}

impl Objective {
    /// Returns the stable wire label for the objective.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Throughput => "throughput",
            Self::Cost => "cost",
            Self::Resource => "resource",
        }
    }
}

// ============================================================================
// SECTION: Optimization
// ============================================================================

/// Reorders unlocked steps per the objective, writing a new draft version.
///
/// # Errors
///
/// Returns [`PlanError`] when the plan is not editable or the write
/// conflicts.
pub fn optimize_plan<S: PlanStore, A: AuditLog>(
    store: &S,
    audit: &A,
    plan_id: &PlanId,
    objective: Objective,
    actor: &ActorId,
    role: Role,
    at: Timestamp,
) -> Result<DatumPlan, PlanError> {
    let latest = store.latest(plan_id)?.ok_or_else(|| PlanError::NotFound(plan_id.to_string()))?;

    let optimized = reorder_steps(&latest.steps, objective);
    let edits = PlanEdits {
        steps: Some(optimized),
        ..PlanEdits::default()
    };
    edit_plan(
        store,
        audit,
        plan_id,
        &edits,
        actor,
        role,
        &format!("optimized for {}", objective.as_str()),
        &[],
        at,
    )
}

/// Reorders unlocked steps among their own positions; locked steps stay put.
fn reorder_steps(steps: &[Step], objective: Objective) -> Vec<Step> {
    let mut ordered: Vec<Step> = steps.to_vec();
    ordered.sort_by_key(|step| step.sequence);

    let free_positions: Vec<usize> = ordered
        .iter()
        .enumerate()
        .filter(|(_, step)| !step.is_soe_locked())
        .map(|(position, _)| position)
        .collect();

    let mut free_steps: Vec<Step> =
        free_positions.iter().map(|&position| ordered[position].clone()).collect();
    match objective {
        Objective::Throughput => {
            free_steps.sort_by(|a, b| {
                a.step_type.cmp(&b.step_type).then_with(|| a.sequence.cmp(&b.sequence))
            });
        }
        Objective::Cost | Objective::Resource => {}
    }

    for (&position, step) in free_positions.iter().zip(free_steps) {
        ordered[position] = step;
    }
    for (index, step) in ordered.iter_mut().enumerate() {
        step.sequence = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);
    }
    ordered
}

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Human-oriented summary of what an optimization changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationSummary {
    /// Objective the optimization ran under.
    pub objective: Objective,
    /// Steps whose position or content changed.
    pub steps_reordered: usize,
    /// Steps added (always zero for reorders).
    pub steps_added: usize,
    /// Steps removed (always zero for reorders).
    pub steps_removed: usize,
    /// Locked constraints are preserved by construction.
    pub constraints_preserved: bool,
}

/// Summarizes the differences introduced by an optimization.
#[must_use]
pub fn optimization_summary(
    original: &DatumPlan,
    optimized: &DatumPlan,
    objective: Objective,
) -> OptimizationSummary {
    let diff = diff_plans(original, optimized);
    OptimizationSummary {
        objective,
        steps_reordered: diff.steps.modified.len(),
        steps_added: diff.steps.added.len(),
        steps_removed: diff.steps.removed.len(),
        constraints_preserved: true,
    }
}
