// crates/datumplan-core/src/runtime/trace.rs
// ============================================================================
// Module: Datum Compliance Trace
// Description: Per-item mapping from plan artifacts back to rules and clauses.
// Purpose: Join plan steps, tests, and evidence to their governing decisions.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The compliance trace joins every plan step, test, and evidence item back
//! to the rule, pack, citations, and profile layer that mandated it.
//! SOE-derived items trace through their decision; baseline items trace to
//! their source rules. Tracing is a pure function of the plan and its run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::DatumPlan;
use crate::core::DecisionId;
use crate::core::PackId;
use crate::core::PlanId;
use crate::core::ProfileSource;
use crate::core::ProfileStackEntry;
use crate::core::RuleId;
use crate::core::SoeRun;
use crate::core::SourceRule;

// ============================================================================
// SECTION: Trace Types
// ============================================================================

/// Traceability record for one plan item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceRef {
    /// Governing rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,
    /// Pack the rule belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_id: Option<PackId>,
    /// Clause citations.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
    /// Profile attribution of the governing decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_source: Option<ProfileSource>,
    /// Governing decision id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<DecisionId>,
    /// Baseline justification when no decision governs the item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

/// Traced plan item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracedItem {
    /// Item classification (`step`, `test`, `evidence`).
    pub entity_type: &'static str,
    /// Item identifier.
    pub entity_id: String,
    /// Item type detail (step type, test type, evidence type).
    pub entity_detail: String,
    /// Display title, when the item has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Traceability record.
    pub trace: TraceRef,
}

/// Full compliance trace for a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceTrace {
    /// Plan identifier.
    pub plan_id: PlanId,
    /// Plan version.
    pub plan_version: u32,
    /// Profile stack recorded on the SOE run.
    pub profile_stack: Vec<ProfileStackEntry>,
    /// Traced steps in sequence order.
    pub steps: Vec<TracedItem>,
    /// Traced tests.
    pub tests: Vec<TracedItem>,
    /// Traced evidence items.
    pub evidence: Vec<TracedItem>,
}

// ============================================================================
// SECTION: Tracing
// ============================================================================

/// Builds the compliance trace for a plan against its SOE run.
#[must_use]
pub fn trace_plan(plan: &DatumPlan, soe_run: Option<&SoeRun>) -> ComplianceTrace {
    let mut steps: Vec<&crate::core::Step> = plan.steps.iter().collect();
    steps.sort_by_key(|step| step.sequence);

    ComplianceTrace {
        plan_id: plan.plan_id.clone(),
        plan_version: plan.version,
        profile_stack: soe_run.map(|run| run.profile_stack.clone()).unwrap_or_default(),
        steps: steps
            .iter()
            .map(|step| TracedItem {
                entity_type: "step",
                entity_id: step.step_id.to_string(),
                entity_detail: step.step_type.clone(),
                title: Some(step.title.clone()),
                trace: trace_item(step.soe_decision_id.as_ref(), &step.source_rules, soe_run),
            })
            .collect(),
        tests: plan
            .tests
            .iter()
            .map(|test| TracedItem {
                entity_type: "test",
                entity_id: test.test_id.to_string(),
                entity_detail: test.test_type.clone(),
                title: Some(test.title.clone()),
                trace: trace_item(test.soe_decision_id.as_ref(), &[], soe_run),
            })
            .collect(),
        evidence: plan
            .evidence_intent
            .iter()
            .map(|evidence| TracedItem {
                entity_type: "evidence",
                entity_id: evidence.evidence_id.to_string(),
                entity_detail: evidence.evidence_type.clone(),
                title: None,
                trace: trace_item(evidence.soe_decision_id.as_ref(), &[], soe_run),
            })
            .collect(),
    }
}

/// Traces one item through its decision or its source rules.
fn trace_item(
    decision_id: Option<&DecisionId>,
    source_rules: &[SourceRule],
    soe_run: Option<&SoeRun>,
) -> TraceRef {
    if let Some(decision_id) = decision_id
        && let Some(decision) = soe_run.and_then(|run| run.decision(decision_id))
    {
        return TraceRef {
            rule_id: Some(decision.why.rule_id.clone()),
            pack_id: Some(decision.why.pack_id.clone()),
            citations: decision.why.citations.clone(),
            profile_source: decision.profile_source.clone(),
            decision_id: Some(decision.id.clone()),
            justification: None,
        };
    }

    source_rules.first().map_or_else(TraceRef::default, |rule| TraceRef {
        rule_id: Some(rule.rule_id.clone()),
        pack_id: None,
        citations: Vec::new(),
        profile_source: None,
        decision_id: decision_id.cloned(),
        justification: Some(rule.justification.clone()),
    })
}
