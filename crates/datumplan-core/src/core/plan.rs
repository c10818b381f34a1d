// crates/datumplan-core/src/core/plan.rs
// ============================================================================
// Module: Datum Plan Types
// Description: Versioned manufacturing plan artifacts and their records.
// Purpose: Define the governed DatumPlan structure produced by generation.
// Dependencies: crate::core::{hashing, identifiers, pack, soe, time}, serde
// ============================================================================

//! ## Overview
//! A DatumPlan is the versioned decision-of-record artifact: ordered process
//! steps, declared tests, and evidence intent, each traceable to the rules
//! and SOE decisions that mandated it. Plan versions are written once and
//! never mutated; only `state` and `locked` transition as the approval state
//! machine dictates, and an approved version is immutable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::hashing::HashError;
use crate::core::hashing::content_id;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::DecisionId;
use crate::core::identifiers::EvidenceId;
use crate::core::identifiers::PlanId;
use crate::core::identifiers::QuoteId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::SoeRunId;
use crate::core::identifiers::StepId;
use crate::core::identifiers::TestId;
use crate::core::pack::Acceptance;
use crate::core::soe::DecisionWhy;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Source-rule identifier tagged onto baseline default steps.
pub const BASELINE_RULE_ID: &str = "BASELINE_DEFAULT_STEP";

// ============================================================================
// SECTION: Quote Input
// ============================================================================

/// Assembly side selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// Top side of the board.
    Top,
    /// Bottom side of the board.
    Bottom,
}

/// Commercial quote consumed by plan generation.
///
/// Pricing of individual line items is external; the generator only reads
/// the tier, assembly sides, and free-form assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Quote identifier.
    pub quote_id: QuoteId,
    /// Service tier (1..=4); gates execution-output exports.
    pub tier: u8,
    /// Assembly sides to populate.
    #[serde(default)]
    pub assembly_sides: Vec<Side>,
    /// Free-form quoting assumptions.
    #[serde(default)]
    pub assumptions: Map<String, Value>,
}

// ============================================================================
// SECTION: Plan State
// ============================================================================

/// Plan lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    /// Editable working version.
    Draft,
    /// Awaiting approval.
    Submitted,
    /// Approved and locked.
    Approved,
    /// Rejected by an approver.
    Rejected,
}

// ============================================================================
// SECTION: Steps
// ============================================================================

/// Rule reference recorded on a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRule {
    /// Rule identifier.
    pub rule_id: RuleId,
    /// Why the rule mandated this step.
    pub justification: String,
}

/// Content-bearing fields hashed into a step identifier.
#[derive(Debug, Clone, Serialize)]
struct StepIdInput<'a> {
    /// Step type.
    step_type: &'a str,
    /// Step title.
    title: &'a str,
    /// Sequence position.
    sequence: u32,
    /// Step parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<&'a Map<String, Value>>,
    /// Source rules.
    source_rules: &'a [SourceRule],
    /// SOE decision reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    soe_decision_id: Option<&'a DecisionId>,
}

/// Ordered manufacturing process step.
///
/// # Invariants
/// - `source_rules` is never empty.
/// - A step with `soe_decision_id` is SOE-derived; removing or reordering it
///   requires a recorded override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Content-addressed step identifier.
    pub step_id: StepId,
    /// Step type (FAB, SMT, REFLOW, CLEAN, BAKE, ...).
    #[serde(rename = "type")]
    pub step_type: String,
    /// Display title.
    pub title: String,
    /// Position in the plan (1-based).
    pub sequence: u32,
    /// Whether the step is mandatory.
    pub required: bool,
    /// Whether the step participates in a locked sequence.
    pub locked_sequence: bool,
    /// Step parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    /// Acceptance criteria.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance: Option<Acceptance>,
    /// Rules that mandated the step.
    pub source_rules: Vec<SourceRule>,
    /// SOE decision the step derives from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soe_decision_id: Option<DecisionId>,
    /// SOE justification carried alongside the decision reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soe_why: Option<DecisionWhy>,
}

impl Step {
    /// Derives the content-addressed identifier from the step's content.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn derive_id(
        step_type: &str,
        title: &str,
        sequence: u32,
        parameters: Option<&Map<String, Value>>,
        source_rules: &[SourceRule],
        soe_decision_id: Option<&DecisionId>,
    ) -> Result<StepId, HashError> {
        let input = StepIdInput {
            step_type,
            title,
            sequence,
            parameters,
            source_rules,
            soe_decision_id,
        };
        Ok(StepId::new(content_id(&input)?))
    }

    /// Returns true when the step is SOE-derived or sequence-locked.
    #[must_use]
    pub const fn is_soe_locked(&self) -> bool {
        self.soe_decision_id.is_some() || self.locked_sequence
    }
}

// ============================================================================
// SECTION: Tests and Evidence
// ============================================================================

/// Declared test within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTest {
    /// Test identifier.
    pub test_id: TestId,
    /// Test type (TVAC, VIBRATION, IQ, OQ, PQ, ...).
    pub test_type: String,
    /// Display title.
    pub title: String,
    /// Whether the test is mandatory.
    pub required: bool,
    /// Acceptance criteria text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    /// SOE decision the test derives from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soe_decision_id: Option<DecisionId>,
    /// SOE justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soe_why: Option<DecisionWhy>,
}

impl PlanTest {
    /// Returns true when the test is SOE-derived.
    #[must_use]
    pub const fn is_soe_locked(&self) -> bool {
        self.soe_decision_id.is_some()
    }
}

/// Evidence the plan intends to produce and retain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceIntent {
    /// Evidence identifier.
    pub evidence_id: EvidenceId,
    /// Evidence type (DHR, DMR, CERT_OF_CONFORMANCE, ...).
    pub evidence_type: String,
    /// What the evidence applies to.
    pub applies_to: String,
    /// Target object identifier.
    pub object_id: String,
    /// Retention period identifier.
    pub retention: String,
    /// SOE decision the requirement derives from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soe_decision_id: Option<DecisionId>,
    /// SOE justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soe_why: Option<DecisionWhy>,
}

impl EvidenceIntent {
    /// Returns true when the evidence requirement is SOE-derived.
    #[must_use]
    pub const fn is_soe_locked(&self) -> bool {
        self.soe_decision_id.is_some()
    }
}

// ============================================================================
// SECTION: Edit Metadata
// ============================================================================

/// Recorded deviation from an SOE-locked constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRecord {
    /// Constraint key the override covers (e.g. `remove_step:<id>`).
    pub constraint: String,
    /// Non-empty justification.
    pub reason: String,
    /// Actor who recorded the override.
    pub user_id: ActorId,
    /// When the override was recorded.
    pub timestamp: Timestamp,
}

/// Metadata recorded with each edit; entries are appended, never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditMetadata {
    /// Actor who performed the edit.
    pub edited_by: ActorId,
    /// When the edit happened.
    pub edited_at: Timestamp,
    /// Reason for the edit.
    pub edit_reason: String,
    /// Overrides applied by the edit.
    #[serde(default)]
    pub overrides: Vec<OverrideRecord>,
}

// ============================================================================
// SECTION: Datum Plan
// ============================================================================

/// Versioned, governed manufacturing plan.
///
/// # Invariants
/// - `version` is strictly increasing within a `plan_id`.
/// - A version is immutable after write; only `state`/`locked` transition.
/// - `state == approved` implies `locked == true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatumPlan {
    /// Plan identifier.
    pub plan_id: PlanId,
    /// Quote the plan was generated from.
    pub quote_id: QuoteId,
    /// Monotonic version number (1-based).
    pub version: u32,
    /// Version this one was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_version: Option<u32>,
    /// Revision letter (A, B, ..., Z, AA, ...).
    pub plan_revision: String,
    /// Lifecycle state.
    pub state: PlanState,
    /// Whether the version is locked against edits.
    pub locked: bool,
    /// Service tier inherited from the quote.
    pub tier: u8,
    /// Ordered process steps.
    pub steps: Vec<Step>,
    /// Declared tests.
    #[serde(default)]
    pub tests: Vec<PlanTest>,
    /// Evidence intent.
    #[serde(default)]
    pub evidence_intent: Vec<EvidenceIntent>,
    /// SOE run the plan derives from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soe_run_id: Option<SoeRunId>,
    /// All SOE decision ids referenced by the plan, sorted ascending.
    #[serde(default)]
    pub soe_decision_ids: Vec<DecisionId>,
    /// Free-form operator notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Edit history, appended on every edit.
    #[serde(default)]
    pub edit_metadata: Vec<EditMetadata>,
    /// Approver identity, set on approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<ActorId>,
    /// Approval timestamp, set on approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<Timestamp>,
    /// Creation timestamp of this version.
    pub created_at: Timestamp,
    /// Last state-transition timestamp of this version.
    pub updated_at: Timestamp,
}

impl DatumPlan {
    /// Looks up a step by identifier.
    #[must_use]
    pub fn step(&self, step_id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|step| &step.step_id == step_id)
    }
}

// ============================================================================
// SECTION: Revision Letters
// ============================================================================

/// Computes the next revision letter after the given existing revisions.
///
/// Revisions run A..Z, then AA, AB, ... like spreadsheet columns. An empty
/// history yields `A`.
#[must_use]
pub fn next_revision(existing: &[String]) -> String {
    let highest = existing
        .iter()
        .filter(|revision| {
            !revision.is_empty() && revision.chars().all(|ch| ch.is_ascii_uppercase())
        })
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    match highest {
        None => "A".to_string(),
        Some(revision) => increment_revision(revision),
    }
}

/// Increments a revision letter string with carry (Z -> AA, AZ -> BA).
fn increment_revision(revision: &str) -> String {
    let mut letters: Vec<u8> = revision.bytes().collect();
    let mut index = letters.len();
    loop {
        if index == 0 {
            letters.insert(0, b'A');
            break;
        }
        index -= 1;
        if letters[index] == b'Z' {
            letters[index] = b'A';
        } else {
            letters[index] += 1;
            break;
        }
    }
    String::from_utf8_lossy(&letters).into_owned()
}
