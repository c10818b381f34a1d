// crates/datumplan-core/src/core/soe.rs
// ============================================================================
// Module: Datum SOE Run Types
// Description: Standards-overlay run requests, decisions, gates, and manifests.
// Purpose: Define the canonical, content-addressed output of SOE evaluation.
// Dependencies: crate::core::{expr, hashing, identifiers, pack, profile}, serde
// ============================================================================

//! ## Overview
//! An SOE run is the auditable output of evaluating a resolved profile stack
//! against a design context: content-addressed decisions, derived release
//! gates, required evidence, and cost modifiers. Runs are pure functions of
//! their inputs; regenerating a run from identical inputs yields byte-equal
//! canonical JSON.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::hashing::HashError;
use crate::core::hashing::content_id;
use crate::core::identifiers::BundleId;
use crate::core::identifiers::DecisionId;
use crate::core::identifiers::GateId;
use crate::core::identifiers::IndustryId;
use crate::core::identifiers::PackId;
use crate::core::identifiers::ProfileId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::SoeRunId;
use crate::core::pack::ActionKind;
use crate::core::pack::ActionPayload;
use crate::core::pack::Enforcement;
use crate::core::pack::ModifierType;
use crate::core::pack::ObjectType;
use crate::core::profile::ProfileStackEntry;
use crate::core::profile::ProfileType;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// SOE engine version recorded on every run.
pub const SOE_ENGINE_VERSION: &str = "1.0.0";

/// Identifier of the implicit release gate aggregating blocking decisions.
pub const RELEASE_GATE_ID: &str = "GATE-RELEASE";

// ============================================================================
// SECTION: Run Request
// ============================================================================

/// Request evaluated by the SOE engine.
///
/// # Invariants
/// - At most one of `active_profiles` / `profile_bundle_id` may be provided;
///   when neither is, the industry profile's defaults apply alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoeRequest {
    /// Industry profile identifier.
    pub industry_profile: IndustryId,
    /// Optional hardware class (e.g. `flight`, `class_2`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_class: Option<String>,
    /// Design context inputs (processes, tests_requested, materials, ...).
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// Explicit profile stack selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_profiles: Option<Vec<ProfileId>>,
    /// Bundle selection, expanded to its profile ids at evaluation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_bundle_id: Option<BundleId>,
    /// Packs activated beyond profile and industry defaults.
    #[serde(default)]
    pub additional_packs: Vec<PackId>,
    /// Accept deprecated profiles for audit replay of historical artifacts.
    #[serde(default)]
    pub audit_replay: bool,
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Stable fields hashed into a decision identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct DecisionIdInput<'a> {
    /// Rule identifier.
    rule_id: &'a RuleId,
    /// Pack identifier.
    pack_id: &'a PackId,
    /// Action kind.
    action: ActionKind,
    /// Target object classification.
    object_type: ObjectType,
    /// Target object identifier.
    object_id: &'a str,
}

/// Content-addressed fact that a rule requires, prohibits, or inserts
/// something.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Content-addressed identifier (fixed-length hex prefix).
    pub id: DecisionId,
    /// Action kind.
    pub action: ActionKind,
    /// Target object classification.
    pub object_type: ObjectType,
    /// Target object identifier.
    pub object_id: String,
    /// Enforcement level, when the rule declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement: Option<Enforcement>,
    /// Traceable justification.
    pub why: DecisionWhy,
    /// Rendered human-readable explanation.
    pub explanation: String,
    /// Highest-layer profile whose pack list contains the emitting pack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_source: Option<ProfileSource>,
    /// Declared action payload carried through to plan generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ActionPayload>,
}

impl Decision {
    /// Derives the content-addressed identifier for a decision.
    ///
    /// The id hashes only the stable fields `{rule_id, pack_id, action,
    /// object_type, object_id}`, so payload or explanation changes never move
    /// a decision.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn derive_id(
        rule_id: &RuleId,
        pack_id: &PackId,
        action: ActionKind,
        object_type: ObjectType,
        object_id: &str,
    ) -> Result<DecisionId, HashError> {
        let input = DecisionIdInput {
            rule_id,
            pack_id,
            action,
            object_type,
            object_id,
        };
        Ok(DecisionId::new(content_id(&input)?))
    }
}

/// Traceable justification for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionWhy {
    /// Rule that emitted the decision.
    pub rule_id: RuleId,
    /// Pack the rule belongs to.
    pub pack_id: PackId,
    /// Clause citations into the source standard.
    #[serde(default)]
    pub citations: Vec<String>,
    /// Rule summary.
    pub summary: String,
}

/// Profile attribution for a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSource {
    /// Profile identifier.
    pub profile_id: ProfileId,
    /// Profile layer classification.
    pub profile_type: ProfileType,
    /// Semantic layer constant.
    pub layer: u8,
}

/// Record of a conflict resolved by a non-ERROR policy.
///
/// Dropped decisions leave the run, but the resolution itself stays
/// auditable and is listed under deviations in compliance reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictOverride {
    /// Object classification both decisions targeted.
    pub object_type: ObjectType,
    /// Object identifier both decisions targeted.
    pub object_id: String,
    /// Decision kept by the policy.
    pub kept_decision: DecisionId,
    /// Decision dropped by the policy.
    pub dropped_decision: DecisionId,
    /// Policy that governed the resolution.
    pub policy: crate::core::profile::ConflictPolicy,
    /// Profile whose policy governed.
    pub governing_profile: ProfileId,
}

// ============================================================================
// SECTION: Derived Artifacts
// ============================================================================

/// Release gate status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    /// No blocking decisions.
    Open,
    /// At least one blocking decision.
    Blocked,
    /// Non-blocking findings present.
    Warning,
}

/// Release checkpoint derived from decisions.
///
/// # Invariants
/// - `status` is `blocked` iff `blocked_by` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    /// Gate identifier.
    pub gate_id: GateId,
    /// Derived status.
    pub status: GateStatus,
    /// Blocking decision identifiers.
    #[serde(default)]
    pub blocked_by: Vec<DecisionId>,
}

/// Evidence the plan must retain, derived from evidence decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRequirement {
    /// Evidence type identifier.
    pub evidence_type: String,
    /// What the evidence applies to (material, process, lot, ...).
    pub applies_to: String,
    /// Target object identifier.
    pub object_id: String,
    /// Retention period identifier.
    pub retention: String,
    /// Decision the requirement derives from.
    pub decision_id: DecisionId,
}

/// Quote cost modifier derived from `ADD_COST_MODIFIER` decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModifier {
    /// Rule that emitted the modifier.
    pub rule_id: RuleId,
    /// Human-readable reason.
    pub reason: String,
    /// Modifier type.
    pub modifier_type: ModifierType,
    /// Modifier value.
    pub value: f64,
}

// ============================================================================
// SECTION: SOE Run
// ============================================================================

/// Auditable result of one SOE evaluation.
///
/// # Invariants
/// - `active_packs` is sorted ascending and duplicate-free.
/// - Identical inputs produce byte-equal canonical JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoeRun {
    /// Run identifier, derived from the canonical request.
    pub soe_run_id: SoeRunId,
    /// Engine version that produced the run.
    pub soe_version: String,
    /// Industry profile identifier.
    pub industry_profile: IndustryId,
    /// Hardware class, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_class: Option<String>,
    /// True when deprecated profiles were admitted for audit replay.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub audit_replay: bool,
    /// Active packs, sorted ascending by pack id.
    pub active_packs: Vec<PackId>,
    /// Resolved profile stack.
    #[serde(default)]
    pub profile_stack: Vec<ProfileStackEntry>,
    /// Design context inputs the run was evaluated against.
    pub inputs: Map<String, Value>,
    /// Decisions in deterministic firing order, merged by id.
    pub decisions: Vec<Decision>,
    /// Conflicts resolved by PARENT_WINS or CHILD_WINS policies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflict_overrides: Vec<ConflictOverride>,
    /// Derived release gates.
    pub gates: Vec<Gate>,
    /// Derived evidence requirements.
    pub required_evidence: Vec<EvidenceRequirement>,
    /// Derived cost modifiers.
    pub cost_modifiers: Vec<CostModifier>,
}

impl SoeRun {
    /// Looks up a decision by identifier.
    #[must_use]
    pub fn decision(&self, id: &DecisionId) -> Option<&Decision> {
        self.decisions.iter().find(|decision| &decision.id == id)
    }
}

// ============================================================================
// SECTION: Audit Manifest
// ============================================================================

/// Deduplicated rule reference listed in audit manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRef {
    /// Rule identifier.
    pub rule_id: RuleId,
    /// Pack identifier.
    pub pack_id: PackId,
    /// Clause citations.
    #[serde(default)]
    pub citations: Vec<String>,
}

/// Audit-ready manifest of everything a run decided and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoeAuditManifest {
    /// Run identifier.
    pub soe_run_id: SoeRunId,
    /// Engine version.
    pub soe_version: String,
    /// Industry profile identifier.
    pub industry_profile: IndustryId,
    /// Hardware class, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_class: Option<String>,
    /// Active packs.
    pub active_packs: Vec<PackId>,
    /// Decisions with rendered explanations.
    pub decisions: Vec<Decision>,
    /// Unique rule references across all decisions.
    pub rules_applied: Vec<RuleRef>,
    /// Evidence requirements.
    pub required_evidence: Vec<EvidenceRequirement>,
    /// Release gates.
    pub gates: Vec<Gate>,
    /// Cost modifiers.
    pub cost_modifiers: Vec<CostModifier>,
}
