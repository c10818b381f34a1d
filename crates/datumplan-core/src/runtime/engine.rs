// crates/datumplan-core/src/runtime/engine.rs
// ============================================================================
// Module: Datum SOE Engine
// Description: Deterministic standards-overlay evaluation.
// Purpose: Resolve profile stacks, evaluate rules, and emit auditable runs.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! The SOE engine is the single canonical evaluation path: it resolves the
//! layered profile stack, unions and sorts the active packs, evaluates every
//! rule in deterministic order, and emits a content-addressed [`SoeRun`].
//! The engine performs no I/O beyond the injected catalogs, reads no clock,
//! and produces byte-equal canonical JSON for identical inputs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::ActionKind;
use crate::core::ActionPayload;
use crate::core::ConflictOverride;
use crate::core::ConflictPolicy;
use crate::core::CostModifier;
use crate::core::Decision;
use crate::core::DecisionId;
use crate::core::DecisionWhy;
use crate::core::Enforcement;
use crate::core::EvalContext;
use crate::core::EvidenceRequirement;
use crate::core::Gate;
use crate::core::GateStatus;
use crate::core::HashError;
use crate::core::IndustryId;
use crate::core::IndustryProfile;
use crate::core::ModifierType;
use crate::core::ObjectType;
use crate::core::OverrideMode;
use crate::core::PackId;
use crate::core::ProfileId;
use crate::core::ProfileSource;
use crate::core::ProfileStackEntry;
use crate::core::ProfileState;
use crate::core::ProfileType;
use crate::core::RELEASE_GATE_ID;
use crate::core::Rule;
use crate::core::RuleRef;
use crate::core::SOE_ENGINE_VERSION;
use crate::core::SoeAuditManifest;
use crate::core::SoeRequest;
use crate::core::SoeRun;
use crate::core::SoeRunId;
use crate::core::StandardsProfile;
use crate::core::conflict_policy_for;
use crate::core::content_id;
use crate::core::eval_expr;
use crate::core::identifiers::GateId;
use crate::interfaces::CatalogError;
use crate::interfaces::PackCatalog;
use crate::interfaces::ProfileCatalog;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Retention fallback for explicit retention decisions.
const RETENTION_FALLBACK_SET: &str = "LIFE_OF_PROGRAM";
/// Retention fallback for plain evidence requirements.
const RETENTION_FALLBACK_REQUIRE: &str = "5_YEARS";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors aborting an SOE run.
///
/// All variants surface under the `SOE_BLOCKED` umbrella at the request
/// boundary, with [`SoeError::code`] as the sub-code.
#[derive(Debug, Error)]
pub enum SoeError {
    /// A selected profile is not usable in its current state.
    #[error("profile {profile_id} is in state {state} and cannot be used in an SOE run")]
    ProfileUnusable {
        /// Offending profile.
        profile_id: String,
        /// State the profile is in.
        state: String,
    },
    /// The profile graph violates type constraints or contains cycles.
    #[error("profile graph invalid: {0}")]
    ProfileGraphInvalid(String),
    /// An active pack could not be resolved.
    #[error("standards pack not found: {0}")]
    PackNotFound(String),
    /// The industry profile could not be resolved.
    #[error("industry profile not found: {0}")]
    IndustryProfileNotFound(String),
    /// Contradictory decisions under the ERROR conflict policy.
    #[error(
        "conflicting decisions on {object_type} {object_id}: {require_decision} requires what \
         {prohibit_decision} prohibits"
    )]
    RuleConflict {
        /// Object classification both decisions target.
        object_type: String,
        /// Object identifier both decisions target.
        object_id: String,
        /// Requiring decision id.
        require_decision: DecisionId,
        /// Prohibiting decision id.
        prohibit_decision: DecisionId,
    },
    /// Canonicalization failed while deriving identifiers.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl SoeError {
    /// Returns the stable sub-code under the `SOE_BLOCKED` umbrella.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ProfileUnusable {
                ..
            } => "PROFILE_UNUSABLE",
            Self::ProfileGraphInvalid(_) => "PROFILE_GRAPH_INVALID",
            Self::PackNotFound(_) => "PACK_NOT_FOUND",
            Self::IndustryProfileNotFound(_) => "INDUSTRY_PROFILE_NOT_FOUND",
            Self::RuleConflict {
                ..
            } => "RULE_CONFLICT",
            Self::Hash(_) => "CANONICALIZATION_FAILED",
        }
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Stable inputs hashed into the run identifier.
#[derive(Serialize)]
struct RunIdInput<'a> {
    /// Industry identifier.
    industry_profile: &'a IndustryId,
    /// Hardware class.
    hardware_class: Option<&'a str>,
    /// Context inputs.
    inputs: &'a serde_json::Map<String, Value>,
    /// Resolved profile stack.
    profile_stack: &'a [ProfileStackEntry],
    /// Sorted active packs.
    active_packs: &'a [PackId],
    /// Audit replay flag.
    audit_replay: bool,
}

/// Evaluates an SOE request into a complete run.
///
/// # Errors
///
/// Returns [`SoeError`] when profile resolution, pack resolution, or conflict
/// resolution fails.
pub fn evaluate<C>(catalog: &C, request: &SoeRequest) -> Result<SoeRun, SoeError>
where
    C: ProfileCatalog + PackCatalog,
{
    let industry = catalog.industry_profile(&request.industry_profile).map_err(|_| {
        SoeError::IndustryProfileNotFound(request.industry_profile.to_string())
    })?;

    let profiles = resolve_profiles(catalog, request)?;
    guard_profile_states(&profiles, request.audit_replay)?;
    let profile_stack = build_stack(&profiles);
    let active_packs = resolve_active_packs(&profiles, &industry, &request.additional_packs);

    let context = build_context(request);
    let hardware_class = request.hardware_class.as_deref();

    let mut decisions: Vec<Decision> = Vec::new();
    let mut seen: BTreeSet<DecisionId> = BTreeSet::new();
    for pack_id in &active_packs {
        let pack =
            catalog.pack(pack_id).map_err(|_| SoeError::PackNotFound(pack_id.to_string()))?;
        for rule in &pack.rules {
            if !rule.applies.admits(&request.industry_profile, hardware_class) {
                continue;
            }
            let fires = rule.trigger.as_ref().is_none_or(|trigger| eval_expr(trigger, &context));
            if !fires {
                continue;
            }
            emit_rule_decisions(
                rule,
                pack_id,
                &request.industry_profile,
                hardware_class,
                &profiles,
                &mut decisions,
                &mut seen,
            )?;
        }
    }

    let (decisions, conflict_overrides) = resolve_conflicts(decisions, &profiles)?;

    let gates = derive_gates(&decisions);
    let required_evidence = derive_evidence(&decisions, &industry);
    let cost_modifiers = derive_cost_modifiers(&decisions);

    let run_id_input = RunIdInput {
        industry_profile: &request.industry_profile,
        hardware_class,
        inputs: &request.inputs,
        profile_stack: &profile_stack,
        active_packs: &active_packs,
        audit_replay: request.audit_replay,
    };
    let soe_run_id = SoeRunId::new(format!("soe_{}", content_id(&run_id_input)?));

    Ok(SoeRun {
        soe_run_id,
        soe_version: SOE_ENGINE_VERSION.to_string(),
        industry_profile: request.industry_profile.clone(),
        hardware_class: request.hardware_class.clone(),
        audit_replay: request.audit_replay,
        active_packs,
        profile_stack,
        inputs: request.inputs.clone(),
        decisions,
        conflict_overrides,
        gates,
        required_evidence,
        cost_modifiers,
    })
}

/// Builds the audit manifest for a completed run.
#[must_use]
pub fn audit_manifest(run: &SoeRun) -> SoeAuditManifest {
    let mut rules_applied: Vec<RuleRef> = Vec::new();
    for decision in &run.decisions {
        let reference = RuleRef {
            rule_id: decision.why.rule_id.clone(),
            pack_id: decision.why.pack_id.clone(),
            citations: decision.why.citations.clone(),
        };
        if !rules_applied.contains(&reference) {
            rules_applied.push(reference);
        }
    }

    SoeAuditManifest {
        soe_run_id: run.soe_run_id.clone(),
        soe_version: run.soe_version.clone(),
        industry_profile: run.industry_profile.clone(),
        hardware_class: run.hardware_class.clone(),
        active_packs: run.active_packs.clone(),
        decisions: run.decisions.clone(),
        rules_applied,
        required_evidence: run.required_evidence.clone(),
        gates: run.gates.clone(),
        cost_modifiers: run.cost_modifiers.clone(),
    }
}

// ============================================================================
// SECTION: Profile Resolution
// ============================================================================

/// Resolves the selected profile ids into loaded profiles, validating the
/// graph.
fn resolve_profiles<C: ProfileCatalog>(
    catalog: &C,
    request: &SoeRequest,
) -> Result<Vec<StandardsProfile>, SoeError> {
    if request.active_profiles.is_some() && request.profile_bundle_id.is_some() {
        return Err(SoeError::ProfileGraphInvalid(
            "active_profiles and profile_bundle_id are mutually exclusive".to_string(),
        ));
    }

    let mut selected: Vec<ProfileId> = Vec::new();
    if let Some(bundle_id) = &request.profile_bundle_id {
        let bundle = catalog
            .bundle(bundle_id)
            .map_err(|err| SoeError::ProfileGraphInvalid(err.to_string()))?;
        for profile_id in bundle.resolve() {
            if !selected.contains(&profile_id) {
                selected.push(profile_id);
            }
        }
    }
    if let Some(active) = &request.active_profiles {
        for profile_id in active {
            if !selected.contains(profile_id) {
                selected.push(profile_id.clone());
            }
        }
    }

    let mut profiles: Vec<StandardsProfile> = Vec::with_capacity(selected.len());
    for profile_id in &selected {
        let profile = catalog
            .profile(profile_id)
            .map_err(|err| SoeError::ProfileGraphInvalid(err.to_string()))?;
        profiles.push(profile);
    }

    validate_graph(catalog, &profiles)?;
    Ok(profiles)
}

/// Validates type constraints and acyclicity of the profile graph.
fn validate_graph<C: ProfileCatalog>(
    catalog: &C,
    profiles: &[StandardsProfile],
) -> Result<(), SoeError> {
    let loaded: BTreeMap<&ProfileId, &StandardsProfile> =
        profiles.iter().map(|profile| (&profile.profile_id, profile)).collect();

    let lookup = |profile_id: &ProfileId| -> Result<StandardsProfile, SoeError> {
        if let Some(profile) = loaded.get(profile_id) {
            return Ok((*profile).clone());
        }
        catalog
            .profile(profile_id)
            .map_err(|err: CatalogError| SoeError::ProfileGraphInvalid(err.to_string()))
    };

    for profile in profiles {
        let expected_parent_type = match profile.profile_type {
            ProfileType::Base => {
                if !profile.parent_profile_ids.is_empty() {
                    return Err(SoeError::ProfileGraphInvalid(format!(
                        "BASE profile {} must not declare parents",
                        profile.profile_id
                    )));
                }
                continue;
            }
            ProfileType::Domain => ProfileType::Base,
            ProfileType::CustomerOverride => ProfileType::Domain,
        };

        if profile.parent_profile_ids.is_empty() {
            return Err(SoeError::ProfileGraphInvalid(format!(
                "profile {} must declare at least one parent",
                profile.profile_id
            )));
        }

        for parent_id in &profile.parent_profile_ids {
            let parent = lookup(parent_id)?;
            if parent.profile_type != expected_parent_type {
                return Err(SoeError::ProfileGraphInvalid(format!(
                    "profile {} may only inherit from {} profiles, found {parent_id}",
                    profile.profile_id,
                    expected_parent_type.as_str()
                )));
            }
        }

        // Walk ancestry to reject cycles in misdeclared graphs.
        let mut path: Vec<ProfileId> = vec![profile.profile_id.clone()];
        let mut frontier: Vec<ProfileId> = profile.parent_profile_ids.clone();
        while let Some(ancestor_id) = frontier.pop() {
            if path.contains(&ancestor_id) {
                return Err(SoeError::ProfileGraphInvalid(format!(
                    "profile graph cycle through {ancestor_id}"
                )));
            }
            path.push(ancestor_id.clone());
            let ancestor = lookup(&ancestor_id)?;
            frontier.extend(ancestor.parent_profile_ids.iter().cloned());
        }
    }

    Ok(())
}

/// Rejects profiles whose state makes them unusable for this run.
fn guard_profile_states(
    profiles: &[StandardsProfile],
    audit_replay: bool,
) -> Result<(), SoeError> {
    for profile in profiles {
        let usable = match profile.state {
            ProfileState::Approved => true,
            ProfileState::Deprecated => audit_replay,
            ProfileState::Draft | ProfileState::Submitted | ProfileState::Rejected => false,
        };
        if !usable {
            return Err(SoeError::ProfileUnusable {
                profile_id: profile.profile_id.to_string(),
                state: profile.state.as_str().to_string(),
            });
        }
    }
    Ok(())
}

/// Builds the recorded profile stack, ordered by layer then selection order.
fn build_stack(profiles: &[StandardsProfile]) -> Vec<ProfileStackEntry> {
    let mut entries: Vec<(usize, ProfileStackEntry)> = profiles
        .iter()
        .enumerate()
        .map(|(index, profile)| {
            (index, ProfileStackEntry {
                profile_id: profile.profile_id.clone(),
                profile_type: profile.profile_type,
                layer: profile.profile_type.layer(),
                parent_profile_ids: profile.parent_profile_ids.clone(),
            })
        })
        .collect();
    entries.sort_by(|(a_index, a), (b_index, b)| {
        a.layer.cmp(&b.layer).then_with(|| a_index.cmp(b_index))
    });
    entries.into_iter().map(|(_, entry)| entry).collect()
}

/// Unions profile, industry, and additional packs into a sorted active set.
///
/// A `REPLACE` profile removes the packs contributed by its direct parents
/// before adding its own.
fn resolve_active_packs(
    profiles: &[StandardsProfile],
    industry: &IndustryProfile,
    additional_packs: &[PackId],
) -> Vec<PackId> {
    let mut union: BTreeSet<PackId> = BTreeSet::new();

    let mut ordered: Vec<&StandardsProfile> = profiles.iter().collect();
    ordered.sort_by_key(|profile| profile.profile_type.layer());
    let by_id: BTreeMap<&ProfileId, &StandardsProfile> =
        profiles.iter().map(|profile| (&profile.profile_id, profile)).collect();

    for profile in ordered {
        if profile.override_mode == OverrideMode::Replace {
            for parent_id in &profile.parent_profile_ids {
                if let Some(parent) = by_id.get(parent_id) {
                    for pack_id in &parent.default_packs {
                        union.remove(pack_id);
                    }
                }
            }
        }
        union.extend(profile.default_packs.iter().cloned());
    }

    union.extend(industry.default_packs.iter().cloned());
    union.extend(additional_packs.iter().cloned());
    union.into_iter().collect()
}

// ============================================================================
// SECTION: Rule Evaluation
// ============================================================================

/// Builds the evaluation context from request inputs and run scope.
fn build_context(request: &SoeRequest) -> EvalContext {
    let mut context = EvalContext::from_map(request.inputs.clone());
    context.insert("industry_profile", Value::String(request.industry_profile.to_string()));
    if let Some(hardware_class) = &request.hardware_class {
        context.insert("hardware_class", Value::String(hardware_class.clone()));
    }
    context
}

/// Emits one decision per declared action of a fired rule, merging by id.
fn emit_rule_decisions(
    rule: &Rule,
    pack_id: &PackId,
    industry: &IndustryId,
    hardware_class: Option<&str>,
    profiles: &[StandardsProfile],
    decisions: &mut Vec<Decision>,
    seen: &mut BTreeSet<DecisionId>,
) -> Result<(), SoeError> {
    for action in &rule.actions {
        let id = Decision::derive_id(
            &rule.rule_id,
            pack_id,
            action.action,
            action.object_type,
            &action.object_id,
        )?;
        if !seen.insert(id.clone()) {
            continue;
        }

        let why = DecisionWhy {
            rule_id: rule.rule_id.clone(),
            pack_id: pack_id.clone(),
            citations: rule.citations.clone(),
            summary: rule.summary.clone(),
        };
        let explanation =
            render_explanation(industry, hardware_class, rule, pack_id, action.action);
        let profile_source = attribute_profile(profiles, pack_id);

        decisions.push(Decision {
            id,
            action: action.action,
            object_type: action.object_type,
            object_id: action.object_id.clone(),
            enforcement: rule.enforcement,
            why,
            explanation,
            profile_source,
            payload: action.payload.clone(),
        });
    }
    Ok(())
}

/// Renders the locale-independent human explanation for a decision.
fn render_explanation(
    industry: &IndustryId,
    hardware_class: Option<&str>,
    rule: &Rule,
    pack_id: &PackId,
    action: ActionKind,
) -> String {
    let scope = match hardware_class {
        Some(class) => format!("{industry}/{class}"),
        None => industry.to_string(),
    };
    let base = if rule.summary.trim().is_empty() {
        format!("{} required by {} in pack {pack_id}", action.as_str(), rule.rule_id)
    } else {
        rule.summary.clone()
    };
    if rule.citations.is_empty() {
        format!("[{scope}] {base}")
    } else {
        format!("[{scope}] {base} ({})", rule.citations.join(", "))
    }
}

/// Attributes a pack to the highest-layer profile carrying it.
///
/// Ties within a layer break toward the lexicographically smallest profile
/// id, keeping attribution deterministic.
fn attribute_profile(profiles: &[StandardsProfile], pack_id: &PackId) -> Option<ProfileSource> {
    let mut candidates: Vec<&StandardsProfile> = profiles
        .iter()
        .filter(|profile| profile.default_packs.contains(pack_id))
        .collect();
    candidates.sort_by(|a, b| {
        b.profile_type
            .layer()
            .cmp(&a.profile_type.layer())
            .then_with(|| a.profile_id.cmp(&b.profile_id))
    });
    candidates.first().map(|profile| ProfileSource {
        profile_id: profile.profile_id.clone(),
        profile_type: profile.profile_type,
        layer: profile.profile_type.layer(),
    })
}

// ============================================================================
// SECTION: Conflict Resolution
// ============================================================================

/// Resolves REQUIRE/PROHIBIT contradictions per the governing conflict policy.
fn resolve_conflicts(
    decisions: Vec<Decision>,
    profiles: &[StandardsProfile],
) -> Result<(Vec<Decision>, Vec<ConflictOverride>), SoeError> {
    let mut dropped: BTreeSet<DecisionId> = BTreeSet::new();
    let mut overrides: Vec<ConflictOverride> = Vec::new();

    let mut targets: Vec<(ObjectType, String)> = Vec::new();
    for decision in &decisions {
        let key = (decision.object_type, decision.object_id.clone());
        if !targets.contains(&key) {
            targets.push(key);
        }
    }

    for (object_type, object_id) in targets {
        let requires: Vec<&Decision> = decisions
            .iter()
            .filter(|decision| {
                decision.action == ActionKind::Require
                    && decision.object_type == object_type
                    && decision.object_id == object_id
            })
            .collect();
        let prohibits: Vec<&Decision> = decisions
            .iter()
            .filter(|decision| {
                decision.action == ActionKind::Prohibit
                    && decision.object_type == object_type
                    && decision.object_id == object_id
            })
            .collect();

        for require in &requires {
            for prohibit in &prohibits {
                if dropped.contains(&require.id) || dropped.contains(&prohibit.id) {
                    continue;
                }
                let require_layer = source_layer(require);
                let prohibit_layer = source_layer(prohibit);
                let (lower, higher) = if require_layer <= prohibit_layer {
                    (*require, *prohibit)
                } else {
                    (*prohibit, *require)
                };

                let policy = higher
                    .profile_source
                    .as_ref()
                    .and_then(|source| conflict_policy_for(profiles, &source.profile_id));

                let conflict = || SoeError::RuleConflict {
                    object_type: object_type_label(object_type).to_string(),
                    object_id: object_id.clone(),
                    require_decision: require.id.clone(),
                    prohibit_decision: prohibit.id.clone(),
                };

                if require_layer == prohibit_layer {
                    return Err(conflict());
                }
                let governing_profile = higher
                    .profile_source
                    .as_ref()
                    .map(|source| source.profile_id.clone());
                match (policy, governing_profile) {
                    (None | Some(ConflictPolicy::Error), _) | (_, None) => return Err(conflict()),
                    (Some(resolved @ ConflictPolicy::ParentWins), Some(governing)) => {
                        dropped.insert(higher.id.clone());
                        overrides.push(ConflictOverride {
                            object_type,
                            object_id: object_id.clone(),
                            kept_decision: lower.id.clone(),
                            dropped_decision: higher.id.clone(),
                            policy: resolved,
                            governing_profile: governing,
                        });
                    }
                    (Some(resolved @ ConflictPolicy::ChildWins), Some(governing)) => {
                        dropped.insert(lower.id.clone());
                        overrides.push(ConflictOverride {
                            object_type,
                            object_id: object_id.clone(),
                            kept_decision: higher.id.clone(),
                            dropped_decision: lower.id.clone(),
                            policy: resolved,
                            governing_profile: governing,
                        });
                    }
                }
            }
        }
    }

    let kept = decisions.into_iter().filter(|decision| !dropped.contains(&decision.id)).collect();
    Ok((kept, overrides))
}

/// Returns the attribution layer of a decision; unattributed decisions rank
/// below BASE.
fn source_layer(decision: &Decision) -> i16 {
    decision.profile_source.as_ref().map_or(-1, |source| i16::from(source.layer))
}

/// Returns the wire label for an object type.
const fn object_type_label(object_type: ObjectType) -> &'static str {
    match object_type {
        ObjectType::ProcessStep => "process_step",
        ObjectType::Test => "test",
        ObjectType::Evidence => "evidence",
        ObjectType::Gate => "gate",
        ObjectType::CostModifier => "cost_modifier",
        ObjectType::Plan => "plan",
    }
}

// ============================================================================
// SECTION: Derived Artifacts
// ============================================================================

/// Derives release gates from decisions.
///
/// The implicit release gate aggregates every BLOCK_RELEASE decision;
/// `ADD_GATE` decisions contribute their own gates.
fn derive_gates(decisions: &[Decision]) -> Vec<Gate> {
    let blocking: Vec<DecisionId> = decisions
        .iter()
        .filter(|decision| decision.enforcement == Some(Enforcement::BlockRelease))
        .map(|decision| decision.id.clone())
        .collect();

    let release_status =
        if blocking.is_empty() { GateStatus::Open } else { GateStatus::Blocked };
    let mut gates = vec![Gate {
        gate_id: GateId::new(RELEASE_GATE_ID),
        status: release_status,
        blocked_by: blocking,
    }];

    for decision in decisions {
        if decision.action != ActionKind::AddGate {
            continue;
        }
        let gate_id = match &decision.payload {
            Some(ActionPayload::Gate {
                gate_id,
            }) => gate_id.clone(),
            _ => GateId::new(decision.object_id.clone()),
        };
        let (status, blocked_by) = match decision.enforcement {
            Some(Enforcement::BlockRelease) => (GateStatus::Blocked, vec![decision.id.clone()]),
            Some(Enforcement::Warn) => (GateStatus::Warning, Vec::new()),
            _ => (GateStatus::Open, Vec::new()),
        };
        if let Some(existing) = gates.iter_mut().find(|gate| gate.gate_id == gate_id) {
            existing.blocked_by.extend(blocked_by);
            if status == GateStatus::Blocked {
                existing.status = GateStatus::Blocked;
            }
        } else {
            gates.push(Gate {
                gate_id,
                status,
                blocked_by,
            });
        }
    }

    gates
}

/// Derives evidence requirements from evidence decisions.
fn derive_evidence(
    decisions: &[Decision],
    industry: &IndustryProfile,
) -> Vec<EvidenceRequirement> {
    let mut requirements = Vec::new();
    for decision in decisions {
        if decision.object_type != ObjectType::Evidence {
            continue;
        }
        match decision.action {
            ActionKind::Require => {
                let (applies_to, retention) = match &decision.payload {
                    Some(ActionPayload::Evidence {
                        applies_to,
                        retention,
                    }) => (applies_to.clone(), retention.clone()),
                    _ => (None, None),
                };
                requirements.push(EvidenceRequirement {
                    evidence_type: decision.object_id.clone(),
                    applies_to: applies_to.unwrap_or_else(|| "material".to_string()),
                    object_id: decision.object_id.clone(),
                    retention: retention
                        .or_else(|| industry.evidence_retention.clone())
                        .unwrap_or_else(|| RETENTION_FALLBACK_REQUIRE.to_string()),
                    decision_id: decision.id.clone(),
                });
            }
            ActionKind::SetRetention => {
                let (retention, applies_to) = match &decision.payload {
                    Some(ActionPayload::Retention {
                        retention,
                        applies_to,
                    }) => (Some(retention.clone()), applies_to.clone()),
                    _ => (None, None),
                };
                requirements.push(EvidenceRequirement {
                    evidence_type: decision.object_id.clone(),
                    applies_to: applies_to.unwrap_or_else(|| "material".to_string()),
                    object_id: decision.object_id.clone(),
                    retention: retention
                        .or_else(|| industry.evidence_retention.clone())
                        .unwrap_or_else(|| RETENTION_FALLBACK_SET.to_string()),
                    decision_id: decision.id.clone(),
                });
            }
            _ => {}
        }
    }
    requirements
}

/// Derives cost modifiers from `ADD_COST_MODIFIER` decisions.
fn derive_cost_modifiers(decisions: &[Decision]) -> Vec<CostModifier> {
    decisions
        .iter()
        .filter(|decision| decision.action == ActionKind::AddCostModifier)
        .map(|decision| {
            let (modifier_type, value) = match &decision.payload {
                Some(ActionPayload::CostModifier {
                    modifier_type,
                    value,
                }) => (*modifier_type, *value),
                _ => (ModifierType::Percent, 0.0),
            };
            CostModifier {
                rule_id: decision.why.rule_id.clone(),
                reason: decision.why.summary.clone(),
                modifier_type,
                value,
            }
        })
        .collect()
}
