// crates/datumplan-core/src/runtime/generator.rs
// ============================================================================
// Module: Datum Plan Generator
// Description: Deterministic plan generation from a quote and an SOE run.
// Purpose: Produce version-1 draft plans traceable to SOE decisions.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Plan generation is a pure function from `(quote, soe_run)` to a draft
//! DatumPlan: a baseline fabrication/assembly sequence seeded from the quote,
//! SOE-mandated steps merged or appended with their decision references, and
//! test/evidence intent derived from the run. Fixed inputs produce
//! byte-identical output; there is no clock, randomness, or I/O.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::Acceptance;
use crate::core::ActionKind;
use crate::core::ActionPayload;
use crate::core::BASELINE_RULE_ID;
use crate::core::DatumPlan;
use crate::core::Decision;
use crate::core::DecisionId;
use crate::core::Enforcement;
use crate::core::EvidenceId;
use crate::core::EvidenceIntent;
use crate::core::HashError;
use crate::core::ObjectType;
use crate::core::PlanId;
use crate::core::PlanState;
use crate::core::PlanTest;
use crate::core::Quote;
use crate::core::QuoteId;
use crate::core::RuleId;
use crate::core::Side;
use crate::core::SoeRun;
use crate::core::SoeRunId;
use crate::core::SourceRule;
use crate::core::Step;
use crate::core::TestId;
use crate::core::Timestamp;
use crate::core::content_id;
use crate::core::next_revision;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised during plan generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Canonicalization failed while deriving identifiers.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Stable inputs hashed into the plan identifier.
#[derive(Serialize)]
struct PlanIdInput<'a> {
    /// Quote identifier.
    quote_id: &'a QuoteId,
    /// SOE run identifier, when a run was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    soe_run_id: Option<&'a SoeRunId>,
}

/// Generates a version-1 draft plan from a quote and an optional SOE run.
///
/// `existing_revisions` lists revision letters already issued for the quote;
/// the new plan receives the next letter.
///
/// # Errors
///
/// Returns [`GenerateError`] when identifier derivation fails.
pub fn generate_plan(
    quote: &Quote,
    soe_run: Option<&SoeRun>,
    existing_revisions: &[String],
    generated_at: Timestamp,
) -> Result<DatumPlan, GenerateError> {
    let mut steps = baseline_steps(quote);

    let mut tests: Vec<PlanTest> = Vec::new();
    let mut evidence_intent: Vec<EvidenceIntent> = Vec::new();
    let mut soe_decision_ids: Vec<DecisionId> = Vec::new();

    if let Some(run) = soe_run {
        apply_step_decisions(run, &mut steps);
        tests = derive_tests(run)?;
        evidence_intent = derive_evidence_intent(run)?;
        soe_decision_ids = run.decisions.iter().map(|decision| decision.id.clone()).collect();
        soe_decision_ids.sort();
    }

    steps.sort_by_key(|step| step.sequence);
    finalize_step_ids(&mut steps)?;

    let plan_id_input = PlanIdInput {
        quote_id: &quote.quote_id,
        soe_run_id: soe_run.map(|run| &run.soe_run_id),
    };
    let plan_id = PlanId::new(format!("plan_{}", content_id(&plan_id_input)?));

    Ok(DatumPlan {
        plan_id,
        quote_id: quote.quote_id.clone(),
        version: 1,
        parent_version: None,
        plan_revision: next_revision(existing_revisions),
        state: PlanState::Draft,
        locked: false,
        tier: quote.tier,
        steps,
        tests,
        evidence_intent,
        soe_run_id: soe_run.map(|run| run.soe_run_id.clone()),
        soe_decision_ids,
        notes: None,
        edit_metadata: Vec::new(),
        approved_by: None,
        approved_at: None,
        created_at: generated_at,
        updated_at: generated_at,
    })
}

// ============================================================================
// SECTION: Baseline Steps
// ============================================================================

/// Baseline source rule tagged onto default steps.
fn baseline_rule() -> SourceRule {
    SourceRule {
        rule_id: RuleId::new(BASELINE_RULE_ID),
        justification: "Default manufacturing step required by baseline process".to_string(),
    }
}

/// Appends one baseline step with the next sequence number.
fn push_baseline_step(
    steps: &mut Vec<Step>,
    step_type: &str,
    title: &str,
    parameters: Option<Map<String, Value>>,
    acceptance: Option<Acceptance>,
) {
    let sequence = u32::try_from(steps.len()).unwrap_or(u32::MAX).saturating_add(1);
    steps.push(Step {
        step_id: crate::core::StepId::new(String::new()),
        step_type: step_type.to_string(),
        title: title.to_string(),
        sequence,
        required: true,
        locked_sequence: false,
        parameters,
        acceptance,
        source_rules: vec![baseline_rule()],
        soe_decision_id: None,
        soe_why: None,
    });
}

/// Builds the package-agnostic baseline fabrication/assembly sequence.
fn baseline_steps(quote: &Quote) -> Vec<Step> {
    let mut steps: Vec<Step> = Vec::new();

    push_baseline_step(
        &mut steps,
        "FAB",
        "PCB Fabrication",
        None,
        Some(Acceptance {
            criteria: "IPC-A-600 Class 3".to_string(),
            sampling: Some("100_PERCENT".to_string()),
        }),
    );

    let sides = if quote.assembly_sides.is_empty() {
        vec![Side::Top]
    } else {
        quote.assembly_sides.clone()
    };
    for side in sides {
        let (label, value) = match side {
            Side::Top => ("Top-side", "TOP"),
            Side::Bottom => ("Bottom-side", "BOTTOM"),
        };
        let mut parameters = Map::new();
        parameters.insert("side".to_string(), Value::String(value.to_string()));
        push_baseline_step(
            &mut steps,
            "SMT",
            &format!("{label} SMT"),
            Some(parameters.clone()),
            Some(Acceptance {
                criteria: "IPC-A-610 Class 3".to_string(),
                sampling: Some("100_PERCENT".to_string()),
            }),
        );
        push_baseline_step(&mut steps, "REFLOW", &format!("{label} Reflow"), Some(parameters), None);
    }

    push_baseline_step(
        &mut steps,
        "INSPECT",
        "Final Inspection",
        None,
        Some(Acceptance {
            criteria: "Visual inspection per IPC-A-610".to_string(),
            sampling: Some("100_PERCENT".to_string()),
        }),
    );
    push_baseline_step(&mut steps, "PACK", "Packaging", None, None);

    steps
}

// ============================================================================
// SECTION: SOE Step Integration
// ============================================================================

/// Canonical step type for an SOE object identifier.
fn canonical_step_type(object_id: &str) -> &str {
    match object_id {
        "TVAC" | "VIBRATION" | "SHOCK" | "XRAY" => "TEST",
        other => other,
    }
}

/// Title-cases an object identifier (`CONFORMAL_COAT` -> `Conformal Coat`).
fn title_case(object_id: &str) -> String {
    object_id
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the SOE justification text for a decision.
fn soe_justification(decision: &Decision) -> String {
    if decision.why.citations.is_empty() {
        format!("SOE: {}", decision.why.rule_id)
    } else {
        format!("SOE: {}", decision.why.citations.join(", "))
    }
}

/// Returns the payload sequence hint of a step decision, when present.
fn sequence_hint(decision: &Decision) -> Option<u32> {
    match &decision.payload {
        Some(ActionPayload::Step {
            sequence,
            ..
        }) => *sequence,
        _ => None,
    }
}

/// Merges or appends SOE step decisions into the step list.
///
/// Decisions are processed in ascending decision-id order, except that
/// decisions carrying a payload sequence hint form a contiguous block per
/// rule, ordered by hint and anchored at the block's lowest-id member. This
/// keeps mandated sub-sequences (clean, bake, polymer, cure, inspect) in
/// their declared order regardless of hash values.
fn apply_step_decisions(run: &SoeRun, steps: &mut Vec<Step>) {
    let mut step_decisions: Vec<&Decision> = run
        .decisions
        .iter()
        .filter(|decision| {
            matches!(decision.action, ActionKind::InsertStep | ActionKind::Require)
                && decision.object_type == ObjectType::ProcessStep
        })
        .collect();
    step_decisions.sort_by(|a, b| a.id.cmp(&b.id));

    let mut ordered: Vec<(&Decision, bool)> = Vec::with_capacity(step_decisions.len());
    let mut placed: Vec<DecisionId> = Vec::new();
    for decision in &step_decisions {
        if placed.contains(&decision.id) {
            continue;
        }
        if sequence_hint(decision).is_some() {
            let mut block: Vec<&Decision> = step_decisions
                .iter()
                .copied()
                .filter(|candidate| {
                    candidate.why.rule_id == decision.why.rule_id
                        && sequence_hint(candidate).is_some()
                        && !placed.contains(&candidate.id)
                })
                .collect();
            block.sort_by_key(|candidate| sequence_hint(candidate).unwrap_or(u32::MAX));
            for member in block {
                placed.push(member.id.clone());
                ordered.push((member, true));
            }
        } else {
            placed.push(decision.id.clone());
            ordered.push((decision, false));
        }
    }

    let mut next_sequence = steps.iter().map(|step| step.sequence).max().unwrap_or(0);
    for (decision, in_block) in ordered {
        let step_type = canonical_step_type(&decision.object_id).to_string();
        let locked = decision.enforcement == Some(Enforcement::BlockRelease)
            || matches!(
                &decision.payload,
                Some(ActionPayload::Step {
                    lock_sequence: true,
                    ..
                })
            );

        // Block members always append so the mandated sub-sequence stays
        // contiguous; only free-standing decisions merge into existing steps.
        let merge_index = if in_block {
            None
        } else {
            steps.iter().position(|step| {
                step.step_type == step_type
                    || step.title.to_ascii_uppercase() == decision.object_id.to_ascii_uppercase()
            })
        };
        if let Some(index) = merge_index {
            let existing = &mut steps[index];
            existing.required = true;
            if locked {
                existing.locked_sequence = true;
            }
            existing.soe_decision_id = Some(decision.id.clone());
            existing.soe_why = Some(decision.why.clone());
            let source = SourceRule {
                rule_id: decision.why.rule_id.clone(),
                justification: soe_justification(decision),
            };
            if !existing.source_rules.contains(&source) {
                existing.source_rules.push(source);
            }
            continue;
        }

        let (title, parameters, acceptance) = match &decision.payload {
            Some(ActionPayload::Step {
                title,
                parameters,
                acceptance,
                ..
            }) => (title.clone(), parameters.clone(), acceptance.clone()),
            _ => (None, None, None),
        };
        let title = title.unwrap_or_else(|| title_case(&decision.object_id));
        let acceptance = acceptance.or_else(|| {
            matches!(step_type.as_str(), "INSPECT" | "TEST").then(|| Acceptance {
                criteria: format!(
                    "SOE requirement: {}",
                    if decision.why.citations.is_empty() {
                        decision.why.rule_id.to_string()
                    } else {
                        decision.why.citations.join(", ")
                    }
                ),
                sampling: Some("100_PERCENT".to_string()),
            })
        });

        next_sequence += 1;
        steps.push(Step {
            step_id: crate::core::StepId::new(String::new()),
            step_type,
            title,
            sequence: next_sequence,
            required: true,
            locked_sequence: locked,
            parameters,
            acceptance,
            source_rules: vec![SourceRule {
                rule_id: decision.why.rule_id.clone(),
                justification: soe_justification(decision),
            }],
            soe_decision_id: Some(decision.id.clone()),
            soe_why: Some(decision.why.clone()),
        });
    }
}

/// Recomputes content-addressed step identifiers after assembly.
fn finalize_step_ids(steps: &mut [Step]) -> Result<(), HashError> {
    for step in steps {
        step.step_id = Step::derive_id(
            &step.step_type,
            &step.title,
            step.sequence,
            step.parameters.as_ref(),
            &step.source_rules,
            step.soe_decision_id.as_ref(),
        )?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Test and Evidence Intent
// ============================================================================

/// Stable inputs hashed into a test identifier.
#[derive(Serialize)]
struct TestIdInput<'a> {
    /// Test type.
    test_type: &'a str,
    /// Emitting decision.
    soe_decision_id: &'a DecisionId,
}

/// Derives declared tests from SOE test decisions, preserving run order.
fn derive_tests(run: &SoeRun) -> Result<Vec<PlanTest>, GenerateError> {
    let mut tests = Vec::new();
    for decision in &run.decisions {
        if decision.object_type != ObjectType::Test
            || !matches!(decision.action, ActionKind::Require | ActionKind::InsertStep)
        {
            continue;
        }
        let (title, acceptance_criteria) = match &decision.payload {
            Some(ActionPayload::Test {
                title,
                acceptance_criteria,
            }) => (title.clone(), acceptance_criteria.clone()),
            _ => (None, None),
        };
        let test_id = TestId::new(content_id(&TestIdInput {
            test_type: &decision.object_id,
            soe_decision_id: &decision.id,
        })?);
        tests.push(PlanTest {
            test_id,
            test_type: decision.object_id.clone(),
            title: title.unwrap_or_else(|| title_case(&decision.object_id)),
            required: true,
            acceptance_criteria: acceptance_criteria.or_else(|| {
                Some(format!(
                    "SOE requirement: {}",
                    if decision.why.citations.is_empty() {
                        decision.why.rule_id.to_string()
                    } else {
                        decision.why.citations.join(", ")
                    }
                ))
            }),
            soe_decision_id: Some(decision.id.clone()),
            soe_why: Some(decision.why.clone()),
        });
    }
    Ok(tests)
}

/// Stable inputs hashed into an evidence identifier.
#[derive(Serialize)]
struct EvidenceIdInput<'a> {
    /// Evidence type.
    evidence_type: &'a str,
    /// Target object identifier.
    object_id: &'a str,
}

/// Derives evidence intent from the run's evidence requirements.
fn derive_evidence_intent(run: &SoeRun) -> Result<Vec<EvidenceIntent>, GenerateError> {
    let mut intent = Vec::new();
    for requirement in &run.required_evidence {
        let evidence_id = EvidenceId::new(content_id(&EvidenceIdInput {
            evidence_type: &requirement.evidence_type,
            object_id: &requirement.object_id,
        })?);
        let soe_why = run.decision(&requirement.decision_id).map(|decision| decision.why.clone());
        intent.push(EvidenceIntent {
            evidence_id,
            evidence_type: requirement.evidence_type.clone(),
            applies_to: requirement.applies_to.clone(),
            object_id: requirement.object_id.clone(),
            retention: requirement.retention.clone(),
            soe_decision_id: Some(requirement.decision_id.clone()),
            soe_why,
        });
    }
    Ok(intent)
}
