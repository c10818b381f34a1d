// crates/datumplan-core/src/core/pack.rs
// ============================================================================
// Module: Datum Standards Packs
// Description: Standards pack and rule specifications with validation helpers.
// Purpose: Define the canonical rule catalog evaluated by the SOE engine.
// Dependencies: crate::core::{expr, identifiers}, serde
// ============================================================================

//! ## Overview
//! A standards pack is an ordered collection of rules citing a specific
//! external standard. Rules pair an applicability guard and a trigger
//! expression with one or more declared actions; each matched action becomes
//! one content-addressed decision. Packs are immutable once published and are
//! validated at load time for unique rule identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::expr::RuleExpr;
use crate::core::identifiers::GateId;
use crate::core::identifiers::IndustryId;
use crate::core::identifiers::PackId;
use crate::core::identifiers::RuleId;

// ============================================================================
// SECTION: Pack Specification
// ============================================================================

/// Canonical standards pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardsPack {
    /// Pack identifier.
    pub pack_id: PackId,
    /// Industry the pack belongs to.
    pub industry: IndustryId,
    /// Human-readable pack name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Rules in declaration order.
    pub rules: Vec<Rule>,
}

impl StandardsPack {
    /// Validates pack invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PackError`] when validation fails.
    pub fn validate(&self) -> Result<(), PackError> {
        if self.pack_id.as_str().trim().is_empty() {
            return Err(PackError::EmptyPackId);
        }
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.rule_id.as_str().trim().is_empty() {
                return Err(PackError::EmptyRuleId(self.pack_id.to_string()));
            }
            if self.rules.iter().skip(index + 1).any(|other| other.rule_id == rule.rule_id) {
                return Err(PackError::DuplicateRuleId(rule.rule_id.to_string()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Rule Specification
// ============================================================================

/// A single rule within a standards pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier, unique within the catalog.
    pub rule_id: RuleId,
    /// Human-readable summary used in why strings.
    pub summary: String,
    /// Clause citations into the source standard.
    #[serde(default)]
    pub citations: Vec<String>,
    /// Applicability guard checked before the trigger.
    #[serde(default)]
    pub applies: Applicability,
    /// Trigger expression; an absent trigger always matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<RuleExpr>,
    /// Actions emitted when the rule fires, in declaration order.
    pub actions: Vec<RuleAction>,
    /// Enforcement applied to emitted decisions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement: Option<Enforcement>,
    /// Rule severity for reporting.
    #[serde(default)]
    pub severity: Severity,
}

/// Applicability guard limiting a rule to industries and hardware classes.
///
/// # Invariants
/// - `industry_profiles` must contain the run's industry; an empty list
///   admits nothing.
/// - An empty `hardware_classes` list applies to every hardware class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicability {
    /// Industries the rule applies to.
    #[serde(default)]
    pub industry_profiles: Vec<IndustryId>,
    /// Hardware classes the rule applies to.
    #[serde(default)]
    pub hardware_classes: Vec<String>,
}

impl Applicability {
    /// Returns true when the guard admits the given industry and hardware class.
    #[must_use]
    pub fn admits(&self, industry: &IndustryId, hardware_class: Option<&str>) -> bool {
        if !self.industry_profiles.contains(industry) {
            return false;
        }
        if let Some(class) = hardware_class
            && !self.hardware_classes.is_empty()
            && !self.hardware_classes.iter().any(|candidate| candidate == class)
        {
            return false;
        }
        true
    }
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Closed set of actions a rule may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Require the target object.
    Require,
    /// Recommend the target object without requiring it.
    Optional,
    /// Prohibit the target object.
    Prohibit,
    /// Insert a process step into the plan.
    InsertStep,
    /// Escalate to a named authority.
    Escalate,
    /// Set an evidence retention policy.
    SetRetention,
    /// Add a cost modifier to the quote.
    AddCostModifier,
    /// Add a release gate.
    AddGate,
}

impl ActionKind {
    /// Returns the stable wire label for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Require => "REQUIRE",
            Self::Optional => "OPTIONAL",
            Self::Prohibit => "PROHIBIT",
            Self::InsertStep => "INSERT_STEP",
            Self::Escalate => "ESCALATE",
            Self::SetRetention => "SET_RETENTION",
            Self::AddCostModifier => "ADD_COST_MODIFIER",
            Self::AddGate => "ADD_GATE",
        }
    }
}

/// Target object classification for actions and decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    /// Manufacturing process step.
    ProcessStep,
    /// Declared test.
    Test,
    /// Retained evidence item.
    Evidence,
    /// Release gate.
    Gate,
    /// Cost modifier.
    CostModifier,
    /// Whole-plan target.
    Plan,
}

/// Declared action within a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    /// Action kind.
    pub action: ActionKind,
    /// Target object classification.
    pub object_type: ObjectType,
    /// Target object identifier (step type, test type, evidence type, ...).
    pub object_id: String,
    /// Action payload, tagged by shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ActionPayload>,
}

/// Tagged per-action payload.
///
/// Payload shapes are closed records so decision hashing stays stable under
/// refactoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    /// Payload for step insertion and step requirements.
    Step {
        /// Display title; derived from the object id when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Position hint within the emitting rule's locked block.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sequence: Option<u32>,
        /// Whether the step participates in a locked sequence.
        #[serde(default)]
        lock_sequence: bool,
        /// Step parameters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parameters: Option<Map<String, Value>>,
        /// Acceptance criteria.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        acceptance: Option<Acceptance>,
    },
    /// Payload for test requirements.
    Test {
        /// Display title; derived from the object id when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Acceptance criteria text.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        acceptance_criteria: Option<String>,
    },
    /// Payload for evidence requirements.
    Evidence {
        /// What the evidence applies to (material, process, lot, ...).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        applies_to: Option<String>,
        /// Retention period identifier.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retention: Option<String>,
    },
    /// Payload for retention policy assignment.
    Retention {
        /// Retention period identifier.
        retention: String,
        /// What the retention applies to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        applies_to: Option<String>,
    },
    /// Payload for cost modifiers.
    CostModifier {
        /// Modifier type.
        modifier_type: ModifierType,
        /// Modifier value (percent or fixed amount).
        value: f64,
    },
    /// Payload for added release gates.
    Gate {
        /// Gate identifier.
        gate_id: GateId,
    },
    /// Payload for escalations.
    Escalation {
        /// Authority the escalation is routed to.
        escalate_to: String,
    },
}

/// Cost modifier type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierType {
    /// Percentage modifier on the quote total.
    Percent,
    /// Fixed amount modifier.
    Fixed,
}

/// Acceptance criteria for a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceptance {
    /// Acceptance criteria text.
    pub criteria: String,
    /// Sampling plan identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<String>,
}

// ============================================================================
// SECTION: Enforcement and Severity
// ============================================================================

/// Enforcement level attached to decisions emitted by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Enforcement {
    /// Block release until satisfied.
    BlockRelease,
    /// Surface a warning without blocking.
    Warn,
    /// Informational only.
    None,
}

/// Rule severity classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational.
    Info,
    /// Minor finding.
    #[default]
    Minor,
    /// Major finding.
    Major,
    /// Critical finding.
    Critical,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Standards pack validation errors.
#[derive(Debug, Error)]
pub enum PackError {
    /// Pack identifier is empty.
    #[error("standards pack identifier must not be empty")]
    EmptyPackId,
    /// A rule identifier is empty.
    #[error("pack {0} contains a rule with an empty identifier")]
    EmptyRuleId(String),
    /// Duplicate rule identifiers detected.
    #[error("duplicate rule identifier: {0}")]
    DuplicateRuleId(String),
}
