// crates/datumplan-core/src/runtime/export.rs
// ============================================================================
// Module: Datum Hardened Export
// Description: Approved-plan exports with provenance and content hashing.
// Purpose: Produce tamper-evident CSV, JSON, and placement exports.
// Dependencies: crate::{core, runtime::audit_check}, serde
// ============================================================================

//! ## Overview
//! Exports are available only for approved, locked plans. JSON exports embed
//! a provenance block (plan version, profile stack, approval identity, any
//! integrity findings) and a full SHA-256 `content_hash` computed over the
//! canonical content without the hash field. Exports that include execution
//! outputs are tier-gated. CSV and placement exports are plain-text tables
//! for downstream tooling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::ActorId;
use crate::core::DEFAULT_HASH_ALGORITHM;
use crate::core::DatumPlan;
use crate::core::DecisionId;
use crate::core::EvidenceIntent;
use crate::core::HashError;
use crate::core::PlanId;
use crate::core::PlanState;
use crate::core::PlanTest;
use crate::core::ProfileStackEntry;
use crate::core::QuoteId;
use crate::core::SoeRunId;
use crate::core::Step;
use crate::core::Timestamp;
use crate::core::canonical_json_bytes;
use crate::core::hash_bytes;
use crate::runtime::audit_check::IntegrityFinding;
use crate::runtime::editor::plan_state_label;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum tier required for exports that include execution outputs.
pub const EXECUTION_OUTPUT_MIN_TIER: u8 = 3;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by plan exports.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Exports require an approved, locked plan.
    #[error("plan {plan_id} is {state}; exports require an approved plan")]
    RequiresApproval {
        /// Plan identifier.
        plan_id: String,
        /// Current state label.
        state: String,
    },
    /// Execution outputs require a higher service tier.
    #[error("tier {actual} is below the minimum tier {required} for execution outputs")]
    TierInsufficient {
        /// Minimum tier required.
        required: u8,
        /// Plan tier.
        actual: u8,
    },
    /// Requested export format is not supported.
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
    /// Canonicalization failed while hashing content.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl ExportError {
    /// Returns the stable error code for the request boundary.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::RequiresApproval {
                ..
            } => "EXPORT_REQUIRES_APPROVAL",
            Self::TierInsufficient {
                ..
            } => "TIER_INSUFFICIENT",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::Hash(_) => "CANONICALIZATION_FAILED",
        }
    }
}

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Steps and tests as CSV tables.
    Csv,
    /// Hardened JSON export with provenance and content hash.
    Json,
    /// XYRS-style placement CSV.
    PlacementCsv,
}

impl ExportFormat {
    /// Parses a format label; unknown labels are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::UnsupportedFormat`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, ExportError> {
        match label {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "placement_csv" | "placement-csv" => Ok(Self::PlacementCsv),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Export Guard
// ============================================================================

/// Rejects plans that are not approved and locked.
fn ensure_exportable(plan: &DatumPlan) -> Result<(), ExportError> {
    if plan.state != PlanState::Approved || !plan.locked {
        return Err(ExportError::RequiresApproval {
            plan_id: plan.plan_id.to_string(),
            state: plan_state_label(plan.state).to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: JSON Export
// ============================================================================

/// Provenance block embedded in hardened JSON exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportProvenance {
    /// Exported plan version.
    pub plan_version: u32,
    /// Profile stack recorded on the SOE run.
    pub profile_stack: Vec<ProfileStackEntry>,
    /// Approver identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<ActorId>,
    /// Approval timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<Timestamp>,
    /// Export generation timestamp.
    pub export_generated_at: Timestamp,
    /// Integrity findings carried into the export (warnings survive export).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integrity_findings: Vec<IntegrityFinding>,
}

/// Content block covered by the export hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportContent {
    /// Plan identifier.
    pub plan_id: PlanId,
    /// Revision letter.
    pub plan_revision: String,
    /// Plan version.
    pub version: u32,
    /// Plan state label.
    pub state: String,
    /// Quote identifier.
    pub quote_id: QuoteId,
    /// Ordered steps.
    pub steps: Vec<Step>,
    /// Declared tests.
    pub tests: Vec<PlanTest>,
    /// Evidence intent.
    pub evidence_intent: Vec<EvidenceIntent>,
    /// SOE run reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soe_run_id: Option<SoeRunId>,
    /// SOE decision references.
    #[serde(default)]
    pub soe_decision_ids: Vec<DecisionId>,
    /// Execution outputs, present only for tier-qualified exports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_outputs: Option<Value>,
}

/// Hardened JSON export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonExport {
    /// Provenance metadata.
    pub provenance: ExportProvenance,
    /// Exported content.
    pub content: ExportContent,
    /// Full SHA-256 hex over the canonical content (hash excluded).
    pub content_hash: String,
}

/// Builds the hardened JSON export for an approved plan.
///
/// `execution_outputs` is caller-supplied machine data; including it requires
/// `tier >= 3`. `integrity_findings` lets callers carry audit findings into
/// the export provenance.
///
/// # Errors
///
/// Returns [`ExportError::RequiresApproval`] or
/// [`ExportError::TierInsufficient`].
pub fn export_json(
    plan: &DatumPlan,
    profile_stack: &[ProfileStackEntry],
    execution_outputs: Option<Value>,
    integrity_findings: &[IntegrityFinding],
    exported_at: Timestamp,
) -> Result<JsonExport, ExportError> {
    ensure_exportable(plan)?;
    if execution_outputs.is_some() && plan.tier < EXECUTION_OUTPUT_MIN_TIER {
        return Err(ExportError::TierInsufficient {
            required: EXECUTION_OUTPUT_MIN_TIER,
            actual: plan.tier,
        });
    }

    let content = ExportContent {
        plan_id: plan.plan_id.clone(),
        plan_revision: plan.plan_revision.clone(),
        version: plan.version,
        state: plan_state_label(plan.state).to_string(),
        quote_id: plan.quote_id.clone(),
        steps: plan.steps.clone(),
        tests: plan.tests.clone(),
        evidence_intent: plan.evidence_intent.clone(),
        soe_run_id: plan.soe_run_id.clone(),
        soe_decision_ids: plan.soe_decision_ids.clone(),
        execution_outputs,
    };

    let content_bytes = canonical_json_bytes(&content)?;
    let content_hash = hash_bytes(DEFAULT_HASH_ALGORITHM, &content_bytes).value;

    Ok(JsonExport {
        provenance: ExportProvenance {
            plan_version: plan.version,
            profile_stack: profile_stack.to_vec(),
            approved_by: plan.approved_by.clone(),
            approved_at: plan.approved_at,
            export_generated_at: exported_at,
            integrity_findings: integrity_findings.to_vec(),
        },
        content,
        content_hash,
    })
}

// ============================================================================
// SECTION: CSV Export
// ============================================================================

/// Escapes a CSV field, quoting when needed.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Writes one CSV row.
fn csv_row(fields: &[String]) -> String {
    fields.iter().map(|field| csv_field(field)).collect::<Vec<_>>().join(",") + "\n"
}

/// Exports plan steps and tests as CSV tables.
///
/// # Errors
///
/// Returns [`ExportError::RequiresApproval`] for unapproved plans.
pub fn export_csv(plan: &DatumPlan) -> Result<String, ExportError> {
    ensure_exportable(plan)?;

    let mut out = String::new();
    out.push_str(&csv_row(&[
        "Plan Export".to_string(),
        plan.plan_id.to_string(),
        plan.plan_revision.clone(),
        plan.version.to_string(),
    ]));
    out.push('\n');

    out.push_str("Steps\n");
    out.push_str(&csv_row(&[
        "Sequence".to_string(),
        "Type".to_string(),
        "Title".to_string(),
        "Required".to_string(),
        "Locked".to_string(),
        "SOE Decision ID".to_string(),
    ]));
    let mut steps: Vec<&Step> = plan.steps.iter().collect();
    steps.sort_by_key(|step| step.sequence);
    for step in steps {
        out.push_str(&csv_row(&[
            step.sequence.to_string(),
            step.step_type.clone(),
            step.title.clone(),
            step.required.to_string(),
            step.locked_sequence.to_string(),
            step.soe_decision_id.as_ref().map(ToString::to_string).unwrap_or_default(),
        ]));
    }
    out.push('\n');

    out.push_str("Tests\n");
    out.push_str(&csv_row(&[
        "Test Type".to_string(),
        "Title".to_string(),
        "Required".to_string(),
        "SOE Decision ID".to_string(),
    ]));
    for test in &plan.tests {
        out.push_str(&csv_row(&[
            test.test_type.clone(),
            test.title.clone(),
            test.required.to_string(),
            test.soe_decision_id.as_ref().map(ToString::to_string).unwrap_or_default(),
        ]));
    }

    Ok(out)
}

// ============================================================================
// SECTION: Placement Export
// ============================================================================

/// Machine placement row supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Reference designator.
    pub refdes: String,
    /// X position in millimeters.
    pub x_mm: f64,
    /// Y position in millimeters.
    pub y_mm: f64,
    /// Rotation in degrees.
    pub rotation_deg: f64,
    /// Board side.
    pub side: String,
}

/// Exports placement data as an XYRS-style CSV.
///
/// # Errors
///
/// Returns [`ExportError::RequiresApproval`] for unapproved plans.
pub fn export_placement_csv(
    plan: &DatumPlan,
    placements: &[Placement],
) -> Result<String, ExportError> {
    ensure_exportable(plan)?;

    let mut out = String::new();
    out.push_str("# XYRS Placement File\n");
    out.push_str(&format!("# Generated from plan {}\n", plan.plan_id));
    out.push_str("RefDes,X,Y,Rotation,Side\n");
    for placement in placements {
        out.push_str(&csv_row(&[
            placement.refdes.clone(),
            placement.x_mm.to_string(),
            placement.y_mm.to_string(),
            placement.rotation_deg.to_string(),
            placement.side.clone(),
        ]));
    }
    Ok(out)
}
