// crates/datumplan-core/src/runtime/report.rs
// ============================================================================
// Module: Datum Compliance Report
// Description: Auditor-facing compliance report assembly and HTML rendering.
// Purpose: Render hashed, nine-section compliance reports for approved plans.
// Dependencies: crate::{core, runtime::trace}, serde
// ============================================================================

//! ## Overview
//! Compliance reports assemble the plan, its compliance trace, and its audit
//! trail into a fixed nine-section body, hash the canonical body bytes, and
//! render HTML. Assembly and rendering are pure functions: the hash covers
//! the entire body (excluding only itself) and is stable across renders.
//! Reports refuse plans that are not approved, and `html` is the only
//! supported output format.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::ActorId;
use crate::core::AuditEvent;
use crate::core::DEFAULT_HASH_ALGORITHM;
use crate::core::DatumPlan;
use crate::core::EvidenceIntent;
use crate::core::HashError;
use crate::core::PlanId;
use crate::core::PlanState;
use crate::core::ProfileStackEntry;
use crate::core::QuoteId;
use crate::core::SoeRun;
use crate::core::SoeRunId;
use crate::core::Timestamp;
use crate::core::canonical_json_bytes;
use crate::core::hash_bytes;
use crate::runtime::editor::plan_state_label;
use crate::runtime::trace::ComplianceTrace;
use crate::runtime::trace::trace_plan;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Report schema version recorded in the audit metadata section.
pub const REPORT_VERSION: &str = "1.0.0";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Reports render only from approved plans.
    #[error("plan {plan_id} is {state}; compliance reports require an approved plan")]
    RequiresApproval {
        /// Plan identifier.
        plan_id: String,
        /// Current state label.
        state: String,
    },
    /// Requested output format is not supported.
    #[error("unsupported report format: {0}")]
    UnsupportedFormat(String),
    /// Canonicalization failed while hashing the body.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl ReportError {
    /// Returns the stable error code for the request boundary.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::RequiresApproval {
                ..
            } => "REPORT_REQUIRES_APPROVAL",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::Hash(_) => "CANONICALIZATION_FAILED",
        }
    }
}

// ============================================================================
// SECTION: Formats
// ============================================================================

/// Supported report output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Self-contained HTML document.
    Html,
}

impl ReportFormat {
    /// Parses a format label; anything but `html` is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::UnsupportedFormat`] for unknown labels.
    pub fn parse(label: &str) -> Result<Self, ReportError> {
        match label {
            "html" => Ok(Self::Html),
            other => Err(ReportError::UnsupportedFormat(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Report Body
// ============================================================================

/// Executive summary section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    /// Plan identifier.
    pub plan_id: PlanId,
    /// Plan version.
    pub plan_version: u32,
    /// Plan state label.
    pub status: String,
    /// Total step count.
    pub total_steps: usize,
    /// Total test count.
    pub total_tests: usize,
    /// Total evidence count.
    pub total_evidence: usize,
    /// Profile stack size.
    pub profile_count: usize,
    /// Recorded override count.
    pub override_count: usize,
    /// Whether any deviations exist.
    pub has_deviations: bool,
}

/// Report scope section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeSection {
    /// Plan identifier.
    pub plan_id: PlanId,
    /// Plan version.
    pub plan_version: u32,
    /// Quote identifier.
    pub quote_id: QuoteId,
    /// SOE run identifier, when recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soe_run_id: Option<SoeRunId>,
    /// Active profile stack.
    pub profile_stack: Vec<ProfileStackEntry>,
}

/// One row of the standards coverage matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageRow {
    /// Item classification.
    pub entity_type: String,
    /// Item identifier.
    pub entity_id: String,
    /// Display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Governing rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Governing pack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_id: Option<String>,
    /// Clause citations.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
    /// Attributed profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    /// Attributed layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<u8>,
    /// Governing decision id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<String>,
}

/// Standards coverage section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSection {
    /// Coverage matrix rows.
    pub rows: Vec<CoverageRow>,
    /// Distinct packs covered by the plan.
    pub packs_covered: Vec<String>,
}

/// One recorded deviation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviationRow {
    /// Constraint key that was overridden.
    pub constraint: String,
    /// Recorded justification.
    pub reason: String,
    /// Actor who recorded the override.
    pub user_id: String,
    /// When the override was recorded.
    pub timestamp: Timestamp,
}

/// Deviations and overrides section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviationsSection {
    /// Number of recorded overrides.
    pub override_count: usize,
    /// Recorded overrides across the edit history.
    pub overrides: Vec<DeviationRow>,
    /// Conflicts resolved by layered profile policies during SOE evaluation.
    pub conflict_overrides: Vec<crate::core::ConflictOverride>,
    /// Whether any deviations exist.
    pub has_deviations: bool,
}

/// Approvals trail section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalsSection {
    /// Audit events for the plan in append order.
    pub events: Vec<AuditEvent>,
}

/// Profile stack section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileStackSection {
    /// Active profiles.
    pub profiles: Vec<ProfileStackEntry>,
    /// Profile count.
    pub profile_count: usize,
}

/// Evidence requirements section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceSection {
    /// Evidence items.
    pub items: Vec<EvidenceIntent>,
    /// Evidence count.
    pub evidence_count: usize,
}

/// Audit metadata section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditMetadataSection {
    /// Report schema version.
    pub report_version: String,
    /// Plan identifier.
    pub plan_id: PlanId,
    /// Plan version.
    pub plan_version: u32,
    /// Generation timestamp.
    pub generated_at: Timestamp,
    /// Generating actor.
    pub generated_by: ActorId,
}

/// Canonical nine-section report body; `report_hash` covers these bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportBody {
    /// 1. Executive summary.
    pub executive_summary: ExecutiveSummary,
    /// 2. Scope.
    pub scope: ScopeSection,
    /// 3. Standards coverage matrix.
    pub standards_coverage: CoverageSection,
    /// 4. Compliance traceability.
    pub compliance_traceability: ComplianceTrace,
    /// 5. Deviations and overrides.
    pub deviations_overrides: DeviationsSection,
    /// 6. Approvals trail.
    pub approvals_trail: ApprovalsSection,
    /// 7. Profile stack.
    pub profile_stack: ProfileStackSection,
    /// 8. Evidence requirements.
    pub evidence_requirements: EvidenceSection,
    /// 9. Audit metadata.
    pub audit_metadata: AuditMetadataSection,
}

/// Assembled compliance report with its body hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReport {
    /// Plan identifier.
    pub plan_id: PlanId,
    /// Plan version.
    pub plan_version: u32,
    /// Nine-section body.
    pub body: ReportBody,
    /// Full SHA-256 hex over the canonical body bytes.
    pub report_hash: String,
    /// Generation timestamp.
    pub generated_at: Timestamp,
    /// Generating actor.
    pub generated_by: ActorId,
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Assembles the compliance report for an approved plan.
///
/// # Errors
///
/// Returns [`ReportError::RequiresApproval`] when the plan is not approved.
pub fn build_report(
    plan: &DatumPlan,
    soe_run: Option<&SoeRun>,
    audit_events: &[AuditEvent],
    generated_at: Timestamp,
    generated_by: &ActorId,
) -> Result<ComplianceReport, ReportError> {
    if plan.state != PlanState::Approved {
        return Err(ReportError::RequiresApproval {
            plan_id: plan.plan_id.to_string(),
            state: plan_state_label(plan.state).to_string(),
        });
    }

    let trace = trace_plan(plan, soe_run);

    let overrides: Vec<DeviationRow> = plan
        .edit_metadata
        .iter()
        .flat_map(|entry| entry.overrides.iter())
        .map(|record| DeviationRow {
            constraint: record.constraint.clone(),
            reason: record.reason.clone(),
            user_id: record.user_id.to_string(),
            timestamp: record.timestamp,
        })
        .collect();

    let rows: Vec<CoverageRow> = trace
        .steps
        .iter()
        .chain(trace.tests.iter())
        .chain(trace.evidence.iter())
        .map(|item| CoverageRow {
            entity_type: item.entity_type.to_string(),
            entity_id: item.entity_id.clone(),
            title: item.title.clone(),
            rule_id: item.trace.rule_id.as_ref().map(ToString::to_string),
            pack_id: item.trace.pack_id.as_ref().map(ToString::to_string),
            citations: item.trace.citations.clone(),
            profile_id: item
                .trace
                .profile_source
                .as_ref()
                .map(|source| source.profile_id.to_string()),
            layer: item.trace.profile_source.as_ref().map(|source| source.layer),
            decision_id: item.trace.decision_id.as_ref().map(ToString::to_string),
        })
        .collect();
    let mut packs_covered: Vec<String> =
        rows.iter().filter_map(|row| row.pack_id.clone()).collect();
    packs_covered.sort();
    packs_covered.dedup();

    let conflict_overrides =
        soe_run.map(|run| run.conflict_overrides.clone()).unwrap_or_default();
    let has_deviations = !overrides.is_empty() || !conflict_overrides.is_empty();

    let body = ReportBody {
        executive_summary: ExecutiveSummary {
            plan_id: plan.plan_id.clone(),
            plan_version: plan.version,
            status: plan_state_label(plan.state).to_string(),
            total_steps: plan.steps.len(),
            total_tests: plan.tests.len(),
            total_evidence: plan.evidence_intent.len(),
            profile_count: trace.profile_stack.len(),
            override_count: overrides.len(),
            has_deviations,
        },
        scope: ScopeSection {
            plan_id: plan.plan_id.clone(),
            plan_version: plan.version,
            quote_id: plan.quote_id.clone(),
            soe_run_id: plan.soe_run_id.clone(),
            profile_stack: trace.profile_stack.clone(),
        },
        standards_coverage: CoverageSection {
            rows,
            packs_covered,
        },
        compliance_traceability: trace.clone(),
        deviations_overrides: DeviationsSection {
            override_count: overrides.len(),
            has_deviations,
            overrides,
            conflict_overrides,
        },
        approvals_trail: ApprovalsSection {
            events: audit_events.to_vec(),
        },
        profile_stack: ProfileStackSection {
            profile_count: trace.profile_stack.len(),
            profiles: trace.profile_stack,
        },
        evidence_requirements: EvidenceSection {
            items: plan.evidence_intent.clone(),
            evidence_count: plan.evidence_intent.len(),
        },
        audit_metadata: AuditMetadataSection {
            report_version: REPORT_VERSION.to_string(),
            plan_id: plan.plan_id.clone(),
            plan_version: plan.version,
            generated_at,
            generated_by: generated_by.clone(),
        },
    };

    let body_bytes = canonical_json_bytes(&body)?;
    let report_hash = hash_bytes(DEFAULT_HASH_ALGORITHM, &body_bytes).value;

    Ok(ComplianceReport {
        plan_id: plan.plan_id.clone(),
        plan_version: plan.version,
        body,
        report_hash,
        generated_at,
        generated_by: generated_by.clone(),
    })
}

// ============================================================================
// SECTION: HTML Rendering
// ============================================================================

/// Renders a report into the requested format.
///
/// # Errors
///
/// Never fails for [`ReportFormat::Html`]; the format type admits nothing
/// else.
pub fn render_report(report: &ComplianceReport, format: ReportFormat) -> Result<String, ReportError> {
    match format {
        ReportFormat::Html => Ok(render_html(report)),
    }
}

/// Escapes a value for safe HTML interpolation.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Returns the wire label for a conflict policy.
const fn conflict_policy_label(policy: crate::core::ConflictPolicy) -> &'static str {
    match policy {
        crate::core::ConflictPolicy::Error => "ERROR",
        crate::core::ConflictPolicy::ParentWins => "PARENT_WINS",
        crate::core::ConflictPolicy::ChildWins => "CHILD_WINS",
    }
}

/// Formats a timestamp for display.
fn format_timestamp(timestamp: Timestamp) -> String {
    match timestamp {
        Timestamp::UnixMillis(millis) => format!("{millis} ms"),
        Timestamp::Logical(tick) => format!("t+{tick}"),
    }
}

/// Renders the report body as a self-contained HTML document.
fn render_html(report: &ComplianceReport) -> String {
    let body = &report.body;
    let mut html = String::with_capacity(16 * 1024);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str(&format!(
        "<title>Compliance Report - {}</title>\n",
        escape(report.plan_id.as_str())
    ));
    html.push_str(
        "<style>\nbody { font-family: Arial, sans-serif; margin: 20px; }\n\
         table { width: 100%; border-collapse: collapse; margin: 15px 0; }\n\
         th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }\n\
         th { background-color: #2c3e50; color: white; }\n\
         .hash { font-family: monospace; font-size: 0.85em; }\n\
         .override { background: #f8d7da; padding: 10px; margin: 10px 0; }\n\
         </style>\n</head>\n<body>\n",
    );

    html.push_str("<h1>Compliance Audit Report</h1>\n");
    html.push_str(&format!(
        "<p><strong>Plan:</strong> {} v{}<br><strong>Report Hash:</strong> \
         <span class=\"hash\">{}</span></p>\n",
        escape(report.plan_id.as_str()),
        report.plan_version,
        escape(&report.report_hash)
    ));

    let summary = &body.executive_summary;
    html.push_str("<h2>1. Executive Summary</h2>\n<table>\n<tr><th>Metric</th><th>Value</th></tr>\n");
    for (metric, value) in [
        ("Status", summary.status.clone()),
        ("Total Steps", summary.total_steps.to_string()),
        ("Total Tests", summary.total_tests.to_string()),
        ("Total Evidence Items", summary.total_evidence.to_string()),
        ("Profile Stack Count", summary.profile_count.to_string()),
        ("Override Count", summary.override_count.to_string()),
        ("Has Deviations", if summary.has_deviations { "Yes" } else { "No" }.to_string()),
    ] {
        html.push_str(&format!("<tr><td>{metric}</td><td>{}</td></tr>\n", escape(&value)));
    }
    html.push_str("</table>\n");

    html.push_str("<h2>2. Scope</h2>\n<table>\n<tr><th>Field</th><th>Value</th></tr>\n");
    html.push_str(&format!(
        "<tr><td>Quote ID</td><td>{}</td></tr>\n",
        escape(body.scope.quote_id.as_str())
    ));
    html.push_str(&format!(
        "<tr><td>SOE Run ID</td><td>{}</td></tr>\n",
        escape(body.scope.soe_run_id.as_ref().map_or("-", |id| id.as_str()))
    ));
    html.push_str("</table>\n");

    html.push_str(
        "<h2>3. Standards Coverage</h2>\n<table>\n<tr><th>Entity</th><th>Title</th>\
         <th>Rule</th><th>Pack</th><th>Citations</th><th>Profile</th><th>Decision</th></tr>\n",
    );
    for row in &body.standards_coverage.rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&row.entity_type),
            escape(row.title.as_deref().unwrap_or("-")),
            escape(row.rule_id.as_deref().unwrap_or("-")),
            escape(row.pack_id.as_deref().unwrap_or("-")),
            escape(&row.citations.join(", ")),
            escape(row.profile_id.as_deref().unwrap_or("-")),
            escape(row.decision_id.as_deref().unwrap_or("-")),
        ));
    }
    html.push_str("</table>\n");

    html.push_str(
        "<h2>4. Compliance Traceability</h2>\n<table>\n<tr><th>Step</th><th>Type</th>\
         <th>Rule</th><th>Decision</th><th>Layer</th></tr>\n",
    );
    for item in &body.compliance_traceability.steps {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(item.title.as_deref().unwrap_or(&item.entity_id)),
            escape(&item.entity_detail),
            escape(&item.trace.rule_id.as_ref().map_or_else(|| "-".to_string(), ToString::to_string)),
            escape(
                &item.trace.decision_id.as_ref().map_or_else(|| "-".to_string(), ToString::to_string)
            ),
            escape(
                &item
                    .trace
                    .profile_source
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |source| source.layer.to_string())
            ),
        ));
    }
    html.push_str("</table>\n");

    html.push_str("<h2>5. Deviations &amp; Overrides</h2>\n");
    if !body.deviations_overrides.has_deviations {
        html.push_str("<p>No deviations recorded.</p>\n");
    } else {
        for deviation in &body.deviations_overrides.overrides {
            html.push_str(&format!(
                "<div class=\"override\"><strong>{}</strong>: {} ({}, {})</div>\n",
                escape(&deviation.constraint),
                escape(&deviation.reason),
                escape(&deviation.user_id),
                escape(&format_timestamp(deviation.timestamp)),
            ));
        }
        for conflict in &body.deviations_overrides.conflict_overrides {
            html.push_str(&format!(
                "<div class=\"override\"><strong>conflict:{}</strong> kept {} over {} under {} \
                 (profile {})</div>\n",
                escape(&conflict.object_id),
                escape(conflict.kept_decision.as_str()),
                escape(conflict.dropped_decision.as_str()),
                conflict_policy_label(conflict.policy),
                escape(conflict.governing_profile.as_str()),
            ));
        }
    }

    html.push_str(
        "<h2>6. Approvals Trail</h2>\n<table>\n<tr><th>Action</th><th>Actor</th>\
         <th>From</th><th>To</th><th>Result</th><th>Reason</th></tr>\n",
    );
    for event in &body.approvals_trail.events {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&event.action),
            escape(event.actor.as_str()),
            escape(&event.from_state),
            escape(&event.to_state),
            event.result.as_str(),
            escape(event.reason.as_deref().unwrap_or("-")),
        ));
    }
    html.push_str("</table>\n");

    html.push_str(
        "<h2>7. Profile Stack</h2>\n<table>\n<tr><th>Profile</th><th>Type</th><th>Layer</th></tr>\n",
    );
    for profile in &body.profile_stack.profiles {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(profile.profile_id.as_str()),
            profile.profile_type.as_str(),
            profile.layer,
        ));
    }
    html.push_str("</table>\n");

    html.push_str(
        "<h2>8. Evidence Requirements</h2>\n<table>\n<tr><th>Type</th><th>Applies To</th>\
         <th>Retention</th><th>Decision</th></tr>\n",
    );
    for item in &body.evidence_requirements.items {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(&item.evidence_type),
            escape(&item.applies_to),
            escape(&item.retention),
            escape(item.soe_decision_id.as_ref().map_or("-", |id| id.as_str())),
        ));
    }
    html.push_str("</table>\n");

    let metadata = &body.audit_metadata;
    html.push_str(&format!(
        "<h2>9. Audit Metadata</h2>\n<p>Report version {} generated at {} by {}.<br>\
         Body hash: <span class=\"hash\">{}</span></p>\n",
        escape(&metadata.report_version),
        escape(&format_timestamp(metadata.generated_at)),
        escape(metadata.generated_by.as_str()),
        escape(&report.report_hash),
    ));

    html.push_str("</body>\n</html>\n");
    html
}
