// crates/datumplan-api/src/routes.rs
// ============================================================================
// Module: Datum API Routes
// Description: HTTP handlers for SOE, plans, compliance, and profiles.
// Purpose: Expose the deterministic core behind a role-gated HTTP contract.
// Dependencies: axum, datumplan-core, crate::{error, state}
// ============================================================================

//! ## Overview
//! Every route authenticates a bearer token, checks the required role for
//! mutating operations, and delegates to the deterministic core. Handlers
//! are thin: they resolve stores, inject the request-boundary timestamp, and
//! map structured core errors into the uniform error body.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::patch;
use axum::routing::post;
use datumplan_core::AuditEntityKind;
use datumplan_core::AuditEvent;
use datumplan_core::AuditLog;
use datumplan_core::AuditResult;
use datumplan_core::DatumPlan;
use datumplan_core::PlanId;
use datumplan_core::PlanStore;
use datumplan_core::ProfileBundle;
use datumplan_core::ProfileId;
use datumplan_core::ProfileState;
use datumplan_core::ProfileStore;
use datumplan_core::Quote;
use datumplan_core::Role;
use datumplan_core::SoeRequest;
use datumplan_core::SoeRun;
use datumplan_core::SoeRunId;
use datumplan_core::SoeRunStore;
use datumplan_core::StandardsProfile;
use datumplan_core::runtime;
use datumplan_core::runtime::ExportFormat;
use datumplan_core::runtime::Objective;
use datumplan_core::runtime::OverrideRequest;
use datumplan_core::runtime::PlanEdits;
use datumplan_core::runtime::ReportFormat;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;
use crate::state::Identity;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the API router over the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/soe/evaluate", post(soe_evaluate))
        .route("/plans/generate", post(plans_generate))
        .route("/plans/{id}", patch(plans_edit))
        .route("/plans/{id}/submit", post(plans_submit))
        .route("/plans/{id}/approve", post(plans_approve))
        .route("/plans/{id}/reject", post(plans_reject))
        .route("/plans/{id}/optimize", post(plans_optimize))
        .route("/plans/{id}/versions", get(plans_versions))
        .route("/plans/{id}/diff", get(plans_diff))
        .route("/plans/{id}/export/{format}", get(plans_export))
        .route("/compliance/plans/{id}/reports/generate", post(compliance_report))
        .route("/compliance/plans/{id}/audit-integrity", get(audit_integrity))
        .route("/profiles", post(profiles_create))
        .route("/profiles/{id}/submit", post(profiles_submit))
        .route("/profiles/{id}/approve", post(profiles_approve))
        .route("/profiles/{id}/reject", post(profiles_reject))
        .route("/profiles/{id}/deprecate", post(profiles_deprecate))
        .route("/profiles/{id}/versions", get(profiles_versions).post(profiles_create_version))
        .route("/profiles/bundles", post(profiles_create_bundle))
        .with_state(state)
}

// ============================================================================
// SECTION: Authentication
// ============================================================================

/// Resolves the bearer token into an identity.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(ApiError::unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or_else(ApiError::unauthorized)?;
    state.identity_for(token).ok_or_else(ApiError::unauthorized)
}

/// Requires one of the given roles.
fn require_role(identity: &Identity, roles: &[Role]) -> Result<(), ApiError> {
    if identity.has_any(roles) { Ok(()) } else { Err(ApiError::forbidden()) }
}

const GOVERNANCE_ROLES: &[Role] = &[Role::Ops, Role::Admin];

// ============================================================================
// SECTION: SOE Routes
// ============================================================================

/// POST /soe/evaluate — run SOE over the given context.
async fn soe_evaluate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SoeRequest>,
) -> Result<Json<SoeRun>, ApiError> {
    authenticate(&state, &headers)?;
    let run = runtime::evaluate(&state.catalog, &request)?;
    state.runs.save(&run)?;
    Ok(Json(run))
}

// ============================================================================
// SECTION: Plan Routes
// ============================================================================

/// Request body for plan generation.
#[derive(Debug, Deserialize)]
struct GeneratePlanRequest {
    /// Quote to plan for.
    quote: Quote,
    /// SOE run to derive from, when one was evaluated.
    #[serde(default)]
    soe_run_id: Option<SoeRunId>,
    /// Revision letters already issued for this quote.
    #[serde(default)]
    existing_revisions: Vec<String>,
}

/// POST /plans/generate — create a version-1 draft plan.
async fn plans_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GeneratePlanRequest>,
) -> Result<Json<DatumPlan>, ApiError> {
    let identity = authenticate(&state, &headers)?;

    let run = match &request.soe_run_id {
        Some(soe_run_id) => Some(
            state
                .runs
                .load(soe_run_id)?
                .ok_or_else(|| ApiError::not_found("soe run"))?,
        ),
        None => None,
    };

    let at = state.now();
    let plan =
        runtime::generate_plan(&request.quote, run.as_ref(), &request.existing_revisions, at)?;
    state.plans.create_version(&plan)?;
    state.audit.append(&AuditEvent {
        timestamp: at,
        actor: identity.actor.clone(),
        role: identity.governing_role(),
        entity_kind: AuditEntityKind::DatumPlan,
        entity_id: plan.plan_id.to_string(),
        action: "generate".to_string(),
        from_state: "absent".to_string(),
        to_state: "draft".to_string(),
        result: AuditResult::Applied,
        reason: None,
    })?;
    Ok(Json(plan))
}

/// Request body for plan edits.
#[derive(Debug, Deserialize)]
struct EditPlanRequest {
    /// Sections to replace.
    edits: PlanEdits,
    /// Reason for the edit.
    reason: String,
    /// Overrides covering constrained changes.
    #[serde(default)]
    overrides: Vec<OverrideRequest>,
}

/// PATCH /plans/{id} — write a new version with edits.
async fn plans_edit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
    Json(request): Json<EditPlanRequest>,
) -> Result<Json<DatumPlan>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;

    let plan = runtime::edit_plan(
        &state.plans,
        &state.audit,
        &PlanId::new(plan_id),
        &request.edits,
        &identity.actor,
        identity.governing_role(),
        &request.reason,
        &request.overrides,
        state.now(),
    )?;
    Ok(Json(plan))
}

/// Request body for state transitions.
#[derive(Debug, Default, Deserialize)]
struct TransitionRequest {
    /// Reason for the transition.
    #[serde(default)]
    reason: Option<String>,
}

/// POST /plans/{id}/submit — draft to submitted.
async fn plans_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<DatumPlan>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;
    let plan = runtime::submit_plan(
        &state.plans,
        &state.audit,
        &PlanId::new(plan_id),
        &identity.actor,
        identity.governing_role(),
        request.reason.as_deref().unwrap_or(""),
        state.now(),
    )?;
    Ok(Json(plan))
}

/// POST /plans/{id}/approve — submitted to approved, locking the version.
async fn plans_approve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<DatumPlan>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;
    let plan = runtime::approve_plan(
        &state.plans,
        &state.audit,
        &PlanId::new(plan_id),
        &identity.actor,
        identity.governing_role(),
        request.reason.as_deref().unwrap_or(""),
        state.now(),
    )?;
    Ok(Json(plan))
}

/// POST /plans/{id}/reject — submitted back to draft.
async fn plans_reject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<DatumPlan>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;
    let plan = runtime::reject_plan(
        &state.plans,
        &state.audit,
        &PlanId::new(plan_id),
        &identity.actor,
        identity.governing_role(),
        request.reason.as_deref().unwrap_or(""),
        state.now(),
    )?;
    Ok(Json(plan))
}

/// Request body for optimization.
#[derive(Debug, Deserialize)]
struct OptimizeRequest {
    /// Optimization objective.
    objective: Objective,
}

/// POST /plans/{id}/optimize — new version with unlocked steps reordered.
async fn plans_optimize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
    Json(request): Json<OptimizeRequest>,
) -> Result<Json<DatumPlan>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;
    let plan = runtime::optimize_plan(
        &state.plans,
        &state.audit,
        &PlanId::new(plan_id),
        request.objective,
        &identity.actor,
        identity.governing_role(),
        state.now(),
    )?;
    Ok(Json(plan))
}

/// GET /plans/{id}/versions — list version numbers.
async fn plans_versions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
) -> Result<Json<Vec<u32>>, ApiError> {
    authenticate(&state, &headers)?;
    let versions = state.plans.versions(&PlanId::new(plan_id))?;
    if versions.is_empty() {
        return Err(ApiError::not_found("plan"));
    }
    Ok(Json(versions))
}

/// Query for structured diffs.
#[derive(Debug, Deserialize)]
struct DiffQuery {
    /// Older version.
    a: u32,
    /// Newer version.
    b: u32,
}

/// GET /plans/{id}/diff?a=&b= — structured diff between versions.
async fn plans_diff(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
    Query(query): Query<DiffQuery>,
) -> Result<Json<runtime::PlanDiff>, ApiError> {
    authenticate(&state, &headers)?;
    let plan_id = PlanId::new(plan_id);
    let older = state
        .plans
        .load(&plan_id, query.a)?
        .ok_or_else(|| ApiError::not_found("plan version"))?;
    let newer = state
        .plans
        .load(&plan_id, query.b)?
        .ok_or_else(|| ApiError::not_found("plan version"))?;
    Ok(Json(runtime::diff_plans(&older, &newer)))
}

/// GET /plans/{id}/export/{format} — hardened export of an approved plan.
async fn plans_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((plan_id, format)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;

    let format = ExportFormat::parse(&format)?;
    let plan_id = PlanId::new(plan_id);
    let plan = state.plans.latest(&plan_id)?.ok_or_else(|| ApiError::not_found("plan"))?;
    let run = load_plan_run(&state, &plan)?;
    let profile_stack = run.as_ref().map(|run| run.profile_stack.clone()).unwrap_or_default();

    match format {
        ExportFormat::Json => {
            let integrity = integrity_for(&state, &plan, run.as_ref())?;
            let export = runtime::export_json(
                &plan,
                &profile_stack,
                None,
                &integrity.warnings(),
                state.now(),
            )?;
            Ok(Json(export).into_response())
        }
        ExportFormat::Csv => {
            let csv = runtime::export_csv(&plan)?;
            Ok(([(header::CONTENT_TYPE, "text/csv")], csv).into_response())
        }
        ExportFormat::PlacementCsv => {
            let csv = runtime::export_placement_csv(&plan, &[])?;
            Ok(([(header::CONTENT_TYPE, "text/csv")], csv).into_response())
        }
    }
}

// ============================================================================
// SECTION: Compliance Routes
// ============================================================================

/// Query for report generation.
#[derive(Debug, Default, Deserialize)]
struct ReportQuery {
    /// Output format; only `html` is supported.
    #[serde(default)]
    format: Option<String>,
}

/// POST /compliance/plans/{id}/reports/generate?format=html — hashed report.
async fn compliance_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let identity = authenticate(&state, &headers)?;

    let format = ReportFormat::parse(query.format.as_deref().unwrap_or("html"))?;
    let plan_id = PlanId::new(plan_id);
    let plan = state.plans.latest(&plan_id)?.ok_or_else(|| ApiError::not_found("plan"))?;
    let run = load_plan_run(&state, &plan)?;
    let events = state.audit.events(plan_id.as_str())?;

    let report =
        runtime::build_report(&plan, run.as_ref(), &events, state.now(), &identity.actor)?;
    let html = runtime::render_report(&report, format)?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::HeaderName::from_static("x-report-hash"), report.report_hash),
        ],
        html,
    )
        .into_response())
}

/// GET /compliance/plans/{id}/audit-integrity — structured integrity report.
async fn audit_integrity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
) -> Result<Json<runtime::IntegrityReport>, ApiError> {
    authenticate(&state, &headers)?;
    let plan_id = PlanId::new(plan_id);
    let plan = state.plans.latest(&plan_id)?.ok_or_else(|| ApiError::not_found("plan"))?;
    let run = load_plan_run(&state, &plan)?;
    let report = integrity_for(&state, &plan, run.as_ref())?;
    Ok(Json(report))
}

/// Loads the SOE run referenced by a plan, when resolvable.
fn load_plan_run(state: &AppState, plan: &DatumPlan) -> Result<Option<SoeRun>, ApiError> {
    match &plan.soe_run_id {
        Some(soe_run_id) => Ok(state.runs.load(soe_run_id)?),
        None => Ok(None),
    }
}

/// Runs the audit integrity check with current profile states.
fn integrity_for(
    state: &AppState,
    plan: &DatumPlan,
    run: Option<&SoeRun>,
) -> Result<runtime::IntegrityReport, ApiError> {
    let mut states: BTreeMap<ProfileId, ProfileState> = BTreeMap::new();
    if let Some(run) = run {
        for entry in &run.profile_stack {
            if let Some(profile) = state.catalog.profiles.latest(&entry.profile_id)? {
                states.insert(entry.profile_id.clone(), profile.state);
            }
        }
    }
    Ok(runtime::check_audit_integrity(plan, run, &states))
}

// ============================================================================
// SECTION: Profile Routes
// ============================================================================

/// POST /profiles — create a new draft profile.
async fn profiles_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut profile): Json<StandardsProfile>,
) -> Result<Json<StandardsProfile>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;

    if runtime::parse_semver(&profile.version).is_none() {
        return Err(ApiError::bad_request(format!(
            "profile version {} is not X.Y.Z",
            profile.version
        )));
    }
    profile.state = ProfileState::Draft;
    state.catalog.profiles.create_version(&profile)?;
    state.audit.append(&AuditEvent {
        timestamp: state.now(),
        actor: identity.actor.clone(),
        role: identity.governing_role(),
        entity_kind: AuditEntityKind::StandardsProfile,
        entity_id: profile.profile_id.to_string(),
        action: "create".to_string(),
        from_state: "absent".to_string(),
        to_state: "draft".to_string(),
        result: AuditResult::Applied,
        reason: None,
    })?;
    Ok(Json(profile))
}

/// Request body for profile transitions.
#[derive(Debug, Default, Deserialize)]
struct ProfileTransitionRequest {
    /// Reason for the transition.
    #[serde(default)]
    reason: Option<String>,
    /// Successor profile recorded on deprecation.
    #[serde(default)]
    superseded_by: Option<ProfileId>,
}

/// POST /profiles/{id}/submit — draft to submitted.
async fn profiles_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(profile_id): Path<String>,
    Json(request): Json<ProfileTransitionRequest>,
) -> Result<Json<StandardsProfile>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;
    let profile = runtime::submit_profile(
        &state.catalog.profiles,
        &state.audit,
        &ProfileId::new(profile_id),
        &identity.actor,
        identity.governing_role(),
        request.reason.as_deref().unwrap_or(""),
        state.now(),
    )?;
    Ok(Json(profile))
}

/// POST /profiles/{id}/approve — submitted to approved.
async fn profiles_approve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(profile_id): Path<String>,
    Json(request): Json<ProfileTransitionRequest>,
) -> Result<Json<StandardsProfile>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;
    let profile = runtime::approve_profile(
        &state.catalog.profiles,
        &state.audit,
        &ProfileId::new(profile_id),
        &identity.actor,
        identity.governing_role(),
        request.reason.as_deref().unwrap_or(""),
        state.now(),
    )?;
    Ok(Json(profile))
}

/// POST /profiles/{id}/reject — submitted to rejected.
async fn profiles_reject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(profile_id): Path<String>,
    Json(request): Json<ProfileTransitionRequest>,
) -> Result<Json<StandardsProfile>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;
    let profile = runtime::reject_profile(
        &state.catalog.profiles,
        &state.audit,
        &ProfileId::new(profile_id),
        &identity.actor,
        identity.governing_role(),
        request.reason.as_deref().unwrap_or(""),
        state.now(),
    )?;
    Ok(Json(profile))
}

/// POST /profiles/{id}/deprecate — approved to deprecated.
async fn profiles_deprecate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(profile_id): Path<String>,
    Json(request): Json<ProfileTransitionRequest>,
) -> Result<Json<StandardsProfile>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;
    let profile = runtime::deprecate_profile(
        &state.catalog.profiles,
        &state.audit,
        &ProfileId::new(profile_id),
        &identity.actor,
        identity.governing_role(),
        request.reason.as_deref().unwrap_or(""),
        request.superseded_by.as_ref(),
        state.now(),
    )?;
    Ok(Json(profile))
}

/// GET /profiles/{id}/versions — version history.
async fn profiles_versions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(profile_id): Path<String>,
) -> Result<Json<Vec<runtime::ProfileVersionInfo>>, ApiError> {
    authenticate(&state, &headers)?;
    let history =
        runtime::list_profile_versions(&state.catalog.profiles, &ProfileId::new(profile_id))?;
    if history.is_empty() {
        return Err(ApiError::not_found("profile"));
    }
    Ok(Json(history))
}

/// Request body for version creation.
#[derive(Debug, Deserialize)]
struct CreateVersionRequest {
    /// New semver version string.
    version: String,
}

/// POST /profiles/{id}/versions — clone the latest version as a new draft.
async fn profiles_create_version(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(profile_id): Path<String>,
    Json(request): Json<CreateVersionRequest>,
) -> Result<Json<StandardsProfile>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;
    let profile = runtime::create_profile_version(
        &state.catalog.profiles,
        &state.audit,
        &ProfileId::new(profile_id),
        &request.version,
        &identity.actor,
        identity.governing_role(),
        state.now(),
    )?;
    Ok(Json(profile))
}

/// POST /profiles/bundles — create a named bundle of profile ids.
async fn profiles_create_bundle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(bundle): Json<ProfileBundle>,
) -> Result<Json<ProfileBundle>, ApiError> {
    let identity = authenticate(&state, &headers)?;
    require_role(&identity, GOVERNANCE_ROLES)?;
    runtime::create_bundle(
        &state.catalog.profiles,
        &state.audit,
        &bundle,
        &identity.actor,
        identity.governing_role(),
        state.now(),
    )?;
    Ok(Json(bundle))
}

