// crates/datumplan-api/tests/routes.rs
// ============================================================================
// Module: API Route Tests
// Description: Tests for auth gating, the happy path, and error mapping.
// ============================================================================
//! ## Overview
//! Drives the router end to end with in-memory state: authentication and
//! role gating, SOE evaluation through plan approval and export, and the
//! uniform error body for contract violations.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use datumplan_api::AppState;
use datumplan_api::ServerConfig;
use datumplan_api::router;
use datumplan_core::IndustryId;
use datumplan_core::IndustryProfile;
use datumplan_core::PackId;
use http_body_util::BodyExt;
use serde_json::Value;
use serde_json::json;
use tower::ServiceExt;

// ============================================================================
// SECTION: Harness
// ============================================================================

const OPS_TOKEN: &str = "ops-secret";
const CUSTOMER_TOKEN: &str = "customer-secret";

fn test_config() -> ServerConfig {
    ServerConfig::from_toml(
        r#"
bind_addr = "127.0.0.1:0"

[[tokens]]
token = "ops-secret"
actor = "ops-1"
roles = ["OPS"]

[[tokens]]
token = "customer-secret"
actor = "cust-1"
roles = ["CUSTOMER"]
"#,
    )
    .unwrap()
}

/// Builds a router over state seeded with the space polymerics fixtures.
fn test_router() -> Router {
    let state = AppState::new(&test_config());

    state
        .catalog
        .catalog
        .put_industry(IndustryProfile {
            industry_id: IndustryId::new("space"),
            default_packs: vec![PackId::new("NASA_POLYMERICS")],
            risk_posture: Some("maximum".to_string()),
            traceability_depth: Some("full".to_string()),
            evidence_retention: Some("LIFE_OF_PROGRAM".to_string()),
        })
        .unwrap();
    state
        .catalog
        .catalog
        .put_pack(
            serde_json::from_value(json!({
                "pack_id": "NASA_POLYMERICS",
                "industry": "space",
                "rules": [{
                    "rule_id": "NASA_POLYMERICS_BONDING",
                    "summary": "Polymeric applications require the qualified bonding sequence",
                    "citations": ["NASA-STD-8739.1 5.2"],
                    "applies": {"industry_profiles": ["space"], "hardware_classes": ["flight"]},
                    "trigger": {"field": "materials", "op": "contains", "value": "EPOXY_3M_SCOTCHWELD_2216"},
                    "actions": [
                        {"action": "INSERT_STEP", "object_type": "process_step", "object_id": "CLEAN",
                         "payload": {"kind": "step", "sequence": 1, "lock_sequence": true}},
                        {"action": "INSERT_STEP", "object_type": "process_step", "object_id": "BAKE",
                         "payload": {"kind": "step", "sequence": 2, "lock_sequence": true}}
                    ],
                    "enforcement": "BLOCK_RELEASE",
                    "severity": "critical"
                }]
            }))
            .unwrap(),
        )
        .unwrap();

    router(state)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

fn post(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn soe_request_body() -> Value {
    json!({
        "industry_profile": "space",
        "hardware_class": "flight",
        "inputs": {
            "materials": ["EPOXY_3M_SCOTCHWELD_2216"],
            "processes": ["SMT", "REFLOW", "CONFORMAL_COAT"]
        }
    })
}

// ============================================================================
// SECTION: Authentication
// ============================================================================

/// Tests requests without credentials are rejected.
#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let router = test_router();
    let (status, body) = send(&router, post("/soe/evaluate", None, soe_request_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

/// Tests customers cannot hit governance routes.
#[tokio::test]
async fn test_customer_cannot_edit_plans() {
    let router = test_router();
    let request = Request::builder()
        .method("PATCH")
        .uri("/plans/plan_x")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {CUSTOMER_TOKEN}"))
        .body(Body::from(json!({"edits": {}, "reason": "tweak"}).to_string()))
        .unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

// ============================================================================
// SECTION: Evaluate, Generate, Approve, Export
// ============================================================================

/// Drives evaluate -> generate -> submit -> approve -> export end to end.
#[tokio::test]
async fn test_plan_lifecycle_round_trip() {
    let router = test_router();

    let (status, run) =
        send(&router, post("/soe/evaluate", Some(CUSTOMER_TOKEN), soe_request_body())).await;
    assert_eq!(status, StatusCode::OK);
    let soe_run_id = run["soe_run_id"].as_str().unwrap().to_string();
    assert_eq!(run["decisions"].as_array().unwrap().len(), 2);

    let (status, plan) = send(
        &router,
        post(
            "/plans/generate",
            Some(CUSTOMER_TOKEN),
            json!({
                "quote": {"quote_id": "quote-001", "tier": 3, "assembly_sides": ["TOP"]},
                "soe_run_id": soe_run_id
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let plan_id = plan["plan_id"].as_str().unwrap().to_string();
    assert_eq!(plan["version"], 1);
    assert_eq!(plan["state"], "draft");

    // Draft plans cannot be exported.
    let export_uri = format!("/plans/{plan_id}/export/json");
    let request = Request::builder()
        .method("GET")
        .uri(&export_uri)
        .header("authorization", format!("Bearer {OPS_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EXPORT_REQUIRES_APPROVAL");

    let (status, _) = send(
        &router,
        post(&format!("/plans/{plan_id}/submit"), Some(OPS_TOKEN), json!({"reason": "ready"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, approved) = send(
        &router,
        post(&format!("/plans/{plan_id}/approve"), Some(OPS_TOKEN), json!({"reason": "go"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["state"], "approved");
    assert_eq!(approved["locked"], true);

    // Approved export succeeds with a content hash.
    let request = Request::builder()
        .method("GET")
        .uri(&export_uri)
        .header("authorization", format!("Bearer {OPS_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, export) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(export["content_hash"].as_str().unwrap().len(), 64);
    assert_eq!(export["provenance"]["plan_version"], 1);

    // Version listing reflects the single version.
    let request = Request::builder()
        .method("GET")
        .uri(format!("/plans/{plan_id}/versions"))
        .header("authorization", format!("Bearer {CUSTOMER_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, versions) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(versions, json!([1]));
}

/// Tests the report endpoint rejects non-html formats and renders html.
#[tokio::test]
async fn test_report_format_contract() {
    let router = test_router();

    let (_, run) =
        send(&router, post("/soe/evaluate", Some(CUSTOMER_TOKEN), soe_request_body())).await;
    let soe_run_id = run["soe_run_id"].as_str().unwrap().to_string();
    let (_, plan) = send(
        &router,
        post(
            "/plans/generate",
            Some(CUSTOMER_TOKEN),
            json!({
                "quote": {"quote_id": "quote-001", "tier": 1, "assembly_sides": ["TOP"]},
                "soe_run_id": soe_run_id
            }),
        ),
    )
    .await;
    let plan_id = plan["plan_id"].as_str().unwrap().to_string();
    send(&router, post(&format!("/plans/{plan_id}/submit"), Some(OPS_TOKEN), json!({}))).await;
    send(&router, post(&format!("/plans/{plan_id}/approve"), Some(OPS_TOKEN), json!({}))).await;

    let (status, body) = send(
        &router,
        post(
            &format!("/compliance/plans/{plan_id}/reports/generate?format=pdf"),
            Some(CUSTOMER_TOKEN),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNSUPPORTED_FORMAT");

    let request = post(
        &format!("/compliance/plans/{plan_id}/reports/generate?format=html"),
        Some(CUSTOMER_TOKEN),
        json!({}),
    );
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-report-hash"));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8_lossy(&bytes);
    assert!(html.contains("Compliance Audit Report"));

    // Audit integrity returns a structured report.
    let request = Request::builder()
        .method("GET")
        .uri(format!("/compliance/plans/{plan_id}/audit-integrity"))
        .header("authorization", format!("Bearer {CUSTOMER_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, report) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["overall"], "pass");
    assert!(report["findings"].as_array().unwrap().len() > 1);
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Tests configuration validation rejects empty tokens.
#[test]
fn test_config_rejects_empty_tokens() {
    let error = ServerConfig::from_toml(
        r#"
bind_addr = "127.0.0.1:0"

[[tokens]]
token = ""
actor = "ops-1"
roles = ["OPS"]
"#,
    )
    .unwrap_err();
    assert!(error.to_string().contains("token"));
}
