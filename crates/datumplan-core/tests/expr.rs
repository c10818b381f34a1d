// crates/datumplan-core/tests/expr.rs
// ============================================================================
// Module: Rule Expression Tests
// Description: Tests for trigger evaluation semantics.
// ============================================================================
//! ## Overview
//! Validates leaf operators, composite semantics, missing-field behavior,
//! and numeric coercion of the trigger evaluator.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use datumplan_core::CompareOp;
use datumplan_core::Comparison;
use datumplan_core::EvalContext;
use datumplan_core::RuleExpr;
use datumplan_core::eval_expr;
use serde_json::Value;
use serde_json::json;

fn context() -> EvalContext {
    let mut context = EvalContext::new();
    context.insert("industry_profile", json!("space"));
    context.insert("layer_count", json!(8));
    context.insert("thickness_mm", json!(1.6));
    context.insert("materials", json!(["EPOXY_3M_SCOTCHWELD_2216", "SAC305"]));
    context.insert("board", json!({"finish": "ENIG", "metrics": {"area_cm2": 120}}));
    context
}

fn leaf(field: &str, op: CompareOp, value: Value) -> RuleExpr {
    RuleExpr::Compare(Comparison {
        field: field.to_string(),
        op,
        value: Some(value),
    })
}

fn leaf_no_value(field: &str, op: CompareOp) -> RuleExpr {
    RuleExpr::Compare(Comparison {
        field: field.to_string(),
        op,
        value: None,
    })
}

// ============================================================================
// SECTION: Leaf Operators
// ============================================================================

/// Tests equals and not_equals against scalars.
#[test]
fn test_equals_and_not_equals() {
    let context = context();
    assert!(eval_expr(&leaf("industry_profile", CompareOp::Equals, json!("space")), &context));
    assert!(!eval_expr(&leaf("industry_profile", CompareOp::Equals, json!("medical")), &context));
    assert!(eval_expr(&leaf("industry_profile", CompareOp::NotEquals, json!("medical")), &context));
}

/// Tests contains over arrays and strings.
#[test]
fn test_contains_arrays_and_strings() {
    let context = context();
    assert!(eval_expr(
        &leaf("materials", CompareOp::Contains, json!("EPOXY_3M_SCOTCHWELD_2216")),
        &context
    ));
    assert!(!eval_expr(&leaf("materials", CompareOp::Contains, json!("PTFE")), &context));
    assert!(eval_expr(&leaf("industry_profile", CompareOp::Contains, json!("pac")), &context));
    assert!(eval_expr(&leaf("materials", CompareOp::NotContains, json!("PTFE")), &context));
    // Non-container fields never contain anything.
    assert!(!eval_expr(&leaf("layer_count", CompareOp::Contains, json!(8)), &context));
}

/// Tests numeric comparisons with integer/float coercion.
#[test]
fn test_numeric_comparisons_coerce() {
    let context = context();
    assert!(eval_expr(&leaf("layer_count", CompareOp::Gt, json!(4)), &context));
    assert!(eval_expr(&leaf("layer_count", CompareOp::Gte, json!(8)), &context));
    assert!(eval_expr(&leaf("layer_count", CompareOp::Lt, json!(8.5)), &context));
    assert!(eval_expr(&leaf("thickness_mm", CompareOp::Lte, json!(2)), &context));
    // Incompatible types yield false, never an error.
    assert!(!eval_expr(&leaf("industry_profile", CompareOp::Gt, json!(1)), &context));
    assert!(!eval_expr(&leaf("layer_count", CompareOp::Gt, json!("four")), &context));
}

/// Tests set membership operators.
#[test]
fn test_in_and_not_in() {
    let context = context();
    assert!(eval_expr(
        &leaf("industry_profile", CompareOp::In, json!(["space", "aerospace"])),
        &context
    ));
    assert!(eval_expr(&leaf("industry_profile", CompareOp::NotIn, json!(["medical"])), &context));
    // A non-list expected value never matches `in`.
    assert!(!eval_expr(&leaf("industry_profile", CompareOp::In, json!("space")), &context));
}

/// Tests dotted-path resolution into nested maps.
#[test]
fn test_dotted_path_resolution() {
    let context = context();
    assert!(eval_expr(&leaf("board.finish", CompareOp::Equals, json!("ENIG")), &context));
    assert!(eval_expr(&leaf("board.metrics.area_cm2", CompareOp::Gt, json!(100)), &context));
    assert!(!eval_expr(&leaf("board.metrics.missing", CompareOp::Equals, json!(1)), &context));
}

// ============================================================================
// SECTION: Existence
// ============================================================================

/// Tests exists and not_exists over present, missing, and null fields.
#[test]
fn test_exists_semantics() {
    let mut context = context();
    context.insert("nullable", Value::Null);
    context.insert("empty_list", json!([]));

    assert!(eval_expr(&leaf_no_value("materials", CompareOp::Exists), &context));
    assert!(eval_expr(&leaf_no_value("empty_list", CompareOp::Exists), &context));
    assert!(!eval_expr(&leaf_no_value("missing_field", CompareOp::Exists), &context));
    assert!(!eval_expr(&leaf_no_value("nullable", CompareOp::Exists), &context));
    assert!(eval_expr(&leaf_no_value("missing_field", CompareOp::NotExists), &context));
}

/// Tests that value operators fail closed on missing fields.
#[test]
fn test_missing_fields_fail_closed() {
    let context = context();
    assert!(!eval_expr(&leaf("missing", CompareOp::Equals, json!(1)), &context));
    assert!(!eval_expr(&leaf("missing", CompareOp::Gt, json!(1)), &context));
    assert!(!eval_expr(&leaf("missing", CompareOp::Contains, json!("x")), &context));
    // Negated operators succeed on missing fields.
    assert!(eval_expr(&leaf("missing", CompareOp::NotEquals, json!(1)), &context));
    assert!(eval_expr(&leaf("missing", CompareOp::NotIn, json!([1, 2])), &context));
}

// ============================================================================
// SECTION: Composites
// ============================================================================

/// Tests empty composite semantics: empty all matches, empty any does not.
#[test]
fn test_empty_composites() {
    let context = context();
    assert!(eval_expr(
        &RuleExpr::All {
            all: Vec::new()
        },
        &context
    ));
    assert!(!eval_expr(
        &RuleExpr::Any {
            any: Vec::new()
        },
        &context
    ));
    assert!(eval_expr(
        &RuleExpr::NoneOf {
            none: Vec::new()
        },
        &context
    ));
}

/// Tests nested composite evaluation.
#[test]
fn test_nested_composites() {
    let context = context();
    let expr = RuleExpr::All {
        all: vec![
            leaf("industry_profile", CompareOp::Equals, json!("space")),
            RuleExpr::Any {
                any: vec![
                    leaf("materials", CompareOp::Contains, json!("PTFE")),
                    leaf("layer_count", CompareOp::Gte, json!(8)),
                ],
            },
            RuleExpr::NoneOf {
                none: vec![leaf("board.finish", CompareOp::Equals, json!("HASL"))],
            },
        ],
    };
    assert!(eval_expr(&expr, &context));
}

/// Tests that the wire shape round-trips through serde.
#[test]
fn test_expression_wire_shape() {
    let raw = json!({
        "all": [
            {"field": "materials", "op": "contains", "value": "SAC305"},
            {"any": [
                {"field": "hardware_class", "op": "not_exists"},
                {"field": "layer_count", "op": "gt", "value": 4}
            ]}
        ]
    });
    let expr: RuleExpr = serde_json::from_value(raw).unwrap();
    assert!(eval_expr(&expr, &context()));
}
