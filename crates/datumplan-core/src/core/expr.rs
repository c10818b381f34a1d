// crates/datumplan-core/src/core/expr.rs
// ============================================================================
// Module: Datum Rule Expressions
// Description: Recursive trigger expressions evaluated against a flat context.
// Purpose: Provide deterministic, total rule-trigger evaluation for the SOE.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Rule triggers are recursive boolean expressions over a JSON context map.
//! Leaves compare a dotted-path field against an expected value; composites
//! combine sub-expressions with `all`, `any`, or `none`. Evaluation is total:
//! missing fields and incompatible types yield `false` (or `true` for the
//! negated operators), never an error. No I/O, clock, or randomness is
//! involved, so identical inputs always produce identical outcomes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Evaluation Context
// ============================================================================

/// Flat evaluation context keyed by dotted field paths.
///
/// # Invariants
/// - Nested objects are addressed with `.`-separated path segments.
/// - A `null` value is indistinguishable from an absent field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvalContext {
    /// Backing value map.
    values: Map<String, Value>,
}

impl EvalContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context from an existing value map.
    #[must_use]
    pub const fn from_map(values: Map<String, Value>) -> Self {
        Self {
            values,
        }
    }

    /// Inserts a value under a top-level key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Resolves a dotted field path to a defined, non-null value.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.values.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        if current.is_null() { None } else { Some(current) }
    }
}

// ============================================================================
// SECTION: Expression Types
// ============================================================================

/// Comparison operator applied at expression leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// Field equals the expected value.
    Equals,
    /// Field differs from the expected value.
    NotEquals,
    /// Field (array or string) contains the expected value.
    Contains,
    /// Field (array or string) does not contain the expected value.
    NotContains,
    /// Field is numerically greater than the expected value.
    Gt,
    /// Field is numerically greater than or equal to the expected value.
    Gte,
    /// Field is numerically less than the expected value.
    Lt,
    /// Field is numerically less than or equal to the expected value.
    Lte,
    /// Field is a member of the expected list.
    In,
    /// Field is not a member of the expected list.
    NotIn,
    /// Field resolves to a defined value.
    Exists,
    /// Field does not resolve to a defined value.
    NotExists,
}

/// Leaf comparison against a context field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Dotted path into the evaluation context.
    pub field: String,
    /// Comparison operator.
    pub op: CompareOp,
    /// Expected value; unused by `exists`/`not_exists`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Recursive trigger expression.
///
/// # Invariants
/// - `all` over an empty list matches; `any` over an empty list does not.
/// - `none` is the negation of `any`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleExpr {
    /// Conjunction of sub-expressions.
    All {
        /// Sub-expressions that must all match.
        all: Vec<RuleExpr>,
    },
    /// Disjunction of sub-expressions.
    Any {
        /// Sub-expressions of which at least one must match.
        any: Vec<RuleExpr>,
    },
    /// Negated disjunction of sub-expressions.
    NoneOf {
        /// Sub-expressions of which none may match.
        none: Vec<RuleExpr>,
    },
    /// Leaf comparison.
    Compare(Comparison),
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates a trigger expression against a context.
#[must_use]
pub fn eval_expr(expr: &RuleExpr, context: &EvalContext) -> bool {
    match expr {
        RuleExpr::All {
            all,
        } => all.iter().all(|sub| eval_expr(sub, context)),
        RuleExpr::Any {
            any,
        } => any.iter().any(|sub| eval_expr(sub, context)),
        RuleExpr::NoneOf {
            none,
        } => !none.iter().any(|sub| eval_expr(sub, context)),
        RuleExpr::Compare(comparison) => eval_comparison(comparison, context),
    }
}

/// Evaluates a leaf comparison against a context.
///
/// Negated operators (`not_equals`, `not_contains`, `not_in`) succeed when
/// the field is missing; all other value operators fail on missing fields.
#[must_use]
pub fn eval_comparison(comparison: &Comparison, context: &EvalContext) -> bool {
    let resolved = context.resolve(&comparison.field);

    match comparison.op {
        CompareOp::Exists => return resolved.is_some(),
        CompareOp::NotExists => return resolved.is_none(),
        _ => {}
    }

    let expected = comparison.value.as_ref();
    match (comparison.op, resolved) {
        (CompareOp::Equals, Some(actual)) => expected.is_some_and(|value| actual == value),
        (CompareOp::NotEquals, Some(actual)) => expected.is_none_or(|value| actual != value),
        (CompareOp::NotEquals, None) => true,
        (CompareOp::Contains, Some(actual)) => expected.is_some_and(|value| contains(actual, value)),
        (CompareOp::NotContains, Some(actual)) => {
            expected.is_none_or(|value| !contains(actual, value))
        }
        (CompareOp::NotContains, None) => true,
        (CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte, Some(actual)) => {
            expected.is_some_and(|value| compare_numbers(comparison.op, actual, value))
        }
        (CompareOp::In, Some(actual)) => expected
            .and_then(Value::as_array)
            .is_some_and(|members| members.iter().any(|member| member == actual)),
        (CompareOp::NotIn, Some(actual)) => expected
            .and_then(Value::as_array)
            .is_none_or(|members| !members.iter().any(|member| member == actual)),
        (CompareOp::NotIn, None) => true,
        (_, None) => false,
        (CompareOp::Exists | CompareOp::NotExists, _) => false,
    }
}

/// Returns true when a container value holds the expected member.
///
/// Arrays match by element equality; strings match by substring.
fn contains(container: &Value, member: &Value) -> bool {
    match container {
        Value::Array(items) => items.iter().any(|item| item == member),
        Value::String(text) => member.as_str().is_some_and(|needle| text.contains(needle)),
        _ => false,
    }
}

/// Compares two JSON numbers under the given ordering operator.
///
/// Integers and finite floats are coerced; non-numeric operands yield false.
fn compare_numbers(op: CompareOp, left: &Value, right: &Value) -> bool {
    let ordering = if let (Some(lhs), Some(rhs)) = (left.as_i64(), right.as_i64()) {
        lhs.partial_cmp(&rhs)
    } else {
        match (left.as_f64(), right.as_f64()) {
            (Some(lhs), Some(rhs)) if lhs.is_finite() && rhs.is_finite() => lhs.partial_cmp(&rhs),
            _ => None,
        }
    };

    let Some(ordering) = ordering else {
        return false;
    };

    match op {
        CompareOp::Gt => ordering.is_gt(),
        CompareOp::Gte => ordering.is_ge(),
        CompareOp::Lt => ordering.is_lt(),
        CompareOp::Lte => ordering.is_le(),
        _ => false,
    }
}
