// crates/datumplan-core/tests/common/mod.rs
// ============================================================================
// Module: Shared Test Fixtures
// Description: Catalog, pack, and quote builders shared across suites.
// ============================================================================
//! ## Overview
//! Builders for the space-flight polymerics and medical validation fixtures
//! used across the integration suites.

#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only fixtures and panic-based assertions are permitted."
)]

use datumplan_core::ActionKind;
use datumplan_core::ActionPayload;
use datumplan_core::Applicability;
use datumplan_core::CompareOp;
use datumplan_core::Comparison;
use datumplan_core::ConflictPolicy;
use datumplan_core::Enforcement;
use datumplan_core::InMemoryCatalog;
use datumplan_core::IndustryId;
use datumplan_core::IndustryProfile;
use datumplan_core::ObjectType;
use datumplan_core::OverrideMode;
use datumplan_core::PackId;
use datumplan_core::ProfileId;
use datumplan_core::ProfileMetadata;
use datumplan_core::ProfileState;
use datumplan_core::ProfileType;
use datumplan_core::Quote;
use datumplan_core::QuoteId;
use datumplan_core::Rule;
use datumplan_core::RuleAction;
use datumplan_core::RuleExpr;
use datumplan_core::RuleId;
use datumplan_core::Severity;
use datumplan_core::Side;
use datumplan_core::SoeRequest;
use datumplan_core::StandardsPack;
use datumplan_core::StandardsProfile;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

/// Builds the space industry profile.
pub fn space_industry() -> IndustryProfile {
    IndustryProfile {
        industry_id: IndustryId::new("space"),
        default_packs: vec![PackId::new("NASA_POLYMERICS")],
        risk_posture: Some("maximum".to_string()),
        traceability_depth: Some("full".to_string()),
        evidence_retention: Some("LIFE_OF_PROGRAM".to_string()),
    }
}

/// Builds the medical industry profile.
pub fn medical_industry() -> IndustryProfile {
    IndustryProfile {
        industry_id: IndustryId::new("medical"),
        default_packs: vec![PackId::new("PROCESS_VALIDATION")],
        risk_posture: Some("high".to_string()),
        traceability_depth: Some("full".to_string()),
        evidence_retention: Some("DEVICE_LIFETIME_PLUS_2Y".to_string()),
    }
}

/// Builds a step-insertion action for a locked sequence member.
fn locked_step_action(object_id: &str, sequence: u32) -> RuleAction {
    RuleAction {
        action: ActionKind::InsertStep,
        object_type: ObjectType::ProcessStep,
        object_id: object_id.to_string(),
        payload: Some(ActionPayload::Step {
            title: None,
            sequence: Some(sequence),
            lock_sequence: true,
            parameters: None,
            acceptance: None,
        }),
    }
}

/// Builds the NASA polymerics pack with its locked bonding sequence rule.
pub fn polymerics_pack() -> StandardsPack {
    StandardsPack {
        pack_id: PackId::new("NASA_POLYMERICS"),
        industry: IndustryId::new("space"),
        name: Some("NASA polymerics workmanship".to_string()),
        rules: vec![Rule {
            rule_id: RuleId::new("NASA_POLYMERICS_BONDING"),
            summary: "Polymeric applications require the qualified bonding sequence".to_string(),
            citations: vec!["NASA-STD-8739.1 5.2".to_string()],
            applies: Applicability {
                industry_profiles: vec![IndustryId::new("space")],
                hardware_classes: vec!["flight".to_string()],
            },
            trigger: Some(RuleExpr::Compare(Comparison {
                field: "materials".to_string(),
                op: CompareOp::Contains,
                value: Some(json!("EPOXY_3M_SCOTCHWELD_2216")),
            })),
            actions: vec![
                locked_step_action("CLEAN", 1),
                locked_step_action("BAKE", 2),
                locked_step_action("POLYMER", 3),
                locked_step_action("CURE", 4),
                locked_step_action("INSPECT", 5),
            ],
            enforcement: Some(Enforcement::BlockRelease),
            severity: Severity::Critical,
        }],
    }
}

/// Builds the medical process-validation pack (IQ/OQ/PQ + DHR/DMR).
pub fn process_validation_pack() -> StandardsPack {
    let require_test = |object_id: &str| RuleAction {
        action: ActionKind::Require,
        object_type: ObjectType::Test,
        object_id: object_id.to_string(),
        payload: None,
    };
    let require_evidence = |object_id: &str| RuleAction {
        action: ActionKind::Require,
        object_type: ObjectType::Evidence,
        object_id: object_id.to_string(),
        payload: Some(ActionPayload::Evidence {
            applies_to: Some("device".to_string()),
            retention: None,
        }),
    };
    StandardsPack {
        pack_id: PackId::new("PROCESS_VALIDATION"),
        industry: IndustryId::new("medical"),
        name: Some("Process validation".to_string()),
        rules: vec![Rule {
            rule_id: RuleId::new("PROCESS_VALIDATION_IQOQPQ"),
            summary: "Process validation requires IQ, OQ, and PQ with device history records"
                .to_string(),
            citations: vec!["ISO 13485 7.5.6".to_string()],
            applies: Applicability {
                industry_profiles: vec![IndustryId::new("medical")],
                hardware_classes: Vec::new(),
            },
            trigger: None,
            actions: vec![
                require_test("IQ"),
                require_test("OQ"),
                require_test("PQ"),
                require_evidence("DHR"),
                require_evidence("DMR"),
            ],
            enforcement: None,
            severity: Severity::Major,
        }],
    }
}

/// Builds an approved profile.
pub fn profile(
    profile_id: &str,
    profile_type: ProfileType,
    parents: &[&str],
    packs: &[&str],
    conflict_policy: ConflictPolicy,
) -> StandardsProfile {
    StandardsProfile {
        profile_id: ProfileId::new(profile_id),
        name: Some(profile_id.replace('_', " ")),
        profile_type,
        parent_profile_ids: parents.iter().map(|parent| ProfileId::new(*parent)).collect(),
        default_packs: packs.iter().map(|pack| PackId::new(*pack)).collect(),
        override_mode: OverrideMode::Additive,
        conflict_policy,
        state: ProfileState::Approved,
        version: "1.0.0".to_string(),
        parent_version: None,
        metadata: ProfileMetadata::default(),
    }
}

/// Builds a quote with top-side assembly.
pub fn quote(tier: u8) -> Quote {
    Quote {
        quote_id: QuoteId::new("quote-001"),
        tier,
        assembly_sides: vec![Side::Top],
        assumptions: Map::new(),
    }
}

/// Builds the space-flight polymerics request from the standard scenario.
pub fn space_flight_request() -> SoeRequest {
    let mut inputs = Map::new();
    inputs.insert(
        "materials".to_string(),
        Value::Array(vec![json!("EPOXY_3M_SCOTCHWELD_2216")]),
    );
    inputs.insert(
        "processes".to_string(),
        Value::Array(vec![json!("SMT"), json!("REFLOW"), json!("CONFORMAL_COAT")]),
    );
    SoeRequest {
        industry_profile: IndustryId::new("space"),
        hardware_class: Some("flight".to_string()),
        inputs,
        active_profiles: None,
        profile_bundle_id: None,
        additional_packs: Vec::new(),
        audit_replay: false,
    }
}

/// Builds the medical request with no tests requested.
pub fn medical_request() -> SoeRequest {
    let mut inputs = Map::new();
    inputs.insert("tests_requested".to_string(), Value::Array(Vec::new()));
    SoeRequest {
        industry_profile: IndustryId::new("medical"),
        hardware_class: None,
        inputs,
        active_profiles: None,
        profile_bundle_id: None,
        additional_packs: Vec::new(),
        audit_replay: false,
    }
}

/// Builds a catalog seeded with the space and medical fixtures.
pub fn seeded_catalog() -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();
    catalog.put_industry(space_industry()).unwrap();
    catalog.put_industry(medical_industry()).unwrap();
    catalog.put_pack(polymerics_pack()).unwrap();
    catalog.put_pack(process_validation_pack()).unwrap();
    catalog
}
