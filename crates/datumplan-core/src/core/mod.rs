// crates/datumplan-core/src/core/mod.rs
// ============================================================================
// Module: Datum Core Types
// Description: Canonical Datum schema for packs, profiles, runs, and plans.
// Purpose: Provide stable, serializable types for Datum artifacts.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Datum core types define standards packs, layered profiles, SOE runs, and
//! governed plan artifacts. These types are the canonical source of truth
//! for any derived API surfaces (HTTP or exports), and every hashing input
//! flows through the canonicalizer in [`hashing`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod expr;
pub mod hashing;
pub mod identifiers;
pub mod pack;
pub mod plan;
pub mod profile;
pub mod soe;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditEntityKind;
pub use audit::AuditEvent;
pub use audit::AuditResult;
pub use audit::Role;
pub use expr::CompareOp;
pub use expr::Comparison;
pub use expr::EvalContext;
pub use expr::RuleExpr;
pub use expr::eval_expr;
pub use hashing::CONTENT_ID_HEX_LEN;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::content_id;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use hashing::is_content_id;
pub use identifiers::ActorId;
pub use identifiers::BundleId;
pub use identifiers::DecisionId;
pub use identifiers::EvidenceId;
pub use identifiers::GateId;
pub use identifiers::IndustryId;
pub use identifiers::PackId;
pub use identifiers::PlanId;
pub use identifiers::ProfileId;
pub use identifiers::QuoteId;
pub use identifiers::RuleId;
pub use identifiers::SoeRunId;
pub use identifiers::StepId;
pub use identifiers::TestId;
pub use pack::Acceptance;
pub use pack::ActionKind;
pub use pack::ActionPayload;
pub use pack::Applicability;
pub use pack::Enforcement;
pub use pack::ModifierType;
pub use pack::ObjectType;
pub use pack::PackError;
pub use pack::Rule;
pub use pack::RuleAction;
pub use pack::Severity;
pub use pack::StandardsPack;
pub use plan::BASELINE_RULE_ID;
pub use plan::DatumPlan;
pub use plan::EditMetadata;
pub use plan::EvidenceIntent;
pub use plan::OverrideRecord;
pub use plan::PlanState;
pub use plan::PlanTest;
pub use plan::Quote;
pub use plan::Side;
pub use plan::SourceRule;
pub use plan::Step;
pub use plan::next_revision;
pub use profile::ConflictPolicy;
pub use profile::conflict_policy_for;
pub use profile::IndustryProfile;
pub use profile::LAYER_BASE;
pub use profile::LAYER_CUSTOMER_OVERRIDE;
pub use profile::LAYER_DOMAIN;
pub use profile::OverrideMode;
pub use profile::ProfileBundle;
pub use profile::ProfileMetadata;
pub use profile::ProfileStackEntry;
pub use profile::ProfileState;
pub use profile::ProfileType;
pub use profile::StandardsProfile;
pub use soe::ConflictOverride;
pub use soe::CostModifier;
pub use soe::Decision;
pub use soe::DecisionWhy;
pub use soe::EvidenceRequirement;
pub use soe::Gate;
pub use soe::GateStatus;
pub use soe::ProfileSource;
pub use soe::RELEASE_GATE_ID;
pub use soe::RuleRef;
pub use soe::SOE_ENGINE_VERSION;
pub use soe::SoeAuditManifest;
pub use soe::SoeRequest;
pub use soe::SoeRun;
pub use time::Timestamp;
