// crates/datumplan-core/src/core/profile.rs
// ============================================================================
// Module: Datum Standards Profiles
// Description: Layered standards profiles, industry profiles, and bundles.
// Purpose: Define the profile stack resolved by the SOE engine.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! Standards profiles organize packs into BASE, DOMAIN, and CUSTOMER_OVERRIDE
//! layers with explicit override and conflict policies. Profiles are governed
//! artifacts: they carry a lifecycle state and a semver version, and an
//! approved version is immutable except for deprecation. Bundles are named
//! profile id lists; industry profiles are a read-only catalog of per-industry
//! defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::BundleId;
use crate::core::identifiers::IndustryId;
use crate::core::identifiers::PackId;
use crate::core::identifiers::ProfileId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Layer Constants
// ============================================================================

/// Layer value for BASE profiles.
pub const LAYER_BASE: u8 = 0;
/// Layer value for DOMAIN profiles.
pub const LAYER_DOMAIN: u8 = 1;
/// Layer value for CUSTOMER_OVERRIDE profiles.
pub const LAYER_CUSTOMER_OVERRIDE: u8 = 2;

// ============================================================================
// SECTION: Profile Types and Policies
// ============================================================================

/// Profile layer classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileType {
    /// Foundation layer; has no parents.
    Base,
    /// Domain layer; parents must be BASE profiles.
    Domain,
    /// Customer override layer; parents must be DOMAIN profiles.
    CustomerOverride,
}

impl ProfileType {
    /// Returns the stable wire label for the profile type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "BASE",
            Self::Domain => "DOMAIN",
            Self::CustomerOverride => "CUSTOMER_OVERRIDE",
        }
    }

    /// Returns the semantic layer constant for this profile type.
    ///
    /// The layer is a property of the type, never a position in a resolved
    /// stack list.
    #[must_use]
    pub const fn layer(self) -> u8 {
        match self {
            Self::Base => LAYER_BASE,
            Self::Domain => LAYER_DOMAIN,
            Self::CustomerOverride => LAYER_CUSTOMER_OVERRIDE,
        }
    }
}

/// How a profile combines its packs with its parents' packs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideMode {
    /// Parents' packs are kept; additions must not contradict them.
    Strict,
    /// Packs are unioned with parents' packs.
    #[default]
    Additive,
    /// This profile's packs replace parents' packs.
    Replace,
}

/// Policy applied when decisions from different layers contradict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictPolicy {
    /// Abort the run listing both decisions.
    #[default]
    Error,
    /// The lower-layer decision is kept.
    ParentWins,
    /// The higher-layer decision is kept.
    ChildWins,
}

/// Profile lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileState {
    /// Editable working copy.
    Draft,
    /// Awaiting approval.
    Submitted,
    /// Approved and immutable.
    Approved,
    /// Rejected; returned to draft on the next edit.
    Rejected,
    /// Retired; usable only in audit replay.
    Deprecated,
}

impl ProfileState {
    /// Returns the stable wire label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Deprecated => "deprecated",
        }
    }
}

// ============================================================================
// SECTION: Standards Profile
// ============================================================================

/// Governed standards profile.
///
/// # Invariants
/// - DOMAIN parents must be BASE; CUSTOMER_OVERRIDE parents must be DOMAIN.
/// - An approved version is immutable except for the transition to deprecated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardsProfile {
    /// Profile identifier.
    pub profile_id: ProfileId,
    /// Human-readable profile name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Layer classification.
    pub profile_type: ProfileType,
    /// Parent profile identifiers.
    #[serde(default)]
    pub parent_profile_ids: Vec<ProfileId>,
    /// Packs contributed by this profile.
    #[serde(default)]
    pub default_packs: Vec<PackId>,
    /// Pack combination mode relative to parents.
    #[serde(default)]
    pub override_mode: OverrideMode,
    /// Conflict policy governing contradictory decisions.
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// Lifecycle state.
    pub state: ProfileState,
    /// Semver version string (`X.Y.Z`).
    pub version: String,
    /// Version this one was cloned from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_version: Option<String>,
    /// Lifecycle annotations.
    #[serde(default)]
    pub metadata: ProfileMetadata,
}

/// Lifecycle annotations recorded on state transitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    /// Timestamp of the last state transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_updated_at: Option<Timestamp>,
    /// Actor who performed the last state transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_updated_by: Option<ActorId>,
    /// Reason recorded with the last state transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
    /// Profiles superseding this one after deprecation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superseded_by: Vec<ProfileId>,
}

/// Returns the conflict policy of the named profile within a resolved set.
#[must_use]
pub fn conflict_policy_for(
    profiles: &[StandardsProfile],
    profile_id: &ProfileId,
) -> Option<ConflictPolicy> {
    profiles
        .iter()
        .find(|profile| &profile.profile_id == profile_id)
        .map(|profile| profile.conflict_policy)
}

// ============================================================================
// SECTION: Profile Stack Entries
// ============================================================================

/// Resolved profile stack entry recorded on an SOE run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStackEntry {
    /// Profile identifier.
    pub profile_id: ProfileId,
    /// Layer classification.
    pub profile_type: ProfileType,
    /// Semantic layer constant (`0` BASE, `1` DOMAIN, `2` CUSTOMER_OVERRIDE).
    pub layer: u8,
    /// Parent profile identifiers.
    #[serde(default)]
    pub parent_profile_ids: Vec<ProfileId>,
}

// ============================================================================
// SECTION: Industry Profiles
// ============================================================================

/// Read-only industry profile supplying per-industry defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryProfile {
    /// Industry identifier.
    pub industry_id: IndustryId,
    /// Packs active by default for the industry.
    #[serde(default)]
    pub default_packs: Vec<PackId>,
    /// Risk posture descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_posture: Option<String>,
    /// Traceability depth descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceability_depth: Option<String>,
    /// Default evidence retention period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_retention: Option<String>,
}

// ============================================================================
// SECTION: Profile Bundles
// ============================================================================

/// Named set of profile ids; bundles reference profiles, never copy them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBundle {
    /// Bundle identifier.
    pub bundle_id: BundleId,
    /// Human-readable bundle name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Profile identifiers in selection order.
    pub profile_ids: Vec<ProfileId>,
    /// Optional program association.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    /// Optional customer association.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    /// Optional contract association.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
}

impl ProfileBundle {
    /// Resolves the bundle to a deduplicated, order-preserving profile list.
    #[must_use]
    pub fn resolve(&self) -> Vec<ProfileId> {
        let mut out: Vec<ProfileId> = Vec::with_capacity(self.profile_ids.len());
        for profile_id in &self.profile_ids {
            if !out.contains(profile_id) {
                out.push(profile_id.clone());
            }
        }
        out
    }
}
