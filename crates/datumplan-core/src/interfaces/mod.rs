// crates/datumplan-core/src/interfaces/mod.rs
// ============================================================================
// Module: Datum Interfaces
// Description: Backend-agnostic interfaces for catalogs, stores, and audit.
// Purpose: Define the contract surfaces used by the Datum runtime.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the Datum runtime reaches catalogs and persistence
//! without embedding backend-specific details. There are no hidden globals:
//! catalogs and stores are explicit dependencies passed into each runtime
//! entry point, and tests inject in-memory fakes. Versioned stores follow a
//! single-writer-per-entity discipline — a version write fails with a
//! conflict when the version already exists, and the caller retries from a
//! fresh read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::AuditEvent;
use crate::core::BundleId;
use crate::core::DatumPlan;
use crate::core::IndustryId;
use crate::core::IndustryProfile;
use crate::core::PackId;
use crate::core::PlanId;
use crate::core::ProfileBundle;
use crate::core::ProfileId;
use crate::core::SoeRun;
use crate::core::SoeRunId;
use crate::core::StandardsPack;
use crate::core::StandardsProfile;

// ============================================================================
// SECTION: Catalog Errors
// ============================================================================

/// Errors raised when resolving catalog entries.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Standards pack could not be resolved.
    #[error("standards pack not found: {0}")]
    PackNotFound(String),
    /// Standards profile could not be resolved.
    #[error("standards profile not found: {0}")]
    ProfileNotFound(String),
    /// Industry profile could not be resolved.
    #[error("industry profile not found: {0}")]
    IndustryNotFound(String),
    /// Profile bundle could not be resolved.
    #[error("profile bundle not found: {0}")]
    BundleNotFound(String),
    /// Catalog backend reported an error.
    #[error("catalog error: {0}")]
    Backend(String),
}

// ============================================================================
// SECTION: Catalogs
// ============================================================================

/// Read-only standards pack catalog.
pub trait PackCatalog {
    /// Resolves a pack by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PackNotFound`] when the pack does not exist.
    fn pack(&self, pack_id: &PackId) -> Result<StandardsPack, CatalogError>;
}

/// Read-only profile catalog covering profiles, industries, and bundles.
pub trait ProfileCatalog {
    /// Resolves the current version of a profile by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProfileNotFound`] when the profile does not exist.
    fn profile(&self, profile_id: &ProfileId) -> Result<StandardsProfile, CatalogError>;

    /// Resolves an industry profile by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::IndustryNotFound`] when the industry does not exist.
    fn industry_profile(&self, industry_id: &IndustryId) -> Result<IndustryProfile, CatalogError>;

    /// Resolves a profile bundle by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::BundleNotFound`] when the bundle does not exist.
    fn bundle(&self, bundle_id: &BundleId) -> Result<ProfileBundle, CatalogError>;
}

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Errors raised by versioned stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The version being written already exists; retry from a fresh read.
    #[error("version {version} of {entity} already exists")]
    VersionConflict {
        /// Entity identifier.
        entity: String,
        /// Conflicting version label.
        version: String,
    },
    /// The targeted version does not exist.
    #[error("version {version} of {entity} not found")]
    VersionNotFound {
        /// Entity identifier.
        entity: String,
        /// Missing version label.
        version: String,
    },
    /// Store backend reported an error.
    #[error("store error: {0}")]
    Backend(String),
}

// ============================================================================
// SECTION: Plan Store
// ============================================================================

/// Versioned plan store with write-once version semantics.
pub trait PlanStore {
    /// Loads the latest version of a plan.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the store fails.
    fn latest(&self, plan_id: &PlanId) -> Result<Option<DatumPlan>, StoreError>;

    /// Loads a specific plan version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the store fails.
    fn load(&self, plan_id: &PlanId, version: u32) -> Result<Option<DatumPlan>, StoreError>;

    /// Lists version numbers for a plan, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the store fails.
    fn versions(&self, plan_id: &PlanId) -> Result<Vec<u32>, StoreError>;

    /// Writes a new plan version with must-not-exist semantics.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionConflict`] when the version already exists.
    fn create_version(&self, plan: &DatumPlan) -> Result<(), StoreError>;

    /// Replaces an existing version for a state-machine transition.
    ///
    /// Only `state`, `locked`, approval metadata, edit history, and
    /// `updated_at` may change; the transition machinery enforces this.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionNotFound`] when the version does not exist.
    fn update_state(&self, plan: &DatumPlan) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Profile Store
// ============================================================================

/// Versioned profile store with write-once version semantics.
pub trait ProfileStore {
    /// Loads the latest version of a profile (highest semver).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the store fails.
    fn latest(&self, profile_id: &ProfileId) -> Result<Option<StandardsProfile>, StoreError>;

    /// Loads a specific profile version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the store fails.
    fn load_version(
        &self,
        profile_id: &ProfileId,
        version: &str,
    ) -> Result<Option<StandardsProfile>, StoreError>;

    /// Lists version strings for a profile in ascending semver order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the store fails.
    fn versions(&self, profile_id: &ProfileId) -> Result<Vec<String>, StoreError>;

    /// Writes a new profile version with must-not-exist semantics.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionConflict`] when the version already exists.
    fn create_version(&self, profile: &StandardsProfile) -> Result<(), StoreError>;

    /// Replaces an existing version for a lifecycle transition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionNotFound`] when the version does not exist.
    fn update_state(&self, profile: &StandardsProfile) -> Result<(), StoreError>;

    /// Creates a profile bundle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionConflict`] when the bundle already exists.
    fn create_bundle(&self, bundle: &ProfileBundle) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: SOE Run Store
// ============================================================================

/// Store for immutable SOE run artifacts.
pub trait SoeRunStore {
    /// Loads a run by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the store fails.
    fn load(&self, soe_run_id: &SoeRunId) -> Result<Option<SoeRun>, StoreError>;

    /// Saves a run; identical re-saves are idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the store fails.
    fn save(&self, run: &SoeRun) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Audit Log
// ============================================================================

/// Append-only audit log.
pub trait AuditLog {
    /// Appends an event to the log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the log cannot be written.
    fn append(&self, event: &AuditEvent) -> Result<(), StoreError>;

    /// Returns events for an entity in append order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the log cannot be read.
    fn events(&self, entity_id: &str) -> Result<Vec<AuditEvent>, StoreError>;
}
