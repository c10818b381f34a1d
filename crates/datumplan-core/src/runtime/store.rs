// crates/datumplan-core/src/runtime/store.rs
// ============================================================================
// Module: Datum In-Memory Stores
// Description: In-memory catalogs and versioned stores for tests and demos.
// Purpose: Provide deterministic store implementations without external deps.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! In-memory implementations of the catalog and store interfaces, used by
//! tests and the development server. Versioned writes follow the same
//! write-once discipline as durable backends: creating an existing version
//! fails with a conflict. Not intended for production persistence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

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
use crate::interfaces::AuditLog;
use crate::interfaces::CatalogError;
use crate::interfaces::PackCatalog;
use crate::interfaces::PlanStore;
use crate::interfaces::ProfileCatalog;
use crate::interfaces::ProfileStore;
use crate::interfaces::SoeRunStore;
use crate::interfaces::StoreError;
use crate::runtime::lifecycle::parse_semver;

/// Converts a poisoned-mutex error into a store error.
fn poisoned() -> StoreError {
    StoreError::Backend("store mutex poisoned".to_string())
}

/// Converts a poisoned-mutex error into a catalog error.
fn catalog_poisoned() -> CatalogError {
    CatalogError::Backend("catalog mutex poisoned".to_string())
}

// ============================================================================
// SECTION: In-Memory Catalog
// ============================================================================

/// In-memory pack/profile/industry/bundle catalog.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    /// Packs by id.
    packs: Arc<Mutex<BTreeMap<PackId, StandardsPack>>>,
    /// Profiles by id (latest version only).
    profiles: Arc<Mutex<BTreeMap<ProfileId, StandardsProfile>>>,
    /// Industry profiles by id.
    industries: Arc<Mutex<BTreeMap<IndustryId, IndustryProfile>>>,
    /// Bundles by id.
    bundles: Arc<Mutex<BTreeMap<BundleId, ProfileBundle>>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a pack.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Backend`] when the catalog lock is poisoned.
    pub fn put_pack(&self, pack: StandardsPack) -> Result<(), CatalogError> {
        self.packs.lock().map_err(|_| catalog_poisoned())?.insert(pack.pack_id.clone(), pack);
        Ok(())
    }

    /// Inserts or replaces a profile.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Backend`] when the catalog lock is poisoned.
    pub fn put_profile(&self, profile: StandardsProfile) -> Result<(), CatalogError> {
        self.profiles
            .lock()
            .map_err(|_| catalog_poisoned())?
            .insert(profile.profile_id.clone(), profile);
        Ok(())
    }

    /// Inserts or replaces an industry profile.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Backend`] when the catalog lock is poisoned.
    pub fn put_industry(&self, industry: IndustryProfile) -> Result<(), CatalogError> {
        self.industries
            .lock()
            .map_err(|_| catalog_poisoned())?
            .insert(industry.industry_id.clone(), industry);
        Ok(())
    }

    /// Inserts or replaces a bundle.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Backend`] when the catalog lock is poisoned.
    pub fn put_bundle(&self, bundle: ProfileBundle) -> Result<(), CatalogError> {
        self.bundles
            .lock()
            .map_err(|_| catalog_poisoned())?
            .insert(bundle.bundle_id.clone(), bundle);
        Ok(())
    }
}

impl PackCatalog for InMemoryCatalog {
    fn pack(&self, pack_id: &PackId) -> Result<StandardsPack, CatalogError> {
        self.packs
            .lock()
            .map_err(|_| catalog_poisoned())?
            .get(pack_id)
            .cloned()
            .ok_or_else(|| CatalogError::PackNotFound(pack_id.to_string()))
    }
}

impl ProfileCatalog for InMemoryCatalog {
    fn profile(&self, profile_id: &ProfileId) -> Result<StandardsProfile, CatalogError> {
        self.profiles
            .lock()
            .map_err(|_| catalog_poisoned())?
            .get(profile_id)
            .cloned()
            .ok_or_else(|| CatalogError::ProfileNotFound(profile_id.to_string()))
    }

    fn industry_profile(&self, industry_id: &IndustryId) -> Result<IndustryProfile, CatalogError> {
        self.industries
            .lock()
            .map_err(|_| catalog_poisoned())?
            .get(industry_id)
            .cloned()
            .ok_or_else(|| CatalogError::IndustryNotFound(industry_id.to_string()))
    }

    fn bundle(&self, bundle_id: &BundleId) -> Result<ProfileBundle, CatalogError> {
        self.bundles
            .lock()
            .map_err(|_| catalog_poisoned())?
            .get(bundle_id)
            .cloned()
            .ok_or_else(|| CatalogError::BundleNotFound(bundle_id.to_string()))
    }
}

// ============================================================================
// SECTION: In-Memory Plan Store
// ============================================================================

/// In-memory versioned plan store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPlanStore {
    /// Versions keyed by plan id then version number.
    plans: Arc<Mutex<BTreeMap<PlanId, BTreeMap<u32, DatumPlan>>>>,
}

impl InMemoryPlanStore {
    /// Creates an empty plan store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlanStore for InMemoryPlanStore {
    fn latest(&self, plan_id: &PlanId) -> Result<Option<DatumPlan>, StoreError> {
        let guard = self.plans.lock().map_err(|_| poisoned())?;
        Ok(guard
            .get(plan_id)
            .and_then(|versions| versions.values().next_back())
            .cloned())
    }

    fn load(&self, plan_id: &PlanId, version: u32) -> Result<Option<DatumPlan>, StoreError> {
        let guard = self.plans.lock().map_err(|_| poisoned())?;
        Ok(guard.get(plan_id).and_then(|versions| versions.get(&version)).cloned())
    }

    fn versions(&self, plan_id: &PlanId) -> Result<Vec<u32>, StoreError> {
        let guard = self.plans.lock().map_err(|_| poisoned())?;
        Ok(guard.get(plan_id).map(|versions| versions.keys().copied().collect()).unwrap_or_default())
    }

    fn create_version(&self, plan: &DatumPlan) -> Result<(), StoreError> {
        let mut guard = self.plans.lock().map_err(|_| poisoned())?;
        let versions = guard.entry(plan.plan_id.clone()).or_default();
        if versions.contains_key(&plan.version) {
            return Err(StoreError::VersionConflict {
                entity: plan.plan_id.to_string(),
                version: plan.version.to_string(),
            });
        }
        versions.insert(plan.version, plan.clone());
        Ok(())
    }

    fn update_state(&self, plan: &DatumPlan) -> Result<(), StoreError> {
        let mut guard = self.plans.lock().map_err(|_| poisoned())?;
        let versions = guard.entry(plan.plan_id.clone()).or_default();
        if !versions.contains_key(&plan.version) {
            return Err(StoreError::VersionNotFound {
                entity: plan.plan_id.to_string(),
                version: plan.version.to_string(),
            });
        }
        versions.insert(plan.version, plan.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Profile Store
// ============================================================================

/// In-memory versioned profile store with bundle storage.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProfileStore {
    /// Versions keyed by profile id then version string.
    profiles: Arc<Mutex<BTreeMap<ProfileId, BTreeMap<String, StandardsProfile>>>>,
    /// Bundles by id.
    bundles: Arc<Mutex<BTreeMap<BundleId, ProfileBundle>>>,
}

impl InMemoryProfileStore {
    /// Creates an empty profile store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored bundle, when present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the store lock is poisoned.
    pub fn bundle(&self, bundle_id: &BundleId) -> Result<Option<ProfileBundle>, StoreError> {
        let guard = self.bundles.lock().map_err(|_| poisoned())?;
        Ok(guard.get(bundle_id).cloned())
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn latest(&self, profile_id: &ProfileId) -> Result<Option<StandardsProfile>, StoreError> {
        let guard = self.profiles.lock().map_err(|_| poisoned())?;
        Ok(guard.get(profile_id).and_then(|versions| {
            versions
                .values()
                .max_by_key(|profile| parse_semver(&profile.version).unwrap_or((0, 0, 0)))
                .cloned()
        }))
    }

    fn load_version(
        &self,
        profile_id: &ProfileId,
        version: &str,
    ) -> Result<Option<StandardsProfile>, StoreError> {
        let guard = self.profiles.lock().map_err(|_| poisoned())?;
        Ok(guard.get(profile_id).and_then(|versions| versions.get(version)).cloned())
    }

    fn versions(&self, profile_id: &ProfileId) -> Result<Vec<String>, StoreError> {
        let guard = self.profiles.lock().map_err(|_| poisoned())?;
        let mut versions: Vec<String> = guard
            .get(profile_id)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default();
        versions.sort_by_key(|version| parse_semver(version).unwrap_or((0, 0, 0)));
        Ok(versions)
    }

    fn create_version(&self, profile: &StandardsProfile) -> Result<(), StoreError> {
        let mut guard = self.profiles.lock().map_err(|_| poisoned())?;
        let versions = guard.entry(profile.profile_id.clone()).or_default();
        if versions.contains_key(&profile.version) {
            return Err(StoreError::VersionConflict {
                entity: profile.profile_id.to_string(),
                version: profile.version.clone(),
            });
        }
        versions.insert(profile.version.clone(), profile.clone());
        Ok(())
    }

    fn update_state(&self, profile: &StandardsProfile) -> Result<(), StoreError> {
        let mut guard = self.profiles.lock().map_err(|_| poisoned())?;
        let versions = guard.entry(profile.profile_id.clone()).or_default();
        if !versions.contains_key(&profile.version) {
            return Err(StoreError::VersionNotFound {
                entity: profile.profile_id.to_string(),
                version: profile.version.clone(),
            });
        }
        versions.insert(profile.version.clone(), profile.clone());
        Ok(())
    }

    fn create_bundle(&self, bundle: &ProfileBundle) -> Result<(), StoreError> {
        let mut guard = self.bundles.lock().map_err(|_| poisoned())?;
        if guard.contains_key(&bundle.bundle_id) {
            return Err(StoreError::VersionConflict {
                entity: bundle.bundle_id.to_string(),
                version: "1".to_string(),
            });
        }
        guard.insert(bundle.bundle_id.clone(), bundle.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory SOE Run Store
// ============================================================================

/// In-memory SOE run store.
#[derive(Debug, Default, Clone)]
pub struct InMemorySoeRunStore {
    /// Runs by id.
    runs: Arc<Mutex<BTreeMap<SoeRunId, SoeRun>>>,
}

impl InMemorySoeRunStore {
    /// Creates an empty run store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SoeRunStore for InMemorySoeRunStore {
    fn load(&self, soe_run_id: &SoeRunId) -> Result<Option<SoeRun>, StoreError> {
        let guard = self.runs.lock().map_err(|_| poisoned())?;
        Ok(guard.get(soe_run_id).cloned())
    }

    fn save(&self, run: &SoeRun) -> Result<(), StoreError> {
        self.runs
            .lock()
            .map_err(|_| poisoned())?
            .insert(run.soe_run_id.clone(), run.clone());
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Audit Log
// ============================================================================

/// In-memory append-only audit log.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditLog {
    /// Events in append order.
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditLog {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, event: &AuditEvent) -> Result<(), StoreError> {
        self.events.lock().map_err(|_| poisoned())?.push(event.clone());
        Ok(())
    }

    fn events(&self, entity_id: &str) -> Result<Vec<AuditEvent>, StoreError> {
        let guard = self.events.lock().map_err(|_| poisoned())?;
        Ok(guard.iter().filter(|event| event.entity_id == entity_id).cloned().collect())
    }
}
