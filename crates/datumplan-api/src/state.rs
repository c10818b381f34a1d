// crates/datumplan-api/src/state.rs
// ============================================================================
// Module: Datum API State
// Description: Shared application state and the governed catalog facade.
// Purpose: Wire catalogs, stores, and auth into the request handlers.
// Dependencies: datumplan-core, crate::config
// ============================================================================

//! ## Overview
//! Application state bundles the read-only pack/industry catalog, the
//! governed profile store, the versioned plan store, the SOE run store, the
//! audit log, and the token table. The governed catalog facade resolves
//! profiles through the lifecycle-managed store so that profile state
//! transitions are immediately visible to SOE evaluation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use datumplan_core::ActorId;
use datumplan_core::BundleId;
use datumplan_core::CatalogError;
use datumplan_core::IndustryId;
use datumplan_core::IndustryProfile;
use datumplan_core::InMemoryAuditLog;
use datumplan_core::InMemoryCatalog;
use datumplan_core::InMemoryPlanStore;
use datumplan_core::InMemoryProfileStore;
use datumplan_core::InMemorySoeRunStore;
use datumplan_core::PackCatalog;
use datumplan_core::PackId;
use datumplan_core::ProfileBundle;
use datumplan_core::ProfileCatalog;
use datumplan_core::ProfileId;
use datumplan_core::ProfileStore;
use datumplan_core::Role;
use datumplan_core::StandardsPack;
use datumplan_core::StandardsProfile;
use datumplan_core::Timestamp;

use crate::config::ServerConfig;

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Actor identifier.
    pub actor: ActorId,
    /// Granted roles.
    pub roles: Vec<Role>,
}

impl Identity {
    /// Returns true when the identity holds any of the given roles.
    #[must_use]
    pub fn has_any(&self, roles: &[Role]) -> bool {
        self.roles.iter().any(|role| roles.contains(role))
    }

    /// Returns the strongest governance role for audit attribution.
    #[must_use]
    pub fn governing_role(&self) -> Role {
        if self.roles.contains(&Role::Admin) {
            Role::Admin
        } else if self.roles.contains(&Role::Ops) {
            Role::Ops
        } else if self.roles.contains(&Role::Qa) {
            Role::Qa
        } else {
            Role::Customer
        }
    }
}

// ============================================================================
// SECTION: Governed Catalog
// ============================================================================

/// Catalog facade resolving profiles through the governed store.
#[derive(Clone)]
pub struct GovernedCatalog {
    /// Read-only packs and industry profiles.
    pub catalog: InMemoryCatalog,
    /// Lifecycle-managed profiles and bundles.
    pub profiles: InMemoryProfileStore,
}

impl PackCatalog for GovernedCatalog {
    fn pack(&self, pack_id: &PackId) -> Result<StandardsPack, CatalogError> {
        self.catalog.pack(pack_id)
    }
}

impl ProfileCatalog for GovernedCatalog {
    fn profile(&self, profile_id: &ProfileId) -> Result<StandardsProfile, CatalogError> {
        match self.profiles.latest(profile_id) {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => self.catalog.profile(profile_id),
            Err(err) => Err(CatalogError::Backend(err.to_string())),
        }
    }

    fn industry_profile(&self, industry_id: &IndustryId) -> Result<IndustryProfile, CatalogError> {
        self.catalog.industry_profile(industry_id)
    }

    fn bundle(&self, bundle_id: &BundleId) -> Result<ProfileBundle, CatalogError> {
        match self.profiles.bundle(bundle_id) {
            Ok(Some(bundle)) => Ok(bundle),
            Ok(None) => self.catalog.bundle(bundle_id),
            Err(err) => Err(CatalogError::Backend(err.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Application State
// ============================================================================

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Governed catalog facade.
    pub catalog: GovernedCatalog,
    /// Versioned plan store.
    pub plans: InMemoryPlanStore,
    /// SOE run store.
    pub runs: InMemorySoeRunStore,
    /// Append-only audit log.
    pub audit: InMemoryAuditLog,
    /// Bearer token table.
    tokens: Arc<BTreeMap<String, Identity>>,
}

impl AppState {
    /// Builds state from configuration with empty stores.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let tokens: BTreeMap<String, Identity> = config
            .tokens
            .iter()
            .map(|entry| {
                (entry.token.clone(), Identity {
                    actor: ActorId::new(entry.actor.clone()),
                    roles: entry.roles.clone(),
                })
            })
            .collect();
        Self {
            catalog: GovernedCatalog {
                catalog: InMemoryCatalog::new(),
                profiles: InMemoryProfileStore::new(),
            },
            plans: InMemoryPlanStore::new(),
            runs: InMemorySoeRunStore::new(),
            audit: InMemoryAuditLog::new(),
            tokens: Arc::new(tokens),
        }
    }

    /// Resolves a bearer token to an identity.
    #[must_use]
    pub fn identity_for(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).cloned()
    }

    /// Returns the current wall-clock timestamp.
    ///
    /// The deterministic core never reads the clock; the request boundary is
    /// the single place wall time enters the system.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Timestamp::UnixMillis(millis)
    }
}
