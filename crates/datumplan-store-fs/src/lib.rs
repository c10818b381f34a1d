// crates/datumplan-store-fs/src/lib.rs
// ============================================================================
// Module: Datum Filesystem Store
// Description: Versioned JSON file store with an append-only audit log.
// Purpose: Durable write-once version storage for plans, profiles, and runs.
// Dependencies: datumplan-core, serde_json
// ============================================================================

//! ## Overview
//! The filesystem store keeps one JSON file per entity version under
//! per-entity directories, an append-only JSONL audit log per entity, and
//! bundle documents by id. Version writes are exclusive: the version file is
//! staged to a temporary path and hard-linked into place, so a concurrent
//! writer racing on the same version loses with a conflict and never observes
//! a partial artifact. Versions are immutable once linked; only the
//! state-transition path rewrites a version file in place, atomically via
//! rename.
//!
//! Layout:
//!
//! ```text
//! <root>/plans/<plan_id>/v0001.json
//! <root>/profiles/<profile_id>/<version>.json
//! <root>/soe_runs/<soe_run_id>.json
//! <root>/bundles/<bundle_id>.json
//! <root>/audit/<entity_id>.jsonl
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use datumplan_core::AuditEvent;
use datumplan_core::AuditLog;
use datumplan_core::DatumPlan;
use datumplan_core::PlanId;
use datumplan_core::PlanStore;
use datumplan_core::ProfileBundle;
use datumplan_core::ProfileId;
use datumplan_core::ProfileStore;
use datumplan_core::SoeRun;
use datumplan_core::SoeRunId;
use datumplan_core::SoeRunStore;
use datumplan_core::StandardsProfile;
use datumplan_core::StoreError;
use datumplan_core::runtime::parse_semver;
use serde::Serialize;
use serde::de::DeserializeOwned;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Filesystem-backed versioned store.
#[derive(Debug, Clone)]
pub struct FsStore {
    /// Root directory for all entity kinds.
    root: PathBuf,
}

impl FsStore {
    /// Opens (and creates) a store rooted at the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the directories cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for kind in ["plans", "profiles", "soe_runs", "bundles", "audit"] {
            fs::create_dir_all(root.join(kind)).map_err(io_backend)?;
        }
        Ok(Self {
            root,
        })
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory for one entity, validating the id as a path
    /// component.
    fn entity_dir(&self, kind: &str, id: &str) -> Result<PathBuf, StoreError> {
        validate_id(id)?;
        Ok(self.root.join(kind).join(id))
    }
}

/// Rejects ids that are empty or escape their directory.
fn validate_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty()
        || id.contains('/')
        || id.contains('\\')
        || id.contains("..")
        || id.starts_with('.')
    {
        return Err(StoreError::Backend(format!("invalid entity id: {id:?}")));
    }
    Ok(())
}

/// Maps an I/O error into a backend store error.
fn io_backend(err: std::io::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// Serializes a value into pretty JSON bytes.
fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(value).map_err(|err| StoreError::Backend(err.to_string()))
}

/// Reads and deserializes a JSON file when it exists.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| StoreError::Backend(err.to_string())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_backend(err)),
    }
}

/// Writes a version file exclusively: stage to a temp path, hard-link into
/// place, and fail with a conflict when the target already exists.
fn write_exclusive(
    target: &Path,
    bytes: &[u8],
    entity: &str,
    version: &str,
) -> Result<(), StoreError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(io_backend)?;
    }
    let staging = target.with_extension("tmp");
    fs::write(&staging, bytes).map_err(io_backend)?;
    let linked = fs::hard_link(&staging, target);
    // Staging cleanup is best-effort; a racing writer may have removed it.
    drop(fs::remove_file(&staging));
    match linked {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(StoreError::VersionConflict {
                entity: entity.to_string(),
                version: version.to_string(),
            })
        }
        Err(err) => Err(io_backend(err)),
    }
}

/// Replaces an existing version file atomically via rename.
fn replace_existing(
    target: &Path,
    bytes: &[u8],
    entity: &str,
    version: &str,
) -> Result<(), StoreError> {
    if !target.exists() {
        return Err(StoreError::VersionNotFound {
            entity: entity.to_string(),
            version: version.to_string(),
        });
    }
    let staging = target.with_extension("tmp");
    fs::write(&staging, bytes).map_err(io_backend)?;
    fs::rename(&staging, target).map_err(io_backend)
}

/// Formats a plan version file name.
fn plan_version_file(version: u32) -> String {
    format!("v{version:04}.json")
}

// ============================================================================
// SECTION: Plan Store
// ============================================================================

impl PlanStore for FsStore {
    fn latest(&self, plan_id: &PlanId) -> Result<Option<DatumPlan>, StoreError> {
        let versions = PlanStore::versions(self, plan_id)?;
        match versions.last() {
            Some(version) => PlanStore::load(self, plan_id, *version),
            None => Ok(None),
        }
    }

    fn load(&self, plan_id: &PlanId, version: u32) -> Result<Option<DatumPlan>, StoreError> {
        let dir = self.entity_dir("plans", plan_id.as_str())?;
        read_json(&dir.join(plan_version_file(version)))
    }

    fn versions(&self, plan_id: &PlanId) -> Result<Vec<u32>, StoreError> {
        let dir = self.entity_dir("plans", plan_id.as_str())?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_backend(err)),
        };
        let mut versions: Vec<u32> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_backend)?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(version) = name
                .strip_prefix('v')
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|digits| digits.parse::<u32>().ok())
            {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn create_version(&self, plan: &DatumPlan) -> Result<(), StoreError> {
        let dir = self.entity_dir("plans", plan.plan_id.as_str())?;
        write_exclusive(
            &dir.join(plan_version_file(plan.version)),
            &to_bytes(plan)?,
            plan.plan_id.as_str(),
            &plan.version.to_string(),
        )
    }

    fn update_state(&self, plan: &DatumPlan) -> Result<(), StoreError> {
        let dir = self.entity_dir("plans", plan.plan_id.as_str())?;
        replace_existing(
            &dir.join(plan_version_file(plan.version)),
            &to_bytes(plan)?,
            plan.plan_id.as_str(),
            &plan.version.to_string(),
        )
    }
}

// ============================================================================
// SECTION: Profile Store
// ============================================================================

impl ProfileStore for FsStore {
    fn latest(&self, profile_id: &ProfileId) -> Result<Option<StandardsProfile>, StoreError> {
        let versions = ProfileStore::versions(self, profile_id)?;
        match versions.last() {
            Some(version) => self.load_version(profile_id, version),
            None => Ok(None),
        }
    }

    fn load_version(
        &self,
        profile_id: &ProfileId,
        version: &str,
    ) -> Result<Option<StandardsProfile>, StoreError> {
        validate_id(version)?;
        let dir = self.entity_dir("profiles", profile_id.as_str())?;
        read_json(&dir.join(format!("{version}.json")))
    }

    fn versions(&self, profile_id: &ProfileId) -> Result<Vec<String>, StoreError> {
        let dir = self.entity_dir("profiles", profile_id.as_str())?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_backend(err)),
        };
        let mut versions: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_backend)?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(version) = name.strip_suffix(".json")
                && parse_semver(version).is_some()
            {
                versions.push(version.to_string());
            }
        }
        versions.sort_by_key(|version| parse_semver(version).unwrap_or((0, 0, 0)));
        Ok(versions)
    }

    fn create_version(&self, profile: &StandardsProfile) -> Result<(), StoreError> {
        validate_id(&profile.version)?;
        let dir = self.entity_dir("profiles", profile.profile_id.as_str())?;
        write_exclusive(
            &dir.join(format!("{}.json", profile.version)),
            &to_bytes(profile)?,
            profile.profile_id.as_str(),
            &profile.version,
        )
    }

    fn update_state(&self, profile: &StandardsProfile) -> Result<(), StoreError> {
        validate_id(&profile.version)?;
        let dir = self.entity_dir("profiles", profile.profile_id.as_str())?;
        replace_existing(
            &dir.join(format!("{}.json", profile.version)),
            &to_bytes(profile)?,
            profile.profile_id.as_str(),
            &profile.version,
        )
    }

    fn create_bundle(&self, bundle: &ProfileBundle) -> Result<(), StoreError> {
        validate_id(bundle.bundle_id.as_str())?;
        let path = self.root.join("bundles").join(format!("{}.json", bundle.bundle_id));
        write_exclusive(&path, &to_bytes(bundle)?, bundle.bundle_id.as_str(), "1")
    }
}

impl FsStore {
    /// Loads a bundle by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the file cannot be read.
    pub fn bundle(&self, bundle_id: &str) -> Result<Option<ProfileBundle>, StoreError> {
        validate_id(bundle_id)?;
        read_json(&self.root.join("bundles").join(format!("{bundle_id}.json")))
    }
}

// ============================================================================
// SECTION: SOE Run Store
// ============================================================================

impl SoeRunStore for FsStore {
    fn load(&self, soe_run_id: &SoeRunId) -> Result<Option<SoeRun>, StoreError> {
        validate_id(soe_run_id.as_str())?;
        read_json(&self.root.join("soe_runs").join(format!("{soe_run_id}.json")))
    }

    fn save(&self, run: &SoeRun) -> Result<(), StoreError> {
        validate_id(run.soe_run_id.as_str())?;
        let path = self.root.join("soe_runs").join(format!("{}.json", run.soe_run_id));
        // Runs are content-addressed; re-saving an identical run is a no-op.
        match write_exclusive(&path, &to_bytes(run)?, run.soe_run_id.as_str(), "1") {
            Ok(()) | Err(StoreError::VersionConflict { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

// ============================================================================
// SECTION: Audit Log
// ============================================================================

impl AuditLog for FsStore {
    fn append(&self, event: &AuditEvent) -> Result<(), StoreError> {
        validate_id(&event.entity_id)?;
        let path = self.root.join("audit").join(format!("{}.jsonl", event.entity_id));
        let line =
            serde_json::to_string(event).map_err(|err| StoreError::Backend(err.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_backend)?;
        file.write_all(line.as_bytes()).map_err(io_backend)?;
        file.write_all(b"\n").map_err(io_backend)
    }

    fn events(&self, entity_id: &str) -> Result<Vec<AuditEvent>, StoreError> {
        validate_id(entity_id)?;
        let path = self.root.join("audit").join(format!("{entity_id}.jsonl"));
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_backend(err)),
        };
        let mut events = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let event: AuditEvent =
                serde_json::from_str(line).map_err(|err| StoreError::Backend(err.to_string()))?;
            events.push(event);
        }
        Ok(events)
    }
}
