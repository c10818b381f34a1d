// crates/datumplan-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Datum Profile Lifecycle
// Description: Profile state machine, versioning, and bundle management.
// Purpose: Apply plan-grade governance to the profiles themselves.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Profiles follow the same discipline as plans: `draft -> submitted ->
//! approved | rejected -> deprecated`, with approved versions immutable.
//! New content requires a new semver version cloned from an existing one.
//! Deprecation is the only forward move out of approved and requires a
//! reason. Every transition attempt appends an audit event, so what an
//! auditor sees cannot silently change under production artifacts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::ActorId;
use crate::core::AuditEntityKind;
use crate::core::AuditEvent;
use crate::core::AuditResult;
use crate::core::ProfileBundle;
use crate::core::ProfileId;
use crate::core::ProfileMetadata;
use crate::core::ProfileState;
use crate::core::Role;
use crate::core::StandardsProfile;
use crate::core::Timestamp;
use crate::interfaces::AuditLog;
use crate::interfaces::ProfileStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by profile lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// State machine rejected the transition.
    #[error("profile {profile_id} is {state}; operation requires {expected}")]
    StateTransitionInvalid {
        /// Profile identifier.
        profile_id: String,
        /// Current state label.
        state: String,
        /// Required state label.
        expected: String,
    },
    /// Write attempted on an approved version.
    #[error("profile {0} is approved and immutable; create a new version instead")]
    Immutable(String),
    /// Operation requires a non-empty reason.
    #[error("a non-empty reason is required to {0}")]
    ReasonRequired(&'static str),
    /// Role is not allowed to perform the operation.
    #[error("role is not permitted to {0} profiles")]
    Forbidden(&'static str),
    /// Version string is not valid semver.
    #[error("invalid profile version: {0}")]
    InvalidVersion(String),
    /// Bundle failed validation.
    #[error("invalid profile bundle: {0}")]
    InvalidBundle(String),
    /// Profile does not exist.
    #[error("profile not found: {0}")]
    NotFound(String),
    /// Versioned store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LifecycleError {
    /// Returns the stable error code for the request boundary.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::StateTransitionInvalid {
                ..
            } => "PROFILE_STATE_TRANSITION_INVALID",
            Self::Immutable(_) => "PROFILE_APPROVED_IMMUTABLE",
            Self::ReasonRequired(_) => "REASON_REQUIRED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidVersion(_) => "PROFILE_VERSION_INVALID",
            Self::InvalidBundle(_) => "BUNDLE_INVALID",
            Self::NotFound(_) => "PROFILE_NOT_FOUND",
            Self::Store(StoreError::VersionConflict {
                ..
            }) => "VERSION_CONFLICT",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

// ============================================================================
// SECTION: Semver
// ============================================================================

/// Parses an `X.Y.Z` version string into its numeric components.
#[must_use]
pub fn parse_semver(version: &str) -> Option<(u64, u64, u64)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

// ============================================================================
// SECTION: State Transitions
// ============================================================================

/// Submits a draft (or resubmits a rejected) profile for approval.
///
/// # Errors
///
/// Returns [`LifecycleError::StateTransitionInvalid`] when the profile is in
/// another state.
pub fn submit_profile<S: ProfileStore, A: AuditLog>(
    store: &S,
    audit: &A,
    profile_id: &ProfileId,
    actor: &ActorId,
    role: Role,
    reason: &str,
    at: Timestamp,
) -> Result<StandardsProfile, LifecycleError> {
    transition(
        store,
        audit,
        profile_id,
        "submit",
        &[ProfileState::Draft, ProfileState::Rejected],
        ProfileState::Submitted,
        actor,
        role,
        reason,
        at,
    )
}

/// Approves a submitted profile; the version becomes immutable.
///
/// # Errors
///
/// Returns [`LifecycleError::Forbidden`] when the role may not approve.
pub fn approve_profile<S: ProfileStore, A: AuditLog>(
    store: &S,
    audit: &A,
    profile_id: &ProfileId,
    actor: &ActorId,
    role: Role,
    reason: &str,
    at: Timestamp,
) -> Result<StandardsProfile, LifecycleError> {
    if !role.can_approve() {
        return Err(LifecycleError::Forbidden("approve"));
    }
    transition(
        store,
        audit,
        profile_id,
        "approve",
        &[ProfileState::Submitted],
        ProfileState::Approved,
        actor,
        role,
        reason,
        at,
    )
}

/// Rejects a submitted profile.
///
/// # Errors
///
/// Returns [`LifecycleError::ReasonRequired`] when the reason is empty.
pub fn reject_profile<S: ProfileStore, A: AuditLog>(
    store: &S,
    audit: &A,
    profile_id: &ProfileId,
    actor: &ActorId,
    role: Role,
    reason: &str,
    at: Timestamp,
) -> Result<StandardsProfile, LifecycleError> {
    if reason.trim().is_empty() {
        return Err(LifecycleError::ReasonRequired("reject"));
    }
    transition(
        store,
        audit,
        profile_id,
        "reject",
        &[ProfileState::Submitted],
        ProfileState::Rejected,
        actor,
        role,
        reason,
        at,
    )
}

/// Deprecates an approved profile; the only forward move out of approved.
///
/// # Errors
///
/// Returns [`LifecycleError::ReasonRequired`] when the reason is empty.
pub fn deprecate_profile<S: ProfileStore, A: AuditLog>(
    store: &S,
    audit: &A,
    profile_id: &ProfileId,
    actor: &ActorId,
    role: Role,
    reason: &str,
    superseded_by: Option<&ProfileId>,
    at: Timestamp,
) -> Result<StandardsProfile, LifecycleError> {
    if reason.trim().is_empty() {
        return Err(LifecycleError::ReasonRequired("deprecate"));
    }
    let mut profile = transition(
        store,
        audit,
        profile_id,
        "deprecate",
        &[ProfileState::Approved],
        ProfileState::Deprecated,
        actor,
        role,
        reason,
        at,
    )?;
    if let Some(successor) = superseded_by {
        profile.metadata.superseded_by.push(successor.clone());
        store.update_state(&profile)?;
    }
    Ok(profile)
}

/// Applies a guarded state transition and records the attempt.
#[allow(clippy::too_many_arguments, reason = "transitions capture full governance context")]
fn transition<S: ProfileStore, A: AuditLog>(
    store: &S,
    audit: &A,
    profile_id: &ProfileId,
    action: &str,
    accepted: &[ProfileState],
    next: ProfileState,
    actor: &ActorId,
    role: Role,
    reason: &str,
    at: Timestamp,
) -> Result<StandardsProfile, LifecycleError> {
    let mut profile =
        store.latest(profile_id)?.ok_or_else(|| LifecycleError::NotFound(profile_id.to_string()))?;

    if !accepted.contains(&profile.state) {
        audit.append(&profile_event(&profile, action, profile.state, AuditResult::Denied, actor, role, reason, at))?;
        if profile.state == ProfileState::Approved {
            return Err(LifecycleError::Immutable(profile_id.to_string()));
        }
        return Err(LifecycleError::StateTransitionInvalid {
            profile_id: profile_id.to_string(),
            state: profile.state.as_str().to_string(),
            expected: accepted
                .iter()
                .map(|state| state.as_str())
                .collect::<Vec<_>>()
                .join("|"),
        });
    }

    let before = profile.state;
    profile.state = next;
    profile.metadata = ProfileMetadata {
        state_updated_at: Some(at),
        state_updated_by: Some(actor.clone()),
        state_reason: if reason.is_empty() { None } else { Some(reason.to_string()) },
        superseded_by: profile.metadata.superseded_by.clone(),
    };
    store.update_state(&profile)?;
    audit.append(&profile_event(&profile, action, before, AuditResult::Applied, actor, role, reason, at))?;
    Ok(profile)
}

/// Builds a profile audit event for an attempt.
#[allow(clippy::too_many_arguments, reason = "audit events capture full mutation context")]
fn profile_event(
    profile: &StandardsProfile,
    action: &str,
    from_state: ProfileState,
    result: AuditResult,
    actor: &ActorId,
    role: Role,
    reason: &str,
    at: Timestamp,
) -> AuditEvent {
    AuditEvent {
        timestamp: at,
        actor: actor.clone(),
        role,
        entity_kind: AuditEntityKind::StandardsProfile,
        entity_id: profile.profile_id.to_string(),
        action: action.to_string(),
        from_state: from_state.as_str().to_string(),
        to_state: if matches!(result, AuditResult::Denied) {
            from_state.as_str().to_string()
        } else {
            profile.state.as_str().to_string()
        },
        result,
        reason: if reason.is_empty() { None } else { Some(reason.to_string()) },
    }
}

// ============================================================================
// SECTION: Versioning
// ============================================================================

/// Version history entry for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileVersionInfo {
    /// Version string.
    pub version: String,
    /// Lifecycle state of the version.
    pub state: ProfileState,
    /// Version this one was cloned from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_version: Option<String>,
}

/// Clones the latest profile version into a new draft version.
///
/// # Errors
///
/// Returns [`LifecycleError::InvalidVersion`] for malformed or non-advancing
/// version strings, and [`LifecycleError::Store`] on version conflicts.
pub fn create_profile_version<S: ProfileStore, A: AuditLog>(
    store: &S,
    audit: &A,
    profile_id: &ProfileId,
    new_version: &str,
    actor: &ActorId,
    role: Role,
    at: Timestamp,
) -> Result<StandardsProfile, LifecycleError> {
    let latest =
        store.latest(profile_id)?.ok_or_else(|| LifecycleError::NotFound(profile_id.to_string()))?;

    let Some(next) = parse_semver(new_version) else {
        return Err(LifecycleError::InvalidVersion(new_version.to_string()));
    };
    if let Some(current) = parse_semver(&latest.version)
        && next <= current
    {
        return Err(LifecycleError::InvalidVersion(format!(
            "{new_version} does not advance {}",
            latest.version
        )));
    }

    let mut version = latest.clone();
    version.version = new_version.to_string();
    version.parent_version = Some(latest.version.clone());
    version.state = ProfileState::Draft;
    version.metadata = ProfileMetadata {
        state_updated_at: Some(at),
        state_updated_by: Some(actor.clone()),
        state_reason: None,
        superseded_by: Vec::new(),
    };

    store.create_version(&version)?;
    audit.append(&profile_event(&version, "version", latest.state, AuditResult::Applied, actor, role, "", at))?;
    Ok(version)
}

/// Lists profile versions in ascending semver order.
///
/// # Errors
///
/// Returns [`LifecycleError::Store`] when the store fails.
pub fn list_profile_versions<S: ProfileStore>(
    store: &S,
    profile_id: &ProfileId,
) -> Result<Vec<ProfileVersionInfo>, LifecycleError> {
    let mut infos: Vec<ProfileVersionInfo> = Vec::new();
    for version in store.versions(profile_id)? {
        if let Some(profile) = store.load_version(profile_id, &version)? {
            infos.push(ProfileVersionInfo {
                version: profile.version.clone(),
                state: profile.state,
                parent_version: profile.parent_version.clone(),
            });
        }
    }
    infos.sort_by_key(|info| parse_semver(&info.version).unwrap_or((0, 0, 0)));
    Ok(infos)
}

// ============================================================================
// SECTION: Version Comparison
// ============================================================================

/// Single field change between two profile versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileFieldChange {
    /// Field name.
    pub field: String,
    /// Value in the older version.
    pub old_value: String,
    /// Value in the newer version.
    pub new_value: String,
}

/// Structural diff between two profile versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileVersionDiff {
    /// Profile identifier.
    pub profile_id: ProfileId,
    /// Older version string.
    pub from_version: String,
    /// Newer version string.
    pub to_version: String,
    /// Packs present only in the newer version.
    pub packs_added: Vec<String>,
    /// Packs present only in the older version.
    pub packs_removed: Vec<String>,
    /// Scalar field changes.
    pub field_changes: Vec<ProfileFieldChange>,
}

/// Compares two stored profile versions.
///
/// # Errors
///
/// Returns [`LifecycleError::NotFound`] when either version is missing.
pub fn compare_profile_versions<S: ProfileStore>(
    store: &S,
    profile_id: &ProfileId,
    from_version: &str,
    to_version: &str,
) -> Result<ProfileVersionDiff, LifecycleError> {
    let from = store
        .load_version(profile_id, from_version)?
        .ok_or_else(|| LifecycleError::NotFound(format!("{profile_id}@{from_version}")))?;
    let to = store
        .load_version(profile_id, to_version)?
        .ok_or_else(|| LifecycleError::NotFound(format!("{profile_id}@{to_version}")))?;

    let packs_added = to
        .default_packs
        .iter()
        .filter(|pack| !from.default_packs.contains(pack))
        .map(ToString::to_string)
        .collect();
    let packs_removed = from
        .default_packs
        .iter()
        .filter(|pack| !to.default_packs.contains(pack))
        .map(ToString::to_string)
        .collect();

    let mut field_changes = Vec::new();
    let mut compare_field = |field: &str, old_value: String, new_value: String| {
        if old_value != new_value {
            field_changes.push(ProfileFieldChange {
                field: field.to_string(),
                old_value,
                new_value,
            });
        }
    };
    compare_field(
        "name",
        from.name.clone().unwrap_or_default(),
        to.name.clone().unwrap_or_default(),
    );
    compare_field(
        "profile_type",
        from.profile_type.as_str().to_string(),
        to.profile_type.as_str().to_string(),
    );
    compare_field("state", from.state.as_str().to_string(), to.state.as_str().to_string());

    Ok(ProfileVersionDiff {
        profile_id: profile_id.clone(),
        from_version: from.version,
        to_version: to.version,
        packs_added,
        packs_removed,
        field_changes,
    })
}

// ============================================================================
// SECTION: Bundles
// ============================================================================

/// Creates a profile bundle after basic validation.
///
/// # Errors
///
/// Returns [`LifecycleError::InvalidBundle`] for an empty profile list and
/// [`LifecycleError::Store`] when the bundle already exists.
pub fn create_bundle<S: ProfileStore, A: AuditLog>(
    store: &S,
    audit: &A,
    bundle: &ProfileBundle,
    actor: &ActorId,
    role: Role,
    at: Timestamp,
) -> Result<(), LifecycleError> {
    if bundle.profile_ids.is_empty() {
        return Err(LifecycleError::InvalidBundle(format!(
            "bundle {} must reference at least one profile",
            bundle.bundle_id
        )));
    }
    store.create_bundle(bundle)?;
    audit.append(&AuditEvent {
        timestamp: at,
        actor: actor.clone(),
        role,
        entity_kind: AuditEntityKind::ProfileBundle,
        entity_id: bundle.bundle_id.to_string(),
        action: "create".to_string(),
        from_state: "absent".to_string(),
        to_state: "present".to_string(),
        result: AuditResult::Applied,
        reason: None,
    })?;
    Ok(())
}
