// crates/datumplan-core/src/core/audit.rs
// ============================================================================
// Module: Datum Audit Events
// Description: Structured audit events for lifecycle and governance mutations.
// Purpose: Record every mutation attempt, including denied ones.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! Every mutating operation on plans and profiles emits an audit event,
//! whether it was applied or denied. Denied attempts keep `from_state ==
//! to_state` and carry `result = denied`. Events for a given entity are
//! totally ordered by their position in the append-only log.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Caller role used for authorization and audit attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// External customer.
    Customer,
    /// Operations staff.
    Ops,
    /// Quality assurance staff.
    Qa,
    /// Administrator.
    Admin,
}

impl Role {
    /// Returns true when the role may approve and mutate governed artifacts.
    #[must_use]
    pub const fn can_approve(self) -> bool {
        matches!(self, Self::Ops | Self::Admin)
    }
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Entity classification for audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEntityKind {
    /// Datum plan.
    DatumPlan,
    /// Standards profile.
    StandardsProfile,
    /// Profile bundle.
    ProfileBundle,
    /// Plan export record.
    PlanExport,
}

/// Outcome of a mutation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    /// The mutation was applied.
    Applied,
    /// The mutation was denied; state is unchanged.
    Denied,
}

impl AuditResult {
    /// Returns the stable wire label for the result.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Denied => "denied",
        }
    }
}

/// Structured audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event timestamp.
    pub timestamp: Timestamp,
    /// Acting user.
    pub actor: ActorId,
    /// Acting role.
    pub role: Role,
    /// Entity classification.
    pub entity_kind: AuditEntityKind,
    /// Entity identifier.
    pub entity_id: String,
    /// Operation name (submit, approve, reject, edit, export, ...).
    pub action: String,
    /// State before the attempt.
    pub from_state: String,
    /// State after the attempt; equals `from_state` on denial.
    pub to_state: String,
    /// Attempt outcome.
    pub result: AuditResult,
    /// Reason supplied with the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
