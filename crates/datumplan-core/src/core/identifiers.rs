// crates/datumplan-core/src/core/identifiers.rs
// ============================================================================
// Module: Datum Identifiers
// Description: Canonical opaque identifiers for Datum catalog and plan records.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical string-based identifiers used throughout
//! Datum. Identifiers are opaque and serialize as strings. Validation is
//! handled at catalog or runtime boundaries rather than within these simple
//! wrappers. Content-addressed identifiers (decision ids, step ids) are
//! derived in `core::hashing` and stored here as plain strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares an opaque string identifier newtype.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Catalog Identifiers
// ============================================================================

string_id! {
    /// Standards pack identifier (e.g. an IPC or agency document pack).
    PackId
}

string_id! {
    /// Rule identifier, unique within the catalog.
    RuleId
}

string_id! {
    /// Standards profile identifier.
    ProfileId
}

string_id! {
    /// Profile bundle identifier.
    BundleId
}

string_id! {
    /// Industry profile identifier (e.g. `space`, `medical`).
    IndustryId
}

// ============================================================================
// SECTION: Run and Plan Identifiers
// ============================================================================

string_id! {
    /// Standards-overlay run identifier.
    SoeRunId
}

string_id! {
    /// Content-addressed decision identifier (fixed-length hex prefix).
    DecisionId
}

string_id! {
    /// Release gate identifier.
    GateId
}

string_id! {
    /// Datum plan identifier.
    PlanId
}

string_id! {
    /// Quote identifier referencing the commercial input to a plan.
    QuoteId
}

string_id! {
    /// Content-addressed plan step identifier.
    StepId
}

string_id! {
    /// Declared test identifier within a plan.
    TestId
}

string_id! {
    /// Evidence-intent identifier within a plan.
    EvidenceId
}

// ============================================================================
// SECTION: Actor Identifiers
// ============================================================================

string_id! {
    /// Actor identifier for audit attribution.
    ActorId
}
