// crates/datumplan-api/src/error.rs
// ============================================================================
// Module: Datum API Errors
// Description: Uniform error body and status mapping for the HTTP surface.
// Purpose: Surface structured core errors at the request boundary.
// Dependencies: axum, serde, datumplan-core
// ============================================================================

//! ## Overview
//! Every failure leaves the API as a uniform `{code, message, detail?}` JSON
//! body. Core errors carry stable codes; this module adds the HTTP status
//! mapping and the `SOE_BLOCKED` umbrella over engine sub-codes. No error
//! crosses a module boundary as an exception.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use datumplan_core::ExportError;
use datumplan_core::LifecycleError;
use datumplan_core::PlanError;
use datumplan_core::ReportError;
use datumplan_core::SoeError;
use datumplan_core::StoreError;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Error Body
// ============================================================================

/// Uniform API error body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    /// HTTP status for the response.
    #[serde(skip)]
    pub status: StatusCode,
}

impl ApiError {
    /// Builds an error body.
    #[must_use]
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            detail: None,
            status,
        }
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// 401 for missing or unknown credentials.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "missing or unknown bearer token")
    }

    /// 403 for authenticated callers lacking a required role.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", "caller role is not permitted")
    }

    /// 404 for missing entities.
    #[must_use]
    pub fn not_found(entity: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{entity} not found"))
    }

    /// 400 for malformed request input.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// SECTION: Core Error Mapping
// ============================================================================

impl From<SoeError> for ApiError {
    fn from(err: SoeError) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "SOE_BLOCKED", err.to_string())
            .with_detail(json!({"sub_code": err.code()}))
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        let status = match &err {
            PlanError::InvalidEdit(_)
            | PlanError::OverrideMissingReason(_)
            | PlanError::ReasonRequired(_)
            | PlanError::Hash(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PlanError::StateTransitionInvalid {
                ..
            }
            | PlanError::ApprovedImmutable
            | PlanError::EmptyPlan(_) => StatusCode::CONFLICT,
            PlanError::Forbidden(_) => StatusCode::FORBIDDEN,
            PlanError::NotFound(_) => StatusCode::NOT_FOUND,
            PlanError::Store(StoreError::VersionConflict {
                ..
            }) => StatusCode::CONFLICT,
            PlanError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let status = match &err {
            LifecycleError::StateTransitionInvalid {
                ..
            }
            | LifecycleError::Immutable(_) => StatusCode::CONFLICT,
            LifecycleError::ReasonRequired(_)
            | LifecycleError::InvalidVersion(_)
            | LifecycleError::InvalidBundle(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LifecycleError::Forbidden(_) => StatusCode::FORBIDDEN,
            LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
            LifecycleError::Store(StoreError::VersionConflict {
                ..
            }) => StatusCode::CONFLICT,
            LifecycleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        let status = match &err {
            ExportError::RequiresApproval {
                ..
            }
            | ExportError::TierInsufficient {
                ..
            } => StatusCode::CONFLICT,
            ExportError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            ExportError::Hash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        let status = match &err {
            ReportError::RequiresApproval {
                ..
            } => StatusCode::CONFLICT,
            ReportError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            ReportError::Hash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::VersionConflict {
                ..
            } => StatusCode::CONFLICT,
            StoreError::VersionNotFound {
                ..
            } => StatusCode::NOT_FOUND,
            StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let code = match &err {
            StoreError::VersionConflict {
                ..
            } => "VERSION_CONFLICT",
            StoreError::VersionNotFound {
                ..
            } => "NOT_FOUND",
            StoreError::Backend(_) => "STORE_ERROR",
        };
        Self::new(status, code, err.to_string())
    }
}

impl From<datumplan_core::runtime::GenerateError> for ApiError {
    fn from(err: datumplan_core::runtime::GenerateError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "CANONICALIZATION_FAILED", err.to_string())
    }
}
