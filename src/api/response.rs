//! Response types for the Markup Engine API.
//!
//! This module defines the success bodies that are not plain domain types,
//! the error response structures, and the mapping from engine errors to HTTP.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{PositionReport, SequenceEvaluation};
use crate::error::EngineError;
use crate::models::AuditStep;

/// Response body for the `/evaluate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResponse {
    /// The final value.
    pub result: Decimal,
    /// Every step result, in order.
    pub step_results: Vec<Decimal>,
    /// Parameters that resolved to zero because they were not set.
    pub missing_parameters: Vec<String>,
    /// One audit step per evaluated step.
    pub audit_steps: Vec<AuditStep>,
}

impl From<SequenceEvaluation> for EvaluationResponse {
    fn from(evaluation: SequenceEvaluation) -> Self {
        Self {
            result: evaluation.result,
            step_results: evaluation.step_results,
            missing_parameters: evaluation.missing_parameters,
            audit_steps: evaluation.audit_steps,
        }
    }
}

/// Response body for the `/leaves` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeavesResponse {
    /// Leaf position ids, in position-number order.
    pub leaf_ids: Vec<String>,
    /// Per-position aggregation.
    pub report: PositionReport,
}

/// Response body for the `/validate/tactic` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    /// True when no violations were found.
    pub valid: bool,
    /// Human-readable violations.
    pub violations: Vec<String>,
}

impl From<Vec<String>> for ValidationResponse {
    fn from(violations: Vec<String>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a tactic not found error response.
    pub fn tactic_not_found(name: &str) -> Self {
        Self::with_details(
            "TACTIC_NOT_FOUND",
            format!("Markup tactic not found: {}", name),
            format!("The tactic '{}' is not configured in this engine", name),
        )
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::ConfigNotFound { path } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration error",
                    format!("Configuration file not found: {}", path),
                ),
            },
            EngineError::ConfigParseError { path, message } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration parse error",
                    format!("Failed to parse {}: {}", path, message),
                ),
            },
            EngineError::TacticNotFound { name } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::tactic_not_found(&name),
            },
            EngineError::SequenceNotDefined { tactic, item_type } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::with_details(
                    "SEQUENCE_NOT_DEFINED",
                    format!("Tactic '{}' defines no sequence for '{}'", tactic, item_type),
                    "Add a sequence for the item type or use another tactic",
                ),
            },
            EngineError::InvalidStep { step, message } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::with_details(
                    "INVALID_STEP",
                    format!("Invalid step '{}': {}", step, message),
                    "The step record could not be converted",
                ),
            },
            EngineError::InvalidStepReference { step, reference } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::with_details(
                    "INVALID_STEP_REFERENCE",
                    format!("Step {} references step {}", step, reference),
                    "Steps may only reference the original base or earlier steps",
                ),
            },
            EngineError::NonFiniteResult { step, message } => ApiErrorResponse {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: ApiError::with_details(
                    "NON_FINITE_RESULT",
                    format!("Step {} has no finite result", step),
                    message,
                ),
            },
            EngineError::ItemCalculation { item_id, source } => {
                let mut response = ApiErrorResponse::from(*source);
                let details = match response.error.details.take() {
                    Some(inner) => format!("BOQ item '{}': {}", item_id, inner),
                    None => format!("BOQ item '{}'", item_id),
                };
                response.error.details = Some(details);
                response
            }
            EngineError::ValidationFailed { violations } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::with_details(
                    "VALIDATION_ERROR",
                    "Validation failed",
                    violations.join("; "),
                ),
            },
            EngineError::CalculationError { message } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details("CALCULATION_ERROR", "Calculation failed", message),
            },
        }
    }
}
