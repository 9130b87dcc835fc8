//! HTTP request handlers for the Markup Engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::borrow::Cow;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{
    calculate_commercial_costs, evaluate_sequence, redistribute_with_tolerance, round_batch,
    summarize_positions, validate_redistribution, validate_sequence, validate_tactic,
};
use crate::config::ConfigLoader;
use crate::error::{EngineError, EngineResult};
use crate::models::{BoqItem, MarkupTactic, TenderCalculationResult, sort_by_position_number};

use super::request::{
    CalculationRequest, EvaluateRequest, LeavesRequest, RedistributeRequest, RoundRequest,
};
use super::response::{
    ApiError, ApiErrorResponse, EvaluationResponse, LeavesResponse, ValidationResponse,
};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calculate", post(calculate_handler))
        .route("/evaluate", post(evaluate_handler))
        .route("/round", post(round_handler))
        .route("/leaves", post(leaves_handler))
        .route("/redistribute", post(redistribute_handler))
        .route("/validate/tactic", post(validate_tactic_handler))
        .with_state(state)
}

fn json_ok<T: Serialize>(body: T) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(error: impl Into<ApiErrorResponse>) -> Response {
    let api_error: ApiErrorResponse = error.into();
    (
        api_error.status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(api_error.error),
    )
        .into_response()
}

fn rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // The body text carries serde's message, including step conversion failures
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") || body_text.contains("Invalid step") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "application/json")],
        Json(error),
    )
        .into_response()
}

/// Picks the inline tactic, the named tactic, or the configured default.
fn resolve_tactic<'a>(
    config: &'a ConfigLoader,
    inline: Option<MarkupTactic>,
    name: Option<&str>,
) -> EngineResult<Cow<'a, MarkupTactic>> {
    match (inline, name) {
        (Some(tactic), _) => {
            let violations: Vec<String> = tactic
                .sequences
                .iter()
                .flat_map(|(item_type, sequence)| {
                    validate_sequence(sequence)
                        .into_iter()
                        .map(move |violation| format!("{}: {}", item_type, violation))
                })
                .collect();
            if violations.is_empty() {
                Ok(Cow::Owned(tactic))
            } else {
                Err(EngineError::ValidationFailed { violations })
            }
        }
        (None, Some(name)) => config.get_tactic(name).map(Cow::Borrowed),
        (None, None) => config.default_tactic().map(Cow::Borrowed),
    }
}

/// Handler for POST /calculate endpoint.
///
/// Prices the BOQ items with the resolved tactic and returns the full result.
async fn calculate_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> impl IntoResponse {
    // Generate correlation ID for request tracking
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing calculation request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let config = state.config();
    let tactic = match resolve_tactic(config, request.inline_tactic, request.tactic.as_deref()) {
        Ok(tactic) => tactic,
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Tactic could not be resolved"
            );
            return error_response(err);
        }
    };

    let items: Vec<BoqItem> = request.items.into_iter().map(Into::into).collect();
    let parameters = config.default_parameters().merged_with(&request.parameters);
    let distribution = request
        .pricing_distribution
        .unwrap_or_else(|| config.pricing_distribution().clone());

    let start_time = Instant::now();
    match calculate_commercial_costs(&items, &tactic, &parameters, &distribution) {
        Ok(calculation) => {
            let result: TenderCalculationResult =
                calculation.into_result(&tactic.name, &config.engine().version);
            info!(
                correlation_id = %correlation_id,
                calculation_id = %result.calculation_id,
                tactic = %result.tactic,
                items_count = result.items.len(),
                commercial_total = %result.totals.commercial_amount,
                duration_us = start_time.elapsed().as_micros(),
                "Calculation completed successfully"
            );
            json_ok(result)
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Calculation failed"
            );
            error_response(err)
        }
    }
}

/// Handler for POST /evaluate endpoint.
///
/// Evaluates a single sequence against a base amount and returns every step.
async fn evaluate_handler(
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let violations = validate_sequence(&request.steps);
    if !violations.is_empty() {
        warn!(correlation_id = %correlation_id, violations = violations.len(), "Sequence rejected");
        return error_response(EngineError::ValidationFailed { violations });
    }

    match evaluate_sequence(request.base_amount, &request.steps, &request.parameters, 1) {
        Ok(evaluation) => {
            info!(
                correlation_id = %correlation_id,
                steps = evaluation.step_results.len(),
                result = %evaluation.result,
                "Sequence evaluated"
            );
            json_ok(EvaluationResponse::from(evaluation))
        }
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Evaluation failed");
            error_response(err)
        }
    }
}

/// Handler for POST /round endpoint.
async fn round_handler(
    State(state): State<AppState>,
    payload: Result<Json<RoundRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let defaults = state.config().rounding();
    let step = request.step.unwrap_or(defaults.step);
    let minimum = request.minimum.unwrap_or(defaults.minimum);

    let mut violations = Vec::new();
    if step <= Decimal::ZERO {
        violations.push(format!("Rounding step must be positive, got {}", step));
    }
    if minimum < Decimal::ZERO {
        violations.push(format!("Rounding minimum must not be negative, got {}", minimum));
    }
    if !violations.is_empty() {
        return error_response(EngineError::ValidationFailed { violations });
    }

    let result = match round_batch(&request.items, step, minimum) {
        Ok(result) => result,
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Rounding failed");
            return error_response(err);
        }
    };
    info!(
        correlation_id = %correlation_id,
        items_count = result.items.len(),
        total_error = %result.total_error,
        residual_error = %result.residual_error,
        "Rounding completed"
    );
    json_ok(result)
}

/// Handler for POST /leaves endpoint.
///
/// Sorts the positions by number, classifies them and aggregates any items sent along.
async fn leaves_handler(payload: Result<Json<LeavesRequest>, JsonRejection>) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();

    let mut request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    sort_by_position_number(&mut request.positions);
    let report = summarize_positions(&request.positions, &request.items);
    let leaf_ids: Vec<String> = report
        .positions
        .iter()
        .filter(|summary| summary.is_leaf)
        .map(|summary| summary.position_id.clone())
        .collect();

    info!(
        correlation_id = %correlation_id,
        positions = request.positions.len(),
        leaves = leaf_ids.len(),
        "Leaves computed"
    );
    json_ok(LeavesResponse { leaf_ids, report })
}

/// Handler for POST /redistribute endpoint.
///
/// Rule sets that fail validation are rejected before anything is computed.
async fn redistribute_handler(
    State(state): State<AppState>,
    payload: Result<Json<RedistributeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let (items, category_map, source_rules, targets) = request.into_parts();
    let violations = validate_redistribution(&source_rules, &targets);
    if !violations.is_empty() {
        warn!(correlation_id = %correlation_id, violations = violations.len(), "Redistribution rejected");
        return error_response(EngineError::ValidationFailed { violations });
    }

    match redistribute_with_tolerance(
        &items,
        &source_rules,
        &targets,
        &category_map,
        state.config().balance_tolerance(),
    ) {
        Ok(result) => {
            info!(
                correlation_id = %correlation_id,
                total_deducted = %result.total_deducted,
                total_added = %result.total_added,
                is_balanced = result.is_balanced,
                "Redistribution completed"
            );
            json_ok(result)
        }
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "Redistribution failed");
            error_response(err)
        }
    }
}

/// Handler for POST /validate/tactic endpoint.
async fn validate_tactic_handler(
    payload: Result<Json<MarkupTactic>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();

    let tactic = match payload {
        Ok(Json(tactic)) => tactic,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let response = ValidationResponse::from(validate_tactic(&tactic));
    info!(
        correlation_id = %correlation_id,
        tactic = %tactic.name,
        valid = response.valid,
        "Tactic validated"
    );
    json_ok(response)
}
