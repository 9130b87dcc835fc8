//! HTTP API module for the Markup Engine.
//!
//! This module exposes the calculation core as a stateless JSON service over
//! the loaded configuration.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    BoqItemRequest, CalculationRequest, EvaluateRequest, LeavesRequest, RedistributeRequest,
    RedistributionItemRequest, RoundRequest,
};
pub use response::{ApiError, EvaluationResponse, LeavesResponse, ValidationResponse};
pub use state::AppState;
