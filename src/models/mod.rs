//! Core data models for the Markup Engine.
//!
//! This module contains all the domain models used throughout the engine.

mod boq_item;
mod calculation_result;
mod distribution;
mod parameters;
mod position;
mod redistribution;
mod tactic;

pub use boq_item::{BoqItem, BoqItemType, MaterialKind};
pub use calculation_result::{
    AuditStep, AuditTrace, AuditWarning, CommercialTotals, ItemCommercialCost,
    TenderCalculationResult,
};
pub use distribution::{CategoryKind, CostBucket, DistributionRule, PricingDistributionConfig};
pub use parameters::{ParameterResolution, TenderMarkupParameters};
pub use position::{ClientPosition, sort_by_position_number};
pub use redistribution::{ItemWorkCost, SourceRule, TargetCost};
pub use tactic::{
    Action, MAX_OPERATIONS, MarkupTactic, MultiplyFormat, ORIGINAL_BASE_INDEX, Operand,
    OperandType, Operation, Step, StepRecord, StepSource,
};
