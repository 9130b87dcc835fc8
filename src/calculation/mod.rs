//! Calculation logic for the Markup Engine.
//!
//! Every function here is pure and synchronous: it works on in-memory inputs
//! and returns its results together with enough detail to audit them.

mod commercial;
mod hierarchy;
mod pricing_distribution;
mod redistribution;
mod sequence;
mod smart_rounding;
mod validation;

pub use commercial::{CommercialCalculation, calculate_commercial_costs};
pub use hierarchy::{
    PositionCost, PositionReport, PositionSummary, compute_leaves, is_leaf_at, leaf_flags,
    summarize_positions,
};
pub use pricing_distribution::{
    PricingSplit, PricingSplitResult, RuleSource, resolve_rule, split, split_by_kind_name,
    split_with_audit,
};
pub use redistribution::{
    BALANCE_TOLERANCE, ItemRedistribution, RedistributionResult, SourceDeduction,
    TargetAllocation, redistribute, redistribute_with_tolerance,
};
pub use sequence::{SequenceEvaluation, evaluate, evaluate_sequence};
pub use smart_rounding::{
    DEFAULT_ROUNDING_MINIMUM, DEFAULT_ROUNDING_STEP, RoundedItem, RoundingItem, RoundingResult,
    round_batch, round_to_step,
};
pub use validation::{validate_redistribution, validate_sequence, validate_tactic};
