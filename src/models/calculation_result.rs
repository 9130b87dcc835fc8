//! Calculation result models for the Markup Engine.
//!
//! This module contains the [`TenderCalculationResult`] type and its associated
//! structures that capture all outputs of pricing a tender: per-item commercial
//! costs, totals, and the audit trace explaining how each number was derived.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BoqItemType;

/// The commercial pricing of one BOQ item.
///
/// # Example
///
/// ```
/// use markup_engine::models::{BoqItemType, ItemCommercialCost};
/// use rust_decimal::Decimal;
///
/// let cost = ItemCommercialCost {
///     item_id: "boq_001".to_string(),
///     item_type: BoqItemType::Material,
///     client_position_id: Some("pos_001".to_string()),
///     quantity: Decimal::new(2, 0),
///     base_amount: Decimal::new(100, 0),
///     commercial_amount: Decimal::new(150, 0),
///     markup: Decimal::new(50, 0),
///     markup_coefficient: Some(Decimal::new(15, 1)),
///     material_cost: Decimal::new(100, 0),
///     work_cost: Decimal::new(50, 0),
///     detail_cost_category_id: None,
/// };
/// assert_eq!(cost.material_cost + cost.work_cost, cost.commercial_amount);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCommercialCost {
    /// The priced item.
    pub item_id: String,
    /// The item's type.
    pub item_type: BoqItemType,
    /// The owning position, if any.
    pub client_position_id: Option<String>,
    /// Quantity on the line.
    pub quantity: Decimal,
    /// Direct cost, copied from the input.
    pub base_amount: Decimal,
    /// Sell-side cost after the tactic.
    pub commercial_amount: Decimal,
    /// Commercial minus base; negative when a tactic reduces cost.
    pub markup: Decimal,
    /// Commercial divided by base; absent for a zero base.
    pub markup_coefficient: Option<Decimal>,
    /// Portion booked to the material bucket.
    pub material_cost: Decimal,
    /// Portion booked to the work bucket.
    pub work_cost: Decimal,
    /// The detail cost category, carried over for redistribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_cost_category_id: Option<String>,
}

/// Aggregated totals for a tender calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommercialTotals {
    /// Sum of base amounts.
    pub base_amount: Decimal,
    /// Sum of commercial amounts.
    pub commercial_amount: Decimal,
    /// Sum of markups.
    pub markup: Decimal,
    /// Sum of material costs.
    pub material_cost: Decimal,
    /// Sum of work costs.
    pub work_cost: Decimal,
}

impl CommercialTotals {
    /// Sums the given item costs.
    pub fn from_items(items: &[ItemCommercialCost]) -> Self {
        items.iter().fold(Self::default(), |mut totals, item| {
            totals.base_amount += item.base_amount;
            totals.commercial_amount += item.commercial_amount;
            totals.markup += item.markup;
            totals.material_cost += item.material_cost;
            totals.work_cost += item.work_cost;
            totals
        })
    }
}

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings flag silently applied defaults and imbalances; they never stop
/// a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level ("low", "medium", "high").
    pub severity: String,
}

impl AuditWarning {
    /// Creates a warning.
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: severity.into(),
        }
    }
}

/// The complete audit trace for a calculation.
///
/// # Example
///
/// ```
/// use markup_engine::models::AuditTrace;
///
/// let trace = AuditTrace {
///     steps: vec![],
///     warnings: vec![],
///     duration_us: 1234,
/// };
/// assert!(trace.steps.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

/// The complete result of pricing a tender's BOQ items with one tactic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderCalculationResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// The tactic that was applied.
    pub tactic: String,
    /// Per-item commercial costs, in input order.
    pub items: Vec<ItemCommercialCost>,
    /// Aggregated totals.
    pub totals: CommercialTotals,
    /// Complete audit trace of calculation decisions.
    pub audit_trace: AuditTrace,
}
