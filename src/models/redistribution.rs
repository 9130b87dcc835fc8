//! Cost redistribution rule types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A percentage cut taken from the work cost of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRule {
    /// The detail cost category to deduct from.
    pub category_id: String,
    /// Percentage of the category's work cost to deduct.
    pub percentage: Decimal,
}

/// A category that receives part of the deducted amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCost {
    /// The detail cost category to add to.
    pub category_id: String,
}

/// The work cost of one BOQ item, as fed to the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemWorkCost {
    /// The BOQ item.
    pub item_id: String,
    /// Its current work cost.
    pub work_cost: Decimal,
}
