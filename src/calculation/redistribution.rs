//! Cost redistribution between detail cost categories.
//!
//! Work cost is taken from source categories by percentage and spread over
//! target categories in proportion to their existing work cost. Within a
//! category every amount is shared out over its items by the same proportion.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditWarning, ItemWorkCost, SourceRule, TargetCost};

/// Largest difference between deducted and added totals that still counts as balanced.
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Per-item outcome of a redistribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRedistribution {
    /// The item.
    pub item_id: String,
    /// Its category, if mapped.
    pub category_id: Option<String>,
    /// Work cost before redistribution.
    pub original_work_cost: Decimal,
    /// Amount taken by source rules.
    pub deducted: Decimal,
    /// Amount received as a target.
    pub added: Decimal,
    /// `original_work_cost - deducted + added`.
    pub final_work_cost: Decimal,
}

/// What one source rule took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDeduction {
    /// The source category.
    pub category_id: String,
    /// The rule's percentage.
    pub percentage: Decimal,
    /// Work cost of the category before deduction.
    pub base_work_cost: Decimal,
    /// Amount deducted.
    pub deducted: Decimal,
}

/// What one target category received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAllocation {
    /// The target category.
    pub category_id: String,
    /// Work cost of the category before allocation.
    pub work_cost: Decimal,
    /// Fraction of the deducted total assigned to it.
    pub share: Decimal,
    /// Amount that landed on its items.
    pub added: Decimal,
}

/// The complete outcome of a redistribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedistributionResult {
    /// One entry per input item, in input order.
    pub items: Vec<ItemRedistribution>,
    /// One entry per source rule, in rule order.
    pub deductions: Vec<SourceDeduction>,
    /// One entry per target, in target order.
    pub allocations: Vec<TargetAllocation>,
    /// Sum of all deductions.
    pub total_deducted: Decimal,
    /// Sum of all additions.
    pub total_added: Decimal,
    /// Whether the totals agree within tolerance.
    pub is_balanced: bool,
    /// Fallbacks taken and imbalances found.
    pub warnings: Vec<AuditWarning>,
}

fn checked(value: Option<Decimal>, what: &str) -> EngineResult<Decimal> {
    value.ok_or_else(|| EngineError::CalculationError {
        message: format!("arithmetic overflow while computing {}", what),
    })
}

fn proportion(amount: Decimal, part: Decimal, whole: Decimal, what: &str) -> EngineResult<Decimal> {
    let scaled = checked(amount.checked_mul(part), what)?;
    checked(scaled.checked_div(whole), what)
}

/// Redistributes work cost with the default balance tolerance.
///
/// See [`redistribute_with_tolerance`].
pub fn redistribute(
    items: &[ItemWorkCost],
    source_rules: &[SourceRule],
    targets: &[TargetCost],
    category_map: &HashMap<String, String>,
) -> EngineResult<RedistributionResult> {
    redistribute_with_tolerance(items, source_rules, targets, category_map, BALANCE_TOLERANCE)
}

/// Redistributes work cost from source categories to target categories.
///
/// Each source rule deducts `percentage%` of the work cost of every item in
/// its category. The deducted total is then assigned to targets by their share
/// of the combined target work cost, and within a target to its items by their
/// share of that target's work cost.
///
/// When all targets have zero work cost the total is split equally between
/// targets, and within a target equally between its items. A target with no
/// items cannot receive anything, which shows up as an imbalance.
///
/// # Arguments
///
/// * `items` - Work costs of the tender's BOQ items
/// * `source_rules` - Percentage deductions per category
/// * `targets` - Categories receiving the deducted amount
/// * `category_map` - Item id to detail cost category id
/// * `tolerance` - Largest allowed |deducted - added|
///
/// # Errors
///
/// * `CalculationError` if an amount overflows
pub fn redistribute_with_tolerance(
    items: &[ItemWorkCost],
    source_rules: &[SourceRule],
    targets: &[TargetCost],
    category_map: &HashMap<String, String>,
    tolerance: Decimal,
) -> EngineResult<RedistributionResult> {
    let mut results: Vec<ItemRedistribution> = items
        .iter()
        .map(|item| ItemRedistribution {
            item_id: item.item_id.clone(),
            category_id: category_map.get(&item.item_id).cloned(),
            original_work_cost: item.work_cost,
            deducted: Decimal::ZERO,
            added: Decimal::ZERO,
            final_work_cost: item.work_cost,
        })
        .collect();
    let mut warnings = Vec::new();

    let members = |category_id: &str| -> Vec<usize> {
        results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.category_id.as_deref() == Some(category_id))
            .map(|(index, _)| index)
            .collect()
    };
    let source_members: Vec<Vec<usize>> = source_rules.iter().map(|r| members(&r.category_id)).collect();
    let target_members: Vec<Vec<usize>> = targets.iter().map(|t| members(&t.category_id)).collect();

    // Phase 1: deductions
    let mut deductions = Vec::with_capacity(source_rules.len());
    let mut total_deducted = Decimal::ZERO;
    for (rule, indices) in source_rules.iter().zip(&source_members) {
        let rate = checked(rule.percentage.checked_div(Decimal::ONE_HUNDRED), "deduction rate")?;
        let mut base_work_cost = Decimal::ZERO;
        let mut deducted = Decimal::ZERO;
        for &index in indices {
            let item = &mut results[index];
            let amount = checked(item.original_work_cost.checked_mul(rate), "item deduction")?;
            item.deducted += amount;
            base_work_cost += item.original_work_cost;
            deducted += amount;
        }
        if indices.is_empty() {
            warnings.push(AuditWarning::new(
                "SOURCE_CATEGORY_EMPTY",
                format!("Source category '{}' has no items", rule.category_id),
                "low",
            ));
        }
        debug!(category = %rule.category_id, deducted = %deducted, "Source deduction");
        total_deducted += deducted;
        deductions.push(SourceDeduction {
            category_id: rule.category_id.clone(),
            percentage: rule.percentage,
            base_work_cost,
            deducted,
        });
    }

    // Phase 2: allocations
    let target_costs: Vec<Decimal> = target_members
        .iter()
        .map(|indices| indices.iter().map(|&i| results[i].original_work_cost).sum())
        .collect();
    let total_target_cost: Decimal = target_costs.iter().copied().sum();
    let equal_split = total_target_cost.is_zero();
    if equal_split && !targets.is_empty() && !total_deducted.is_zero() {
        warn!("Target categories have no work cost, splitting equally");
        warnings.push(AuditWarning::new(
            "TARGETS_WITHOUT_WORK_COST",
            "Target categories have no work cost; the deducted amount was split equally",
            "medium",
        ));
    }

    let mut allocations = Vec::with_capacity(targets.len());
    let mut total_added = Decimal::ZERO;
    let target_count = Decimal::from(targets.len());
    for ((target, indices), &work_cost) in targets.iter().zip(&target_members).zip(&target_costs) {
        let share = if equal_split {
            checked(Decimal::ONE.checked_div(target_count), "target share")?
        } else {
            checked(work_cost.checked_div(total_target_cost), "target share")?
        };
        let target_amount = checked(total_deducted.checked_mul(share), "target allocation")?;

        let mut added = Decimal::ZERO;
        if indices.is_empty() {
            warnings.push(AuditWarning::new(
                "TARGET_CATEGORY_EMPTY",
                format!("Target category '{}' has no items to receive cost", target.category_id),
                "medium",
            ));
        } else if work_cost.is_zero() {
            if equal_split {
                let count = Decimal::from(indices.len());
                for &index in indices {
                    let amount = checked(target_amount.checked_div(count), "item allocation")?;
                    results[index].added += amount;
                    added += amount;
                }
            }
        } else {
            for &index in indices {
                let item = &mut results[index];
                let amount = proportion(target_amount, item.original_work_cost, work_cost, "item allocation")?;
                item.added += amount;
                added += amount;
            }
        }

        total_added += added;
        allocations.push(TargetAllocation {
            category_id: target.category_id.clone(),
            work_cost,
            share,
            added,
        });
    }

    for item in &mut results {
        item.final_work_cost = item.original_work_cost - item.deducted + item.added;
    }

    let is_balanced = (total_deducted - total_added).abs() < tolerance;
    if !is_balanced {
        warn!(
            total_deducted = %total_deducted,
            total_added = %total_added,
            "Redistribution is not balanced"
        );
        warnings.push(AuditWarning::new(
            "REDISTRIBUTION_IMBALANCE",
            format!(
                "Deducted {} but added {}",
                total_deducted.normalize(),
                total_added.normalize()
            ),
            "high",
        ));
    }

    Ok(RedistributionResult {
        items: results,
        deductions,
        allocations,
        total_deducted,
        total_added,
        is_balanced,
        warnings,
    })
}
