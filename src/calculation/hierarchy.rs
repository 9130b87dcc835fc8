//! Leaf derivation and cost aggregation over the flat position list.
//!
//! Positions are never materialised as a tree. Structure is derived from the
//! ordered list by looking ahead: a position is a header only when the next
//! non-additional position is strictly deeper.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{AuditWarning, ClientPosition, ItemCommercialCost};

/// Classifies every position as leaf (`true`) or header (`false`).
///
/// `positions` must already be sorted by position number. Additional rows are
/// skipped when looking for the next position, so they never change the
/// classification of the row they were inserted under.
pub fn leaf_flags(positions: &[ClientPosition]) -> Vec<bool> {
    let mut flags = vec![false; positions.len()];
    let mut next_level: Option<i32> = None;

    for (index, position) in positions.iter().enumerate().rev() {
        flags[index] = match next_level {
            None => true,
            Some(level) => position.hierarchy_level >= level,
        };
        if !position.is_additional {
            next_level = Some(position.hierarchy_level);
        }
    }

    flags
}

/// Returns the ids of all leaf positions.
///
/// # Examples
///
/// ```
/// use markup_engine::calculation::compute_leaves;
/// use markup_engine::models::ClientPosition;
/// use rust_decimal::Decimal;
///
/// let positions: Vec<ClientPosition> = [1, 2, 2, 1]
///     .iter()
///     .enumerate()
///     .map(|(i, level)| ClientPosition::new(format!("p{}", i), Decimal::from(i as i64), *level))
///     .collect();
///
/// let leaves = compute_leaves(&positions);
/// assert!(!leaves.contains("p0"));
/// assert!(leaves.contains("p1") && leaves.contains("p2") && leaves.contains("p3"));
/// ```
pub fn compute_leaves(positions: &[ClientPosition]) -> HashSet<String> {
    positions
        .iter()
        .zip(leaf_flags(positions))
        .filter(|(_, is_leaf)| *is_leaf)
        .map(|(position, _)| position.id.clone())
        .collect()
}

/// Returns true if the position at `index` is a leaf.
pub fn is_leaf_at(positions: &[ClientPosition], index: usize) -> bool {
    let Some(current) = positions.get(index) else {
        return false;
    };
    match positions[index + 1..].iter().find(|p| !p.is_additional) {
        None => true,
        Some(next) => current.hierarchy_level >= next.hierarchy_level,
    }
}

/// Money amounts accumulated for a position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCost {
    /// Sum of base amounts.
    pub base_amount: Decimal,
    /// Sum of commercial amounts.
    pub commercial_amount: Decimal,
    /// Sum of material costs.
    pub material_cost: Decimal,
    /// Sum of work costs.
    pub work_cost: Decimal,
}

impl PositionCost {
    fn add(&mut self, other: &PositionCost) {
        self.base_amount += other.base_amount;
        self.commercial_amount += other.commercial_amount;
        self.material_cost += other.material_cost;
        self.work_cost += other.work_cost;
    }

    fn add_item(&mut self, item: &ItemCommercialCost) {
        self.base_amount += item.base_amount;
        self.commercial_amount += item.commercial_amount;
        self.material_cost += item.material_cost;
        self.work_cost += item.work_cost;
    }
}

/// Aggregated costs of one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSummary {
    /// The position.
    pub position_id: String,
    /// Its depth.
    pub hierarchy_level: i32,
    /// Whether it is an additional row.
    pub is_additional: bool,
    /// Whether it is a leaf.
    pub is_leaf: bool,
    /// Number of items attached directly.
    pub item_count: usize,
    /// Costs of the directly attached items.
    pub direct: PositionCost,
    /// Direct costs plus those of every position in its section.
    pub section: PositionCost,
}

/// The result of aggregating item costs over the position list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionReport {
    /// One summary per position, in list order.
    pub positions: Vec<PositionSummary>,
    /// Items without a known position.
    pub unattached_items: Vec<String>,
    /// Structural warnings.
    pub warnings: Vec<AuditWarning>,
}

/// Aggregates item costs per position and per section.
///
/// A non-additional position's section runs until the next non-additional
/// position at the same or a shallower level; additional rows never head a
/// section but count towards the sections they fall in. Items attached to a
/// header position are still counted and produce a warning.
pub fn summarize_positions(
    positions: &[ClientPosition],
    items: &[ItemCommercialCost],
) -> PositionReport {
    let flags = leaf_flags(positions);
    let index_by_id: HashMap<&str, usize> = positions
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), i))
        .collect();

    let mut direct = vec![PositionCost::default(); positions.len()];
    let mut counts = vec![0usize; positions.len()];
    let mut unattached_items = Vec::new();
    let mut warnings = Vec::new();

    for item in items {
        let index = item
            .client_position_id
            .as_deref()
            .and_then(|id| index_by_id.get(id).copied());
        match index {
            Some(index) => {
                direct[index].add_item(item);
                counts[index] += 1;
                if !flags[index] {
                    warnings.push(AuditWarning::new(
                        "ITEM_ON_HEADER_POSITION",
                        format!(
                            "Item '{}' is attached to header position '{}'",
                            item.item_id, positions[index].id
                        ),
                        "medium",
                    ));
                }
            }
            None => {
                debug!(item_id = %item.item_id, "Item has no known position");
                unattached_items.push(item.item_id.clone());
            }
        }
    }

    let mut section = direct.clone();
    let mut open: Vec<usize> = Vec::new();
    for (index, position) in positions.iter().enumerate() {
        if !position.is_additional {
            while let Some(&top) = open.last() {
                if positions[top].hierarchy_level >= position.hierarchy_level {
                    open.pop();
                } else {
                    break;
                }
            }
        }
        for &header in &open {
            let cost = direct[index];
            section[header].add(&cost);
        }
        if !position.is_additional {
            open.push(index);
        }
    }

    let summaries = positions
        .iter()
        .enumerate()
        .map(|(index, position)| PositionSummary {
            position_id: position.id.clone(),
            hierarchy_level: position.hierarchy_level,
            is_additional: position.is_additional,
            is_leaf: flags[index],
            item_count: counts[index],
            direct: direct[index],
            section: section[index],
        })
        .collect();

    PositionReport {
        positions: summaries,
        unattached_items,
        warnings,
    }
}
