//! Unit-price rounding with total compensation.
//!
//! Quotations show unit prices on a denomination grid (multiples of 5 by
//! default). Rounding every price independently drifts the total, so after
//! plain rounding the accumulated error is pushed back into the prices whose
//! unrounded value was closest to the next grid line.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// The default grid step.
pub const DEFAULT_ROUNDING_STEP: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Prices below this value round to zero.
pub const DEFAULT_ROUNDING_MINIMUM: Decimal = Decimal::from_parts(25, 0, 0, false, 1);

/// One line to be rounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundingItem {
    /// Optional caller reference, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Quantity on the line.
    pub quantity: Decimal,
    /// Total cost of the line (unit price × quantity before rounding).
    #[serde(alias = "unit_total")]
    pub total: Decimal,
}

/// One rounded line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundedItem {
    /// Caller reference from the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Quantity on the line.
    pub quantity: Decimal,
    /// Unrounded unit price (zero for lines that were not rounded).
    pub original_unit_price: Decimal,
    /// Unit price on the grid.
    pub rounded_unit_price: Decimal,
    /// Rounded unit price × quantity.
    pub rounded_total: Decimal,
    /// Compensation applied on top of plain rounding.
    pub adjustment: Decimal,
}

/// The outcome of rounding a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingResult {
    /// Rounded lines, in input order.
    pub items: Vec<RoundedItem>,
    /// Sum of input totals of the rounded lines.
    pub original_total: Decimal,
    /// Sum of rounded totals.
    pub rounded_total: Decimal,
    /// Accumulated error of plain rounding.
    pub total_error: Decimal,
    /// Error left after compensation.
    pub residual_error: Decimal,
    /// Whether compensation ran.
    pub compensated: bool,
}

/// Rounds a value to the nearest multiple of `step`.
///
/// Values below `minimum` become zero; midpoints round away from zero. A
/// non-positive `step` leaves the value unchanged.
///
/// # Errors
///
/// Returns `CalculationError` when `value / step` does not fit a decimal,
/// which happens for very small steps.
///
/// # Examples
///
/// ```
/// use markup_engine::calculation::round_to_step;
/// use rust_decimal::Decimal;
///
/// let step = Decimal::new(5, 0);
/// let minimum = Decimal::new(25, 1);
/// assert_eq!(round_to_step(Decimal::new(1074, 1), step, minimum).unwrap(), Decimal::new(105, 0));
/// assert_eq!(round_to_step(Decimal::new(24, 1), step, minimum).unwrap(), Decimal::ZERO);
/// ```
pub fn round_to_step(value: Decimal, step: Decimal, minimum: Decimal) -> EngineResult<Decimal> {
    if step <= Decimal::ZERO {
        return Ok(value);
    }
    if value < minimum {
        return Ok(Decimal::ZERO);
    }
    let units = checked(value.checked_div(step), "grid units")?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    checked(units.checked_mul(step), "rounded price")
}

fn checked(value: Option<Decimal>, what: &str) -> EngineResult<Decimal> {
    value.ok_or_else(|| EngineError::CalculationError {
        message: format!("arithmetic overflow while rounding {}", what),
    })
}

struct Candidate {
    index: usize,
    quantity: Decimal,
    fractional_part: Decimal,
}

/// Rounds the unit prices of a batch and compensates the total error.
///
/// Lines with a positive quantity and a positive total are rounded with
/// [`round_to_step`]; other lines come back with zero prices. When the summed
/// error `Σ (rounded - price) × quantity` is at least one `step` in magnitude,
/// lines are visited in descending order of the fractional part of their
/// unrounded price. Each visited line moves by the largest whole number of
/// steps whose effect on the total stays within the remaining error, against
/// the sign of that error. Compensation stops once less than one step of
/// error remains. Prices never go below zero.
///
/// # Errors
///
/// Returns `CalculationError` when a unit price, line total or the summed
/// error overflows, e.g. a tiny quantity against a large total.
///
/// # Examples
///
/// ```
/// use markup_engine::calculation::{round_batch, RoundingItem};
/// use rust_decimal::Decimal;
///
/// let items = vec![
///     RoundingItem { id: None, quantity: Decimal::ONE, total: Decimal::new(1074, 1) },
///     RoundingItem { id: None, quantity: Decimal::ONE, total: Decimal::new(1026, 1) },
/// ];
/// let result = round_batch(&items, Decimal::new(5, 0), Decimal::new(25, 1)).unwrap();
/// assert_eq!(result.items[0].rounded_unit_price, Decimal::new(105, 0));
/// assert_eq!(result.items[1].rounded_unit_price, Decimal::new(105, 0));
/// assert!(!result.compensated);
/// ```
pub fn round_batch(
    items: &[RoundingItem],
    step: Decimal,
    minimum: Decimal,
) -> EngineResult<RoundingResult> {
    let mut rounded_items = Vec::with_capacity(items.len());
    let mut candidates = Vec::with_capacity(items.len());
    let mut original_total = Decimal::ZERO;
    let mut total_error = Decimal::ZERO;

    for (index, item) in items.iter().enumerate() {
        if item.quantity <= Decimal::ZERO || item.total <= Decimal::ZERO {
            rounded_items.push(RoundedItem {
                id: item.id.clone(),
                quantity: item.quantity,
                original_unit_price: Decimal::ZERO,
                rounded_unit_price: Decimal::ZERO,
                rounded_total: Decimal::ZERO,
                adjustment: Decimal::ZERO,
            });
            continue;
        }

        let price = checked(item.total.checked_div(item.quantity), "unit price")?;
        let rounded = round_to_step(price, step, minimum)?;
        let line_error = checked(
            checked(rounded.checked_sub(price), "line error")?.checked_mul(item.quantity),
            "line error",
        )?;
        total_error = checked(total_error.checked_add(line_error), "total error")?;
        original_total = checked(original_total.checked_add(item.total), "original total")?;

        candidates.push(Candidate {
            index,
            quantity: item.quantity,
            fractional_part: price - price.floor(),
        });
        rounded_items.push(RoundedItem {
            id: item.id.clone(),
            quantity: item.quantity,
            original_unit_price: price,
            rounded_unit_price: rounded,
            rounded_total: checked(rounded.checked_mul(item.quantity), "line total")?,
            adjustment: Decimal::ZERO,
        });
    }

    let compensated = step > Decimal::ZERO && total_error.abs() >= step;
    let mut remaining = total_error;

    if compensated {
        // Stable sort: ties keep input order.
        candidates.sort_by(|a, b| b.fractional_part.cmp(&a.fractional_part));

        for candidate in &candidates {
            if remaining.abs() < step {
                break;
            }

            let item = &mut rounded_items[candidate.index];
            let per_unit = checked(remaining.abs().checked_div(candidate.quantity), "adjustment")?;
            let mut steps = checked(per_unit.checked_div(step), "adjustment")?.floor();
            if remaining > Decimal::ZERO {
                let available = checked(item.rounded_unit_price.checked_div(step), "adjustment")?;
                steps = steps.min(available.floor());
            }
            if steps.is_zero() {
                continue;
            }

            let magnitude = checked(steps.checked_mul(step), "adjustment")?;
            let delta = if remaining > Decimal::ZERO {
                magnitude
            } else {
                -magnitude
            };
            item.rounded_unit_price =
                checked(item.rounded_unit_price.checked_sub(delta), "adjusted price")?;
            item.adjustment = checked(item.adjustment.checked_sub(delta), "adjustment")?;
            item.rounded_total = checked(
                item.rounded_unit_price.checked_mul(item.quantity),
                "line total",
            )?;
            let effect = checked(delta.checked_mul(candidate.quantity), "residual error")?;
            remaining = checked(remaining.checked_sub(effect), "residual error")?;
        }

        debug!(
            total_error = %total_error,
            residual_error = %remaining,
            "Applied rounding compensation"
        );
    }

    let rounded_total = rounded_items.iter().try_fold(Decimal::ZERO, |sum, item| {
        checked(sum.checked_add(item.rounded_total), "rounded total")
    })?;

    Ok(RoundingResult {
        items: rounded_items,
        original_total,
        rounded_total,
        total_error,
        residual_error: remaining,
        compensated,
    })
}
