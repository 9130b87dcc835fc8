//! Structural checks for tactics and redistribution rule sets.
//!
//! Validators never fail: they return every violation found as a
//! human-readable message, and an empty list means the input is usable.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::models::{
    Action, MAX_OPERATIONS, MarkupTactic, Operand, SourceRule, Step, StepSource, TargetCost,
};

fn check_reference(source: StepSource, index: usize, what: &str, step: &Step, violations: &mut Vec<String>) {
    if let StepSource::Step(reference) = source {
        if reference >= index {
            violations.push(format!(
                "Step {} ('{}'): {} references step {}, which is not an earlier step",
                index, step.name, what, reference
            ));
        }
    }
}

/// Checks a sequence of steps.
///
/// Every step must have between one and five operations and may only refer
/// to the original base or to earlier steps. Parameter keys must be
/// non-empty and literal divisors must be non-zero.
pub fn validate_sequence(sequence: &[Step]) -> Vec<String> {
    let mut violations = Vec::new();

    for (index, step) in sequence.iter().enumerate() {
        let count = step.operations.len();
        if count == 0 || count > MAX_OPERATIONS {
            violations.push(format!(
                "Step {} ('{}'): must have between 1 and {} operations, found {}",
                index, step.name, MAX_OPERATIONS, count
            ));
        }

        check_reference(step.base, index, "base", step, &mut violations);

        for (position, operation) in step.operations.iter().enumerate() {
            let slot = position + 1;
            match &operation.operand {
                Operand::Parameter { key, .. } => {
                    if key.trim().is_empty() {
                        violations.push(format!(
                            "Step {} ('{}'): operand {} has an empty parameter key",
                            index, step.name, slot
                        ));
                    }
                }
                Operand::Step(source) => {
                    check_reference(*source, index, &format!("operand {}", slot), step, &mut violations);
                }
                Operand::Literal(value) => {
                    if operation.action == Action::Divide && value.is_zero() {
                        violations.push(format!(
                            "Step {} ('{}'): operand {} divides by zero",
                            index, step.name, slot
                        ));
                    }
                }
            }
        }
    }

    violations
}

/// Checks a whole tactic, including item types it has no sequence for.
pub fn validate_tactic(tactic: &MarkupTactic) -> Vec<String> {
    let mut violations = Vec::new();

    if tactic.name.trim().is_empty() {
        violations.push("Tactic name must not be empty".to_string());
    }

    for (item_type, sequence) in &tactic.sequences {
        violations.extend(
            validate_sequence(sequence)
                .into_iter()
                .map(|violation| format!("{}: {}", item_type, violation)),
        );
    }

    for item_type in tactic.missing_types() {
        violations.push(format!("No sequence defined for item type '{}'", item_type));
    }

    violations
}

/// Checks a redistribution rule set before it is applied.
pub fn validate_redistribution(source_rules: &[SourceRule], targets: &[TargetCost]) -> Vec<String> {
    let mut violations = Vec::new();

    if source_rules.is_empty() {
        violations.push("At least one source rule is required".to_string());
    }
    if targets.is_empty() {
        violations.push("At least one target category is required".to_string());
    }

    let mut sources = HashSet::new();
    for rule in source_rules {
        if rule.percentage <= Decimal::ZERO || rule.percentage > Decimal::ONE_HUNDRED {
            violations.push(format!(
                "Source '{}': percentage {} must be greater than 0 and at most 100",
                rule.category_id, rule.percentage
            ));
        }
        if !sources.insert(rule.category_id.as_str()) {
            violations.push(format!("Source '{}' is listed more than once", rule.category_id));
        }
    }

    let mut seen_targets = HashSet::new();
    for target in targets {
        if !seen_targets.insert(target.category_id.as_str()) {
            violations.push(format!("Target '{}' is listed more than once", target.category_id));
        }
        if sources.contains(target.category_id.as_str()) {
            violations.push(format!(
                "Category '{}' is both a source and a target",
                target.category_id
            ));
        }
    }

    violations
}
