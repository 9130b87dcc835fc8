//! Markup sequence evaluation.
//!
//! This module interprets the steps of a markup tactic: each step starts from
//! the original base amount or an earlier step result and runs up to five
//! chained operations over it, strictly left to right.

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    Action, AuditStep, MultiplyFormat, Operand, Step, StepSource, TenderMarkupParameters,
};

/// The result of evaluating a sequence, with everything needed to explain it.
#[derive(Debug, Clone)]
pub struct SequenceEvaluation {
    /// The final value (last step result, or the base amount for an empty sequence).
    pub result: Decimal,
    /// The result of every step, in order.
    pub step_results: Vec<Decimal>,
    /// Parameter keys that were referenced but not set and resolved to zero.
    pub missing_parameters: Vec<String>,
    /// One audit step per evaluated step.
    pub audit_steps: Vec<AuditStep>,
}

struct ResolvedOperand<'a> {
    value: Decimal,
    label: String,
    missing_key: Option<&'a str>,
}

fn source_label(source: StepSource) -> String {
    match source {
        StepSource::OriginalBase => "original_base".to_string(),
        StepSource::Step(index) => format!("step_{}", index),
    }
}

fn source_value(
    source: StepSource,
    base_amount: Decimal,
    results: &[Decimal],
    step: usize,
) -> EngineResult<Decimal> {
    match source {
        StepSource::OriginalBase => Ok(base_amount),
        StepSource::Step(reference) => {
            results
                .get(reference)
                .copied()
                .ok_or(EngineError::InvalidStepReference { step, reference })
        }
    }
}

fn resolve_operand<'a>(
    operand: &'a Operand,
    action: Action,
    base_amount: Decimal,
    results: &[Decimal],
    parameters: &TenderMarkupParameters,
    step: usize,
) -> EngineResult<ResolvedOperand<'a>> {
    match operand {
        Operand::Parameter {
            key,
            multiply_format,
        } => {
            let resolution = parameters.resolve(key);
            let value = if action == Action::Multiply {
                let fraction = resolution.value / Decimal::ONE_HUNDRED;
                match multiply_format {
                    MultiplyFormat::AddOne => Decimal::ONE + fraction,
                    MultiplyFormat::Direct => fraction,
                }
            } else {
                resolution.value
            };
            Ok(ResolvedOperand {
                value,
                label: format!("parameter:{}", key),
                missing_key: resolution.defaulted.then_some(key.as_str()),
            })
        }
        Operand::Step(source) => Ok(ResolvedOperand {
            value: source_value(*source, base_amount, results, step)?,
            label: source_label(*source),
            missing_key: None,
        }),
        Operand::Literal(value) => Ok(ResolvedOperand {
            value: *value,
            label: "number".to_string(),
            missing_key: None,
        }),
    }
}

fn apply(action: Action, left: Decimal, right: Decimal, step: usize) -> EngineResult<Decimal> {
    let result = match action {
        Action::Multiply => left.checked_mul(right),
        Action::Divide => left.checked_div(right),
        Action::Add => left.checked_add(right),
        Action::Subtract => left.checked_sub(right),
    };

    result.ok_or_else(|| {
        let reason = if action == Action::Divide && right.is_zero() {
            "division by zero"
        } else {
            "arithmetic overflow"
        };
        EngineError::NonFiniteResult {
            step,
            message: format!("{} {} {}: {}", left, action.symbol(), right, reason),
        }
    })
}

/// Evaluates a markup sequence against a base amount.
///
/// Returns only the final value; see [`evaluate_sequence`] for the full trace.
///
/// # Examples
///
/// ```
/// use markup_engine::calculation::evaluate;
/// use markup_engine::models::{
///     Action, MultiplyFormat, Operation, Step, StepSource, TenderMarkupParameters,
/// };
/// use rust_decimal::Decimal;
///
/// let sequence = vec![Step::new(
///     "Growth",
///     StepSource::OriginalBase,
///     vec![Operation::parameter(Action::Multiply, "growth", MultiplyFormat::AddOne)],
/// )];
/// let params = TenderMarkupParameters::from_pairs([("growth", Decimal::new(10, 0))]);
///
/// let result = evaluate(Decimal::new(1000, 0), &sequence, &params).unwrap();
/// assert_eq!(result, Decimal::new(1100, 0));
/// ```
pub fn evaluate(
    base_amount: Decimal,
    sequence: &[Step],
    parameters: &TenderMarkupParameters,
) -> EngineResult<Decimal> {
    evaluate_sequence(base_amount, sequence, parameters, 1).map(|evaluation| evaluation.result)
}

/// Evaluates a markup sequence and records every intermediate result.
///
/// For each step the base value is the original base amount (`-1`) or the
/// result of an earlier step. Operations are applied in order, each taking the
/// running value as its left operand. Parameter operands resolve to zero when
/// the key is unset; for multiply actions they are converted to a multiplier
/// according to their [`MultiplyFormat`], for other actions the raw value is
/// used.
///
/// # Arguments
///
/// * `base_amount` - The item's original base amount
/// * `sequence` - The steps to evaluate
/// * `parameters` - The tender's markup parameters
/// * `step_number` - The audit step number of the first step
///
/// # Errors
///
/// * `InvalidStepReference` if a step refers to a step that is not earlier
/// * `NonFiniteResult` on division by zero or overflow
pub fn evaluate_sequence(
    base_amount: Decimal,
    sequence: &[Step],
    parameters: &TenderMarkupParameters,
    step_number: u32,
) -> EngineResult<SequenceEvaluation> {
    let mut results: Vec<Decimal> = Vec::with_capacity(sequence.len());
    let mut missing_parameters: Vec<String> = Vec::new();
    let mut audit_steps = Vec::with_capacity(sequence.len());

    for (index, step) in sequence.iter().enumerate() {
        let base_value = source_value(step.base, base_amount, &results, index)?;
        let mut value = base_value;
        let mut reasoning = base_value.normalize().to_string();
        let mut operations = Vec::with_capacity(step.operations.len());

        for operation in &step.operations {
            let operand = resolve_operand(
                &operation.operand,
                operation.action,
                base_amount,
                &results,
                parameters,
                index,
            )?;

            if let Some(key) = operand.missing_key {
                debug!(parameter = %key, step = index, "Tender parameter not set, using 0");
                if !missing_parameters.iter().any(|k| k == key) {
                    missing_parameters.push(key.to_string());
                }
            }

            value = apply(operation.action, value, operand.value, index)?;
            reasoning.push_str(&format!(
                " {} {}",
                operation.action.symbol(),
                operand.value.normalize()
            ));
            operations.push(serde_json::json!({
                "action": operation.action,
                "operand": operand.label,
                "value": operand.value.normalize().to_string(),
                "defaulted": operand.missing_key.is_some()
            }));
        }

        reasoning.push_str(&format!(" = {}", value.normalize()));

        audit_steps.push(AuditStep {
            step_number: step_number + index as u32,
            rule_id: "markup_step".to_string(),
            rule_name: if step.name.is_empty() {
                format!("Step {}", index + 1)
            } else {
                step.name.clone()
            },
            input: serde_json::json!({
                "step_index": index,
                "base": source_label(step.base),
                "base_value": base_value.normalize().to_string(),
                "operations": operations
            }),
            output: serde_json::json!({
                "result": value.normalize().to_string()
            }),
            reasoning,
        });

        results.push(value);
    }

    let result = results.last().copied().unwrap_or(base_amount);

    Ok(SequenceEvaluation {
        result,
        step_results: results,
        missing_parameters,
        audit_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Operation;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> TenderMarkupParameters {
        TenderMarkupParameters::from_pairs(pairs.iter().map(|(k, v)| (*k, dec(v))))
    }

    fn growth_step() -> Step {
        Step::new(
            "Growth",
            StepSource::OriginalBase,
            vec![Operation::parameter(
                Action::Multiply,
                "growth",
                MultiplyFormat::AddOne,
            )],
        )
    }

    /// SE-001: single add-one parameter step
    #[test]
    fn test_growth_scenario() {
        let result = evaluate(dec("1000"), &[growth_step()], &params(&[("growth", "10")])).unwrap();
        assert_eq!(result, dec("1100"));
    }

    /// SE-002: empty sequence is the identity
    #[test]
    fn test_empty_sequence_returns_base_amount() {
        let evaluation =
            evaluate_sequence(dec("1234.56"), &[], &params(&[("growth", "10")]), 1).unwrap();
        assert_eq!(evaluation.result, dec("1234.56"));
        assert!(evaluation.step_results.is_empty());
        assert!(evaluation.audit_steps.is_empty());
    }

    /// SE-003: missing parameter behaves like zero and is reported
    #[test]
    fn test_missing_parameter_resolves_to_zero() {
        let missing = evaluate_sequence(dec("1000"), &[growth_step()], &params(&[]), 1).unwrap();
        let zero =
            evaluate_sequence(dec("1000"), &[growth_step()], &params(&[("growth", "0")]), 1)
                .unwrap();

        assert_eq!(missing.result, zero.result);
        assert_eq!(missing.result, dec("1000"));
        assert_eq!(missing.missing_parameters, vec!["growth".to_string()]);
        assert!(zero.missing_parameters.is_empty());
        assert_eq!(
            missing.audit_steps[0].input["operations"][0]["defaulted"],
            serde_json::json!(true)
        );
    }

    #[test]
    fn test_direct_multiply_format() {
        let sequence = vec![Step::new(
            "Mechanization",
            StepSource::OriginalBase,
            vec![Operation::parameter(
                Action::Multiply,
                "mechanization",
                MultiplyFormat::Direct,
            )],
        )];
        let result = evaluate(dec("2000"), &sequence, &params(&[("mechanization", "5")])).unwrap();
        assert_eq!(result, dec("100"));
    }

    #[test]
    fn test_non_multiply_parameter_uses_raw_value() {
        let sequence = vec![Step::new(
            "Flat fee",
            StepSource::OriginalBase,
            vec![Operation::parameter(
                Action::Add,
                "fee",
                MultiplyFormat::AddOne,
            )],
        )];
        let result = evaluate(dec("100"), &sequence, &params(&[("fee", "15")])).unwrap();
        assert_eq!(result, dec("115"));
    }

    /// SE-004: step references and the original base sentinel
    #[test]
    fn test_chained_steps_with_references() {
        let sequence = vec![
            growth_step(),
            Step::new(
                "Growth delta",
                StepSource::Step(0),
                vec![Operation::step(Action::Subtract, StepSource::OriginalBase)],
            ),
            Step::new(
                "Blend",
                StepSource::OriginalBase,
                vec![
                    Operation::literal(Action::Multiply, dec("2")),
                    Operation::step(Action::Add, StepSource::Step(1)),
                    Operation::literal(Action::Divide, dec("4")),
                ],
            ),
        ];

        let evaluation =
            evaluate_sequence(dec("1000"), &sequence, &params(&[("growth", "10")]), 1).unwrap();
        assert_eq!(
            evaluation.step_results,
            vec![dec("1100"), dec("100"), dec("525")]
        );
        assert_eq!(evaluation.result, dec("525"));
    }

    #[test]
    fn test_operations_apply_left_to_right() {
        // (100 + 10) × 2, not 100 + (10 × 2)
        let sequence = vec![Step::new(
            "Order",
            StepSource::OriginalBase,
            vec![
                Operation::literal(Action::Add, dec("10")),
                Operation::literal(Action::Multiply, dec("2")),
            ],
        )];
        assert_eq!(evaluate(dec("100"), &sequence, &params(&[])).unwrap(), dec("220"));
    }

    #[test]
    fn test_division_by_zero_is_non_finite() {
        let sequence = vec![Step::new(
            "Broken",
            StepSource::OriginalBase,
            vec![Operation::parameter(
                Action::Divide,
                "unset",
                MultiplyFormat::AddOne,
            )],
        )];

        match evaluate(dec("100"), &sequence, &params(&[])) {
            Err(EngineError::NonFiniteResult { step, message }) => {
                assert_eq!(step, 0);
                assert!(message.contains("division by zero"));
            }
            other => panic!("Expected NonFiniteResult, got {:?}", other),
        }
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        let sequence = vec![Step::new(
            "Forward",
            StepSource::Step(1),
            vec![Operation::literal(Action::Add, dec("1"))],
        )];

        match evaluate(dec("100"), &sequence, &params(&[])) {
            Err(EngineError::InvalidStepReference { step, reference }) => {
                assert_eq!(step, 0);
                assert_eq!(reference, 1);
            }
            other => panic!("Expected InvalidStepReference, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_in_operand_is_rejected() {
        let sequence = vec![Step::new(
            "Self",
            StepSource::OriginalBase,
            vec![Operation::step(Action::Add, StepSource::Step(0))],
        )];
        assert!(matches!(
            evaluate(dec("100"), &sequence, &params(&[])),
            Err(EngineError::InvalidStepReference { step: 0, reference: 0 })
        ));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let sequence = vec![growth_step(), growth_step()];
        let p = params(&[("growth", "7.3")]);
        let first = evaluate(dec("999.99"), &sequence, &p).unwrap();
        let second = evaluate(dec("999.99"), &sequence, &p).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_audit_steps_record_each_step() {
        let sequence = vec![growth_step()];
        let evaluation =
            evaluate_sequence(dec("1000"), &sequence, &params(&[("growth", "10")]), 4).unwrap();

        let audit = &evaluation.audit_steps[0];
        assert_eq!(audit.step_number, 4);
        assert_eq!(audit.rule_id, "markup_step");
        assert_eq!(audit.rule_name, "Growth");
        assert_eq!(audit.input["base"], "original_base");
        assert_eq!(audit.input["base_value"], "1000");
        assert_eq!(audit.input["operations"][0]["operand"], "parameter:growth");
        assert_eq!(audit.input["operations"][0]["value"], "1.1");
        assert_eq!(audit.output["result"], "1100");
        assert_eq!(audit.reasoning, "1000 × 1.1 = 1100");
    }
}
