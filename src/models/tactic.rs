//! Markup tactic model: steps, operations and per-type sequences.
//!
//! A [`Step`] is stored as a flat [`StepRecord`] (five numbered operation
//! slots, camelCase field names) and converted into a tagged-union form for
//! evaluation. The conversion runs automatically through serde, so a
//! [`MarkupTactic`] can be read straight from JSON or YAML.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

use super::BoqItemType;

/// Maximum number of chained operations in one step.
pub const MAX_OPERATIONS: usize = 5;

/// Index sentinel meaning "the original base amount".
pub const ORIGINAL_BASE_INDEX: i64 = -1;

/// An arithmetic action applied to the running value of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// running × operand
    Multiply,
    /// running ÷ operand
    Divide,
    /// running + operand
    Add,
    /// running − operand
    Subtract,
}

impl Action {
    /// Returns the arithmetic symbol used in audit reasoning.
    pub fn symbol(&self) -> &'static str {
        match self {
            Action::Multiply => "×",
            Action::Divide => "÷",
            Action::Add => "+",
            Action::Subtract => "-",
        }
    }
}

/// How a percentage parameter becomes a multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MultiplyFormat {
    /// multiplier = 1 + value / 100
    #[default]
    AddOne,
    /// multiplier = value / 100
    Direct,
}

/// The operand kind of a persisted operation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandType {
    /// A tender parameter, by key.
    Parameter,
    /// A previous step result, by index.
    Step,
    /// A literal number.
    Number,
}

/// Where a step or operand takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSource {
    /// The item's original base amount.
    OriginalBase,
    /// The result of the step at this index.
    Step(usize),
}

impl StepSource {
    /// Converts a persisted index (`-1` or a non-negative index).
    pub fn from_index(index: i64) -> Option<Self> {
        if index == ORIGINAL_BASE_INDEX {
            Some(StepSource::OriginalBase)
        } else {
            usize::try_from(index).ok().map(StepSource::Step)
        }
    }

    /// Returns the persisted index.
    pub fn index(&self) -> i64 {
        match self {
            StepSource::OriginalBase => ORIGINAL_BASE_INDEX,
            StepSource::Step(index) => *index as i64,
        }
    }
}

/// The right-hand side of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A tender parameter.
    Parameter {
        /// The parameter key.
        key: String,
        /// How the percentage is turned into a multiplier for multiply actions.
        multiply_format: MultiplyFormat,
    },
    /// An earlier step result or the original base.
    Step(StepSource),
    /// A literal number.
    Literal(Decimal),
}

/// One action together with its operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// The arithmetic action.
    pub action: Action,
    /// The operand.
    pub operand: Operand,
}

impl Operation {
    /// An operation against a tender parameter.
    pub fn parameter(action: Action, key: impl Into<String>, multiply_format: MultiplyFormat) -> Self {
        Self {
            action,
            operand: Operand::Parameter {
                key: key.into(),
                multiply_format,
            },
        }
    }

    /// An operation against an earlier step result or the original base.
    pub fn step(action: Action, source: StepSource) -> Self {
        Self {
            action,
            operand: Operand::Step(source),
        }
    }

    /// An operation against a literal number.
    pub fn literal(action: Action, value: Decimal) -> Self {
        Self {
            action,
            operand: Operand::Literal(value),
        }
    }
}

/// One row of a markup sequence.
///
/// # Example
///
/// ```
/// use markup_engine::models::{Action, MultiplyFormat, Operation, Step, StepSource};
///
/// let step = Step::new(
///     "Cost growth",
///     StepSource::OriginalBase,
///     vec![Operation::parameter(Action::Multiply, "growth", MultiplyFormat::AddOne)],
/// );
/// assert_eq!(step.operations.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "StepRecord")]
pub struct Step {
    /// Display label.
    pub name: String,
    /// The value the first operation is applied to.
    pub base: StepSource,
    /// Chained operations, applied left to right.
    pub operations: Vec<Operation>,
}

impl Step {
    /// Creates a step.
    pub fn new(name: impl Into<String>, base: StepSource, operations: Vec<Operation>) -> Self {
        Self {
            name: name.into(),
            base,
            operations,
        }
    }
}

/// The persisted, flat form of a [`Step`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    /// Display label.
    #[serde(default)]
    pub name: String,
    /// `-1` for the original base, otherwise an earlier step index.
    pub base_index: i64,
    /// Action of slot 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action1: Option<Action>,
    /// Operand type of slot 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand1_type: Option<OperandType>,
    /// Operand key, index or literal of slot 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand1_key: Option<Value>,
    /// Multiply format of slot 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand1_multiply_format: Option<MultiplyFormat>,
    /// Action of slot 2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action2: Option<Action>,
    /// Operand type of slot 2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand2_type: Option<OperandType>,
    /// Operand key, index or literal of slot 2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand2_key: Option<Value>,
    /// Multiply format of slot 2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand2_multiply_format: Option<MultiplyFormat>,
    /// Action of slot 3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action3: Option<Action>,
    /// Operand type of slot 3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand3_type: Option<OperandType>,
    /// Operand key, index or literal of slot 3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand3_key: Option<Value>,
    /// Multiply format of slot 3.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand3_multiply_format: Option<MultiplyFormat>,
    /// Action of slot 4.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action4: Option<Action>,
    /// Operand type of slot 4.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand4_type: Option<OperandType>,
    /// Operand key, index or literal of slot 4.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand4_key: Option<Value>,
    /// Multiply format of slot 4.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand4_multiply_format: Option<MultiplyFormat>,
    /// Action of slot 5.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action5: Option<Action>,
    /// Operand type of slot 5.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand5_type: Option<OperandType>,
    /// Operand key, index or literal of slot 5.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand5_key: Option<Value>,
    /// Multiply format of slot 5.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand5_multiply_format: Option<MultiplyFormat>,
}

/// Borrowed view of one numbered operation slot.
struct OperationSlot<'a> {
    action: Option<Action>,
    operand_type: Option<OperandType>,
    key: Option<&'a Value>,
    multiply_format: Option<MultiplyFormat>,
}

impl StepRecord {
    fn slots(&self) -> [OperationSlot<'_>; MAX_OPERATIONS] {
        [
            OperationSlot {
                action: self.action1,
                operand_type: self.operand1_type,
                key: self.operand1_key.as_ref(),
                multiply_format: self.operand1_multiply_format,
            },
            OperationSlot {
                action: self.action2,
                operand_type: self.operand2_type,
                key: self.operand2_key.as_ref(),
                multiply_format: self.operand2_multiply_format,
            },
            OperationSlot {
                action: self.action3,
                operand_type: self.operand3_type,
                key: self.operand3_key.as_ref(),
                multiply_format: self.operand3_multiply_format,
            },
            OperationSlot {
                action: self.action4,
                operand_type: self.operand4_type,
                key: self.operand4_key.as_ref(),
                multiply_format: self.operand4_multiply_format,
            },
            OperationSlot {
                action: self.action5,
                operand_type: self.operand5_type,
                key: self.operand5_key.as_ref(),
                multiply_format: self.operand5_multiply_format,
            },
        ]
    }

    fn set_slot(
        &mut self,
        position: usize,
        action: Action,
        operand_type: OperandType,
        key: Value,
        multiply_format: Option<MultiplyFormat>,
    ) {
        let (a, t, k, f) = match position {
            0 => (
                &mut self.action1,
                &mut self.operand1_type,
                &mut self.operand1_key,
                &mut self.operand1_multiply_format,
            ),
            1 => (
                &mut self.action2,
                &mut self.operand2_type,
                &mut self.operand2_key,
                &mut self.operand2_multiply_format,
            ),
            2 => (
                &mut self.action3,
                &mut self.operand3_type,
                &mut self.operand3_key,
                &mut self.operand3_multiply_format,
            ),
            3 => (
                &mut self.action4,
                &mut self.operand4_type,
                &mut self.operand4_key,
                &mut self.operand4_multiply_format,
            ),
            4 => (
                &mut self.action5,
                &mut self.operand5_type,
                &mut self.operand5_key,
                &mut self.operand5_multiply_format,
            ),
            _ => return,
        };
        *a = Some(action);
        *t = Some(operand_type);
        *k = Some(key);
        *f = multiply_format;
    }
}

fn invalid_step(step: &str, message: String) -> EngineError {
    EngineError::InvalidStep {
        step: step.to_string(),
        message,
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn value_to_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn operation_from_slot(step: &str, position: usize, slot: &OperationSlot<'_>) -> EngineResult<Operation> {
    let number = position + 1;
    let action = slot
        .action
        .ok_or_else(|| invalid_step(step, format!("operation {} has no action", number)))?;
    let operand_type = slot
        .operand_type
        .ok_or_else(|| invalid_step(step, format!("operation {} has no operand type", number)))?;
    let key = slot
        .key
        .ok_or_else(|| invalid_step(step, format!("operation {} has no operand", number)))?;

    let operand = match operand_type {
        OperandType::Parameter => {
            let key = match key {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(invalid_step(
                        step,
                        format!("operation {} has a non-text parameter key: {}", number, other),
                    ));
                }
            };
            if key.is_empty() {
                return Err(invalid_step(
                    step,
                    format!("operation {} has an empty parameter key", number),
                ));
            }
            Operand::Parameter {
                key,
                multiply_format: slot.multiply_format.unwrap_or_default(),
            }
        }
        OperandType::Step => {
            let source = value_to_index(key)
                .and_then(StepSource::from_index)
                .ok_or_else(|| {
                    invalid_step(
                        step,
                        format!("operation {} has an invalid step index: {}", number, key),
                    )
                })?;
            Operand::Step(source)
        }
        OperandType::Number => {
            let value = value_to_decimal(key).ok_or_else(|| {
                invalid_step(
                    step,
                    format!("operation {} has a non-numeric literal: {}", number, key),
                )
            })?;
            Operand::Literal(value)
        }
    };

    Ok(Operation { action, operand })
}

impl TryFrom<StepRecord> for Step {
    type Error = EngineError;

    fn try_from(record: StepRecord) -> EngineResult<Self> {
        let base = StepSource::from_index(record.base_index).ok_or_else(|| {
            invalid_step(
                &record.name,
                format!("base index {} is neither -1 nor a step index", record.base_index),
            )
        })?;

        let mut operations = Vec::with_capacity(MAX_OPERATIONS);
        let mut first_empty: Option<usize> = None;
        for (position, slot) in record.slots().iter().enumerate() {
            if slot.action.is_none() {
                first_empty.get_or_insert(position);
                continue;
            }
            if let Some(empty) = first_empty {
                return Err(invalid_step(
                    &record.name,
                    format!(
                        "operation {} follows empty operation slot {}",
                        position + 1,
                        empty + 1
                    ),
                ));
            }
            operations.push(operation_from_slot(&record.name, position, slot)?);
        }

        if operations.is_empty() {
            return Err(invalid_step(&record.name, "step has no operations".to_string()));
        }

        Ok(Step {
            name: record.name,
            base,
            operations,
        })
    }
}

impl TryFrom<Step> for StepRecord {
    type Error = EngineError;

    /// Flattens a step; more than five operations do not fit the record.
    fn try_from(step: Step) -> EngineResult<Self> {
        if step.operations.len() > MAX_OPERATIONS {
            return Err(invalid_step(
                &step.name,
                format!(
                    "{} operations do not fit the {} persisted slots",
                    step.operations.len(),
                    MAX_OPERATIONS
                ),
            ));
        }

        let mut record = StepRecord {
            name: step.name,
            base_index: step.base.index(),
            ..Default::default()
        };

        for (position, operation) in step.operations.into_iter().enumerate() {
            let (operand_type, key, multiply_format) = match operation.operand {
                Operand::Parameter {
                    key,
                    multiply_format,
                } => (
                    OperandType::Parameter,
                    Value::String(key),
                    (operation.action == Action::Multiply).then_some(multiply_format),
                ),
                Operand::Step(source) => (OperandType::Step, Value::from(source.index()), None),
                Operand::Literal(value) => {
                    (OperandType::Number, Value::String(value.to_string()), None)
                }
            };
            record.set_slot(position, operation.action, operand_type, key, multiply_format);
        }

        Ok(record)
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StepRecord::try_from(self.clone())
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

/// A named bundle of per-item-type markup sequences.
///
/// An empty sequence is the identity; a type with no entry cannot be priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupTactic {
    /// Tactic name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Sequence per item type.
    #[serde(default)]
    pub sequences: BTreeMap<BoqItemType, Vec<Step>>,
}

impl MarkupTactic {
    /// Creates a tactic with no sequences.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            sequences: BTreeMap::new(),
        }
    }

    /// Sets the sequence for an item type, returning the updated tactic.
    pub fn with_sequence(mut self, item_type: BoqItemType, steps: Vec<Step>) -> Self {
        self.sequences.insert(item_type, steps);
        self
    }

    /// Returns the sequence for an item type.
    pub fn sequence(&self, item_type: BoqItemType) -> EngineResult<&[Step]> {
        self.sequences
            .get(&item_type)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::SequenceNotDefined {
                tactic: self.name.clone(),
                item_type: item_type.to_string(),
            })
    }

    /// Item types this tactic has no sequence for.
    pub fn missing_types(&self) -> Vec<BoqItemType> {
        BoqItemType::ALL
            .into_iter()
            .filter(|t| !self.sequences.contains_key(t))
            .collect()
    }
}
