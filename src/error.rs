//! Error types for the Markup Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while pricing tender line items.

use thiserror::Error;

/// The main error type for the Markup Engine.
///
/// Missing tender parameters and unmapped category kinds are not errors:
/// they resolve to documented defaults and are reported through the audit
/// trail instead.
///
/// # Example
///
/// ```
/// use markup_engine::error::EngineError;
///
/// let error = EngineError::TacticNotFound {
///     name: "aggressive".to_string(),
/// };
/// assert_eq!(error.to_string(), "Markup tactic not found: aggressive");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The requested markup tactic is not configured.
    #[error("Markup tactic not found: {name}")]
    TacticNotFound {
        /// The tactic name that was requested.
        name: String,
    },

    /// The tactic has no sequence for the item type being evaluated.
    #[error("Tactic '{tactic}' defines no sequence for item type '{item_type}'")]
    SequenceNotDefined {
        /// The tactic name.
        tactic: String,
        /// The BOQ item type without a sequence.
        item_type: String,
    },

    /// A persisted step record could not be converted into a step.
    #[error("Invalid step '{step}': {message}")]
    InvalidStep {
        /// The step name.
        step: String,
        /// A description of the problem.
        message: String,
    },

    /// A step references a result that has not been computed yet.
    #[error("Step {step} references step {reference}, which is not an earlier step")]
    InvalidStepReference {
        /// Index of the referencing step.
        step: usize,
        /// The referenced step index.
        reference: usize,
    },

    /// An arithmetic operation had no finite result (division by zero or overflow).
    #[error("Non-finite commercial result at step {step}: {message}")]
    NonFiniteResult {
        /// Index of the step where the degeneracy occurred.
        step: usize,
        /// A description of the failed operation.
        message: String,
    },

    /// Calculation of one BOQ item failed.
    #[error("Failed to price BOQ item '{item_id}': {source}")]
    ItemCalculation {
        /// The item that failed.
        item_id: String,
        /// The underlying failure.
        #[source]
        source: Box<EngineError>,
    },

    /// A structural pre-check rejected the input.
    #[error("Validation failed: {}", violations.join("; "))]
    ValidationFailed {
        /// Human-readable violations.
        violations: Vec<String>,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    /// Returns the innermost error, unwrapping item context.
    pub fn root_cause(&self) -> &EngineError {
        match self {
            EngineError::ItemCalculation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/engine.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/engine.yaml"
        );
    }

    #[test]
    fn test_config_parse_error_displays_path_and_message() {
        let error = EngineError::ConfigParseError {
            path: "/config/bad.yaml".to_string(),
            message: "invalid YAML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration file '/config/bad.yaml': invalid YAML syntax"
        );
    }

    #[test]
    fn test_sequence_not_defined_displays_tactic_and_type() {
        let error = EngineError::SequenceNotDefined {
            tactic: "standard".to_string(),
            item_type: "subcontract_work".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Tactic 'standard' defines no sequence for item type 'subcontract_work'"
        );
    }

    #[test]
    fn test_invalid_step_reference_displays_indices() {
        let error = EngineError::InvalidStepReference {
            step: 1,
            reference: 3,
        };
        assert_eq!(
            error.to_string(),
            "Step 1 references step 3, which is not an earlier step"
        );
    }

    #[test]
    fn test_validation_failed_joins_violations() {
        let error = EngineError::ValidationFailed {
            violations: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(error.to_string(), "Validation failed: first; second");
    }

    #[test]
    fn test_item_calculation_wraps_source() {
        let error = EngineError::ItemCalculation {
            item_id: "boq_001".to_string(),
            source: Box::new(EngineError::NonFiniteResult {
                step: 0,
                message: "division by zero".to_string(),
            }),
        };
        assert_eq!(
            error.to_string(),
            "Failed to price BOQ item 'boq_001': Non-finite commercial result at step 0: division by zero"
        );
        assert!(matches!(
            error.root_cause(),
            EngineError::NonFiniteResult { step: 0, .. }
        ));
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_tactic_not_found() -> EngineResult<()> {
            Err(EngineError::TacticNotFound {
                name: "missing".to_string(),
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_tactic_not_found()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
