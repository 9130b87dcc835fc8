//! Configuration types for the markup engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::calculation::{BALANCE_TOLERANCE, DEFAULT_ROUNDING_MINIMUM, DEFAULT_ROUNDING_STEP};
use crate::models::{MarkupTactic, PricingDistributionConfig, TenderMarkupParameters};

/// Metadata about the engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineMetadata {
    /// Short code of the configuration set (e.g., "default").
    pub code: String,
    /// The human-readable name of the configuration set.
    pub name: String,
    /// The version reported in calculation results.
    pub version: String,
}

/// Smart rounding defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RoundingConfig {
    /// Prices are rounded to multiples of this step.
    #[serde(default = "default_rounding_step")]
    pub step: Decimal,
    /// Prices below this value round to zero.
    #[serde(default = "default_rounding_minimum")]
    pub minimum: Decimal,
}

fn default_rounding_step() -> Decimal {
    DEFAULT_ROUNDING_STEP
}

fn default_rounding_minimum() -> Decimal {
    DEFAULT_ROUNDING_MINIMUM
}

fn default_balance_tolerance() -> Decimal {
    BALANCE_TOLERANCE
}

impl Default for RoundingConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_ROUNDING_STEP,
            minimum: DEFAULT_ROUNDING_MINIMUM,
        }
    }
}

/// Contents of engine.yaml.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Configuration metadata.
    pub metadata: EngineMetadata,
    /// Rounding defaults.
    #[serde(default)]
    pub rounding: RoundingConfig,
    /// Largest |deducted - added| accepted by redistribution.
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: Decimal,
    /// Tactic used when a request names none.
    pub default_tactic: String,
}

/// The complete engine configuration loaded from YAML files.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    settings: EngineSettings,
    parameters: TenderMarkupParameters,
    distribution: PricingDistributionConfig,
    tactics: BTreeMap<String, MarkupTactic>,
}

impl EngineConfig {
    /// Creates a new EngineConfig from its component parts.
    ///
    /// Tactics are keyed by their name; a later tactic with the same name
    /// replaces an earlier one.
    pub fn new(
        settings: EngineSettings,
        parameters: TenderMarkupParameters,
        distribution: PricingDistributionConfig,
        tactics: Vec<MarkupTactic>,
    ) -> Self {
        let tactics = tactics.into_iter().map(|t| (t.name.clone(), t)).collect();
        Self {
            settings,
            parameters,
            distribution,
            tactics,
        }
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns the default tender parameters.
    pub fn parameters(&self) -> &TenderMarkupParameters {
        &self.parameters
    }

    /// Returns the pricing distribution rules.
    pub fn distribution(&self) -> &PricingDistributionConfig {
        &self.distribution
    }

    /// Returns all tactics, keyed by name.
    pub fn tactics(&self) -> &BTreeMap<String, MarkupTactic> {
        &self.tactics
    }
}
