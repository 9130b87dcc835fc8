//! Pricing distribution configuration types.
//!
//! A [`PricingDistributionConfig`] decides, per category kind, whether the
//! base amount and the markup of an item land in the material bucket or the
//! work bucket.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the two cost buckets a commercial amount is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBucket {
    /// The material side of the commercial cost.
    Material,
    /// The work side of the commercial cost.
    Work,
}

/// The category kinds the distribution is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// Basic (primary) material.
    Basic,
    /// Auxiliary or component material.
    Auxiliary,
    /// Basic material supplied through a subcontractor.
    SubcontractBasic,
    /// Any labour.
    Work,
}

impl CategoryKind {
    /// Returns the wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Basic => "basic",
            CategoryKind::Auxiliary => "auxiliary",
            CategoryKind::SubcontractBasic => "subcontract_basic",
            CategoryKind::Work => "work",
        }
    }

    /// The rule applied when the configuration has no entry for this kind.
    ///
    /// Material kinds keep their base amount on the material side and book
    /// the markup as work; labour goes entirely to work.
    pub fn default_rule(&self) -> DistributionRule {
        match self {
            CategoryKind::Basic | CategoryKind::Auxiliary | CategoryKind::SubcontractBasic => {
                DistributionRule {
                    base_target: CostBucket::Material,
                    markup_target: CostBucket::Work,
                }
            }
            CategoryKind::Work => DistributionRule {
                base_target: CostBucket::Work,
                markup_target: CostBucket::Work,
            },
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(CategoryKind::Basic),
            "auxiliary" => Ok(CategoryKind::Auxiliary),
            "subcontract_basic" => Ok(CategoryKind::SubcontractBasic),
            "work" => Ok(CategoryKind::Work),
            other => Err(format!("unknown category kind '{}'", other)),
        }
    }
}

/// Where the base amount and the markup of one category kind are booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRule {
    /// Bucket receiving the base amount.
    pub base_target: CostBucket,
    /// Bucket receiving the markup (commercial minus base).
    pub markup_target: CostBucket,
}

/// Per-kind distribution rules, as persisted for a tender.
///
/// Kinds without an entry fall back to [`CategoryKind::default_rule`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingDistributionConfig {
    rules: BTreeMap<CategoryKind, DistributionRule>,
}

impl PricingDistributionConfig {
    /// Creates a configuration from explicit rules.
    pub fn new(rules: BTreeMap<CategoryKind, DistributionRule>) -> Self {
        Self { rules }
    }

    /// Sets the rule for a kind, returning the updated configuration.
    pub fn with_rule(mut self, kind: CategoryKind, rule: DistributionRule) -> Self {
        self.rules.insert(kind, rule);
        self
    }

    /// Returns the configured rule for a kind, if any.
    pub fn rule(&self, kind: CategoryKind) -> Option<&DistributionRule> {
        self.rules.get(&kind)
    }
}
