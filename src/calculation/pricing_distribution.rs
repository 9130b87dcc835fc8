//! Pricing distribution between the material and work buckets.
//!
//! This module splits an item's commercial amount into a material part and a
//! work part: the base amount goes to one bucket, the markup to another, each
//! as a whole.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{AuditStep, CategoryKind, CostBucket, DistributionRule, PricingDistributionConfig};

/// Where the applied distribution rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    /// The tender configuration had an entry for the kind.
    Configured,
    /// No entry; the kind's default policy was used.
    DefaultPolicy,
    /// The kind name was not recognised; everything went to work.
    UnknownKind,
}

/// The material/work split of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingSplit {
    /// Amount booked to the material bucket.
    pub material_cost: Decimal,
    /// Amount booked to the work bucket.
    pub work_cost: Decimal,
    /// Commercial minus base.
    pub markup: Decimal,
    /// The rule that was applied.
    pub rule: DistributionRule,
    /// Where the rule came from.
    pub rule_source: RuleSource,
}

/// A split together with the audit step recording it.
#[derive(Debug, Clone)]
pub struct PricingSplitResult {
    /// The split.
    pub split: PricingSplit,
    /// The audit step recording this decision.
    pub audit_step: AuditStep,
}

const ALL_WORK: DistributionRule = DistributionRule {
    base_target: CostBucket::Work,
    markup_target: CostBucket::Work,
};

/// Looks up the rule for a kind, falling back to the kind's default policy.
pub fn resolve_rule(
    kind: CategoryKind,
    config: &PricingDistributionConfig,
) -> (DistributionRule, RuleSource) {
    match config.rule(kind) {
        Some(rule) => (*rule, RuleSource::Configured),
        None => (kind.default_rule(), RuleSource::DefaultPolicy),
    }
}

fn allocate(
    base_amount: Decimal,
    commercial_amount: Decimal,
    rule: DistributionRule,
    rule_source: RuleSource,
) -> PricingSplit {
    let markup = commercial_amount - base_amount;
    let mut material_cost = Decimal::ZERO;
    let mut work_cost = Decimal::ZERO;

    for (amount, target) in [(base_amount, rule.base_target), (markup, rule.markup_target)] {
        match target {
            CostBucket::Material => material_cost += amount,
            CostBucket::Work => work_cost += amount,
        }
    }

    PricingSplit {
        material_cost,
        work_cost,
        markup,
        rule,
        rule_source,
    }
}

/// Splits a commercial amount into material and work costs.
///
/// The markup (`commercial_amount - base_amount`) may be negative and is not
/// rejected. When `config` has no rule for `kind` the kind's default policy is
/// used and reported through [`PricingSplit::rule_source`].
///
/// # Examples
///
/// ```
/// use markup_engine::calculation::split;
/// use markup_engine::models::{CategoryKind, PricingDistributionConfig};
/// use rust_decimal::Decimal;
///
/// let result = split(
///     Decimal::new(100, 0),
///     Decimal::new(150, 0),
///     CategoryKind::Basic,
///     &PricingDistributionConfig::default(),
/// );
/// assert_eq!(result.material_cost, Decimal::new(100, 0));
/// assert_eq!(result.work_cost, Decimal::new(50, 0));
/// ```
pub fn split(
    base_amount: Decimal,
    commercial_amount: Decimal,
    kind: CategoryKind,
    config: &PricingDistributionConfig,
) -> PricingSplit {
    let (rule, rule_source) = resolve_rule(kind, config);
    if rule_source == RuleSource::DefaultPolicy {
        debug!(kind = %kind, "No distribution rule configured, using default policy");
    }
    allocate(base_amount, commercial_amount, rule, rule_source)
}

/// Splits using a kind given by name, as read from persisted configuration.
///
/// An unrecognised name is a configuration error: it is logged and the whole
/// commercial amount is routed to work.
pub fn split_by_kind_name(
    base_amount: Decimal,
    commercial_amount: Decimal,
    kind: &str,
    config: &PricingDistributionConfig,
) -> PricingSplit {
    match kind.parse::<CategoryKind>() {
        Ok(kind) => split(base_amount, commercial_amount, kind, config),
        Err(message) => {
            warn!(kind = %kind, error = %message, "Unknown category kind, routing to work");
            allocate(base_amount, commercial_amount, ALL_WORK, RuleSource::UnknownKind)
        }
    }
}

fn bucket_name(bucket: CostBucket) -> &'static str {
    match bucket {
        CostBucket::Material => "material",
        CostBucket::Work => "work",
    }
}

/// Splits a commercial amount and records the decision as an audit step.
pub fn split_with_audit(
    base_amount: Decimal,
    commercial_amount: Decimal,
    kind: CategoryKind,
    config: &PricingDistributionConfig,
    step_number: u32,
) -> PricingSplitResult {
    let split = split(base_amount, commercial_amount, kind, config);

    let audit_step = AuditStep {
        step_number,
        rule_id: "pricing_distribution".to_string(),
        rule_name: "Pricing Distribution".to_string(),
        input: serde_json::json!({
            "kind": kind,
            "base_amount": base_amount.normalize().to_string(),
            "commercial_amount": commercial_amount.normalize().to_string()
        }),
        output: serde_json::json!({
            "material_cost": split.material_cost.normalize().to_string(),
            "work_cost": split.work_cost.normalize().to_string(),
            "rule_source": split.rule_source
        }),
        reasoning: format!(
            "Base ${} -> {}, markup ${} -> {}",
            base_amount.normalize(),
            bucket_name(split.rule.base_target),
            split.markup.normalize(),
            bucket_name(split.rule.markup_target)
        ),
    };

    PricingSplitResult { split, audit_step }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rule(base_target: CostBucket, markup_target: CostBucket) -> DistributionRule {
        DistributionRule {
            base_target,
            markup_target,
        }
    }

    /// PD-001: basic material with default config
    #[test]
    fn test_basic_default_policy() {
        let result = split(
            dec("100"),
            dec("150"),
            CategoryKind::Basic,
            &PricingDistributionConfig::default(),
        );
        assert_eq!(result.material_cost, dec("100"));
        assert_eq!(result.work_cost, dec("50"));
        assert_eq!(result.markup, dec("50"));
        assert_eq!(result.rule_source, RuleSource::DefaultPolicy);
    }

    #[test]
    fn test_work_default_policy_goes_entirely_to_work() {
        let result = split(
            dec("100"),
            dec("150"),
            CategoryKind::Work,
            &PricingDistributionConfig::default(),
        );
        assert_eq!(result.material_cost, Decimal::ZERO);
        assert_eq!(result.work_cost, dec("150"));
    }

    #[test]
    fn test_configured_rule_is_used() {
        let config = PricingDistributionConfig::default().with_rule(
            CategoryKind::Auxiliary,
            rule(CostBucket::Work, CostBucket::Material),
        );
        let result = split(dec("80"), dec("100"), CategoryKind::Auxiliary, &config);
        assert_eq!(result.work_cost, dec("80"));
        assert_eq!(result.material_cost, dec("20"));
        assert_eq!(result.rule_source, RuleSource::Configured);
    }

    #[test]
    fn test_both_components_to_same_bucket() {
        let config = PricingDistributionConfig::default().with_rule(
            CategoryKind::SubcontractBasic,
            rule(CostBucket::Material, CostBucket::Material),
        );
        let result = split(dec("80"), dec("100"), CategoryKind::SubcontractBasic, &config);
        assert_eq!(result.material_cost, dec("100"));
        assert_eq!(result.work_cost, Decimal::ZERO);
    }

    #[test]
    fn test_negative_markup_is_not_rejected() {
        let result = split(
            dec("100"),
            dec("90"),
            CategoryKind::Basic,
            &PricingDistributionConfig::default(),
        );
        assert_eq!(result.material_cost, dec("100"));
        assert_eq!(result.work_cost, dec("-10"));
        assert_eq!(result.material_cost + result.work_cost, dec("90"));
    }

    #[test]
    fn test_unknown_kind_name_routes_to_work() {
        let result = split_by_kind_name(
            dec("100"),
            dec("150"),
            "exotic",
            &PricingDistributionConfig::default(),
        );
        assert_eq!(result.material_cost, Decimal::ZERO);
        assert_eq!(result.work_cost, dec("150"));
        assert_eq!(result.rule_source, RuleSource::UnknownKind);
    }

    #[test]
    fn test_known_kind_name_uses_normal_path() {
        let result = split_by_kind_name(
            dec("100"),
            dec("150"),
            "basic",
            &PricingDistributionConfig::default(),
        );
        assert_eq!(result.material_cost, dec("100"));
        assert_eq!(result.rule_source, RuleSource::DefaultPolicy);
    }

    #[test]
    fn test_split_audit_step() {
        let result = split_with_audit(
            dec("100"),
            dec("150"),
            CategoryKind::Basic,
            &PricingDistributionConfig::default(),
            3,
        );
        assert_eq!(result.audit_step.step_number, 3);
        assert_eq!(result.audit_step.rule_id, "pricing_distribution");
        assert_eq!(result.audit_step.input["kind"], "basic");
        assert_eq!(result.audit_step.output["material_cost"], "100");
        assert_eq!(result.audit_step.output["rule_source"], "default_policy");
        assert_eq!(
            result.audit_step.reasoning,
            "Base $100 -> material, markup $50 -> work"
        );
    }
}
