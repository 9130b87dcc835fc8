//! Commercial pricing of a tender's BOQ items.
//!
//! Ties the sequence evaluator and the pricing splitter together: every item is
//! marked up with its type's sequence and the result is split into material
//! and work costs.

use std::collections::BTreeSet;
use std::time::Instant;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditTrace, AuditWarning, BoqItem, CategoryKind, CommercialTotals, ItemCommercialCost,
    MarkupTactic, PricingDistributionConfig, TenderCalculationResult, TenderMarkupParameters,
};

use super::pricing_distribution::{RuleSource, split_with_audit};
use super::sequence::evaluate_sequence;

/// Commercial costs of a batch of items.
#[derive(Debug, Clone)]
pub struct CommercialCalculation {
    /// Per-item costs, in input order.
    pub items: Vec<ItemCommercialCost>,
    /// Aggregated totals.
    pub totals: CommercialTotals,
    /// Every step, split and warning, in calculation order.
    pub audit_trace: AuditTrace,
}

impl CommercialCalculation {
    /// Wraps the calculation into a result with a fresh id and timestamp.
    pub fn into_result(self, tactic: &str, engine_version: &str) -> TenderCalculationResult {
        TenderCalculationResult {
            calculation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            engine_version: engine_version.to_string(),
            tactic: tactic.to_string(),
            items: self.items,
            totals: self.totals,
            audit_trace: self.audit_trace,
        }
    }
}

fn markup_coefficient(base_amount: Decimal, commercial_amount: Decimal) -> Option<Decimal> {
    if base_amount.is_zero() {
        None
    } else {
        commercial_amount.checked_div(base_amount)
    }
}

/// Prices every item with the tactic and splits the result into buckets.
///
/// Items are priced independently. Parameters the tactic references but the
/// tender does not set are treated as zero, and kinds without a configured
/// distribution rule use their default policy; both are reported once each as
/// audit warnings.
///
/// # Errors
///
/// `ItemCalculation` wrapping the first failure (`SequenceNotDefined`,
/// `InvalidStepReference` or `NonFiniteResult`) together with the item id.
pub fn calculate_commercial_costs(
    items: &[BoqItem],
    tactic: &MarkupTactic,
    parameters: &TenderMarkupParameters,
    distribution: &PricingDistributionConfig,
) -> EngineResult<CommercialCalculation> {
    let start_time = Instant::now();
    let mut audit_trace = AuditTrace::default();
    let mut step_number: u32 = 1;
    let mut missing_parameters: BTreeSet<String> = BTreeSet::new();
    let mut defaulted_kinds: BTreeSet<CategoryKind> = BTreeSet::new();
    let mut costs = Vec::with_capacity(items.len());

    for item in items {
        let wrap = |source: EngineError| EngineError::ItemCalculation {
            item_id: item.id.clone(),
            source: Box::new(source),
        };

        let sequence = tactic.sequence(item.item_type).map_err(wrap)?;
        let evaluation =
            evaluate_sequence(item.base_amount, sequence, parameters, step_number).map_err(wrap)?;
        step_number += evaluation.audit_steps.len() as u32;
        audit_trace.steps.extend(evaluation.audit_steps);
        missing_parameters.extend(evaluation.missing_parameters);

        let commercial_amount = evaluation.result;
        let kind = item.category_kind();
        let split = split_with_audit(
            item.base_amount,
            commercial_amount,
            kind,
            distribution,
            step_number,
        );
        step_number += 1;
        audit_trace.steps.push(split.audit_step);
        if split.split.rule_source == RuleSource::DefaultPolicy {
            defaulted_kinds.insert(kind);
        }

        debug!(
            item_id = %item.id,
            base_amount = %item.base_amount,
            commercial_amount = %commercial_amount,
            "Priced BOQ item"
        );

        costs.push(ItemCommercialCost {
            item_id: item.id.clone(),
            item_type: item.item_type,
            client_position_id: item.client_position_id.clone(),
            quantity: item.quantity,
            base_amount: item.base_amount,
            commercial_amount,
            markup: split.split.markup,
            markup_coefficient: markup_coefficient(item.base_amount, commercial_amount),
            material_cost: split.split.material_cost,
            work_cost: split.split.work_cost,
            detail_cost_category_id: item.detail_cost_category_id.clone(),
        });
    }

    for key in &missing_parameters {
        audit_trace.warnings.push(AuditWarning::new(
            "PARAMETER_DEFAULTED",
            format!("Tender parameter '{}' is not set; 0 was used", key),
            "low",
        ));
    }
    for kind in &defaulted_kinds {
        audit_trace.warnings.push(AuditWarning::new(
            "DISTRIBUTION_DEFAULT_POLICY",
            format!("No distribution rule for '{}'; the default policy was used", kind),
            "low",
        ));
    }

    let totals = CommercialTotals::from_items(&costs);
    audit_trace.duration_us = start_time.elapsed().as_micros() as u64;

    info!(
        tactic = %tactic.name,
        items_count = costs.len(),
        commercial_total = %totals.commercial_amount,
        warnings = audit_trace.warnings.len(),
        duration_us = audit_trace.duration_us,
        "Commercial costs calculated"
    );

    Ok(CommercialCalculation {
        items: costs,
        totals,
        audit_trace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Action, BoqItemType, CostBucket, DistributionRule, MaterialKind, MultiplyFormat,
        Operation, Step, StepSource,
    };
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(id: &str, item_type: BoqItemType, base: &str) -> BoqItem {
        BoqItem {
            id: id.to_string(),
            item_type,
            base_amount: dec(base),
            quantity: Decimal::ONE,
            client_position_id: Some("pos_001".to_string()),
            material_kind: MaterialKind::Basic,
            detail_cost_category_id: None,
        }
    }

    fn growth(key: &str) -> Step {
        Step::new(
            key,
            StepSource::OriginalBase,
            vec![Operation::parameter(Action::Multiply, key, MultiplyFormat::AddOne)],
        )
    }

    fn create_test_tactic() -> MarkupTactic {
        let mut tactic = MarkupTactic::new("test");
        for item_type in BoqItemType::ALL {
            tactic = tactic.with_sequence(item_type, vec![growth("growth")]);
        }
        tactic
    }

    fn params() -> TenderMarkupParameters {
        TenderMarkupParameters::from_pairs([("growth", dec("50"))])
    }

    #[test]
    fn test_material_and_work_items() {
        let items = vec![
            item("m1", BoqItemType::Material, "100"),
            item("w1", BoqItemType::Work, "200"),
        ];
        let result = calculate_commercial_costs(
            &items,
            &create_test_tactic(),
            &params(),
            &PricingDistributionConfig::default(),
        )
        .unwrap();

        let m1 = &result.items[0];
        assert_eq!(m1.commercial_amount, dec("150"));
        assert_eq!(m1.material_cost, dec("100"));
        assert_eq!(m1.work_cost, dec("50"));
        assert_eq!(m1.markup_coefficient, Some(dec("1.5")));

        let w1 = &result.items[1];
        assert_eq!(w1.commercial_amount, dec("300"));
        assert_eq!(w1.material_cost, Decimal::ZERO);
        assert_eq!(w1.work_cost, dec("300"));

        assert_eq!(result.totals.base_amount, dec("300"));
        assert_eq!(result.totals.commercial_amount, dec("450"));
        assert_eq!(result.totals.markup, dec("150"));
        assert_eq!(result.totals.material_cost + result.totals.work_cost, dec("450"));
    }

    #[test]
    fn test_detail_cost_category_is_carried_over() {
        let mut booked = item("w1", BoqItemType::Work, "200");
        booked.detail_cost_category_id = Some("cat_earthworks".to_string());
        let items = vec![booked, item("w2", BoqItemType::Work, "100")];

        let result = calculate_commercial_costs(
            &items,
            &create_test_tactic(),
            &params(),
            &PricingDistributionConfig::default(),
        )
        .unwrap();

        assert_eq!(
            result.items[0].detail_cost_category_id.as_deref(),
            Some("cat_earthworks")
        );
        assert!(result.items[1].detail_cost_category_id.is_none());
    }

    #[test]
    fn test_audit_steps_are_numbered_in_order() {
        let items = vec![
            item("m1", BoqItemType::Material, "100"),
            item("w1", BoqItemType::Work, "200"),
        ];
        let result = calculate_commercial_costs(
            &items,
            &create_test_tactic(),
            &params(),
            &PricingDistributionConfig::default(),
        )
        .unwrap();

        let numbers: Vec<u32> = result.audit_trace.steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(result.audit_trace.steps[0].rule_id, "markup_step");
        assert_eq!(result.audit_trace.steps[1].rule_id, "pricing_distribution");
    }

    #[test]
    fn test_defaults_are_reported_once() {
        let items = vec![
            item("m1", BoqItemType::Material, "100"),
            item("m2", BoqItemType::Material, "100"),
        ];
        let config = PricingDistributionConfig::default();
        let result = calculate_commercial_costs(
            &items,
            &create_test_tactic(),
            &TenderMarkupParameters::new(),
            &config,
        )
        .unwrap();

        assert_eq!(result.items[0].commercial_amount, dec("100"));
        let codes: Vec<&str> = result.audit_trace.warnings.iter().map(|w| w.code.as_str()).collect();
        assert_eq!(codes, vec!["PARAMETER_DEFAULTED", "DISTRIBUTION_DEFAULT_POLICY"]);
    }

    #[test]
    fn test_configured_distribution_has_no_warning() {
        let config = PricingDistributionConfig::default().with_rule(
            CategoryKind::Basic,
            DistributionRule {
                base_target: CostBucket::Material,
                markup_target: CostBucket::Material,
            },
        );
        let result = calculate_commercial_costs(
            &[item("m1", BoqItemType::Material, "100")],
            &create_test_tactic(),
            &params(),
            &config,
        )
        .unwrap();

        assert_eq!(result.items[0].material_cost, dec("150"));
        assert!(result.audit_trace.warnings.is_empty());
    }

    #[test]
    fn test_zero_base_has_no_coefficient() {
        let result = calculate_commercial_costs(
            &[item("z", BoqItemType::Work, "0")],
            &create_test_tactic(),
            &params(),
            &PricingDistributionConfig::default(),
        )
        .unwrap();
        assert_eq!(result.items[0].markup_coefficient, None);
        assert_eq!(result.items[0].commercial_amount, Decimal::ZERO);
    }

    #[test]
    fn test_missing_sequence_names_the_item() {
        let tactic = MarkupTactic::new("partial").with_sequence(BoqItemType::Work, vec![]);
        let err = calculate_commercial_costs(
            &[item("m1", BoqItemType::Material, "100")],
            &tactic,
            &params(),
            &PricingDistributionConfig::default(),
        )
        .unwrap_err();

        match err {
            EngineError::ItemCalculation { item_id, source } => {
                assert_eq!(item_id, "m1");
                assert!(matches!(*source, EngineError::SequenceNotDefined { .. }));
            }
            other => panic!("Expected ItemCalculation, got {:?}", other),
        }
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        let tactic = MarkupTactic::new("div").with_sequence(
            BoqItemType::Work,
            vec![Step::new(
                "div",
                StepSource::OriginalBase,
                vec![Operation::literal(Action::Divide, Decimal::ZERO)],
            )],
        );
        let err = calculate_commercial_costs(
            &[item("w1", BoqItemType::Work, "100")],
            &tactic,
            &params(),
            &PricingDistributionConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err.root_cause(), EngineError::NonFiniteResult { .. }));
    }

    #[test]
    fn test_into_result() {
        let calculation = calculate_commercial_costs(
            &[item("m1", BoqItemType::Material, "100")],
            &create_test_tactic(),
            &params(),
            &PricingDistributionConfig::default(),
        )
        .unwrap();
        let result = calculation.into_result("test", "1.0.0");
        assert_eq!(result.tactic, "test");
        assert_eq!(result.engine_version, "1.0.0");
        assert_eq!(result.items.len(), 1);
    }
}
