//! Request types for the Markup Engine API.
//!
//! This module defines the JSON request structures for every endpoint.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::RoundingItem;
use crate::models::{
    BoqItem, BoqItemType, ClientPosition, ItemCommercialCost, ItemWorkCost, MarkupTactic,
    MaterialKind, PricingDistributionConfig, SourceRule, Step, TargetCost,
    TenderMarkupParameters,
};

/// Request body for the `/calculate` endpoint.
///
/// The tactic is taken from `inline_tactic` when given, otherwise looked up
/// by `tactic`, otherwise the configured default is used. `parameters`
/// override the configured default parameters key by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// The BOQ items to price.
    pub items: Vec<BoqItemRequest>,
    /// Name of a configured tactic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tactic: Option<String>,
    /// A tactic supplied with the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_tactic: Option<MarkupTactic>,
    /// Tender parameter overrides.
    #[serde(default)]
    pub parameters: TenderMarkupParameters,
    /// Replaces the configured distribution rules when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_distribution: Option<PricingDistributionConfig>,
}

/// A BOQ item in a calculation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoqItemRequest {
    /// Unique identifier for the item.
    pub id: String,
    /// The kind of item.
    #[serde(rename = "type")]
    pub item_type: BoqItemType,
    /// Direct cost of the line.
    pub base_amount: Decimal,
    /// Quantity on the line.
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    /// The owning position.
    #[serde(default)]
    pub client_position_id: Option<String>,
    /// Primary or auxiliary, for materials.
    #[serde(default)]
    pub material_kind: MaterialKind,
    /// The detail cost category.
    #[serde(default)]
    pub detail_cost_category_id: Option<String>,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

impl From<BoqItemRequest> for BoqItem {
    fn from(req: BoqItemRequest) -> Self {
        BoqItem {
            id: req.id,
            item_type: req.item_type,
            base_amount: req.base_amount,
            quantity: req.quantity,
            client_position_id: req.client_position_id,
            material_kind: req.material_kind,
            detail_cost_category_id: req.detail_cost_category_id,
        }
    }
}

/// Request body for the `/evaluate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    /// The amount the sequence starts from.
    pub base_amount: Decimal,
    /// The steps, in persisted form.
    pub steps: Vec<Step>,
    /// Parameters used as given; configured defaults are not applied.
    #[serde(default)]
    pub parameters: TenderMarkupParameters,
}

/// Request body for the `/round` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRequest {
    /// Lines to round.
    pub items: Vec<RoundingItem>,
    /// Grid step; the configured default when absent.
    #[serde(default)]
    pub step: Option<Decimal>,
    /// Zero threshold; the configured default when absent.
    #[serde(default)]
    pub minimum: Option<Decimal>,
}

/// Request body for the `/leaves` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeavesRequest {
    /// The tender's positions, in any order.
    pub positions: Vec<ClientPosition>,
    /// Priced items to aggregate per position.
    #[serde(default)]
    pub items: Vec<ItemCommercialCost>,
}

/// An item in a redistribution request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedistributionItemRequest {
    /// The BOQ item.
    pub item_id: String,
    /// Its work cost.
    pub work_cost: Decimal,
    /// Its detail cost category.
    #[serde(default, alias = "detail_cost_category_id")]
    pub category_id: Option<String>,
}

impl From<&ItemCommercialCost> for RedistributionItemRequest {
    fn from(cost: &ItemCommercialCost) -> Self {
        Self {
            item_id: cost.item_id.clone(),
            work_cost: cost.work_cost,
            category_id: cost.detail_cost_category_id.clone(),
        }
    }
}

/// Request body for the `/redistribute` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedistributeRequest {
    /// Work costs and categories of the items.
    pub items: Vec<RedistributionItemRequest>,
    /// Percentage deductions.
    pub source_rules: Vec<SourceRule>,
    /// Receiving categories.
    pub targets: Vec<TargetCost>,
}

impl RedistributeRequest {
    /// Splits the items into allocator input and an item-to-category map.
    pub fn into_parts(self) -> (Vec<ItemWorkCost>, HashMap<String, String>, Vec<SourceRule>, Vec<TargetCost>) {
        let mut category_map = HashMap::new();
        let items = self
            .items
            .into_iter()
            .map(|item| {
                if let Some(category_id) = item.category_id {
                    category_map.insert(item.item_id.clone(), category_id);
                }
                ItemWorkCost {
                    item_id: item.item_id,
                    work_cost: item.work_cost,
                }
            })
            .collect();
        (items, category_map, self.source_rules, self.targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculation_request_defaults() {
        let json = r#"{
            "items": [{"id": "boq_001", "type": "material", "base_amount": "100"}]
        }"#;
        let request: CalculationRequest = serde_json::from_str(json).unwrap();
        assert!(request.tactic.is_none());
        assert!(request.parameters.is_empty());

        let item: BoqItem = request.items[0].clone().into();
        assert_eq!(item.quantity, Decimal::ONE);
        assert_eq!(item.material_kind, MaterialKind::Basic);
        assert_eq!(item.base_amount, Decimal::new(100, 0));
    }

    #[test]
    fn test_redistribute_request_into_parts() {
        let json = r#"{
            "items": [
                {"item_id": "a", "work_cost": 100, "category_id": "A"},
                {"item_id": "b", "work_cost": 50}
            ],
            "source_rules": [{"category_id": "A", "percentage": 10}],
            "targets": [{"category_id": "B"}]
        }"#;
        let request: RedistributeRequest = serde_json::from_str(json).unwrap();
        let (items, map, rules, targets) = request.into_parts();
        assert_eq!(items.len(), 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a").map(String::as_str), Some("A"));
        assert_eq!(rules.len(), 1);
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn test_redistribution_item_accepts_detail_cost_category() {
        let json = r#"{"item_id": "w1", "work_cost": "250", "detail_cost_category_id": "T"}"#;
        let item: RedistributionItemRequest = serde_json::from_str(json).unwrap();
        assert_eq!(item.category_id.as_deref(), Some("T"));
    }

    #[test]
    fn test_redistribution_item_from_commercial_cost() {
        let cost = ItemCommercialCost {
            item_id: "w1".to_string(),
            item_type: BoqItemType::Work,
            client_position_id: None,
            quantity: Decimal::ONE,
            base_amount: Decimal::new(100, 0),
            commercial_amount: Decimal::new(130, 0),
            markup: Decimal::new(30, 0),
            markup_coefficient: Some(Decimal::new(13, 1)),
            material_cost: Decimal::ZERO,
            work_cost: Decimal::new(130, 0),
            detail_cost_category_id: Some("cat_01".to_string()),
        };

        let request = RedistributeRequest {
            items: vec![RedistributionItemRequest::from(&cost)],
            source_rules: vec![],
            targets: vec![],
        };
        let (items, category_map, _, _) = request.into_parts();
        assert_eq!(items[0].work_cost, Decimal::new(130, 0));
        assert_eq!(category_map.get("w1").map(String::as_str), Some("cat_01"));
    }
}
