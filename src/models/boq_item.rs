//! BOQ line item model and related types.
//!
//! This module defines the [`BoqItem`] struct and the [`BoqItemType`] enum
//! for representing costed Bill-of-Quantities rows.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CategoryKind;

/// The kind of a BOQ line item.
///
/// Each type has its own markup sequence in a tactic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoqItemType {
    /// Own-forces labour.
    Work,
    /// Material supplied by the contractor.
    Material,
    /// Labour performed by a subcontractor.
    SubcontractWork,
    /// Material supplied through a subcontractor.
    SubcontractMaterial,
    /// Labour attached as a component of another item.
    ComponentWork,
    /// Material attached as a component of another item.
    ComponentMaterial,
}

impl BoqItemType {
    /// All item types, in declaration order.
    pub const ALL: [BoqItemType; 6] = [
        BoqItemType::Work,
        BoqItemType::Material,
        BoqItemType::SubcontractWork,
        BoqItemType::SubcontractMaterial,
        BoqItemType::ComponentWork,
        BoqItemType::ComponentMaterial,
    ];

    /// Returns the wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoqItemType::Work => "work",
            BoqItemType::Material => "material",
            BoqItemType::SubcontractWork => "subcontract_work",
            BoqItemType::SubcontractMaterial => "subcontract_material",
            BoqItemType::ComponentWork => "component_work",
            BoqItemType::ComponentMaterial => "component_material",
        }
    }

    /// Returns true for the labour types.
    pub fn is_work(&self) -> bool {
        matches!(
            self,
            BoqItemType::Work | BoqItemType::SubcontractWork | BoqItemType::ComponentWork
        )
    }
}

impl fmt::Display for BoqItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a material is a primary or an auxiliary consumable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// A primary material of the position.
    #[default]
    Basic,
    /// An auxiliary consumable.
    Auxiliary,
}

/// A single costed line of a tender's Bill of Quantities.
///
/// `base_amount` is input only; the engine never rewrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoqItem {
    /// Unique identifier for the item.
    pub id: String,
    /// The kind of item.
    #[serde(rename = "type")]
    pub item_type: BoqItemType,
    /// Direct (pre-markup) cost of the whole line.
    pub base_amount: Decimal,
    /// Quantity of units on the line.
    pub quantity: Decimal,
    /// The position this item belongs to.
    #[serde(default)]
    pub client_position_id: Option<String>,
    /// Primary or auxiliary, meaningful for material types only.
    #[serde(default)]
    pub material_kind: MaterialKind,
    /// The detail cost category the item is booked against.
    #[serde(default)]
    pub detail_cost_category_id: Option<String>,
}

impl BoqItem {
    /// Returns the pricing-distribution category kind of this item.
    ///
    /// # Examples
    ///
    /// ```
    /// use markup_engine::models::{BoqItem, BoqItemType, CategoryKind, MaterialKind};
    /// use rust_decimal::Decimal;
    ///
    /// let item = BoqItem {
    ///     id: "boq_001".to_string(),
    ///     item_type: BoqItemType::Material,
    ///     base_amount: Decimal::new(100, 0),
    ///     quantity: Decimal::ONE,
    ///     client_position_id: None,
    ///     material_kind: MaterialKind::Auxiliary,
    ///     detail_cost_category_id: None,
    /// };
    /// assert_eq!(item.category_kind(), CategoryKind::Auxiliary);
    /// ```
    pub fn category_kind(&self) -> CategoryKind {
        match self.item_type {
            BoqItemType::Work | BoqItemType::SubcontractWork | BoqItemType::ComponentWork => {
                CategoryKind::Work
            }
            BoqItemType::Material => match self.material_kind {
                MaterialKind::Basic => CategoryKind::Basic,
                MaterialKind::Auxiliary => CategoryKind::Auxiliary,
            },
            BoqItemType::ComponentMaterial => CategoryKind::Auxiliary,
            BoqItemType::SubcontractMaterial => CategoryKind::SubcontractBasic,
        }
    }
}
