//! Client position model.
//!
//! Positions form a tree that is stored flat: ordered by position number,
//! with an integer hierarchy level per row.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A row of the client's position list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientPosition {
    /// Unique identifier for the position.
    pub id: String,
    /// Ordering key; may carry fractional sub-numbering (e.g. `12.1`).
    pub position_number: Decimal,
    /// Depth in the tree; larger is more nested.
    pub hierarchy_level: i32,
    /// Marks a supplementary row inserted under an anchor position.
    #[serde(default)]
    pub is_additional: bool,
}

impl ClientPosition {
    /// Creates a non-additional position.
    pub fn new(id: impl Into<String>, position_number: Decimal, hierarchy_level: i32) -> Self {
        Self {
            id: id.into(),
            position_number,
            hierarchy_level,
            is_additional: false,
        }
    }

    /// Creates an additional (supplementary) position.
    pub fn additional(id: impl Into<String>, position_number: Decimal, hierarchy_level: i32) -> Self {
        Self {
            is_additional: true,
            ..Self::new(id, position_number, hierarchy_level)
        }
    }
}

/// Sorts positions by position number, keeping the input order for ties.
pub fn sort_by_position_number(positions: &mut [ClientPosition]) {
    positions.sort_by(|a, b| a.position_number.cmp(&b.position_number));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_sort_by_fractional_position_number() {
        let mut positions = vec![
            ClientPosition::new("c", dec("2"), 1),
            ClientPosition::additional("b", dec("1.1"), 2),
            ClientPosition::new("a", dec("1"), 1),
        ];
        sort_by_position_number(&mut positions);

        let ids: Vec<&str> = positions.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(positions[1].is_additional);
    }

    #[test]
    fn test_deserialize_defaults_is_additional() {
        let json = r#"{"id": "pos_1", "position_number": 3, "hierarchy_level": 2}"#;
        let position: ClientPosition = serde_json::from_str(json).unwrap();
        assert!(!position.is_additional);
        assert_eq!(position.hierarchy_level, 2);
    }
}
