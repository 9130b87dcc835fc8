//! Tender markup parameters.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The outcome of looking up a parameter by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterResolution {
    /// The resolved percentage value.
    pub value: Decimal,
    /// True when the key was absent and zero was substituted.
    pub defaulted: bool,
}

/// Percentage values configured for one tender, keyed by parameter name.
///
/// A key that is absent resolves to zero. Callers that need to know when that
/// happened use [`TenderMarkupParameters::resolve`].
///
/// # Example
///
/// ```
/// use markup_engine::models::TenderMarkupParameters;
/// use rust_decimal::Decimal;
///
/// let params = TenderMarkupParameters::from_pairs([("profit", Decimal::new(10, 0))]);
/// assert_eq!(params.get("profit"), Decimal::new(10, 0));
/// assert_eq!(params.get("overhead"), Decimal::ZERO);
/// assert!(params.resolve("overhead").defaulted);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenderMarkupParameters {
    values: HashMap<String, Decimal>,
}

impl TenderMarkupParameters {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a parameter set from key/value pairs.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Decimal)>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Sets a parameter value.
    pub fn set(&mut self, key: impl Into<String>, value: Decimal) {
        self.values.insert(key.into(), value);
    }

    /// Resolves a key, substituting zero for an absent key.
    pub fn resolve(&self, key: &str) -> ParameterResolution {
        match self.values.get(key) {
            Some(value) => ParameterResolution {
                value: *value,
                defaulted: false,
            },
            None => ParameterResolution {
                value: Decimal::ZERO,
                defaulted: true,
            },
        }
    }

    /// Returns the value of a key, or zero.
    pub fn get(&self, key: &str) -> Decimal {
        self.resolve(key).value
    }

    /// Returns true if the key is explicitly set.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns a copy of these parameters with `overrides` applied on top.
    pub fn merged_with(&self, overrides: &TenderMarkupParameters) -> Self {
        let mut values = self.values.clone();
        values.extend(overrides.values.iter().map(|(k, v)| (k.clone(), *v)));
        Self { values }
    }

    /// Number of explicitly set parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_resolve_present_key() {
        let params = TenderMarkupParameters::from_pairs([("growth", dec("12.5"))]);
        let resolution = params.resolve("growth");
        assert_eq!(resolution.value, dec("12.5"));
        assert!(!resolution.defaulted);
    }

    #[test]
    fn test_resolve_absent_key_defaults_to_zero() {
        let params = TenderMarkupParameters::new();
        let resolution = params.resolve("growth");
        assert_eq!(resolution.value, Decimal::ZERO);
        assert!(resolution.defaulted);
    }

    #[test]
    fn test_explicit_zero_is_not_a_default() {
        let params = TenderMarkupParameters::from_pairs([("growth", Decimal::ZERO)]);
        assert!(!params.resolve("growth").defaulted);
    }

    #[test]
    fn test_merged_with_overrides() {
        let defaults =
            TenderMarkupParameters::from_pairs([("profit", dec("10")), ("overhead", dec("8"))]);
        let overrides = TenderMarkupParameters::from_pairs([("profit", dec("15"))]);

        let merged = defaults.merged_with(&overrides);
        assert_eq!(merged.get("profit"), dec("15"));
        assert_eq!(merged.get("overhead"), dec("8"));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_deserialize_from_plain_map() {
        let params: TenderMarkupParameters =
            serde_json::from_str(r#"{"profit": 10, "overhead": "7.5"}"#).unwrap();
        assert_eq!(params.get("profit"), dec("10"));
        assert_eq!(params.get("overhead"), dec("7.5"));
    }
}
