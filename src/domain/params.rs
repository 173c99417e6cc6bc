//! Unit parameter mappings.

use crate::domain::error::UnitError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Longest window any unit accepts. Keeps warm-up arithmetic far from
/// overflow on every target.
pub const MAX_PERIOD: usize = 1_000_000;

/// Ordered `name -> value` mapping. Integer parameters (periods) are stored
/// as `f64` and checked on access.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params(BTreeMap<String, f64>);

impl Params {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build from `(key, value)` pairs.
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
        )
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Finite numeric parameter.
    pub fn number(&self, key: &str) -> Result<f64, UnitError> {
        let value = self.get(key).ok_or_else(|| UnitError::MissingParameter {
            name: key.to_string(),
        })?;
        if !value.is_finite() {
            return Err(UnitError::InvalidParameter {
                name: key.to_string(),
                reason: format!("{value} is not finite"),
            });
        }
        Ok(value)
    }

    /// Positive integer parameter such as a window length, at most
    /// [`MAX_PERIOD`].
    pub fn period(&self, key: &str) -> Result<usize, UnitError> {
        let value = self.number(key)?;
        if value < 1.0 || value.fract() != 0.0 {
            return Err(UnitError::InvalidParameter {
                name: key.to_string(),
                reason: format!("{value} is not a positive integer"),
            });
        }
        if value > MAX_PERIOD as f64 {
            return Err(UnitError::InvalidParameter {
                name: key.to_string(),
                reason: format!("{value} exceeds the maximum window of {MAX_PERIOD} bars"),
            });
        }
        Ok(value as usize)
    }

    /// Strictly positive numeric parameter such as a band multiplier.
    pub fn positive(&self, key: &str) -> Result<f64, UnitError> {
        let value = self.number(key)?;
        if value <= 0.0 {
            return Err(UnitError::InvalidParameter {
                name: key.to_string(),
                reason: format!("{value} must be positive"),
            });
        }
        Ok(value)
    }

    /// Defaults overlaid with overrides, key by key.
    pub fn merged(&self, overrides: &Params) -> Params {
        let mut out = self.clone();
        for (k, v) in overrides.iter() {
            out.insert(k, v);
        }
        out
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_accepts_integers() {
        let p = Params::from_pairs(&[("period", 14.0)]);
        assert_eq!(p.period("period").unwrap(), 14);
    }

    #[test]
    fn period_rejects_fractional_and_zero() {
        let p = Params::from_pairs(&[("a", 2.5), ("b", 0.0), ("c", -3.0)]);
        assert!(p.period("a").is_err());
        assert!(p.period("b").is_err());
        assert!(p.period("c").is_err());
    }

    #[test]
    fn period_rejects_huge_windows() {
        let p = Params::from_pairs(&[("max", MAX_PERIOD as f64), ("huge", 1e20)]);
        assert_eq!(p.period("max").unwrap(), MAX_PERIOD);
        assert!(matches!(
            p.period("huge"),
            Err(UnitError::InvalidParameter { ref name, .. }) if name == "huge"
        ));
    }

    #[test]
    fn missing_parameter() {
        let p = Params::new();
        assert_eq!(
            p.number("x"),
            Err(UnitError::MissingParameter { name: "x".into() })
        );
    }

    #[test]
    fn non_finite_rejected() {
        let p = Params::new().with("x", f64::INFINITY);
        assert!(matches!(
            p.number("x"),
            Err(UnitError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn merged_overrides_key_by_key() {
        let defaults = Params::from_pairs(&[("fast", 12.0), ("slow", 26.0)]);
        let overrides = Params::from_pairs(&[("fast", 5.0)]);
        let merged = defaults.merged(&overrides);
        assert_eq!(merged.get("fast"), Some(5.0));
        assert_eq!(merged.get("slow"), Some(26.0));
    }

    #[test]
    fn display_is_sorted() {
        let p = Params::from_pairs(&[("slow", 26.0), ("fast", 12.0)]);
        assert_eq!(p.to_string(), "fast=12,slow=26");
    }
}
