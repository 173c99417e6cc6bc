//! Capability metadata: what a unit computes, where its output lands and how
//! urgently it should run.

use crate::domain::error::PlanError;
use crate::domain::params::Params;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Trend,
    Momentum,
    Volatility,
    Volume,
    Margin,
    Kline,
    Chart,
    Signal,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Trend,
        Category::Momentum,
        Category::Volatility,
        Category::Volume,
        Category::Margin,
        Category::Kline,
        Category::Chart,
        Category::Signal,
    ];

    /// Categories whose units read the trend context.
    pub fn is_trend_dependent(self) -> bool {
        matches!(self, Category::Kline | Category::Chart | Category::Signal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Trend => "trend",
            Category::Momentum => "momentum",
            Category::Volatility => "volatility",
            Category::Volume => "volume",
            Category::Margin => "margin",
            Category::Kline => "kline",
            Category::Chart => "chart",
            Category::Signal => "signal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lower || (lower == "candlestick" && *c == Category::Kline))
            .ok_or_else(|| PlanError::UnknownCategory {
                name: s.to_string(),
            })
    }
}

/// Urgency tier. `P0` is the most urgent; a plan with `max_priority = P1`
/// runs P0 and P1 units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::P0, Priority::P1, Priority::P2];
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::P0 => write!(f, "P0"),
            Priority::P1 => write!(f, "P1"),
            Priority::P2 => write!(f, "P2"),
        }
    }
}

impl FromStr for Priority {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "P0" | "0" => Ok(Priority::P0),
            "P1" | "1" => Ok(Priority::P1),
            "P2" | "2" => Ok(Priority::P2),
            _ => Err(PlanError::UnknownPriority {
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Indicator,
    PatternDetector,
    StrategyRule,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Indicator => write!(f, "indicator"),
            UnitKind::PatternDetector => write!(f, "pattern"),
            UnitKind::StrategyRule => write!(f, "rule"),
        }
    }
}

/// Static description of one capability. A unit may expose several
/// capabilities (a candlestick detector exposes one per pattern).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityMetadata {
    pub id: String,
    pub display_name: String,
    pub category: Category,
    pub priority: Priority,
    pub min_data_points: usize,
    pub default_params: Params,
}

impl CapabilityMetadata {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        category: Category,
        priority: Priority,
        min_data_points: usize,
        default_params: Params,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category,
            priority,
            min_data_points,
            default_params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_dependent_categories() {
        let deps: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|c| c.is_trend_dependent())
            .collect();
        assert_eq!(deps, vec![Category::Kline, Category::Chart, Category::Signal]);
    }

    #[test]
    fn category_parse() {
        assert_eq!("Momentum".parse::<Category>().unwrap(), Category::Momentum);
        assert_eq!("candlestick".parse::<Category>().unwrap(), Category::Kline);
        assert!("sentiment".parse::<Category>().is_err());
    }

    #[test]
    fn priority_order_and_parse() {
        assert!(Priority::P0 < Priority::P1);
        assert!(Priority::P1 < Priority::P2);
        assert_eq!("p1".parse::<Priority>().unwrap(), Priority::P1);
        assert!("P3".parse::<Priority>().is_err());
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Volatility).unwrap();
        assert_eq!(json, "\"volatility\"");
    }
}
