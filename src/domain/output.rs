//! Typed unit outputs.
//!
//! Values stay typed inside the engine; they become string-keyed JSON only in
//! [`crate::domain::flatten`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalLabel {
    Overbought,
    Oversold,
    Neutral,
    Buy,
    Sell,
    Hold,
    Bullish,
    Bearish,
}

impl fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalLabel::Overbought => "OVERBOUGHT",
            SignalLabel::Oversold => "OVERSOLD",
            SignalLabel::Neutral => "NEUTRAL",
            SignalLabel::Buy => "BUY",
            SignalLabel::Sell => "SELL",
            SignalLabel::Hold => "HOLD",
            SignalLabel::Bullish => "BULLISH",
            SignalLabel::Bearish => "BEARISH",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    Number(f64),
    Label(SignalLabel),
    Composite(BTreeMap<String, f64>),
}

impl OutputValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            OutputValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<SignalLabel> {
        match self {
            OutputValue::Label(l) => Some(*l),
            _ => None,
        }
    }

    pub fn composite(pairs: &[(&str, f64)]) -> Self {
        OutputValue::Composite(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub fn label(self) -> SignalLabel {
        match self {
            Direction::Bullish => SignalLabel::Bullish,
            Direction::Bearish => SignalLabel::Bearish,
            Direction::Neutral => SignalLabel::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternFamily {
    Candlestick,
    Chart,
    Rule,
    Synthesized,
}

/// One discrete detection at a specific bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub pattern_id: String,
    pub name: String,
    pub family: PatternFamily,
    pub direction: Direction,
    pub date: NaiveDate,
    pub index: usize,
    /// Confidence in 0..=100.
    pub strength: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

impl TrendDirection {
    /// Whether a pattern of `direction` agrees with this trend.
    pub fn agrees_with(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (TrendDirection::Up, Direction::Bullish) | (TrendDirection::Down, Direction::Bearish)
        )
    }

    pub fn opposes(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (TrendDirection::Up, Direction::Bearish) | (TrendDirection::Down, Direction::Bullish)
        )
    }
}

/// Trend classification produced by a trend classifier unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendContext {
    pub direction: TrendDirection,
    /// 0..=100
    pub strength: f64,
    pub source: String,
}

/// Read-only state handed to every unit in one compute call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Context {
    pub trend: Option<TrendContext>,
    /// Bars at the tail of the series that detectors should scan.
    pub lookback: usize,
}

impl Context {
    pub fn new(lookback: usize) -> Self {
        Self {
            trend: None,
            lookback,
        }
    }

    pub fn with_trend(mut self, trend: TrendContext) -> Self {
        self.trend = Some(trend);
        self
    }

    /// First bar index detectors should scan for a series of `len` bars.
    pub fn scan_start(&self, len: usize) -> usize {
        len.saturating_sub(self.lookback.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnitOutput {
    pub values: BTreeMap<String, OutputValue>,
    pub occurrences: Vec<Occurrence>,
    pub trend: Option<TrendContext>,
}

impl UnitOutput {
    /// The answer to insufficient data.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.occurrences.is_empty() && self.trend.is_none()
    }

    pub fn number(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), OutputValue::Number(value));
        self
    }

    /// Insert only when the value is present.
    pub fn maybe_number(mut self, key: impl Into<String>, value: Option<f64>) -> Self {
        if let Some(v) = value {
            self.values.insert(key.into(), OutputValue::Number(v));
        }
        self
    }

    pub fn label(mut self, key: impl Into<String>, label: SignalLabel) -> Self {
        self.values.insert(key.into(), OutputValue::Label(label));
        self
    }

    pub fn composite(mut self, key: impl Into<String>, pairs: &[(&str, f64)]) -> Self {
        self.values
            .insert(key.into(), OutputValue::composite(pairs));
        self
    }

    pub fn occurrence(mut self, occurrence: Occurrence) -> Self {
        self.occurrences.push(occurrence);
        self
    }

    pub fn get(&self, key: &str) -> Option<&OutputValue> {
        self.values.get(key)
    }
}
