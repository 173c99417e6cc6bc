//! Rule evaluation against a series and pre-computed indicator values.
//!
//! # Evaluation Semantics
//!
//! - Comparison rules: Evaluate at the given bar index
//! - `CROSS_ABOVE`/`CROSS_BELOW`: Require `index >= 1`, return `false` at index 0
//! - `AND`: Short-circuits on first `false`
//! - `OR`: Short-circuits on first `true`
//! - `CONSECUTIVE(rule, N)`: Child must be true for N consecutive bars ending at current
//! - `ANY_OF(rule, N)`: Child must be true at least once in the last N bars
//!
//! An indicator still warming up (or never computed) resolves to NaN, so
//! every comparison involving it is false.

use crate::domain::indicator::{
    IndicatorSeries, IndicatorType, IndicatorValue, compute_indicators,
};
use crate::domain::rule::{IndicatorField, IndicatorRef, Operand, Rule, extract_indicators};
use crate::domain::series::Series;
use std::collections::HashMap;

const EPSILON: f64 = 1e-9;

/// A series plus the indicators a rule set references.
pub struct RuleContext<'a> {
    series: &'a Series,
    indicators: HashMap<IndicatorType, IndicatorSeries>,
}

impl<'a> RuleContext<'a> {
    /// Compute every indicator referenced by `rules` once.
    pub fn new(series: &'a Series, rules: &[&Rule]) -> Self {
        let mut types = Vec::new();
        for rule in rules {
            types.extend(extract_indicators(rule));
        }
        Self {
            series,
            indicators: compute_indicators(series, &types),
        }
    }

    pub fn with_indicators(
        series: &'a Series,
        indicators: HashMap<IndicatorType, IndicatorSeries>,
    ) -> Self {
        Self { series, indicators }
    }

    pub fn evaluate(&self, rule: &Rule, bar_index: usize) -> bool {
        evaluate(rule, self.series, &self.indicators, bar_index)
    }

    pub fn evaluate_last(&self, rule: &Rule) -> bool {
        match self.series.last_index() {
            Some(i) => self.evaluate(rule, i),
            None => false,
        }
    }
}

pub fn evaluate(
    rule: &Rule,
    series: &Series,
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    bar_index: usize,
) -> bool {
    let value = |operand: &Operand, i: usize| resolve_operand(operand, series, indicators, i);
    match rule {
        Rule::CrossAbove { left, right } => {
            if bar_index == 0 {
                return false;
            }
            value(left, bar_index) > value(right, bar_index)
                && value(left, bar_index - 1) <= value(right, bar_index - 1)
        }
        Rule::CrossBelow { left, right } => {
            if bar_index == 0 {
                return false;
            }
            value(left, bar_index) < value(right, bar_index)
                && value(left, bar_index - 1) >= value(right, bar_index - 1)
        }
        Rule::Above { left, right } => value(left, bar_index) > value(right, bar_index),
        Rule::Below { left, right } => value(left, bar_index) < value(right, bar_index),
        Rule::Between {
            operand,
            lower,
            upper,
        } => {
            let val = value(operand, bar_index);
            val >= *lower && val <= *upper
        }
        Rule::Equals { left, right } => {
            (value(left, bar_index) - value(right, bar_index)).abs() < EPSILON
        }
        Rule::And(rules) => rules
            .iter()
            .all(|r| evaluate(r, series, indicators, bar_index)),
        Rule::Or(rules) => rules
            .iter()
            .any(|r| evaluate(r, series, indicators, bar_index)),
        Rule::Not(rule) => !evaluate(rule, series, indicators, bar_index),
        Rule::Consecutive { rule, count } => {
            if *count == 0 || bar_index + 1 < *count {
                return false;
            }
            ((bar_index + 1 - *count)..=bar_index).all(|i| evaluate(rule, series, indicators, i))
        }
        Rule::AnyOf { rule, count } => {
            if *count == 0 {
                return false;
            }
            let start = bar_index.saturating_sub(*count - 1);
            (start..=bar_index).any(|i| evaluate(rule, series, indicators, i))
        }
    }
}

fn resolve_operand(
    operand: &Operand,
    series: &Series,
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    bar_index: usize,
) -> f64 {
    let field = |values: &[f64]| values.get(bar_index).copied().unwrap_or(f64::NAN);
    match operand {
        Operand::Open => field(&series.open),
        Operand::High => field(&series.high),
        Operand::Low => field(&series.low),
        Operand::Close => field(&series.close),
        Operand::Volume => field(&series.volume),
        Operand::Constant(v) => *v,
        Operand::Indicator(ind_ref) => resolve_indicator(ind_ref, indicators, bar_index),
    }
}

fn resolve_indicator(
    ind_ref: &IndicatorRef,
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    bar_index: usize,
) -> f64 {
    let Some(point) = indicators
        .get(&ind_ref.indicator_type)
        .and_then(|s| s.values.get(bar_index))
    else {
        return f64::NAN;
    };
    if !point.valid {
        return f64::NAN;
    }
    extract_field(&point.value, ind_ref.field)
}

fn extract_field(value: &IndicatorValue, field: IndicatorField) -> f64 {
    match (value, field) {
        (IndicatorValue::Simple(v), IndicatorField::Value) => *v,
        (IndicatorValue::Macd { line, .. }, IndicatorField::MacdLine) => *line,
        (IndicatorValue::Macd { signal, .. }, IndicatorField::MacdSignal) => *signal,
        (IndicatorValue::Macd { histogram, .. }, IndicatorField::MacdHistogram) => *histogram,
        (IndicatorValue::Kdj { k, .. }, IndicatorField::KdjK) => *k,
        (IndicatorValue::Kdj { d, .. }, IndicatorField::KdjD) => *d,
        (IndicatorValue::Kdj { j, .. }, IndicatorField::KdjJ) => *j,
        (IndicatorValue::Bollinger { upper, .. }, IndicatorField::BollingerUpper) => *upper,
        (IndicatorValue::Bollinger { middle, .. }, IndicatorField::BollingerMiddle) => *middle,
        (IndicatorValue::Bollinger { lower, .. }, IndicatorField::BollingerLower) => *lower,
        _ => f64::NAN,
    }
}
