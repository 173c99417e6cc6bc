//! Rule AST for factor rules.
//!
//! This module defines the abstract syntax tree for trading rules:
//! - `Operand`: What can be compared (price fields, constants, indicators)
//! - `IndicatorRef`: Reference to an indicator with a specific field
//! - `IndicatorField`: Which field of a multi-value indicator to use
//! - `Rule`: The rule AST with comparison, composite, and temporal variants

use crate::domain::indicator::IndicatorType;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Open,
    High,
    Low,
    Close,
    Volume,
    Constant(f64),
    Indicator(IndicatorRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRef {
    pub indicator_type: IndicatorType,
    pub field: IndicatorField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Value,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    KdjK,
    KdjD,
    KdjJ,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    CrossAbove {
        left: Operand,
        right: Operand,
    },
    CrossBelow {
        left: Operand,
        right: Operand,
    },
    Above {
        left: Operand,
        right: Operand,
    },
    Below {
        left: Operand,
        right: Operand,
    },
    Between {
        operand: Operand,
        lower: f64,
        upper: f64,
    },
    Equals {
        left: Operand,
        right: Operand,
    },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
    Consecutive {
        rule: Box<Rule>,
        count: usize,
    },
    AnyOf {
        rule: Box<Rule>,
        count: usize,
    },
}

impl Rule {
    /// Bars of history the temporal operators look back over, beyond the
    /// evaluated bar. Crosses need one previous bar.
    pub fn lookback(&self) -> usize {
        match self {
            Rule::CrossAbove { .. } | Rule::CrossBelow { .. } => 1,
            Rule::Above { .. } | Rule::Below { .. } | Rule::Between { .. } | Rule::Equals { .. } => 0,
            Rule::And(rules) | Rule::Or(rules) => {
                rules.iter().map(Rule::lookback).max().unwrap_or(0)
            }
            Rule::Not(rule) => rule.lookback(),
            Rule::Consecutive { rule, count } | Rule::AnyOf { rule, count } => {
                rule.lookback() + count.saturating_sub(1)
            }
        }
    }
}

/// Every distinct indicator referenced by a rule, in first-seen order.
pub fn extract_indicators(rule: &Rule) -> Vec<IndicatorType> {
    let mut out = Vec::new();
    collect_indicators(rule, &mut out);
    out
}

fn collect_indicators(rule: &Rule, out: &mut Vec<IndicatorType>) {
    let mut push = |operand: &Operand| {
        if let Operand::Indicator(r) = operand {
            if !out.contains(&r.indicator_type) {
                out.push(r.indicator_type.clone());
            }
        }
    };
    match rule {
        Rule::CrossAbove { left, right }
        | Rule::CrossBelow { left, right }
        | Rule::Above { left, right }
        | Rule::Below { left, right }
        | Rule::Equals { left, right } => {
            push(left);
            push(right);
        }
        Rule::Between { operand, .. } => push(operand),
        Rule::And(rules) | Rule::Or(rules) => {
            for r in rules {
                collect_indicators(r, out);
            }
        }
        Rule::Not(rule) | Rule::Consecutive { rule, .. } | Rule::AnyOf { rule, .. } => {
            collect_indicators(rule, out)
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Open => write!(f, "open"),
            Operand::High => write!(f, "high"),
            Operand::Low => write!(f, "low"),
            Operand::Close => write!(f, "close"),
            Operand::Volume => write!(f, "volume"),
            Operand::Constant(v) => write!(f, "{}", v),
            Operand::Indicator(r) => match (r.field, &r.indicator_type) {
                (IndicatorField::MacdLine, IndicatorType::Macd { fast, slow, signal }) => {
                    write!(f, "MACD_LINE({},{},{})", fast, slow, signal)
                }
                (IndicatorField::MacdSignal, IndicatorType::Macd { fast, slow, signal }) => {
                    write!(f, "MACD_SIGNAL({},{},{})", fast, slow, signal)
                }
                (IndicatorField::MacdHistogram, IndicatorType::Macd { fast, slow, signal }) => {
                    write!(f, "MACD_HISTOGRAM({},{},{})", fast, slow, signal)
                }
                (IndicatorField::KdjK, IndicatorType::Kdj { period, m1, m2 }) => {
                    write!(f, "KDJ_K({},{},{})", period, m1, m2)
                }
                (IndicatorField::KdjD, IndicatorType::Kdj { period, m1, m2 }) => {
                    write!(f, "KDJ_D({},{},{})", period, m1, m2)
                }
                (IndicatorField::KdjJ, IndicatorType::Kdj { period, m1, m2 }) => {
                    write!(f, "KDJ_J({},{},{})", period, m1, m2)
                }
                (field, IndicatorType::Bollinger { period, stddev_mult_x100 }) => {
                    let band = match field {
                        IndicatorField::BollingerUpper => "UPPER",
                        IndicatorField::BollingerLower => "LOWER",
                        _ => "MIDDLE",
                    };
                    let mult = *stddev_mult_x100 as f64 / 100.0;
                    write!(f, "BOLLINGER_{}({},{})", band, period, mult)
                }
                (_, t) => write!(f, "{}", t),
            },
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |rules: &[Rule]| {
            rules
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Rule::CrossAbove { left, right } => write!(f, "CROSS_ABOVE({}, {})", left, right),
            Rule::CrossBelow { left, right } => write!(f, "CROSS_BELOW({}, {})", left, right),
            Rule::Above { left, right } => write!(f, "ABOVE({}, {})", left, right),
            Rule::Below { left, right } => write!(f, "BELOW({}, {})", left, right),
            Rule::Equals { left, right } => write!(f, "EQUALS({}, {})", left, right),
            Rule::Between {
                operand,
                lower,
                upper,
            } => write!(f, "BETWEEN({}, {}, {})", operand, lower, upper),
            Rule::And(rules) => write!(f, "AND({})", join(rules)),
            Rule::Or(rules) => write!(f, "OR({})", join(rules)),
            Rule::Not(rule) => write!(f, "NOT({})", rule),
            Rule::Consecutive { rule, count } => write!(f, "CONSECUTIVE({}, {})", rule, count),
            Rule::AnyOf { rule, count } => write!(f, "ANY_OF({}, {})", rule, count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sma(period: usize) -> Operand {
        Operand::Indicator(IndicatorRef {
            indicator_type: IndicatorType::Sma(period),
            field: IndicatorField::Value,
        })
    }

    #[test]
    fn operand_constant() {
        let c = Operand::Constant(100.5);
        assert_eq!(c, Operand::Constant(100.5));
        assert_ne!(c, Operand::Constant(99.0));
    }

    #[test]
    fn extract_indicators_dedupes_in_order() {
        let rule = Rule::And(vec![
            Rule::CrossAbove {
                left: sma(5),
                right: sma(20),
            },
            Rule::Not(Box::new(Rule::Below {
                left: Operand::Close,
                right: sma(5),
            })),
        ]);
        assert_eq!(
            extract_indicators(&rule),
            vec![IndicatorType::Sma(5), IndicatorType::Sma(20)]
        );
    }

    #[test]
    fn extract_indicators_none_for_price_rules() {
        let rule = Rule::Above {
            left: Operand::Close,
            right: Operand::Constant(100.0),
        };
        assert!(extract_indicators(&rule).is_empty());
    }

    #[test]
    fn lookback_of_temporal_rules() {
        let cross = Rule::CrossAbove {
            left: sma(5),
            right: sma(20),
        };
        assert_eq!(cross.lookback(), 1);
        let consecutive = Rule::Consecutive {
            rule: Box::new(cross),
            count: 3,
        };
        assert_eq!(consecutive.lookback(), 3);
    }

    #[test]
    fn display_round_trips_syntax() {
        let rule = Rule::Or(vec![
            Rule::Above {
                left: Operand::Close,
                right: Operand::Constant(100.0),
            },
            Rule::Between {
                operand: Operand::Indicator(IndicatorRef {
                    indicator_type: IndicatorType::Rsi(14),
                    field: IndicatorField::Value,
                }),
                lower: 30.0,
                upper: 70.0,
            },
        ]);
        assert_eq!(
            rule.to_string(),
            "OR(ABOVE(close, 100), BETWEEN(RSI(14), 30, 70))"
        );
    }
}
