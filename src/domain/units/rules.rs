//! Signal units: built-in crossover rules and configurable factor rules.
//!
//! Each emits a `signal` label (BUY, SELL or HOLD) for the last bar. BUY and
//! SELL also produce a Rule-family occurrence so they survive into the
//! signal bucket alongside synthesized pattern signals.

use super::trend::validate_macd_params;
use super::momentum::zone_bounds;
use super::{
    LOCAL_TREND_LOOKBACK, clamp_strength, last, meta, prevailing_trend, trend_adjustment,
    unit_identity,
};
use crate::domain::capability::{Category, CapabilityMetadata, Priority, UnitKind};
use crate::domain::error::{ParseError, UnitError};
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator::macd::{calculate_macd, macd_min_bars};
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::labels::{cross_label, last_pair};
use crate::domain::output::{
    Context, Direction, Occurrence, PatternFamily, SignalLabel, UnitOutput,
};
use crate::domain::params::Params;
use crate::domain::rule::{Rule, extract_indicators};
use crate::domain::rule_eval::RuleContext;
use crate::domain::rule_parser;
use crate::domain::series::Series;
use crate::domain::unit::Unit;

/// Strength of a rule signal before the trend adjustment.
pub const RULE_BASE: f64 = 60.0;

/// `signal` label plus, for BUY/SELL, an occurrence on the last bar.
fn signal_output(
    series: &Series,
    ctx: &Context,
    meta: &CapabilityMetadata,
    label: SignalLabel,
    description: impl FnOnce() -> String,
) -> UnitOutput {
    let out = UnitOutput::empty().label("signal", label);
    let direction = match label {
        SignalLabel::Buy => Direction::Bullish,
        SignalLabel::Sell => Direction::Bearish,
        _ => return out,
    };
    let Some(idx) = series.last_index() else {
        return out;
    };
    let trend = prevailing_trend(
        ctx,
        &series.close,
        idx.saturating_sub(1),
        LOCAL_TREND_LOOKBACK,
    );
    out.occurrence(Occurrence {
        pattern_id: meta.id.clone(),
        name: meta.display_name.clone(),
        family: PatternFamily::Rule,
        direction,
        date: series.dates[idx],
        index: idx,
        strength: clamp_strength(RULE_BASE + trend_adjustment(trend, direction)),
        description: description(),
    })
}

fn signal_meta(id: &str, display_name: &str, min: usize, params: &[(&str, f64)]) -> CapabilityMetadata {
    meta(id, display_name, Category::Signal, Priority::P1, min, params)
}

/// Fast SMA crossing the slow SMA.
pub struct MaCross {
    meta: CapabilityMetadata,
}

impl Default for MaCross {
    fn default() -> Self {
        Self {
            meta: signal_meta("ma_cross", "MA Crossover", 21, &[("fast", 5.0), ("slow", 20.0)]),
        }
    }
}

impl MaCross {
    fn periods(params: &Params) -> Result<(usize, usize), UnitError> {
        let fast = params.period("fast")?;
        let slow = params.period("slow")?;
        if fast >= slow {
            return Err(UnitError::InvalidParameter {
                name: "fast".into(),
                reason: format!("{fast} must be below slow {slow}"),
            });
        }
        Ok((fast, slow))
    }
}

impl Unit for MaCross {
    unit_identity!(UnitKind::StrategyRule);

    fn min_data_points(&self, params: &Params) -> usize {
        Self::periods(params)
            .map(|(_, slow)| slow + 1)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        Self::periods(params).map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let (fast, slow) = Self::periods(params)?;
        if series.len() < slow + 1 {
            return Ok(UnitOutput::empty());
        }
        let fast_ma = calculate_sma(&series.close, fast);
        let slow_ma = calculate_sma(&series.close, slow);
        let (Some((pf, f)), Some((ps, s))) = (last_pair(&fast_ma), last_pair(&slow_ma)) else {
            return Ok(UnitOutput::empty());
        };
        let label = cross_label(pf, ps, f, s);
        Ok(signal_output(series, ctx, &self.meta, label, || {
            format!("SMA({fast}) {f:.4} vs SMA({slow}) {s:.4}")
        })
        .number("fast_ma", f)
        .number("slow_ma", s))
    }
}

/// MACD line crossing its signal line.
pub struct MacdCross {
    meta: CapabilityMetadata,
}

impl Default for MacdCross {
    fn default() -> Self {
        Self {
            meta: signal_meta(
                "macd_cross",
                "MACD Crossover",
                macd_min_bars(12, 26, 9) + 1,
                &[("fast", 12.0), ("slow", 26.0), ("signal", 9.0)],
            ),
        }
    }
}

impl Unit for MacdCross {
    unit_identity!(UnitKind::StrategyRule);

    fn min_data_points(&self, params: &Params) -> usize {
        validate_macd_params(params)
            .map(|(f, s, sig)| macd_min_bars(f, s, sig) + 1)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        validate_macd_params(params).map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let (fast, slow, signal) = validate_macd_params(params)?;
        if series.len() < macd_min_bars(fast, slow, signal) + 1 {
            return Ok(UnitOutput::empty());
        }
        let macd = calculate_macd(&series.close, fast, slow, signal);
        let (Some((pl, l)), Some((ps, s))) = (last_pair(&macd.line), last_pair(&macd.signal))
        else {
            return Ok(UnitOutput::empty());
        };
        let label = cross_label(pl, ps, l, s);
        Ok(signal_output(series, ctx, &self.meta, label, || {
            format!("MACD {l:.4} vs signal {s:.4}")
        })
        .number("macd", l)
        .number("macd_signal", s))
    }
}

/// RSI leaving an extreme zone: BUY when it climbs out of oversold, SELL
/// when it drops out of overbought.
pub struct RsiReversal {
    meta: CapabilityMetadata,
}

impl Default for RsiReversal {
    fn default() -> Self {
        Self {
            meta: signal_meta(
                "rsi_reversal",
                "RSI Reversal",
                16,
                &[("period", 14.0), ("oversold", 30.0), ("overbought", 70.0)],
            ),
        }
    }
}

impl Unit for RsiReversal {
    unit_identity!(UnitKind::StrategyRule);

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("period")
            .map(|p| p + 2)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period")?;
        zone_bounds(params).map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        let (oversold, overbought) = zone_bounds(params)?;
        if series.len() < period + 2 {
            return Ok(UnitOutput::empty());
        }
        let rsi = calculate_rsi(&series.close, period);
        let Some((prev, curr)) = last_pair(&rsi) else {
            return Ok(UnitOutput::empty());
        };
        let label = if prev <= oversold && curr > oversold {
            SignalLabel::Buy
        } else if prev >= overbought && curr < overbought {
            SignalLabel::Sell
        } else {
            SignalLabel::Hold
        };
        Ok(signal_output(series, ctx, &self.meta, label, || {
            format!("RSI({period}) {prev:.2} -> {curr:.2}")
        })
        .maybe_number("rsi", last(&rsi)))
    }
}

/// A configured entry/exit rule pair, registered as `rule.<name>`.
///
/// Entry true on the last bar gives BUY; otherwise exit true gives SELL;
/// otherwise HOLD.
#[derive(Debug)]
pub struct FactorRule {
    meta: CapabilityMetadata,
    entry: Rule,
    exit: Rule,
}

impl FactorRule {
    pub fn new(name: &str, entry: Rule, exit: Rule) -> Self {
        let lookback = entry.lookback().max(exit.lookback());
        let warmup = extract_indicators(&entry)
            .iter()
            .chain(extract_indicators(&exit).iter())
            .map(IndicatorType::min_bars)
            .max()
            .unwrap_or(1);
        let id = format!("rule.{name}");
        Self {
            meta: CapabilityMetadata::new(
                id,
                format!("Factor rule {name}"),
                Category::Signal,
                Priority::P1,
                warmup + lookback,
                Params::new(),
            ),
            entry,
            exit,
        }
    }

    /// Parse both expressions with the rule DSL.
    pub fn parse(name: &str, entry: &str, exit: &str) -> Result<Self, ParseError> {
        Ok(Self::new(name, rule_parser::parse(entry)?, rule_parser::parse(exit)?))
    }

    pub fn entry(&self) -> &Rule {
        &self.entry
    }

    pub fn exit(&self) -> &Rule {
        &self.exit
    }
}

impl Unit for FactorRule {
    unit_identity!(UnitKind::StrategyRule);

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        if series.len() < self.min_data_points(params) {
            return Ok(UnitOutput::empty());
        }
        let rules = RuleContext::new(series, &[&self.entry, &self.exit]);
        let label = if rules.evaluate_last(&self.entry) {
            SignalLabel::Buy
        } else if rules.evaluate_last(&self.exit) {
            SignalLabel::Sell
        } else {
            SignalLabel::Hold
        };
        Ok(signal_output(series, ctx, &self.meta, label, || match label {
            SignalLabel::Buy => format!("entry {}", self.entry),
            _ => format!("exit {}", self.exit),
        }))
    }
}
