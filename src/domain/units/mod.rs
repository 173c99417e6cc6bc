//! Built-in calculation units.
//!
//! Each unit wraps one or more kernels from [`crate::domain::indicator`] and
//! turns their last values into named outputs, labels and occurrences.

pub mod candlestick;
pub mod chart;
pub mod margin;
pub mod momentum;
pub mod rules;
pub mod trend;
pub mod volatility;
pub mod volume;

use crate::domain::capability::{Category, CapabilityMetadata, Priority};
use crate::domain::output::{Context, Direction, TrendDirection};
use crate::domain::params::Params;
use crate::domain::unit::Unit;

/// Strength bonus (or penalty) for a pattern that matches (or contradicts)
/// the prevailing trend.
pub const TREND_BONUS: f64 = 15.0;

/// Bars compared against when no trend context is available.
pub const LOCAL_TREND_LOOKBACK: usize = 10;

/// Implements the identity half of [`Unit`] for a struct with a `meta` field.
macro_rules! unit_identity {
    ($kind:expr) => {
        fn name(&self) -> &str {
            &self.meta.id
        }

        fn kind(&self) -> $crate::domain::capability::UnitKind {
            $kind
        }

        fn metadata(&self) -> &$crate::domain::capability::CapabilityMetadata {
            &self.meta
        }
    };
}
pub(crate) use unit_identity;

pub(crate) fn meta(
    id: &str,
    display_name: &str,
    category: Category,
    priority: Priority,
    min_data_points: usize,
    params: &[(&str, f64)],
) -> CapabilityMetadata {
    CapabilityMetadata::new(
        id,
        display_name,
        category,
        priority,
        min_data_points,
        Params::from_pairs(params),
    )
}

/// Last value of an indicator column, if it is out of warm-up.
pub(crate) fn last(values: &[Option<f64>]) -> Option<f64> {
    values.last().copied().flatten()
}

pub(crate) fn clamp_strength(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Close at `idx` against the mean of the `lookback` closes before it.
pub(crate) fn local_trend(close: &[f64], idx: usize, lookback: usize) -> TrendDirection {
    if lookback == 0 || idx < lookback || idx >= close.len() {
        return TrendDirection::Sideways;
    }
    let mean = close[idx - lookback..idx].iter().sum::<f64>() / lookback as f64;
    if close[idx] > mean {
        TrendDirection::Up
    } else if close[idx] < mean {
        TrendDirection::Down
    } else {
        TrendDirection::Sideways
    }
}

/// The trend a detector should weigh at bar `idx`: the shared context when
/// one was produced, otherwise the local slope over `lookback` bars.
pub(crate) fn prevailing_trend(
    ctx: &Context,
    close: &[f64],
    idx: usize,
    lookback: usize,
) -> TrendDirection {
    match &ctx.trend {
        Some(t) => t.direction,
        None => local_trend(close, idx, lookback),
    }
}

/// `+TREND_BONUS` when `trend` agrees with `direction`, minus when opposed.
pub(crate) fn trend_adjustment(trend: TrendDirection, direction: Direction) -> f64 {
    if trend.agrees_with(direction) {
        TREND_BONUS
    } else if trend.opposes(direction) {
        -TREND_BONUS
    } else {
        0.0
    }
}

/// Reversal patterns need a prior trend to reverse. `+TREND_BONUS` when the
/// prior trend is the expected setup, minus when it runs the other way.
pub(crate) fn setup_adjustment(prior: TrendDirection, setup: TrendDirection) -> f64 {
    match (prior, setup) {
        (TrendDirection::Sideways, _) | (_, TrendDirection::Sideways) => 0.0,
        (a, b) if a == b => TREND_BONUS,
        _ => -TREND_BONUS,
    }
}

/// The full library in registration order. Trend classifiers come first.
pub fn default_units() -> Vec<Box<dyn Unit>> {
    vec![
        Box::new(trend::TrendClassifier::default()),
        Box::new(trend::MovingAverage::default()),
        Box::new(trend::Ema::default()),
        Box::new(trend::Dema::default()),
        Box::new(trend::Tema::default()),
        Box::new(trend::Trix::default()),
        Box::new(trend::Zlema::default()),
        Box::new(trend::Hma::default()),
        Box::new(trend::Macd::default()),
        Box::new(trend::ParabolicSar::default()),
        Box::new(trend::Supertrend::default()),
        Box::new(trend::Adx::default()),
        Box::new(momentum::Rsi::default()),
        Box::new(momentum::Kdj::default()),
        Box::new(momentum::WilliamsR::default()),
        Box::new(momentum::StochRsi::default()),
        Box::new(momentum::Cci::default()),
        Box::new(momentum::Roc::default()),
        Box::new(volatility::Bollinger::default()),
        Box::new(volatility::Atr::default()),
        Box::new(volatility::StdDev::default()),
        Box::new(volume::Obv::default()),
        Box::new(volume::Mfi::default()),
        Box::new(volume::Vwap::default()),
        Box::new(volume::VolumeRatio::default()),
        Box::new(margin::MarginTrend::default()),
        Box::new(candlestick::Candlestick::default()),
        Box::new(chart::ChartPatterns::default()),
        Box::new(rules::MaCross::default()),
        Box::new(rules::MacdCross::default()),
        Box::new(rules::RsiReversal::default()),
    ]
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::output::TrendContext;
    use std::collections::HashSet;

    #[test]
    fn default_units_have_unique_names() {
        let units = default_units();
        assert_eq!(units.len(), 31);
        let names: HashSet<String> = units.iter().map(|u| u.name().to_string()).collect();
        assert_eq!(names.len(), units.len());
    }

    #[test]
    fn default_params_pass_validation() {
        for unit in default_units() {
            assert!(
                unit.validate_params(unit.default_params()).is_ok(),
                "{}",
                unit.name()
            );
        }
    }

    #[test]
    fn local_trend_compares_against_mean() {
        let up: Vec<f64> = (0..12).map(|i| i as f64).collect();
        assert_eq!(local_trend(&up, 11, 10), TrendDirection::Up);
        let down: Vec<f64> = up.iter().rev().copied().collect();
        assert_eq!(local_trend(&down, 11, 10), TrendDirection::Down);
        assert_eq!(local_trend(&up, 5, 10), TrendDirection::Sideways);
    }

    #[test]
    fn prevailing_trend_prefers_context() {
        let up: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let ctx = Context::new(1).with_trend(TrendContext {
            direction: TrendDirection::Down,
            strength: 80.0,
            source: "trend_classifier".into(),
        });
        assert_eq!(prevailing_trend(&ctx, &up, 11, 10), TrendDirection::Down);
        assert_eq!(
            prevailing_trend(&Context::new(1), &up, 11, LOCAL_TREND_LOOKBACK),
            TrendDirection::Up
        );
    }

    #[test]
    fn trend_adjustment_sign() {
        assert_eq!(trend_adjustment(TrendDirection::Up, Direction::Bullish), TREND_BONUS);
        assert_eq!(trend_adjustment(TrendDirection::Up, Direction::Bearish), -TREND_BONUS);
        assert_eq!(trend_adjustment(TrendDirection::Sideways, Direction::Bullish), 0.0);
    }

    #[test]
    fn setup_adjustment_sign() {
        assert_eq!(setup_adjustment(TrendDirection::Down, TrendDirection::Down), TREND_BONUS);
        assert_eq!(setup_adjustment(TrendDirection::Up, TrendDirection::Down), -TREND_BONUS);
        assert_eq!(setup_adjustment(TrendDirection::Sideways, TrendDirection::Up), 0.0);
    }
}
