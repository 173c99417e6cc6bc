//! Chart pattern detector.
//!
//! Breakout: close above the highest high of the previous `window` bars
//! (breakdown: below the lowest low). Volume above `volume_factor` × the
//! window's mean volume confirms it.
//!
//! Double top: two pivot highs within `tolerance` of each other, at least
//! `min_separation` bars apart, followed by a close through the neckline
//! (lowest low between the peaks). Double bottom mirrors it.

use super::{
    LOCAL_TREND_LOOKBACK, clamp_strength, meta, prevailing_trend, setup_adjustment,
    trend_adjustment, unit_identity,
};
use crate::domain::capability::{Category, CapabilityMetadata, Priority, UnitKind};
use crate::domain::error::UnitError;
use crate::domain::output::{
    Context, Direction, Occurrence, PatternFamily, TrendDirection, UnitOutput,
};
use crate::domain::params::Params;
use crate::domain::series::Series;
use crate::domain::unit::Unit;

const BREAKOUT_BASE: f64 = 60.0;
const VOLUME_BONUS: f64 = 15.0;
const DOUBLE_BASE: f64 = 65.0;
const SIMILARITY_BONUS: f64 = 10.0;

const DOUBLE_TOP: &str = "chart_double_top";
const DOUBLE_BOTTOM: &str = "chart_double_bottom";
const BREAKOUT: &str = "chart_breakout";
const BREAKDOWN: &str = "chart_breakdown";

struct Settings {
    window: usize,
    tolerance: f64,
    pivot_span: usize,
    min_separation: usize,
    volume_factor: f64,
    trend_lookback: usize,
}

impl Settings {
    fn from_params(params: &Params) -> Result<Self, UnitError> {
        let tolerance = params.positive("tolerance")?;
        if tolerance >= 1.0 {
            return Err(UnitError::InvalidParameter {
                name: "tolerance".into(),
                reason: format!("{tolerance} must be below 1"),
            });
        }
        Ok(Self {
            window: params.period("window")?,
            tolerance,
            pivot_span: params.period("pivot_span")?,
            min_separation: params.period("min_separation")?,
            volume_factor: params.positive("volume_factor")?,
            trend_lookback: params.period("trend_lookback")?,
        })
    }
}

/// Index `j` is a pivot when it beats every bar within `span` on both
/// sides: ties to the left are allowed, ties to the right are not, so a
/// plateau yields one pivot.
fn pivots(values: &[f64], span: usize, higher: impl Fn(f64, f64) -> bool) -> Vec<usize> {
    let n = values.len();
    (span..n.saturating_sub(span))
        .filter(|&j| {
            let v = values[j];
            values[j - span..j].iter().all(|&w| v == w || higher(v, w))
                && values[j + 1..=j + span].iter().all(|&w| higher(v, w))
        })
        .collect()
}

struct Double {
    first: usize,
    difference: f64,
}

/// Most recent qualifying pair of pivots whose neckline breaks at `idx`.
fn find_double(
    pivots: &[usize],
    extremes: &[f64],
    opposite: &[f64],
    close: &[f64],
    idx: usize,
    s: &Settings,
    top: bool,
) -> Option<Double> {
    let from = idx.saturating_sub(s.window);
    let candidates: Vec<usize> = pivots
        .iter()
        .copied()
        .filter(|&p| p >= from && p + s.pivot_span < idx)
        .collect();
    for (b, &second) in candidates.iter().enumerate().rev() {
        for &first in candidates[..b].iter().rev() {
            if second - first < s.min_separation {
                continue;
            }
            let (a, c) = (extremes[first], extremes[second]);
            let scale = a.abs().max(c.abs());
            if scale == 0.0 {
                continue;
            }
            let difference = (a - c).abs() / scale;
            if difference > s.tolerance {
                continue;
            }
            let between = opposite[first..=second].iter().copied();
            let broke = if top {
                let neckline = between.fold(f64::INFINITY, f64::min);
                close[idx] < neckline && close[idx - 1] >= neckline
            } else {
                let neckline = between.fold(f64::NEG_INFINITY, f64::max);
                close[idx] > neckline && close[idx - 1] <= neckline
            };
            if broke {
                return Some(Double { first, difference });
            }
        }
    }
    None
}

pub struct ChartPatterns {
    meta: CapabilityMetadata,
}

impl Default for ChartPatterns {
    fn default() -> Self {
        Self {
            meta: meta(
                "chart",
                "Chart Patterns",
                Category::Chart,
                Priority::P1,
                21,
                &[
                    ("window", 20.0),
                    ("tolerance", 0.03),
                    ("pivot_span", 3.0),
                    ("min_separation", 5.0),
                    ("volume_factor", 1.5),
                    ("trend_lookback", LOCAL_TREND_LOOKBACK as f64),
                ],
            ),
        }
    }
}

fn capability(id: &str, name: &str, priority: Priority, params: &Params) -> CapabilityMetadata {
    CapabilityMetadata::new(id, name, Category::Chart, priority, 21, params.clone())
}

impl Unit for ChartPatterns {
    unit_identity!(UnitKind::PatternDetector);

    fn capabilities(&self) -> Vec<CapabilityMetadata> {
        let params = &self.meta.default_params;
        vec![
            capability(DOUBLE_TOP, "Double Top", Priority::P1, params),
            capability(DOUBLE_BOTTOM, "Double Bottom", Priority::P1, params),
            capability(BREAKOUT, "Breakout", Priority::P1, params),
            capability(BREAKDOWN, "Breakdown", Priority::P1, params),
        ]
    }

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("window")
            .map(|w| w + 1)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        Settings::from_params(params).map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let s = Settings::from_params(params)?;
        let n = series.len();
        if n < s.window + 1 {
            return Ok(UnitOutput::empty());
        }
        let (high, low, close, volume) = (&series.high, &series.low, &series.close, &series.volume);
        let peaks = pivots(high, s.pivot_span, |a, b| a > b);
        let troughs = pivots(low, s.pivot_span, |a, b| a < b);

        let occurrence = |id: &str, name: &str, direction, idx: usize, strength: f64, what: String| {
            Occurrence {
                pattern_id: id.to_string(),
                name: name.to_string(),
                family: PatternFamily::Chart,
                direction,
                date: series.dates[idx],
                index: idx,
                strength: clamp_strength(strength),
                description: what,
            }
        };

        let mut out = UnitOutput::empty();
        for idx in ctx.scan_start(n).max(s.window)..n {
            let prior = idx - s.window..idx;
            let resistance = high[prior.clone()].iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let support = low[prior.clone()].iter().copied().fold(f64::INFINITY, f64::min);
            let mean_volume = volume[prior].iter().sum::<f64>() / s.window as f64;
            let confirmed = mean_volume > 0.0 && volume[idx] >= s.volume_factor * mean_volume;
            let trend = prevailing_trend(ctx, close, idx - 1, s.trend_lookback);

            if close[idx] > resistance {
                let strength = BREAKOUT_BASE
                    + if confirmed { VOLUME_BONUS } else { 0.0 }
                    + trend_adjustment(trend, Direction::Bullish);
                out = out.occurrence(occurrence(
                    BREAKOUT,
                    "Breakout",
                    Direction::Bullish,
                    idx,
                    strength,
                    format!("close {} above {}-bar high {}", close[idx], s.window, resistance),
                ));
            } else if close[idx] < support {
                let strength = BREAKOUT_BASE
                    + if confirmed { VOLUME_BONUS } else { 0.0 }
                    + trend_adjustment(trend, Direction::Bearish);
                out = out.occurrence(occurrence(
                    BREAKDOWN,
                    "Breakdown",
                    Direction::Bearish,
                    idx,
                    strength,
                    format!("close {} below {}-bar low {}", close[idx], s.window, support),
                ));
            }

            let doubles = [
                (DOUBLE_TOP, "Double Top", Direction::Bearish, TrendDirection::Up, &peaks, high, low, true),
                (DOUBLE_BOTTOM, "Double Bottom", Direction::Bullish, TrendDirection::Down, &troughs, low, high, false),
            ];
            for (id, name, direction, setup, pivots, extremes, opposite, top) in doubles {
                let Some(found) = find_double(pivots, extremes, opposite, close, idx, &s, top) else {
                    continue;
                };
                let similarity = SIMILARITY_BONUS * (1.0 - found.difference / s.tolerance);
                let before = prevailing_trend(ctx, close, found.first, s.trend_lookback);
                out = out.occurrence(occurrence(
                    id,
                    name,
                    direction,
                    idx,
                    DOUBLE_BASE + similarity + setup_adjustment(before, setup),
                    format!("{} confirmed, first extreme at bar {}", name, found.first),
                ));
            }
        }
        Ok(out)
    }
}
