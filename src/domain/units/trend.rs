//! Trend units: moving averages, MACD, trend followers and the trend
//! classifier that seeds the shared context.

use super::{last, meta, unit_identity};
use crate::domain::capability::{Category, CapabilityMetadata, Priority, UnitKind};
use crate::domain::error::UnitError;
use crate::domain::indicator::adx::{adx_min_bars, calculate_adx};
use crate::domain::indicator::ema::{
    calculate_dema, calculate_ema, calculate_tema, calculate_trix, calculate_zlema, dema_warmup,
    tema_warmup,
};
use crate::domain::indicator::macd::{calculate_macd, macd_min_bars};
use crate::domain::indicator::sar::calculate_sar;
use crate::domain::indicator::sma::{calculate_sma, calculate_sma_opt};
use crate::domain::indicator::supertrend::calculate_supertrend;
use crate::domain::indicator::wma::{calculate_hma, hma_warmup};
use crate::domain::labels::{cross_label, last_pair};
use crate::domain::output::{Context, SignalLabel, TrendContext, TrendDirection, UnitOutput};
use crate::domain::params::Params;
use crate::domain::series::Series;
use crate::domain::unit::Unit;

fn position_label(close: f64, line: f64) -> SignalLabel {
    if close > line {
        SignalLabel::Bullish
    } else if close < line {
        SignalLabel::Bearish
    } else {
        SignalLabel::Neutral
    }
}

/// BUY on a flip into an up-trend, SELL on a flip into a down-trend.
fn flip_label(flags: &[Option<bool>]) -> SignalLabel {
    let n = flags.len();
    if n < 2 {
        return SignalLabel::Hold;
    }
    match (flags[n - 2], flags[n - 1]) {
        (Some(false), Some(true)) => SignalLabel::Buy,
        (Some(true), Some(false)) => SignalLabel::Sell,
        _ => SignalLabel::Hold,
    }
}

/// Trend classifier.
///
/// Up when close > short MA > long MA, down when close < short MA < long MA,
/// sideways otherwise. Strength is the share of the last `window` closes on
/// the trend side of the long MA.
pub struct TrendClassifier {
    meta: CapabilityMetadata,
}

impl Default for TrendClassifier {
    fn default() -> Self {
        Self {
            meta: meta(
                "trend_classifier",
                "Trend Classifier",
                Category::Trend,
                Priority::P0,
                39,
                &[("short", 10.0), ("long", 30.0), ("window", 10.0)],
            ),
        }
    }
}

impl Unit for TrendClassifier {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        match (params.period("long"), params.period("window")) {
            (Ok(long), Ok(window)) => long + window - 1,
            _ => self.meta.min_data_points,
        }
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        let short = params.period("short")?;
        let long = params.period("long")?;
        params.period("window")?;
        if short >= long {
            return Err(UnitError::InvalidParameter {
                name: "short".into(),
                reason: format!("{short} must be below long {long}"),
            });
        }
        Ok(())
    }

    fn provides_trend_context(&self) -> bool {
        true
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        self.validate_params(params)?;
        if series.len() < self.min_data_points(params) {
            return Ok(UnitOutput::empty());
        }
        let short = params.period("short")?;
        let long = params.period("long")?;
        let window = params.period("window")?;

        let close = &series.close;
        let short_ma = calculate_sma(close, short);
        let long_ma = calculate_sma(close, long);
        let (Some(s), Some(l)) = (last(&short_ma), last(&long_ma)) else {
            return Ok(UnitOutput::empty());
        };
        let c = close[close.len() - 1];

        let n = close.len();
        let above = (n - window..n)
            .filter(|&i| long_ma[i].is_some_and(|m| close[i] > m))
            .count() as f64
            / window as f64;

        let (direction, strength) = if c > s && s > l {
            (TrendDirection::Up, above * 100.0)
        } else if c < s && s < l {
            (TrendDirection::Down, (1.0 - above) * 100.0)
        } else {
            (TrendDirection::Sideways, (1.0 - (2.0 * above - 1.0).abs()) * 100.0)
        };
        let label = match direction {
            TrendDirection::Up => SignalLabel::Bullish,
            TrendDirection::Down => SignalLabel::Bearish,
            TrendDirection::Sideways => SignalLabel::Neutral,
        };

        let mut out = UnitOutput::empty()
            .number("short_ma", s)
            .number("long_ma", l)
            .number("trend_strength", strength)
            .label("trend", label);
        out.trend = Some(TrendContext {
            direction,
            strength,
            source: self.meta.id.clone(),
        });
        Ok(out)
    }
}

/// Simple moving averages over three horizons.
///
/// alignment = BULLISH when short > medium > long, BEARISH when reversed.
pub struct MovingAverage {
    meta: CapabilityMetadata,
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self {
            meta: meta(
                "ma",
                "Moving Average",
                Category::Trend,
                Priority::P0,
                60,
                &[("short", 5.0), ("medium", 20.0), ("long", 60.0)],
            ),
        }
    }
}

impl Unit for MovingAverage {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params.period("long").unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        let short = params.period("short")?;
        let medium = params.period("medium")?;
        let long = params.period("long")?;
        if !(short < medium && medium < long) {
            return Err(UnitError::InvalidParameter {
                name: "medium".into(),
                reason: format!("periods must ascend, got {short}/{medium}/{long}"),
            });
        }
        Ok(())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        self.validate_params(params)?;
        let long = params.period("long")?;
        if series.len() < long {
            return Ok(UnitOutput::empty());
        }
        let close = &series.close;
        let s = last(&calculate_sma(close, params.period("short")?));
        let m = last(&calculate_sma(close, params.period("medium")?));
        let l = last(&calculate_sma(close, long));
        let (Some(s), Some(m), Some(l)) = (s, m, l) else {
            return Ok(UnitOutput::empty());
        };

        let alignment = if s > m && m > l {
            SignalLabel::Bullish
        } else if s < m && m < l {
            SignalLabel::Bearish
        } else {
            SignalLabel::Neutral
        };
        Ok(UnitOutput::empty()
            .number("ma_short", s)
            .number("ma_medium", m)
            .number("ma_long", l)
            .label("alignment", alignment))
    }
}

/// Single-line smoothed averages that share one shape: a value and the
/// close's position relative to it.
fn line_output(key: &str, values: &[Option<f64>], close: f64) -> UnitOutput {
    match last(values) {
        Some(v) => UnitOutput::empty()
            .number(key, v)
            .label("position", position_label(close, v)),
        None => UnitOutput::empty(),
    }
}

fn last_close(series: &Series) -> f64 {
    series.close.last().copied().unwrap_or(f64::NAN)
}

pub struct Ema {
    meta: CapabilityMetadata,
}

impl Default for Ema {
    fn default() -> Self {
        Self {
            meta: meta(
                "ema",
                "Exponential Moving Average",
                Category::Trend,
                Priority::P0,
                12,
                &[("period", 12.0)],
            ),
        }
    }
}

impl Unit for Ema {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params.period("period").unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period").map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        if series.len() < period {
            return Ok(UnitOutput::empty());
        }
        Ok(line_output(
            "ema",
            &calculate_ema(&series.close, period),
            last_close(series),
        ))
    }
}

/// DEMA = 2·EMA − EMA(EMA)
pub struct Dema {
    meta: CapabilityMetadata,
}

impl Default for Dema {
    fn default() -> Self {
        Self {
            meta: meta(
                "dema",
                "Double EMA",
                Category::Trend,
                Priority::P2,
                dema_warmup(20) + 1,
                &[("period", 20.0)],
            ),
        }
    }
}

impl Unit for Dema {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("period")
            .map(|p| dema_warmup(p) + 1)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period").map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        if series.len() < dema_warmup(period) + 1 {
            return Ok(UnitOutput::empty());
        }
        Ok(line_output(
            "dema",
            &calculate_dema(&series.close, period),
            last_close(series),
        ))
    }
}

/// TEMA = 3·EMA1 − 3·EMA2 + EMA3
pub struct Tema {
    meta: CapabilityMetadata,
}

impl Default for Tema {
    fn default() -> Self {
        Self {
            meta: meta(
                "tema",
                "Triple EMA",
                Category::Trend,
                Priority::P2,
                tema_warmup(20) + 1,
                &[("period", 20.0)],
            ),
        }
    }
}

impl Unit for Tema {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("period")
            .map(|p| tema_warmup(p) + 1)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period").map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        if series.len() < tema_warmup(period) + 1 {
            return Ok(UnitOutput::empty());
        }
        Ok(line_output(
            "tema",
            &calculate_tema(&series.close, period),
            last_close(series),
        ))
    }
}

/// TRIX with an SMA signal line; the label is the TRIX/signal crossing.
pub struct Trix {
    meta: CapabilityMetadata,
}

fn trix_min_bars(period: usize, signal: usize) -> usize {
    tema_warmup(period) + signal + 2
}

impl Default for Trix {
    fn default() -> Self {
        Self {
            meta: meta(
                "trix",
                "TRIX",
                Category::Trend,
                Priority::P2,
                trix_min_bars(15, 9),
                &[("period", 15.0), ("signal", 9.0)],
            ),
        }
    }
}

impl Unit for Trix {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        match (params.period("period"), params.period("signal")) {
            (Ok(p), Ok(s)) => trix_min_bars(p, s),
            _ => self.meta.min_data_points,
        }
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period")?;
        params.period("signal")?;
        Ok(())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        let signal = params.period("signal")?;
        if series.len() < trix_min_bars(period, signal) {
            return Ok(UnitOutput::empty());
        }
        let trix = calculate_trix(&series.close, period);
        let signal_line = calculate_sma_opt(&trix, signal);
        let (Some(t), Some(s)) = (last(&trix), last(&signal_line)) else {
            return Ok(UnitOutput::empty());
        };
        let mut out = UnitOutput::empty().number("trix", t).number("trix_signal", s);
        if let (Some((t0, t1)), Some((s0, s1))) = (last_pair(&trix), last_pair(&signal_line)) {
            out = out.label("signal", cross_label(t0, s0, t1, s1));
        }
        Ok(out)
    }
}

/// Zero-lag EMA: EMA of `2·p[i] − p[i−lag]`, `lag = (period − 1) / 2`.
pub struct Zlema {
    meta: CapabilityMetadata,
}

fn zlema_min_bars(period: usize) -> usize {
    period.saturating_sub(1) / 2 + period
}

impl Default for Zlema {
    fn default() -> Self {
        Self {
            meta: meta(
                "zlema",
                "Zero-Lag EMA",
                Category::Trend,
                Priority::P2,
                zlema_min_bars(20),
                &[("period", 20.0)],
            ),
        }
    }
}

impl Unit for Zlema {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("period")
            .map(zlema_min_bars)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period").map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        if series.len() < zlema_min_bars(period) {
            return Ok(UnitOutput::empty());
        }
        Ok(line_output(
            "zlema",
            &calculate_zlema(&series.close, period),
            last_close(series),
        ))
    }
}

/// Hull moving average: WMA(2·WMA(n/2) − WMA(n), √n).
pub struct Hma {
    meta: CapabilityMetadata,
}

impl Default for Hma {
    fn default() -> Self {
        Self {
            meta: meta(
                "hma",
                "Hull Moving Average",
                Category::Trend,
                Priority::P2,
                hma_warmup(16) + 1,
                &[("period", 16.0)],
            ),
        }
    }
}

impl Unit for Hma {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("period")
            .map(|p| hma_warmup(p) + 1)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period").map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        if series.len() < hma_warmup(period) + 1 {
            return Ok(UnitOutput::empty());
        }
        Ok(line_output(
            "hma",
            &calculate_hma(&series.close, period),
            last_close(series),
        ))
    }
}

/// MACD line, signal and histogram. `cross` is the line/signal crossing on
/// the last bar.
pub struct Macd {
    meta: CapabilityMetadata,
}

pub(crate) fn validate_macd_params(params: &Params) -> Result<(usize, usize, usize), UnitError> {
    let fast = params.period("fast")?;
    let slow = params.period("slow")?;
    let signal = params.period("signal")?;
    if fast >= slow {
        return Err(UnitError::InvalidParameter {
            name: "fast".into(),
            reason: format!("{fast} must be below slow {slow}"),
        });
    }
    Ok((fast, slow, signal))
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            meta: meta(
                "macd",
                "MACD",
                Category::Trend,
                Priority::P0,
                macd_min_bars(12, 26, 9) + 1,
                &[("fast", 12.0), ("slow", 26.0), ("signal", 9.0)],
            ),
        }
    }
}

impl Unit for Macd {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        validate_macd_params(params)
            .map(|(f, s, g)| macd_min_bars(f, s, g) + 1)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        validate_macd_params(params).map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let (fast, slow, signal) = validate_macd_params(params)?;
        if series.len() < macd_min_bars(fast, slow, signal) + 1 {
            return Ok(UnitOutput::empty());
        }
        let m = calculate_macd(&series.close, fast, slow, signal);
        let (Some(line), Some(sig), Some(hist)) =
            (last(&m.line), last(&m.signal), last(&m.histogram))
        else {
            return Ok(UnitOutput::empty());
        };
        let mut out = UnitOutput::empty()
            .number("macd", line)
            .number("signal", sig)
            .number("histogram", hist);
        if let (Some((l0, l1)), Some((s0, s1))) = (last_pair(&m.line), last_pair(&m.signal)) {
            out = out.label("cross", cross_label(l0, s0, l1, s1));
        }
        Ok(out)
    }
}

/// Parabolic SAR. `trend` is the current side, `signal` a flip on the last
/// bar.
pub struct ParabolicSar {
    meta: CapabilityMetadata,
}

impl Default for ParabolicSar {
    fn default() -> Self {
        Self {
            meta: meta(
                "sar",
                "Parabolic SAR",
                Category::Trend,
                Priority::P1,
                3,
                &[("af_start", 0.02), ("af_step", 0.02), ("af_max", 0.2)],
            ),
        }
    }
}

impl Unit for ParabolicSar {
    unit_identity!(UnitKind::Indicator);

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        let start = params.positive("af_start")?;
        params.positive("af_step")?;
        let max = params.positive("af_max")?;
        if start > max {
            return Err(UnitError::InvalidParameter {
                name: "af_start".into(),
                reason: format!("{start} exceeds af_max {max}"),
            });
        }
        Ok(())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        self.validate_params(params)?;
        if series.len() < self.meta.min_data_points {
            return Ok(UnitOutput::empty());
        }
        let sar = calculate_sar(
            &series.high,
            &series.low,
            params.number("af_start")?,
            params.number("af_step")?,
            params.number("af_max")?,
        );
        let (Some(stop), Some(Some(up)), Some(af)) = (
            last(&sar.sar),
            sar.uptrend.last().copied(),
            last(&sar.af),
        ) else {
            return Ok(UnitOutput::empty());
        };
        let trend = if up {
            SignalLabel::Bullish
        } else {
            SignalLabel::Bearish
        };
        Ok(UnitOutput::empty()
            .number("sar", stop)
            .number("af", af)
            .label("trend", trend)
            .label("signal", flip_label(&sar.uptrend)))
    }
}

/// Supertrend line with direction and flip signal.
pub struct Supertrend {
    meta: CapabilityMetadata,
}

impl Default for Supertrend {
    fn default() -> Self {
        Self {
            meta: meta(
                "supertrend",
                "Supertrend",
                Category::Trend,
                Priority::P1,
                11,
                &[("period", 10.0), ("multiplier", 3.0)],
            ),
        }
    }
}

impl Unit for Supertrend {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("period")
            .map(|p| p + 1)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period")?;
        params.positive("multiplier")?;
        Ok(())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        let mult = params.positive("multiplier")?;
        if series.len() < period + 1 {
            return Ok(UnitOutput::empty());
        }
        let st = calculate_supertrend(&series.high, &series.low, &series.close, period, mult);
        let (Some(line), Some(Some(up))) = (last(&st.line), st.uptrend.last().copied()) else {
            return Ok(UnitOutput::empty());
        };
        let trend = if up {
            SignalLabel::Bullish
        } else {
            SignalLabel::Bearish
        };
        Ok(UnitOutput::empty()
            .number("supertrend", line)
            .label("trend", trend)
            .label("signal", flip_label(&st.uptrend)))
    }
}

/// ADX with directional indicators. Below `threshold` the trend label is
/// NEUTRAL; above it the dominant DI decides.
pub struct Adx {
    meta: CapabilityMetadata,
}

impl Default for Adx {
    fn default() -> Self {
        Self {
            meta: meta(
                "adx",
                "Average Directional Index",
                Category::Trend,
                Priority::P1,
                adx_min_bars(14),
                &[("period", 14.0), ("threshold", 25.0)],
            ),
        }
    }
}

impl Unit for Adx {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("period")
            .map(adx_min_bars)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period")?;
        params.number("threshold")?;
        Ok(())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        let threshold = params.number("threshold")?;
        if series.len() < adx_min_bars(period) {
            return Ok(UnitOutput::empty());
        }
        let out = calculate_adx(&series.high, &series.low, &series.close, period);
        let (Some(adx), Some(pdi), Some(mdi)) =
            (last(&out.adx), last(&out.plus_di), last(&out.minus_di))
        else {
            return Ok(UnitOutput::empty());
        };
        let trend = if adx < threshold || pdi == mdi {
            SignalLabel::Neutral
        } else if pdi > mdi {
            SignalLabel::Bullish
        } else {
            SignalLabel::Bearish
        };
        Ok(UnitOutput::empty()
            .number("adx", adx)
            .number("plus_di", pdi)
            .number("minus_di", mdi)
            .label("trend", trend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::output::OutputValue;
    use crate::domain::units::test_support::{ramp, series_from_closes};
    use approx::assert_relative_eq;

    fn run(unit: &dyn Unit, series: &Series) -> UnitOutput {
        unit.compute(series, unit.default_params(), &Context::new(1))
            .unwrap()
    }

    fn label(out: &UnitOutput, key: &str) -> Option<SignalLabel> {
        out.get(key).and_then(OutputValue::as_label)
    }

    fn number(out: &UnitOutput, key: &str) -> f64 {
        out.get(key).and_then(OutputValue::as_number).unwrap()
    }

    #[test]
    fn short_series_gives_empty_output() {
        let units: Vec<Box<dyn Unit>> = vec![
            Box::new(TrendClassifier::default()),
            Box::new(MovingAverage::default()),
            Box::new(Ema::default()),
            Box::new(Dema::default()),
            Box::new(Tema::default()),
            Box::new(Trix::default()),
            Box::new(Zlema::default()),
            Box::new(Hma::default()),
            Box::new(Macd::default()),
            Box::new(ParabolicSar::default()),
            Box::new(Supertrend::default()),
            Box::new(Adx::default()),
        ];
        for unit in &units {
            let n = unit.min_data_points(unit.default_params()) - 1;
            let s = series_from_closes(&ramp(n.max(1), 100.0, 1.0));
            let out = run(unit.as_ref(), &s);
            assert!(out.is_empty(), "{}", unit.name());
        }
    }

    #[test]
    fn min_data_points_is_sufficient() {
        let units: Vec<Box<dyn Unit>> = vec![
            Box::new(TrendClassifier::default()),
            Box::new(MovingAverage::default()),
            Box::new(Dema::default()),
            Box::new(Tema::default()),
            Box::new(Trix::default()),
            Box::new(Zlema::default()),
            Box::new(Hma::default()),
            Box::new(Macd::default()),
            Box::new(Supertrend::default()),
            Box::new(Adx::default()),
        ];
        for unit in &units {
            let n = unit.min_data_points(unit.default_params());
            let s = series_from_closes(&ramp(n, 100.0, 1.0));
            assert!(!run(unit.as_ref(), &s).is_empty(), "{}", unit.name());
        }
    }

    #[test]
    fn classifier_reports_uptrend() {
        let s = series_from_closes(&ramp(60, 100.0, 1.0));
        let out = run(&TrendClassifier::default(), &s);
        let trend = out.trend.as_ref().unwrap();
        assert_eq!(trend.direction, TrendDirection::Up);
        assert_relative_eq!(trend.strength, 100.0);
        assert_eq!(label(&out, "trend"), Some(SignalLabel::Bullish));
    }

    #[test]
    fn classifier_reports_downtrend() {
        let s = series_from_closes(&ramp(60, 200.0, -1.0));
        let out = run(&TrendClassifier::default(), &s);
        assert_eq!(out.trend.unwrap().direction, TrendDirection::Down);
    }

    #[test]
    fn classifier_rejects_inverted_periods() {
        let params = Params::from_pairs(&[("short", 30.0), ("long", 10.0), ("window", 5.0)]);
        assert!(TrendClassifier::default().validate_params(&params).is_err());
    }

    #[test]
    fn ma_alignment_bullish_in_rally() {
        let s = series_from_closes(&ramp(80, 100.0, 1.0));
        let out = run(&MovingAverage::default(), &s);
        assert_eq!(label(&out, "alignment"), Some(SignalLabel::Bullish));
        // last 5 closes 175..179
        assert_relative_eq!(number(&out, "ma_short"), 177.0);
    }

    #[test]
    fn ema_matches_seed_mean() {
        let s = series_from_closes(&[10.0, 20.0, 30.0]);
        let params = Params::from_pairs(&[("period", 3.0)]);
        let out = Ema::default()
            .compute(&s, &params, &Context::new(1))
            .unwrap();
        assert_relative_eq!(number(&out, "ema"), 20.0);
        assert_eq!(label(&out, "position"), Some(SignalLabel::Bullish));
    }

    #[test]
    fn macd_positive_in_rally() {
        let s = series_from_closes(&ramp(60, 100.0, 1.0));
        let out = run(&Macd::default(), &s);
        assert!(number(&out, "macd") > 0.0);
        assert!(label(&out, "cross").is_some());
    }

    #[test]
    fn macd_rejects_fast_above_slow() {
        let params = Params::from_pairs(&[("fast", 26.0), ("slow", 12.0), ("signal", 9.0)]);
        let err = Macd::default().validate_params(&params).unwrap_err();
        assert!(matches!(err, UnitError::InvalidParameter { .. }));
    }

    #[test]
    fn sar_bullish_in_rally() {
        let s = series_from_closes(&ramp(30, 100.0, 1.0));
        let out = run(&ParabolicSar::default(), &s);
        assert_eq!(label(&out, "trend"), Some(SignalLabel::Bullish));
        assert!(number(&out, "sar") < 129.0);
    }

    #[test]
    fn supertrend_bullish_in_rally() {
        let s = series_from_closes(&ramp(40, 100.0, 2.0));
        let out = run(&Supertrend::default(), &s);
        assert_eq!(label(&out, "trend"), Some(SignalLabel::Bullish));
        assert_eq!(label(&out, "signal"), Some(SignalLabel::Hold));
    }

    #[test]
    fn adx_flat_market_is_neutral() {
        let s = series_from_closes(&[100.0; 40]);
        let out = run(&Adx::default(), &s);
        assert_eq!(label(&out, "trend"), Some(SignalLabel::Neutral));
    }

    #[test]
    fn flip_label_reads_last_two_bars() {
        assert_eq!(flip_label(&[Some(false), Some(true)]), SignalLabel::Buy);
        assert_eq!(flip_label(&[Some(true), Some(false)]), SignalLabel::Sell);
        assert_eq!(flip_label(&[None, Some(true)]), SignalLabel::Hold);
        assert_eq!(flip_label(&[Some(true)]), SignalLabel::Hold);
    }
}
