//! Momentum oscillators.

use super::{last, meta, unit_identity};
use crate::domain::capability::{Category, CapabilityMetadata, Priority, UnitKind};
use crate::domain::error::UnitError;
use crate::domain::indicator::cci::calculate_cci;
use crate::domain::indicator::roc::calculate_roc;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::stochastic::{
    calculate_kdj, calculate_stoch_rsi, calculate_williams_r, stoch_rsi_warmup,
};
use crate::domain::labels::{cross_label, last_pair, level_cross_label, threshold_label};
use crate::domain::output::{Context, UnitOutput};
use crate::domain::params::Params;
use crate::domain::series::Series;
use crate::domain::unit::Unit;

/// `(oversold, overbought)` with oversold strictly below overbought.
pub(crate) fn zone_bounds(params: &Params) -> Result<(f64, f64), UnitError> {
    let oversold = params.number("oversold")?;
    let overbought = params.number("overbought")?;
    if oversold >= overbought {
        return Err(UnitError::InvalidParameter {
            name: "oversold".into(),
            reason: format!("{oversold} must be below overbought {overbought}"),
        });
    }
    Ok((oversold, overbought))
}

/// Relative Strength Index (Wilder).
pub struct Rsi {
    meta: CapabilityMetadata,
}

impl Default for Rsi {
    fn default() -> Self {
        Self {
            meta: meta(
                "rsi",
                "Relative Strength Index",
                Category::Momentum,
                Priority::P0,
                15,
                &[("period", 14.0), ("overbought", 70.0), ("oversold", 30.0)],
            ),
        }
    }
}

impl Unit for Rsi {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("period")
            .map(|p| p + 1)
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
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        let (oversold, overbought) = zone_bounds(params)?;
        if series.len() < period + 1 {
            return Ok(UnitOutput::empty());
        }
        let Some(rsi) = last(&calculate_rsi(&series.close, period)) else {
            return Ok(UnitOutput::empty());
        };
        Ok(UnitOutput::empty()
            .number("rsi", rsi)
            .label("signal", threshold_label(rsi, oversold, overbought)))
    }
}

/// KDJ stochastic. `zone` reads K against the bounds, `cross` is K over D.
pub struct Kdj {
    meta: CapabilityMetadata,
}

impl Default for Kdj {
    fn default() -> Self {
        Self {
            meta: meta(
                "kdj",
                "KDJ Stochastic",
                Category::Momentum,
                Priority::P0,
                10,
                &[
                    ("period", 9.0),
                    ("m1", 3.0),
                    ("m2", 3.0),
                    ("overbought", 80.0),
                    ("oversold", 20.0),
                ],
            ),
        }
    }
}

impl Unit for Kdj {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("period")
            .map(|p| p + 1)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period")?;
        params.period("m1")?;
        params.period("m2")?;
        zone_bounds(params).map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        let m1 = params.period("m1")?;
        let m2 = params.period("m2")?;
        let (oversold, overbought) = zone_bounds(params)?;
        if series.len() < period + 1 {
            return Ok(UnitOutput::empty());
        }
        let kdj = calculate_kdj(&series.high, &series.low, &series.close, period, m1, m2);
        let (Some(k), Some(d), Some(j)) = (last(&kdj.k), last(&kdj.d), last(&kdj.j)) else {
            return Ok(UnitOutput::empty());
        };
        let mut out = UnitOutput::empty()
            .number("k", k)
            .number("d", d)
            .number("j", j)
            .label("zone", threshold_label(k, oversold, overbought));
        if let (Some((k0, k1)), Some((d0, d1))) = (last_pair(&kdj.k), last_pair(&kdj.d)) {
            out = out.label("cross", cross_label(k0, d0, k1, d1));
        }
        Ok(out)
    }
}

/// Williams %R on the -100..0 scale.
pub struct WilliamsR {
    meta: CapabilityMetadata,
}

impl Default for WilliamsR {
    fn default() -> Self {
        Self {
            meta: meta(
                "williams_r",
                "Williams %R",
                Category::Momentum,
                Priority::P1,
                14,
                &[("period", 14.0), ("overbought", -20.0), ("oversold", -80.0)],
            ),
        }
    }
}

impl Unit for WilliamsR {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params.period("period").unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period")?;
        zone_bounds(params).map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        let (oversold, overbought) = zone_bounds(params)?;
        if series.len() < period {
            return Ok(UnitOutput::empty());
        }
        let wr = calculate_williams_r(&series.high, &series.low, &series.close, period);
        let Some(value) = last(&wr) else {
            return Ok(UnitOutput::empty());
        };
        Ok(UnitOutput::empty()
            .number("williams_r", value)
            .label("zone", threshold_label(value, oversold, overbought)))
    }
}

/// Stochastic RSI with SMA-smoothed %K and %D.
pub struct StochRsi {
    meta: CapabilityMetadata,
}

fn stoch_rsi_periods(params: &Params) -> Result<(usize, usize, usize, usize), UnitError> {
    Ok((
        params.period("rsi_period")?,
        params.period("stoch_period")?,
        params.period("k")?,
        params.period("d")?,
    ))
}

impl Default for StochRsi {
    fn default() -> Self {
        Self {
            meta: meta(
                "stoch_rsi",
                "Stochastic RSI",
                Category::Momentum,
                Priority::P2,
                stoch_rsi_warmup(14, 14, 3, 3) + 1,
                &[
                    ("rsi_period", 14.0),
                    ("stoch_period", 14.0),
                    ("k", 3.0),
                    ("d", 3.0),
                    ("overbought", 80.0),
                    ("oversold", 20.0),
                ],
            ),
        }
    }
}

impl Unit for StochRsi {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        stoch_rsi_periods(params)
            .map(|(r, s, k, d)| stoch_rsi_warmup(r, s, k, d) + 1)
            .unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        stoch_rsi_periods(params)?;
        zone_bounds(params).map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let (rsi_period, stoch_period, k, d) = stoch_rsi_periods(params)?;
        let (oversold, overbought) = zone_bounds(params)?;
        if series.len() < stoch_rsi_warmup(rsi_period, stoch_period, k, d) + 1 {
            return Ok(UnitOutput::empty());
        }
        let out = calculate_stoch_rsi(&series.close, rsi_period, stoch_period, k, d);
        let (Some(k_value), Some(d_value)) = (last(&out.k), last(&out.d)) else {
            return Ok(UnitOutput::empty());
        };
        Ok(UnitOutput::empty()
            .number("stoch_rsi_k", k_value)
            .number("stoch_rsi_d", d_value)
            .label("zone", threshold_label(k_value, oversold, overbought)))
    }
}

/// Commodity Channel Index.
pub struct Cci {
    meta: CapabilityMetadata,
}

impl Default for Cci {
    fn default() -> Self {
        Self {
            meta: meta(
                "cci",
                "Commodity Channel Index",
                Category::Momentum,
                Priority::P1,
                20,
                &[("period", 20.0), ("overbought", 100.0), ("oversold", -100.0)],
            ),
        }
    }
}

impl Unit for Cci {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params.period("period").unwrap_or(self.meta.min_data_points)
    }

    fn validate_params(&self, params: &Params) -> Result<(), UnitError> {
        params.period("period")?;
        zone_bounds(params).map(|_| ())
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        _ctx: &Context,
    ) -> Result<UnitOutput, UnitError> {
        let period = params.period("period")?;
        let (oversold, overbought) = zone_bounds(params)?;
        if series.len() < period {
            return Ok(UnitOutput::empty());
        }
        let Some(cci) = last(&calculate_cci(&series.typical_prices(), period)) else {
            return Ok(UnitOutput::empty());
        };
        Ok(UnitOutput::empty()
            .number("cci", cci)
            .label("zone", threshold_label(cci, oversold, overbought)))
    }
}

/// Rate of change. `signal` is a zero-line crossing on the last bar.
pub struct Roc {
    meta: CapabilityMetadata,
}

impl Default for Roc {
    fn default() -> Self {
        Self {
            meta: meta(
                "roc",
                "Rate of Change",
                Category::Momentum,
                Priority::P2,
                14,
                &[("period", 12.0)],
            ),
        }
    }
}

impl Unit for Roc {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("period")
            .map(|p| p + 2)
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
        if series.len() < period + 2 {
            return Ok(UnitOutput::empty());
        }
        let roc = calculate_roc(&series.close, period);
        let Some((prev, curr)) = last_pair(&roc) else {
            return Ok(UnitOutput::empty());
        };
        Ok(UnitOutput::empty()
            .number("roc", curr)
            .label("signal", level_cross_label(prev, curr, 0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::output::{OutputValue, SignalLabel};
    use crate::domain::units::test_support::{ramp, series_from_closes};
    use approx::assert_relative_eq;

    fn run(unit: &dyn Unit, series: &Series) -> UnitOutput {
        unit.compute(series, unit.default_params(), &Context::new(1))
            .unwrap()
    }

    fn number(out: &UnitOutput, key: &str) -> f64 {
        out.get(key).and_then(OutputValue::as_number).unwrap()
    }

    fn label(out: &UnitOutput, key: &str) -> Option<SignalLabel> {
        out.get(key).and_then(OutputValue::as_label)
    }

    fn all_units() -> Vec<Box<dyn Unit>> {
        vec![
            Box::new(Rsi::default()),
            Box::new(Kdj::default()),
            Box::new(WilliamsR::default()),
            Box::new(StochRsi::default()),
            Box::new(Cci::default()),
            Box::new(Roc::default()),
        ]
    }

    #[test]
    fn short_series_gives_empty_output() {
        for unit in all_units() {
            let n = unit.min_data_points(unit.default_params()) - 1;
            let s = series_from_closes(&ramp(n, 100.0, 1.0));
            assert!(run(unit.as_ref(), &s).is_empty(), "{}", unit.name());
        }
    }

    #[test]
    fn min_data_points_is_sufficient() {
        for unit in all_units() {
            let n = unit.min_data_points(unit.default_params());
            let closes: Vec<f64> = (0..n).map(|i| 100.0 + (i as f64).sin() * 5.0).collect();
            let s = series_from_closes(&closes);
            assert!(!run(unit.as_ref(), &s).is_empty(), "{}", unit.name());
        }
    }

    #[test]
    fn rsi_all_gains_is_overbought() {
        let closes: Vec<f64> = (0..15).map(|i| 10.0 + 0.5 * i as f64).collect();
        let out = run(&Rsi::default(), &series_from_closes(&closes));
        assert_relative_eq!(number(&out, "rsi"), 100.0);
        assert_eq!(label(&out, "signal"), Some(SignalLabel::Overbought));
    }

    #[test]
    fn rsi_rejects_inverted_zone() {
        let params = Params::from_pairs(&[("period", 14.0), ("overbought", 30.0), ("oversold", 70.0)]);
        assert!(Rsi::default().validate_params(&params).is_err());
    }

    #[test]
    fn kdj_flat_window_is_finite() {
        let s = series_from_closes(&[50.0; 20]);
        let out = run(&Kdj::default(), &s);
        for key in ["k", "d", "j"] {
            assert!(number(&out, key).is_finite());
        }
        // flat close sits mid-channel: high = close + 1, low = close - 1
        assert_relative_eq!(number(&out, "k"), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn williams_r_at_top_of_range() {
        let s = series_from_closes(&ramp(20, 100.0, 2.0));
        let out = run(&WilliamsR::default(), &s);
        // close = high - 1 in a channel spanning 28 points
        assert!(number(&out, "williams_r") > -20.0);
        assert_eq!(label(&out, "zone"), Some(SignalLabel::Overbought));
    }

    #[test]
    fn cci_flat_is_zero() {
        let s = series_from_closes(&[10.0; 25]);
        let out = run(&Cci::default(), &s);
        assert_relative_eq!(number(&out, "cci"), 0.0);
        assert_eq!(label(&out, "zone"), Some(SignalLabel::Neutral));
    }

    #[test]
    fn roc_zero_line_cross() {
        let mut closes = vec![100.0; 13];
        closes.push(101.0);
        // roc[12] = 0, roc[13] = 1%
        let out = run(&Roc::default(), &series_from_closes(&closes));
        assert_relative_eq!(number(&out, "roc"), 1.0, epsilon = 1e-9);
        assert_eq!(label(&out, "signal"), Some(SignalLabel::Buy));
    }
}
