//! Volatility units.

use super::{last, meta, unit_identity};
use crate::domain::capability::{Category, CapabilityMetadata, Priority, UnitKind};
use crate::domain::error::UnitError;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::stddev::{calculate_bollinger, calculate_stddev};
use crate::domain::labels::threshold_label;
use crate::domain::output::{Context, UnitOutput};
use crate::domain::params::Params;
use crate::domain::series::Series;
use crate::domain::unit::Unit;

/// Bollinger Bands.
///
/// bandwidth = (upper - lower) / middle × 100
/// percent_b = (close - lower) / (upper - lower)
///
/// A close on or beyond a band is OVERBOUGHT/OVERSOLD.
pub struct Bollinger {
    meta: CapabilityMetadata,
}

impl Default for Bollinger {
    fn default() -> Self {
        Self {
            meta: meta(
                "bollinger",
                "Bollinger Bands",
                Category::Volatility,
                Priority::P0,
                20,
                &[("period", 20.0), ("multiplier", 2.0)],
            ),
        }
    }
}

impl Unit for Bollinger {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params.period("period").unwrap_or(self.meta.min_data_points)
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
        if series.len() < period {
            return Ok(UnitOutput::empty());
        }
        let bands = calculate_bollinger(&series.close, period, mult);
        let (Some(upper), Some(middle), Some(lower), Some(&close)) = (
            last(&bands.upper),
            last(&bands.middle),
            last(&bands.lower),
            series.close.last(),
        ) else {
            return Ok(UnitOutput::empty());
        };
        let bandwidth = (middle != 0.0).then(|| (upper - lower) / middle * 100.0);
        let percent_b = (upper != lower).then(|| (close - lower) / (upper - lower));
        Ok(UnitOutput::empty()
            .number("upper", upper)
            .number("middle", middle)
            .number("lower", lower)
            .maybe_number("bandwidth", bandwidth)
            .maybe_number("percent_b", percent_b)
            .label("zone", threshold_label(close, lower, upper)))
    }
}

/// Average True Range, also as a percentage of the close.
pub struct Atr {
    meta: CapabilityMetadata,
}

impl Default for Atr {
    fn default() -> Self {
        Self {
            meta: meta(
                "atr",
                "Average True Range",
                Category::Volatility,
                Priority::P1,
                14,
                &[("period", 14.0)],
            ),
        }
    }
}

impl Unit for Atr {
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
        let atr = calculate_atr(&series.high, &series.low, &series.close, period);
        let (Some(value), Some(&close)) = (last(&atr), series.close.last()) else {
            return Ok(UnitOutput::empty());
        };
        Ok(UnitOutput::empty()
            .number("atr", value)
            .maybe_number("atr_percent", (close != 0.0).then(|| value / close * 100.0)))
    }
}

/// Population standard deviation of closes.
pub struct StdDev {
    meta: CapabilityMetadata,
}

impl Default for StdDev {
    fn default() -> Self {
        Self {
            meta: meta(
                "stddev",
                "Standard Deviation",
                Category::Volatility,
                Priority::P2,
                20,
                &[("period", 20.0)],
            ),
        }
    }
}

impl Unit for StdDev {
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
        Ok(UnitOutput::empty().maybe_number("stddev", last(&calculate_stddev(&series.close, period))))
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

    #[test]
    fn short_series_gives_empty_output() {
        let units: Vec<Box<dyn Unit>> = vec![
            Box::new(Bollinger::default()),
            Box::new(Atr::default()),
            Box::new(StdDev::default()),
        ];
        for unit in &units {
            let n = unit.min_data_points(unit.default_params()) - 1;
            let s = series_from_closes(&ramp(n, 100.0, 1.0));
            assert!(run(unit.as_ref(), &s).is_empty(), "{}", unit.name());
        }
    }

    #[test]
    fn bollinger_flat_series_collapses() {
        let s = series_from_closes(&[50.0; 20]);
        let out = run(&Bollinger::default(), &s);
        assert_relative_eq!(number(&out, "upper"), 50.0);
        assert_relative_eq!(number(&out, "lower"), 50.0);
        assert_relative_eq!(number(&out, "bandwidth"), 0.0);
        assert!(out.get("percent_b").is_none());
        // close sits on both bands; the upper check wins
        assert_eq!(
            out.get("zone").and_then(OutputValue::as_label),
            Some(SignalLabel::Overbought)
        );
    }

    #[test]
    fn bollinger_percent_b_mid_band() {
        let mut closes = vec![100.0; 10];
        closes.extend(vec![110.0; 10]);
        closes.push(105.0);
        let out = run(&Bollinger::default(), &series_from_closes(&closes));
        let b = number(&out, "percent_b");
        assert!(b > 0.0 && b < 1.0);
    }

    #[test]
    fn atr_of_constant_range() {
        let s = series_from_closes(&[100.0; 20]);
        let out = run(&Atr::default(), &s);
        assert_relative_eq!(number(&out, "atr"), 2.0);
        assert_relative_eq!(number(&out, "atr_percent"), 2.0);
    }

    #[test]
    fn stddev_of_two_levels() {
        let mut closes = vec![10.0; 10];
        closes.extend(vec![20.0; 10]);
        let out = run(&StdDev::default(), &series_from_closes(&closes));
        assert_relative_eq!(number(&out, "stddev"), 5.0);
    }
}
