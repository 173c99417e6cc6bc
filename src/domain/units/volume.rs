//! Volume units.

use super::momentum::zone_bounds;
use super::{last, meta, unit_identity};
use crate::domain::capability::{Category, CapabilityMetadata, Priority, UnitKind};
use crate::domain::error::UnitError;
use crate::domain::indicator::mfi::calculate_mfi;
use crate::domain::indicator::obv::calculate_obv;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::vwap::calculate_vwap;
use crate::domain::labels::threshold_label;
use crate::domain::output::{Context, SignalLabel, UnitOutput};
use crate::domain::params::Params;
use crate::domain::series::Series;
use crate::domain::unit::Unit;

fn compare(value: f64, reference: f64) -> SignalLabel {
    if value > reference {
        SignalLabel::Bullish
    } else if value < reference {
        SignalLabel::Bearish
    } else {
        SignalLabel::Neutral
    }
}

/// On-balance volume with an SMA of itself as reference line.
pub struct Obv {
    meta: CapabilityMetadata,
}

impl Default for Obv {
    fn default() -> Self {
        Self {
            meta: meta(
                "obv",
                "On-Balance Volume",
                Category::Volume,
                Priority::P1,
                20,
                &[("period", 20.0)],
            ),
        }
    }
}

impl Unit for Obv {
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
        let obv = calculate_obv(&series.close, &series.volume);
        let (Some(&value), Some(ma)) = (obv.last(), last(&calculate_sma(&obv, period))) else {
            return Ok(UnitOutput::empty());
        };
        Ok(UnitOutput::empty()
            .number("obv", value)
            .number("obv_ma", ma)
            .label("trend", compare(value, ma)))
    }
}

/// Money Flow Index.
pub struct Mfi {
    meta: CapabilityMetadata,
}

impl Default for Mfi {
    fn default() -> Self {
        Self {
            meta: meta(
                "mfi",
                "Money Flow Index",
                Category::Volume,
                Priority::P1,
                15,
                &[("period", 14.0), ("overbought", 80.0), ("oversold", 20.0)],
            ),
        }
    }
}

impl Unit for Mfi {
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
        let mfi = calculate_mfi(&series.typical_prices(), &series.volume, period);
        let Some(value) = last(&mfi) else {
            return Ok(UnitOutput::empty());
        };
        Ok(UnitOutput::empty()
            .number("mfi", value)
            .label("zone", threshold_label(value, oversold, overbought)))
    }
}

/// Rolling volume-weighted average price.
pub struct Vwap {
    meta: CapabilityMetadata,
}

impl Default for Vwap {
    fn default() -> Self {
        Self {
            meta: meta(
                "vwap",
                "Volume Weighted Average Price",
                Category::Volume,
                Priority::P2,
                20,
                &[("period", 20.0)],
            ),
        }
    }
}

impl Unit for Vwap {
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
        let vwap = calculate_vwap(&series.typical_prices(), &series.volume, period);
        let (Some(value), Some(&close)) = (last(&vwap), series.close.last()) else {
            return Ok(UnitOutput::empty());
        };
        Ok(UnitOutput::empty()
            .number("vwap", value)
            .label("position", compare(close, value)))
    }
}

/// Last bar's volume over the mean of the `period` bars before it.
pub struct VolumeRatio {
    meta: CapabilityMetadata,
}

impl Default for VolumeRatio {
    fn default() -> Self {
        Self {
            meta: meta(
                "volume_ratio",
                "Volume Ratio",
                Category::Volume,
                Priority::P1,
                6,
                &[("period", 5.0)],
            ),
        }
    }
}

impl Unit for VolumeRatio {
    unit_identity!(UnitKind::Indicator);

    fn min_data_points(&self, params: &Params) -> usize {
        params
            .period("period")
            .map(|p| p + 1)
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
        let n = series.len();
        if n < period + 1 {
            return Ok(UnitOutput::empty());
        }
        let volume = &series.volume;
        let mean = volume[n - 1 - period..n - 1].iter().sum::<f64>() / period as f64;
        if mean == 0.0 {
            return Ok(UnitOutput::empty());
        }
        Ok(UnitOutput::empty().number("volume_ratio", volume[n - 1] / mean))
    }
}
