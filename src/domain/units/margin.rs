//! Margin financing trend.
//!
//! change_pct = (balance[t] - balance[t-period]) / balance[t-period] × 100
//!
//! Reads the optional `margin_balance` and `short_balance` fields. Series
//! without them produce empty output.

use super::{meta, unit_identity};
use crate::domain::capability::{Category, CapabilityMetadata, Priority, UnitKind};
use crate::domain::error::UnitError;
use crate::domain::output::{Context, SignalLabel, UnitOutput};
use crate::domain::params::Params;
use crate::domain::series::{MARGIN_BALANCE, SHORT_BALANCE, Series};
use crate::domain::unit::Unit;

pub struct MarginTrend {
    meta: CapabilityMetadata,
}

impl Default for MarginTrend {
    fn default() -> Self {
        Self {
            meta: meta(
                "margin_trend",
                "Margin Financing Trend",
                Category::Margin,
                Priority::P2,
                6,
                &[("period", 5.0)],
            ),
        }
    }
}

fn change_pct(values: &[f64], period: usize) -> Option<f64> {
    let n = values.len();
    let base = values[n.checked_sub(period + 1)?];
    (base != 0.0).then(|| (values[n - 1] - base) / base * 100.0)
}

impl Unit for MarginTrend {
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
        let Some(margin) = series.extra(MARGIN_BALANCE) else {
            return Ok(UnitOutput::empty());
        };
        if series.len() < period + 1 {
            return Ok(UnitOutput::empty());
        }
        let Some(&balance) = margin.last() else {
            return Ok(UnitOutput::empty());
        };
        let change = change_pct(margin, period);
        let trend = match change {
            Some(c) if c > 0.0 => SignalLabel::Bullish,
            Some(c) if c < 0.0 => SignalLabel::Bearish,
            _ => SignalLabel::Neutral,
        };
        let mut out = UnitOutput::empty()
            .number("margin_balance", balance)
            .maybe_number("margin_change_pct", change)
            .label("trend", trend);
        if let Some(short) = series.extra(SHORT_BALANCE) {
            out = out
                .maybe_number("short_balance", short.last().copied())
                .maybe_number("short_change_pct", change_pct(short, period));
        }
        Ok(out)
    }
}
