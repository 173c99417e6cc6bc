//! Technical indicator kernels.
//!
//! Kernels work on plain slices and return one `Option<f64>` per bar, `None`
//! during warm-up. Units in [`crate::domain::units`] wrap them; the rule
//! evaluator reads them through the point/series types below:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values

pub mod adx;
pub mod atr;
pub mod cci;
pub mod ema;
pub mod macd;
pub mod mfi;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod sar;
pub mod sma;
pub mod stddev;
pub mod stochastic;
pub mod supertrend;
pub mod vwap;
pub mod wma;

use crate::domain::series::Series;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Kdj {
        k: f64,
        d: f64,
        j: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Wma(usize),
    Hma(usize),
    Dema(usize),
    Tema(usize),
    Rsi(usize),
    Roc(usize),
    Atr(usize),
    Stddev(usize),
    Cci(usize),
    Mfi(usize),
    WilliamsR(usize),
    Vwap(usize),
    Obv,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Kdj {
        period: usize,
        m1: usize,
        m2: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorType {
    /// Bars needed before the indicator produces its first value.
    pub fn min_bars(&self) -> usize {
        match *self {
            IndicatorType::Sma(p)
            | IndicatorType::Ema(p)
            | IndicatorType::Wma(p)
            | IndicatorType::Atr(p)
            | IndicatorType::Stddev(p)
            | IndicatorType::Cci(p)
            | IndicatorType::WilliamsR(p)
            | IndicatorType::Vwap(p) => p,
            IndicatorType::Rsi(p) | IndicatorType::Roc(p) | IndicatorType::Mfi(p) => p + 1,
            IndicatorType::Hma(p) => wma::hma_warmup(p) + 1,
            IndicatorType::Dema(p) => ema::dema_warmup(p) + 1,
            IndicatorType::Tema(p) => ema::tema_warmup(p) + 1,
            IndicatorType::Obv => 1,
            IndicatorType::Macd { fast, slow, signal } => macd::macd_min_bars(fast, slow, signal),
            IndicatorType::Kdj { period, .. } => period,
            IndicatorType::Bollinger { period, .. } => period,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Wma(period) => write!(f, "WMA({})", period),
            IndicatorType::Hma(period) => write!(f, "HMA({})", period),
            IndicatorType::Dema(period) => write!(f, "DEMA({})", period),
            IndicatorType::Tema(period) => write!(f, "TEMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Roc(period) => write!(f, "ROC({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Cci(period) => write!(f, "CCI({})", period),
            IndicatorType::Mfi(period) => write!(f, "MFI({})", period),
            IndicatorType::WilliamsR(period) => write!(f, "WILLIAMS_R({})", period),
            IndicatorType::Vwap(period) => write!(f, "VWAP({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Kdj { period, m1, m2 } => write!(f, "KDJ({},{},{})", period, m1, m2),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

fn simple_points(series: &Series, values: &[Option<f64>]) -> Vec<IndicatorPoint> {
    series
        .dates
        .iter()
        .zip(values)
        .map(|(date, v)| IndicatorPoint {
            date: *date,
            valid: v.is_some(),
            value: IndicatorValue::Simple(v.unwrap_or(0.0)),
        })
        .collect()
}

/// Compute one indicator over a series.
pub fn compute_indicator(series: &Series, indicator_type: &IndicatorType) -> IndicatorSeries {
    let close = &series.close;
    let values = match *indicator_type {
        IndicatorType::Sma(p) => simple_points(series, &sma::calculate_sma(close, p)),
        IndicatorType::Ema(p) => simple_points(series, &ema::calculate_ema(close, p)),
        IndicatorType::Wma(p) => simple_points(series, &wma::calculate_wma(close, p)),
        IndicatorType::Hma(p) => simple_points(series, &wma::calculate_hma(close, p)),
        IndicatorType::Dema(p) => simple_points(series, &ema::calculate_dema(close, p)),
        IndicatorType::Tema(p) => simple_points(series, &ema::calculate_tema(close, p)),
        IndicatorType::Rsi(p) => simple_points(series, &rsi::calculate_rsi(close, p)),
        IndicatorType::Roc(p) => simple_points(series, &roc::calculate_roc(close, p)),
        IndicatorType::Atr(p) => simple_points(
            series,
            &atr::calculate_atr(&series.high, &series.low, close, p),
        ),
        IndicatorType::Stddev(p) => simple_points(series, &stddev::calculate_stddev(close, p)),
        IndicatorType::Cci(p) => {
            simple_points(series, &cci::calculate_cci(&series.typical_prices(), p))
        }
        IndicatorType::Mfi(p) => simple_points(
            series,
            &mfi::calculate_mfi(&series.typical_prices(), &series.volume, p),
        ),
        IndicatorType::WilliamsR(p) => simple_points(
            series,
            &stochastic::calculate_williams_r(&series.high, &series.low, close, p),
        ),
        IndicatorType::Vwap(p) => simple_points(
            series,
            &vwap::calculate_vwap(&series.typical_prices(), &series.volume, p),
        ),
        IndicatorType::Obv => {
            let obv: Vec<Option<f64>> = obv::calculate_obv(close, &series.volume)
                .into_iter()
                .map(Some)
                .collect();
            simple_points(series, &obv)
        }
        IndicatorType::Macd { fast, slow, signal } => {
            let m = macd::calculate_macd(close, fast, slow, signal);
            (0..series.len())
                .map(|i| {
                    let parts = m.line[i].zip(m.signal[i]).zip(m.histogram[i]);
                    IndicatorPoint {
                        date: series.dates[i],
                        valid: parts.is_some(),
                        value: match parts {
                            Some(((line, signal), histogram)) => IndicatorValue::Macd {
                                line,
                                signal,
                                histogram,
                            },
                            None => IndicatorValue::Macd {
                                line: 0.0,
                                signal: 0.0,
                                histogram: 0.0,
                            },
                        },
                    }
                })
                .collect()
        }
        IndicatorType::Kdj { period, m1, m2 } => {
            let kdj =
                stochastic::calculate_kdj(&series.high, &series.low, close, period, m1, m2);
            (0..series.len())
                .map(|i| {
                    let parts = kdj.k[i].zip(kdj.d[i]).zip(kdj.j[i]);
                    let ((k, d), j) = parts.unwrap_or(((0.0, 0.0), 0.0));
                    IndicatorPoint {
                        date: series.dates[i],
                        valid: parts.is_some(),
                        value: IndicatorValue::Kdj { k, d, j },
                    }
                })
                .collect()
        }
        IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        } => {
            let b = stddev::calculate_bollinger(close, period, stddev_mult_x100 as f64 / 100.0);
            (0..series.len())
                .map(|i| {
                    let parts = b.upper[i].zip(b.middle[i]).zip(b.lower[i]);
                    let ((upper, middle), lower) = parts.unwrap_or(((0.0, 0.0), 0.0));
                    IndicatorPoint {
                        date: series.dates[i],
                        valid: parts.is_some(),
                        value: IndicatorValue::Bollinger {
                            upper,
                            middle,
                            lower,
                        },
                    }
                })
                .collect()
        }
    };

    IndicatorSeries {
        indicator_type: indicator_type.clone(),
        values,
    }
}

/// Compute every requested indicator once, keyed by type.
pub fn compute_indicators(
    series: &Series,
    types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut map = HashMap::new();
    for t in types {
        if !map.contains_key(t) {
            map.insert(t.clone(), compute_indicator(series, t));
        }
    }
    map
}
