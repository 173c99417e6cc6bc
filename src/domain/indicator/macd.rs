//! MACD (Moving Average Convergence Divergence).
//!
//! MACD line = EMA(fast) - EMA(slow)
//! Signal line = EMA(signal) of the MACD line
//! Histogram = MACD line - signal line
//!
//! Warmup: the line is valid from bar (slow-1), signal and histogram from
//! bar (slow-1)+(signal-1).

use crate::domain::indicator::ema::{calculate_ema, calculate_ema_opt};

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn calculate_macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = calculate_ema(values, fast);
    let slow_ema = calculate_ema(values, slow);
    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = calculate_ema_opt(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();
    MacdSeries {
        line,
        signal: signal_line,
        histogram,
    }
}

/// Bars needed before the signal line has a value.
pub fn macd_min_bars(fast: usize, slow: usize, signal: usize) -> usize {
    fast.max(slow) + signal.saturating_sub(1)
}
