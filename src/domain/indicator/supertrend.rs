//! Supertrend.
//!
//! basic upper = HL2 + mult × ATR, basic lower = HL2 - mult × ATR
//!
//! The first bar with an ATR starts up-trending when close > basic upper,
//! otherwise down-trending. Afterwards:
//! - up-trend: close < stop flips down and the stop becomes the basic upper
//!   band; otherwise stop = max(basic lower, stop)
//! - down-trend: close > stop flips up and the stop becomes the basic lower
//!   band; otherwise stop = min(basic upper, stop)
//!
//! A close exactly on the stop does not flip.

use crate::domain::indicator::atr::calculate_atr;

#[derive(Debug, Clone, PartialEq)]
pub struct SupertrendSeries {
    pub line: Vec<Option<f64>>,
    pub uptrend: Vec<Option<bool>>,
}

pub fn calculate_supertrend(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
    mult: f64,
) -> SupertrendSeries {
    let n = close.len();
    let mut out = SupertrendSeries {
        line: vec![None; n],
        uptrend: vec![None; n],
    };
    let atr = calculate_atr(high, low, close, period);

    let mut state: Option<(bool, f64)> = None;
    for i in 0..n {
        let Some(a) = atr[i] else {
            continue;
        };
        let hl2 = (high[i] + low[i]) / 2.0;
        let upper = hl2 + mult * a;
        let lower = hl2 - mult * a;

        let next = match state {
            None => {
                if close[i] > upper {
                    (true, lower)
                } else {
                    (false, upper)
                }
            }
            Some((true, stop)) => {
                if close[i] < stop {
                    (false, upper)
                } else {
                    (true, lower.max(stop))
                }
            }
            Some((false, stop)) => {
                if close[i] > stop {
                    (true, lower)
                } else {
                    (false, upper.min(stop))
                }
            }
        };
        out.uptrend[i] = Some(next.0);
        out.line[i] = Some(next.1);
        state = Some(next);
    }
    out
}
