//! Channel oscillators: KDJ stochastic, Williams %R and Stochastic RSI.
//!
//! Each normalizes the current value against the rolling [min, max] of a
//! lookback window:
//!   RSV = (x - min) / (max - min)            in 0..1
//! When max == min the division is skipped and the previous smoothed value is
//! reused, or 0.5 at the very first point. Outputs are scaled to 0..100
//! (Williams %R to -100..0).
//!
//! KDJ:   K = ((m1-1)*K_prev + RSV) / m1, D = ((m2-1)*D_prev + K) / m2,
//!        both seeded at 0.5, J = 3K - 2D
//! StochRSI: RSV over RSI values, K = SMA(RSV, k), D = SMA(K, d)

use crate::domain::indicator::rsi::calculate_rsi;
use std::collections::VecDeque;

const FLAT_SEED: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct KdjSeries {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
    pub j: Vec<Option<f64>>,
}

fn window_extremes(high: &[f64], low: &[f64], end: usize, period: usize) -> (f64, f64) {
    let start = end + 1 - period;
    let hh = high[start..=end]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let ll = low[start..=end].iter().copied().fold(f64::INFINITY, f64::min);
    (hh, ll)
}

pub fn calculate_kdj(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
    m1: usize,
    m2: usize,
) -> KdjSeries {
    let n = close.len();
    let mut out = KdjSeries {
        k: vec![None; n],
        d: vec![None; n],
        j: vec![None; n],
    };
    if period == 0 || m1 == 0 || m2 == 0 || n < period {
        return out;
    }

    let mut k_prev = FLAT_SEED;
    let mut d_prev = FLAT_SEED;
    let mut first = true;
    for i in (period - 1)..n {
        let (hh, ll) = window_extremes(high, low, i, period);
        let rsv = if hh == ll {
            if first { FLAT_SEED } else { k_prev }
        } else {
            (close[i] - ll) / (hh - ll)
        };
        let k = ((m1 - 1) as f64 * k_prev + rsv) / m1 as f64;
        let d = ((m2 - 1) as f64 * d_prev + k) / m2 as f64;
        let j = 3.0 * k - 2.0 * d;
        out.k[i] = Some(k * 100.0);
        out.d[i] = Some(d * 100.0);
        out.j[i] = Some(j * 100.0);
        k_prev = k;
        d_prev = d;
        first = false;
    }
    out
}

pub fn calculate_williams_r(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
) -> Vec<Option<f64>> {
    let n = close.len();
    let mut out = vec![None; n];
    if period == 0 || n < period {
        return out;
    }

    let mut prev: Option<f64> = None;
    for i in (period - 1)..n {
        let (hh, ll) = window_extremes(high, low, i, period);
        let raw = if hh == ll {
            prev.unwrap_or(FLAT_SEED)
        } else {
            (hh - close[i]) / (hh - ll)
        };
        out[i] = Some(-100.0 * raw);
        prev = Some(raw);
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct StochRsiSeries {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

pub fn calculate_stoch_rsi(
    close: &[f64],
    rsi_period: usize,
    stoch_period: usize,
    k_smooth: usize,
    d_smooth: usize,
) -> StochRsiSeries {
    let n = close.len();
    let mut out = StochRsiSeries {
        k: vec![None; n],
        d: vec![None; n],
    };
    if rsi_period == 0 || stoch_period == 0 || k_smooth == 0 || d_smooth == 0 {
        return out;
    }

    let rsi = calculate_rsi(close, rsi_period);
    let mut rsi_window: VecDeque<f64> = VecDeque::with_capacity(stoch_period);
    let mut raw_window: VecDeque<f64> = VecDeque::with_capacity(k_smooth);
    let mut k_window: VecDeque<f64> = VecDeque::with_capacity(d_smooth);
    let mut last_k: Option<f64> = None;
    let mut last_raw: Option<f64> = None;

    for i in 0..n {
        let Some(r) = rsi[i] else {
            continue;
        };
        rsi_window.push_back(r);
        if rsi_window.len() > stoch_period {
            rsi_window.pop_front();
        }
        if rsi_window.len() < stoch_period {
            continue;
        }

        let hi = rsi_window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lo = rsi_window.iter().copied().fold(f64::INFINITY, f64::min);
        let raw = if hi == lo {
            last_k.or(last_raw).unwrap_or(FLAT_SEED)
        } else {
            (r - lo) / (hi - lo)
        };
        last_raw = Some(raw);

        raw_window.push_back(raw);
        if raw_window.len() > k_smooth {
            raw_window.pop_front();
        }
        if raw_window.len() < k_smooth {
            continue;
        }
        let k = raw_window.iter().sum::<f64>() / k_smooth as f64;
        last_k = Some(k);
        out.k[i] = Some(k * 100.0);

        k_window.push_back(k);
        if k_window.len() > d_smooth {
            k_window.pop_front();
        }
        if k_window.len() == d_smooth {
            out.d[i] = Some(k_window.iter().sum::<f64>() / d_smooth as f64 * 100.0);
        }
    }
    out
}

/// Bars before the first StochRSI %D value.
pub fn stoch_rsi_warmup(rsi_period: usize, stoch_period: usize, k: usize, d: usize) -> usize {
    rsi_period + stoch_period.saturating_sub(1) + k.saturating_sub(1) + d.saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn kdj_flat_window_uses_seed() {
        let flat = vec![10.0; 12];
        let kdj = calculate_kdj(&flat, &flat, &flat, 9, 3, 3);
        assert!(kdj.k[7].is_none());
        // first point: RSV = 0.5, K = (2*0.5 + 0.5)/3 = 0.5
        assert_relative_eq!(kdj.k[8].unwrap(), 50.0);
        assert_relative_eq!(kdj.d[8].unwrap(), 50.0);
        for i in 8..12 {
            let k = kdj.k[i].unwrap();
            assert!(k.is_finite());
            assert_relative_eq!(k, 50.0);
            assert_relative_eq!(kdj.j[i].unwrap(), 50.0);
        }
    }

    #[test]
    fn kdj_close_at_high_pushes_k_up() {
        let high: Vec<f64> = (0..20).map(|i| 11.0 + i as f64).collect();
        let low: Vec<f64> = (0..20).map(|i| 9.0 + i as f64).collect();
        let close = high.clone();
        let kdj = calculate_kdj(&high, &low, &close, 9, 3, 3);
        let k = kdj.k[19].unwrap();
        assert!(k > 90.0 && k <= 100.0, "K = {k}");
        assert!(kdj.j[19].unwrap() >= kdj.k[19].unwrap());
    }

    #[test]
    fn williams_r_range_and_flat() {
        let high = [10.0, 12.0, 14.0, 13.0];
        let low = [8.0, 9.0, 11.0, 10.0];
        let close = [9.0, 11.0, 14.0, 10.0];
        let w = calculate_williams_r(&high, &low, &close, 3);
        assert!(w[1].is_none());
        // window 8..14, close at high → 0
        assert_relative_eq!(w[2].unwrap(), 0.0);
        // window 9..14, close 10 → -(14-10)/5*100 = -80
        assert_relative_eq!(w[3].unwrap(), -80.0);

        let flat = [5.0; 4];
        let w = calculate_williams_r(&flat, &flat, &flat, 3);
        assert_relative_eq!(w[2].unwrap(), -50.0);
        assert_relative_eq!(w[3].unwrap(), -50.0);
    }

    #[test]
    fn stoch_rsi_flat_is_fallback_not_nan() {
        let out = calculate_stoch_rsi(&[20.0; 60], 14, 14, 3, 3);
        for v in out.k.iter().chain(out.d.iter()).flatten() {
            assert!(v.is_finite());
            assert_relative_eq!(*v, 50.0);
        }
        assert!(out.d[59].is_some());
    }

    #[test]
    fn stoch_rsi_warmup_boundary() {
        let data: Vec<f64> = (0..60).map(|i| 50.0 + ((i * 13) % 7) as f64).collect();
        let out = calculate_stoch_rsi(&data, 14, 14, 3, 3);
        let w = stoch_rsi_warmup(14, 14, 3, 3);
        assert!(out.d[w - 1].is_none());
        assert!(out.d[w].is_some());
        for v in out.k.iter().flatten() {
            assert!((0.0..=100.0).contains(v));
        }
    }
}
