//! Average Directional Index (Wilder).
//!
//! +DM = H[i]-H[i-1] if it exceeds L[i-1]-L[i] and is positive, else 0
//! -DM = L[i-1]-L[i] if it exceeds H[i]-H[i-1] and is positive, else 0
//! Smoothed TR/±DM: seed = sum of the first n values, then
//! S = S - S/n + value.
//! ±DI = 100 × S(±DM) / S(TR), DX = 100 × |+DI - -DI| / (+DI + -DI)
//! ADX seed = mean of the first n DX, then Wilder-smoothed.
//!
//! Warmup: DI from bar n, ADX from bar 2n-1.

#[derive(Debug, Clone, PartialEq)]
pub struct AdxSeries {
    pub adx: Vec<Option<f64>>,
    pub plus_di: Vec<Option<f64>>,
    pub minus_di: Vec<Option<f64>>,
}

pub fn calculate_adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> AdxSeries {
    let n = close.len();
    let mut out = AdxSeries {
        adx: vec![None; n],
        plus_di: vec![None; n],
        minus_di: vec![None; n],
    };
    if period == 0 || n <= period {
        return out;
    }

    let mut tr = vec![0.0; n];
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
        let prev = close[i - 1];
        tr[i] = (high[i] - low[i])
            .max((high[i] - prev).abs())
            .max((low[i] - prev).abs());
    }

    let mut s_tr: f64 = tr[1..=period].iter().sum();
    let mut s_plus: f64 = plus_dm[1..=period].iter().sum();
    let mut s_minus: f64 = minus_dm[1..=period].iter().sum();

    let p = period as f64;
    let mut dx_seed = Vec::with_capacity(period);
    let mut adx: Option<f64> = None;

    for i in period..n {
        if i > period {
            s_tr = s_tr - s_tr / p + tr[i];
            s_plus = s_plus - s_plus / p + plus_dm[i];
            s_minus = s_minus - s_minus / p + minus_dm[i];
        }
        let (pdi, mdi) = if s_tr == 0.0 {
            (0.0, 0.0)
        } else {
            (100.0 * s_plus / s_tr, 100.0 * s_minus / s_tr)
        };
        out.plus_di[i] = Some(pdi);
        out.minus_di[i] = Some(mdi);

        let sum = pdi + mdi;
        let dx = if sum == 0.0 {
            0.0
        } else {
            100.0 * (pdi - mdi).abs() / sum
        };

        adx = match adx {
            Some(prev) => Some((prev * (p - 1.0) + dx) / p),
            None => {
                dx_seed.push(dx);
                if dx_seed.len() == period {
                    Some(dx_seed.iter().sum::<f64>() / p)
                } else {
                    None
                }
            }
        };
        out.adx[i] = adx;
    }
    out
}

/// Bars needed before ADX has a value.
pub fn adx_min_bars(period: usize) -> usize {
    2 * period
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn adx_strong_uptrend() {
        let high: Vec<f64> = (0..40).map(|i| 11.0 + i as f64).collect();
        let low: Vec<f64> = (0..40).map(|i| 9.0 + i as f64).collect();
        let close: Vec<f64> = (0..40).map(|i| 10.0 + i as f64).collect();
        let out = calculate_adx(&high, &low, &close, 14);
        assert!(out.adx[26].is_none());
        assert!(out.adx[27].is_some());
        assert_relative_eq!(out.minus_di[39].unwrap(), 0.0);
        assert_relative_eq!(out.adx[39].unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn adx_flat_market_is_zero() {
        let flat = vec![10.0; 40];
        let out = calculate_adx(&flat, &flat, &flat, 14);
        assert_eq!(out.adx[39], Some(0.0));
    }

    #[test]
    fn adx_too_short() {
        let out = calculate_adx(&[1.0; 5], &[1.0; 5], &[1.0; 5], 14);
        assert!(out.adx.iter().all(Option::is_none));
        assert_eq!(adx_min_bars(14), 28);
    }
}
