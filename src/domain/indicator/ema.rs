//! Exponential moving average and the composites built on it.
//!
//! k = 2/(n+1), seed with the SMA of the first n values, then
//! EMA[i] = P[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are None.
//!
//! DEMA = 2*EMA - EMA(EMA)
//! TEMA = 3*EMA1 - 3*EMA2 + EMA3
//! TRIX = 100 * (EMA3[i] - EMA3[i-1]) / EMA3[i-1]
//! ZLEMA = EMA(2*P[i] - P[i-lag]), lag = (n-1)/2

pub fn calculate_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);
    for i in period..values.len() {
        ema = values[i] * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }
    out
}

/// EMA of a column with a warm-up prefix of `None`. Seeding starts at the
/// first present value; a `None` after that ends the computation.
pub fn calculate_ema_opt(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    let Some(start) = values.iter().position(Option::is_some) else {
        return out;
    };
    let tail: Vec<f64> = values[start..].iter().map_while(|v| *v).collect();
    for (offset, v) in calculate_ema(&tail, period).into_iter().enumerate() {
        out[start + offset] = v;
    }
    out
}

pub fn calculate_dema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let e1 = calculate_ema(values, period);
    let e2 = calculate_ema_opt(&e1, period);
    e1.iter()
        .zip(&e2)
        .map(|(a, b)| Some(2.0 * (*a)? - (*b)?))
        .collect()
}

pub fn calculate_tema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let e1 = calculate_ema(values, period);
    let e2 = calculate_ema_opt(&e1, period);
    let e3 = calculate_ema_opt(&e2, period);
    (0..values.len())
        .map(|i| Some(3.0 * e1[i]? - 3.0 * e2[i]? + e3[i]?))
        .collect()
}

/// Percentage rate of change of the triple-smoothed EMA. None when the
/// previous value is zero.
pub fn calculate_trix(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let e1 = calculate_ema(values, period);
    let e2 = calculate_ema_opt(&e1, period);
    let e3 = calculate_ema_opt(&e2, period);
    let mut out = vec![None; values.len()];
    for i in 1..values.len() {
        if let (Some(prev), Some(curr)) = (e3[i - 1], e3[i]) {
            if prev != 0.0 {
                out[i] = Some(100.0 * (curr - prev) / prev);
            }
        }
    }
    out
}

pub fn calculate_zlema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let lag = period.saturating_sub(1) / 2;
    let adjusted: Vec<Option<f64>> = (0..values.len())
        .map(|i| {
            if i >= lag {
                Some(2.0 * values[i] - values[i - lag])
            } else {
                None
            }
        })
        .collect();
    calculate_ema_opt(&adjusted, period)
}

/// Bars before the first DEMA value.
pub fn dema_warmup(period: usize) -> usize {
    2 * period.saturating_sub(1)
}

/// Bars before the first TEMA value.
pub fn tema_warmup(period: usize) -> usize {
    3 * period.saturating_sub(1)
}
