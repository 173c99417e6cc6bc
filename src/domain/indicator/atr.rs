//! Average True Range (Wilder).
//!
//! TR[0] = high - low, TR[i] = max(H-L, |H-C[i-1]|, |L-C[i-1]|)
//! ATR seed = mean of the first n TRs, then ATR = (prev*(n-1) + TR) / n.
//! Warmup: first (n-1) bars are None.

pub fn calculate_atr_from_tr(tr: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; tr.len()];
    if period == 0 || tr.len() < period {
        return out;
    }
    let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(atr);
    for i in period..tr.len() {
        atr = (atr * (period - 1) as f64 + tr[i]) / period as f64;
        out[i] = Some(atr);
    }
    out
}

pub fn true_ranges(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|i| {
            let hl = high[i] - low[i];
            if i == 0 {
                hl
            } else {
                let prev = close[i - 1];
                hl.max((high[i] - prev).abs()).max((low[i] - prev).abs())
            }
        })
        .collect()
}

pub fn calculate_atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    calculate_atr_from_tr(&true_ranges(high, low, close), period)
}
