//! Commodity Channel Index.
//!
//! CCI = (TP - SMA(TP, n)) / (0.015 * MeanDeviation(TP, n))
//! If the mean deviation is 0: CCI = 0
//! Warmup: first (n-1) bars are None.

const LAMBERT: f64 = 0.015;

pub fn calculate_cci(typical: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; typical.len()];
    if period == 0 || typical.len() < period {
        return out;
    }
    for i in (period - 1)..typical.len() {
        let window = &typical[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let md = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / period as f64;
        out[i] = Some(if md == 0.0 {
            0.0
        } else {
            (typical[i] - mean) / (LAMBERT * md)
        });
    }
    out
}
