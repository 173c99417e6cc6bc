//! Simple Moving Average.
//!
//! SMA(n)[i] = sum(P[i-n+1..=i]) / n
//! Warmup: first (n-1) bars are None.

pub fn calculate_sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum / period as f64);
    }
    out
}

/// SMA over a column that may itself be warming up. The window starts at the
/// first present value; gaps after that reset the window.
pub fn calculate_sma_opt(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    let mut run: Vec<f64> = Vec::with_capacity(period);
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(x) => {
                run.push(*x);
                if run.len() > period {
                    run.remove(0);
                }
                if run.len() == period {
                    out[i] = Some(run.iter().sum::<f64>() / period as f64);
                }
            }
            None => run.clear(),
        }
    }
    out
}
