//! Weighted Moving Average and Hull Moving Average.
//!
//! O(n) sliding window implementation using Diophantine technique.
//! WMA(n) = (1*P[i-n+1] + 2*P[i-n+2] + ... + n*P[i]) / (n*(n+1)/2)
//! Warmup: first (n-1) bars are None.
//!
//! HMA(n) = WMA(2*WMA(n/2) - WMA(n), floor(sqrt(n)))

pub fn calculate_wma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.is_empty() {
        return out;
    }

    let divisor = (period * (period + 1)) as f64 / 2.0;
    let mut weighted_sum: f64 = 0.0;
    let mut window_sum: f64 = 0.0;

    for (i, &v) in values.iter().enumerate() {
        if i < period {
            weighted_sum += (i + 1) as f64 * v;
            window_sum += v;
        } else {
            weighted_sum += period as f64 * v - window_sum;
            window_sum += v - values[i - period];
        }
        if i + 1 >= period {
            out[i] = Some(weighted_sum / divisor);
        }
    }
    out
}

fn calculate_wma_opt(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    let Some(start) = values.iter().position(Option::is_some) else {
        return out;
    };
    let tail: Vec<f64> = values[start..].iter().map_while(|v| *v).collect();
    for (offset, v) in calculate_wma(&tail, period).into_iter().enumerate() {
        out[start + offset] = v;
    }
    out
}

pub fn hma_periods(period: usize) -> (usize, usize) {
    let half = (period / 2).max(1);
    let root = ((period as f64).sqrt().floor() as usize).max(1);
    (half, root)
}

/// Bars before the first HMA value.
pub fn hma_warmup(period: usize) -> usize {
    let (_, root) = hma_periods(period);
    period.saturating_sub(1) + root - 1
}

pub fn calculate_hma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    let (half, root) = hma_periods(period);
    let fast = calculate_wma(values, half);
    let slow = calculate_wma(values, period);
    let raw: Vec<Option<f64>> = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| Some(2.0 * (*f)? - (*s)?))
        .collect();
    calculate_wma_opt(&raw, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wma_basic() {
        // (1*1 + 2*2 + 3*3) / 6 = 14/6
        let out = calculate_wma(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(out[1].is_none());
        assert_relative_eq!(out[2].unwrap(), 14.0 / 6.0);
        // (1*2 + 2*3 + 3*4) / 6 = 20/6
        assert_relative_eq!(out[3].unwrap(), 20.0 / 6.0);
    }

    #[test]
    fn wma_sliding_matches_direct() {
        let data: Vec<f64> = (0..20).map(|i| ((i * 7) % 11) as f64).collect();
        let out = calculate_wma(&data, 5);
        for i in 4..data.len() {
            let direct: f64 = (0..5).map(|j| (j + 1) as f64 * data[i - 4 + j]).sum::<f64>() / 15.0;
            assert_relative_eq!(out[i].unwrap(), direct, epsilon = 1e-9);
        }
    }

    #[test]
    fn hma_periods_for_16() {
        assert_eq!(hma_periods(16), (8, 4));
        assert_eq!(hma_warmup(16), 18);
    }

    #[test]
    fn hma_warmup_boundary() {
        let data: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let out = calculate_hma(&data, 16);
        assert!(out[hma_warmup(16) - 1].is_none());
        assert!(out[hma_warmup(16)].is_some());
    }

    #[test]
    fn hma_constant_input() {
        let out = calculate_hma(&[7.0; 30], 9);
        assert_relative_eq!(out.last().unwrap().unwrap(), 7.0, epsilon = 1e-9);
    }

    #[test]
    fn hma_has_no_lag_on_linear_trend() {
        let data: Vec<f64> = (0..50).map(|i| 2.0 * i as f64).collect();
        let out = calculate_hma(&data, 9);
        assert_relative_eq!(out[49].unwrap(), 98.0, epsilon = 1e-9);
    }
}
