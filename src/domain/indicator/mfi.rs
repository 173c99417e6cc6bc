//! Money Flow Index.
//!
//! Raw flow = TP * volume. A bar whose typical price rose adds to positive
//! flow, one that fell adds to negative flow; an unchanged typical price adds
//! to neither. Flows are Wilder-smoothed like RSI gains and losses:
//! MFI = 100 - 100 / (1 + avg_pos / avg_neg), avg_neg == 0 ⇒ 100.
//! Warmup: first n bars are None.

use crate::domain::indicator::rsi::wilder_oscillator;

pub fn calculate_mfi(typical: &[f64], volume: &[f64], period: usize) -> Vec<Option<f64>> {
    let (pos, neg): (Vec<f64>, Vec<f64>) = (1..typical.len())
        .map(|i| {
            let flow = typical[i] * volume[i];
            if typical[i] > typical[i - 1] {
                (flow, 0.0)
            } else if typical[i] < typical[i - 1] {
                (0.0, flow)
            } else {
                (0.0, 0.0)
            }
        })
        .unzip();
    wilder_oscillator(&pos, &neg, period, typical.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mfi_all_rising_is_100() {
        let tp: Vec<f64> = (0..10).map(|i| 10.0 + i as f64).collect();
        let out = calculate_mfi(&tp, &[1000.0; 10], 5);
        assert_eq!(out[5], Some(100.0));
        assert_eq!(out[9], Some(100.0));
    }

    #[test]
    fn mfi_ties_count_on_neither_side() {
        // one rise, one tie: negative flow is zero → 100
        let out = calculate_mfi(&[10.0, 11.0, 11.0], &[100.0, 100.0, 100.0], 2);
        assert_eq!(out[2], Some(100.0));
    }

    #[test]
    fn mfi_balanced() {
        // +flow 11*100, -flow 10*110 → ratio 1100/1100 = 1 → 50
        let out = calculate_mfi(&[10.0, 11.0, 10.0], &[100.0, 100.0, 110.0], 2);
        assert_relative_eq!(out[2].unwrap(), 50.0);
    }
}
