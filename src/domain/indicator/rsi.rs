//! RSI (Relative Strength Index).
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n deltas
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are None (need n price changes).

pub fn calculate_rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let (gains, losses): (Vec<f64>, Vec<f64>) = values
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();
    wilder_oscillator(&gains, &losses, period, values.len())
}

/// Shared Wilder gain/loss oscillator. `gains[j]`/`losses[j]` belong to bar
/// `j + 1`; the output has `len` entries.
pub(crate) fn wilder_oscillator(
    gains: &[f64],
    losses: &[f64],
    period: usize,
    len: usize,
) -> Vec<Option<f64>> {
    let mut out = vec![None; len];
    if period == 0 || gains.len() < period {
        return out;
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    out[period] = Some(ratio_to_oscillator(avg_gain, avg_loss));

    for j in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[j]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[j]) / period as f64;
        out[j + 1] = Some(ratio_to_oscillator(avg_gain, avg_loss));
    }
    out
}

fn ratio_to_oscillator(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_and_single() {
        assert!(calculate_rsi(&[], 14).is_empty());
        assert_eq!(calculate_rsi(&[100.0], 14), vec![None]);
    }

    #[test]
    fn rsi_warmup_period() {
        let closes: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let out = calculate_rsi(&closes, 14);
        assert_eq!(out.len(), 15);
        assert!(out[..14].iter().all(Option::is_none));
        assert!(out[14].is_some());
    }

    #[test]
    fn rsi_all_gains_is_exactly_100() {
        let closes: Vec<f64> = (0..15).map(|i| 10.0 + 0.5 * i as f64).collect();
        let out = calculate_rsi(&closes, 14);
        assert_eq!(out[14], Some(100.0));
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let out = calculate_rsi(&closes, 14);
        assert!(out[14].unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_flat_is_100() {
        // no losses at all: avg_loss == 0 branch
        let out = calculate_rsi(&[50.0; 20], 14);
        assert_eq!(out[19], Some(100.0));
    }

    #[test]
    fn rsi_in_range() {
        let closes: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        for v in calculate_rsi(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_known_calculation() {
        let closes = [
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ];
        let rsi = calculate_rsi(&closes, 14)[14].unwrap();
        // gains sum to 4.0, losses to 1.5 over 14 deltas
        let expected = 100.0 - 100.0 / (1.0 + 4.0 / 1.5);
        assert!((rsi - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_zero_period() {
        assert!(calculate_rsi(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }
}
