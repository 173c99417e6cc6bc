//! Categorical labels from numeric series.
//!
//! Position labels (OVERBOUGHT/OVERSOLD) depend only on the current value.
//! Action labels (BUY/SELL) need a crossing between the previous and the
//! current bar; without one the label is HOLD.

use crate::domain::output::SignalLabel;

/// `value >= upper` is overbought, `value <= lower` is oversold.
pub fn threshold_label(value: f64, lower: f64, upper: f64) -> SignalLabel {
    if value >= upper {
        SignalLabel::Overbought
    } else if value <= lower {
        SignalLabel::Oversold
    } else {
        SignalLabel::Neutral
    }
}

/// Crossing of a fast line over a slow line between two bars.
pub fn cross_label(prev_fast: f64, prev_slow: f64, fast: f64, slow: f64) -> SignalLabel {
    if prev_fast <= prev_slow && fast > slow {
        SignalLabel::Buy
    } else if prev_fast >= prev_slow && fast < slow {
        SignalLabel::Sell
    } else {
        SignalLabel::Hold
    }
}

/// Crossing of a fixed level.
pub fn level_cross_label(prev: f64, curr: f64, level: f64) -> SignalLabel {
    cross_label(prev, level, curr, level)
}

/// Last two present values of an indicator column, aligned to the last two
/// bars. Returns `None` when either is still in warm-up.
pub fn last_pair(values: &[Option<f64>]) -> Option<(f64, f64)> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    Some((values[n - 2]?, values[n - 1]?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_position_only() {
        assert_eq!(threshold_label(80.0, 30.0, 70.0), SignalLabel::Overbought);
        assert_eq!(threshold_label(70.0, 30.0, 70.0), SignalLabel::Overbought);
        assert_eq!(threshold_label(20.0, 30.0, 70.0), SignalLabel::Oversold);
        assert_eq!(threshold_label(50.0, 30.0, 70.0), SignalLabel::Neutral);
    }

    #[test]
    fn cross_requires_crossing() {
        assert_eq!(cross_label(1.0, 2.0, 3.0, 2.0), SignalLabel::Buy);
        assert_eq!(cross_label(3.0, 2.0, 1.0, 2.0), SignalLabel::Sell);
        // already above on both bars: position, not a cross
        assert_eq!(cross_label(3.0, 2.0, 4.0, 2.0), SignalLabel::Hold);
        assert_eq!(cross_label(1.0, 2.0, 0.5, 2.0), SignalLabel::Hold);
    }

    #[test]
    fn level_cross() {
        assert_eq!(level_cross_label(25.0, 35.0, 30.0), SignalLabel::Buy);
        assert_eq!(level_cross_label(75.0, 65.0, 70.0), SignalLabel::Sell);
        assert_eq!(level_cross_label(20.0, 25.0, 30.0), SignalLabel::Hold);
    }

    #[test]
    fn last_pair_needs_both() {
        assert_eq!(last_pair(&[None, Some(1.0), Some(2.0)]), Some((1.0, 2.0)));
        assert_eq!(last_pair(&[None, Some(2.0)]), None);
        assert_eq!(last_pair(&[Some(2.0)]), None);
    }
}
