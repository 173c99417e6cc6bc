//! Standard Deviation and Bollinger Bands.
//!
//! Population standard deviation over n values (divides by N, not N-1).
//! STDDEV(n)[i] = sqrt(sum((P[i-j] - SMA(n)[i])^2 for j in 0..n) / n)
//!
//! Bollinger: middle = SMA(n), upper/lower = middle ± mult × STDDEV(n).
//! Warmup: first (n-1) bars are None.

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

fn mean_and_stddev(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

pub fn calculate_stddev(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    for i in (period - 1)..values.len() {
        out[i] = Some(mean_and_stddev(&values[i + 1 - period..=i]).1);
    }
    out
}

pub fn calculate_bollinger(values: &[f64], period: usize, mult: f64) -> BollingerSeries {
    let n = values.len();
    let mut out = BollingerSeries {
        upper: vec![None; n],
        middle: vec![None; n],
        lower: vec![None; n],
    };
    if period == 0 || n < period {
        return out;
    }
    for i in (period - 1)..n {
        let (mean, sd) = mean_and_stddev(&values[i + 1 - period..=i]);
        out.middle[i] = Some(mean);
        out.upper[i] = Some(mean + mult * sd);
        out.lower[i] = Some(mean - mult * sd);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn stddev_known_value() {
        // 2,4,4,4,5,5,7,9 → population stddev 2
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let out = calculate_stddev(&data, 8);
        assert_relative_eq!(out[7].unwrap(), 2.0);
        assert!(out[6].is_none());
    }

    #[test]
    fn stddev_constant_is_zero() {
        let out = calculate_stddev(&[3.0; 5], 3);
        assert_eq!(out[4], Some(0.0));
    }

    #[test]
    fn bollinger_bands_symmetric() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let b = calculate_bollinger(&data, 8, 2.0);
        assert_relative_eq!(b.middle[7].unwrap(), 5.0);
        assert_relative_eq!(b.upper[7].unwrap(), 9.0);
        assert_relative_eq!(b.lower[7].unwrap(), 1.0);
    }

    #[test]
    fn bollinger_too_short() {
        let b = calculate_bollinger(&[1.0, 2.0], 20, 2.0);
        assert!(b.middle.iter().all(Option::is_none));
    }
}
