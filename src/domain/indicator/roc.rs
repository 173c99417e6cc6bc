//! ROC (Rate of Change).
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100
//! If C[i-n] == 0: ROC = 0
//! Warmup: first n bars are None.

pub fn calculate_roc(values: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if period == 0 || i < period {
                return None;
            }
            let prev = values[i - period];
            Some(if prev == 0.0 {
                0.0
            } else {
                (values[i] - prev) / prev * 100.0
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn roc_basic() {
        let out = calculate_roc(&[100.0, 105.0, 110.0], 2);
        assert!(out[1].is_none());
        assert_relative_eq!(out[2].unwrap(), 10.0);
    }

    #[test]
    fn roc_zero_base() {
        let out = calculate_roc(&[0.0, 5.0], 1);
        assert_eq!(out[1], Some(0.0));
    }

    #[test]
    fn roc_negative() {
        let out = calculate_roc(&[100.0, 90.0], 1);
        assert_relative_eq!(out[1].unwrap(), -10.0);
    }
}
