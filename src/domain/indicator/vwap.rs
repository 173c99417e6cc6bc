//! Rolling VWAP.
//!
//! VWAP(n)[i] = sum(TP * V) / sum(V) over the last n bars.
//! A window with zero volume falls back to the current typical price.

pub fn calculate_vwap(typical: &[f64], volume: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; typical.len()];
    if period == 0 || typical.len() < period {
        return out;
    }
    for i in (period - 1)..typical.len() {
        let start = i + 1 - period;
        let pv: f64 = (start..=i).map(|j| typical[j] * volume[j]).sum();
        let v: f64 = volume[start..=i].iter().sum();
        out[i] = Some(if v == 0.0 { typical[i] } else { pv / v });
    }
    out
}
