//! Parabolic SAR (stop and reverse).
//!
//! SAR(i) = SAR(i-1) + AF × (EP - SAR(i-1))
//!
//! - AF starts at `af_start`, grows by `af_step` whenever a fresh extreme is
//!   recorded, capped at `af_max`
//! - EP is the highest high of an up-trend or the lowest low of a down-trend
//! - The initial trend is up when high[1] > high[0]
//! - While a trend persists the stop never retreats: in an up-trend it is
//!   capped by the two prior lows and never falls below the previous stop,
//!   mirrored for a down-trend
//! - A bar piercing the stop flips the trend; the stop resets to the prior
//!   EP, AF resets to `af_start` and the bar's extreme becomes the new EP
//!
//! Warmup: bar 0 is None.

#[derive(Debug, Clone, PartialEq)]
pub struct SarSeries {
    pub sar: Vec<Option<f64>>,
    /// `true` while up-trending.
    pub uptrend: Vec<Option<bool>>,
    pub af: Vec<Option<f64>>,
}

impl SarSeries {
    fn empty(n: usize) -> Self {
        Self {
            sar: vec![None; n],
            uptrend: vec![None; n],
            af: vec![None; n],
        }
    }
}

pub fn calculate_sar(
    high: &[f64],
    low: &[f64],
    af_start: f64,
    af_step: f64,
    af_max: f64,
) -> SarSeries {
    let n = high.len().min(low.len());
    let mut out = SarSeries::empty(n);
    if n < 2 {
        return out;
    }

    let mut uptrend = high[1] > high[0];
    let mut af = af_start;
    let (mut sar, mut ep) = if uptrend {
        (low[0], high[1])
    } else {
        (high[0], low[1])
    };
    out.sar[1] = Some(sar);
    out.uptrend[1] = Some(uptrend);
    out.af[1] = Some(af);

    for i in 2..n {
        let mut next = sar + af * (ep - sar);

        if uptrend {
            next = next.min(low[i - 1]).min(low[i - 2]).max(sar);
            if low[i] < next {
                uptrend = false;
                next = ep;
                ep = low[i];
                af = af_start;
            } else if high[i] > ep {
                ep = high[i];
                af = (af + af_step).min(af_max);
            }
        } else {
            next = next.max(high[i - 1]).max(high[i - 2]).min(sar);
            if high[i] > next {
                uptrend = true;
                next = ep;
                ep = high[i];
                af = af_start;
            } else if low[i] < ep {
                ep = low[i];
                af = (af + af_step).min(af_max);
            }
        }

        sar = next;
        out.sar[i] = Some(sar);
        out.uptrend[i] = Some(uptrend);
        out.af[i] = Some(af);
    }
    out
}
