#![allow(dead_code)]

use chrono::NaiveDate;
use quantscan::domain::error::QuantscanError;
use quantscan::domain::series::Series;
use quantscan::ports::series_port::SeriesPort;
use std::collections::HashMap;

pub struct MockSeriesPort {
    pub data: HashMap<String, Series>,
    pub errors: HashMap<String, String>,
}

impl MockSeriesPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.data.insert(series.code.clone(), series);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl SeriesPort for MockSeriesPort {
    fn fetch_series(
        &self,
        code: &str,
        _start: Option<NaiveDate>,
        _end: Option<NaiveDate>,
    ) -> Result<Series, QuantscanError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(QuantscanError::Data {
                reason: reason.clone(),
            });
        }
        self.data
            .get(code)
            .cloned()
            .ok_or_else(|| QuantscanError::Data {
                reason: format!("no data for {code}"),
            })
    }

    fn list_codes(&self) -> Result<Vec<String>, QuantscanError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Daily series from closes; open is the previous close, high/low wrap the body.
pub fn make_series(code: &str, closes: &[f64]) -> Series {
    let n = closes.len();
    let open: Vec<f64> = (0..n)
        .map(|i| if i == 0 { closes[0] } else { closes[i - 1] })
        .collect();
    let high: Vec<f64> = (0..n).map(|i| open[i].max(closes[i]) + 0.5).collect();
    let low: Vec<f64> = (0..n).map(|i| open[i].min(closes[i]) - 0.5).collect();
    Series::new(
        code,
        (0..n)
            .map(|i| start_date() + chrono::Duration::days(i as i64))
            .collect(),
        open,
        high,
        low,
        closes.to_vec(),
        (0..n).map(|i| 10_000.0 + (i % 7) as f64 * 500.0).collect(),
    )
    .unwrap()
}

pub fn trending(n: usize, start: f64, step: f64) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Sine wave around `base`; enough swing for oscillators and pivots.
pub fn wave(n: usize, base: f64, amplitude: f64, period: f64) -> Vec<f64> {
    (0..n)
        .map(|i| base + amplitude * (i as f64 * std::f64::consts::TAU / period).sin())
        .collect()
}

/// CSV text in the layout the file adapter reads.
pub fn csv_text(series: &Series) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for i in 0..series.len() {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            series.dates[i],
            series.open[i],
            series.high[i],
            series.low[i],
            series.close[i],
            series.volume[i]
        ));
    }
    out
}
