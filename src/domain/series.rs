//! Per-instrument time series.
//!
//! A `Series` holds parallel arrays keyed by an ascending date axis. Extra
//! numeric fields (margin balance, short balance, ...) live in an ordered map
//! so units can look them up by name.

use crate::domain::error::SeriesError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const MARGIN_BALANCE: &str = "margin_balance";
pub const SHORT_BALANCE: &str = "short_balance";

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub code: String,
    pub dates: Vec<NaiveDate>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
    pub extras: BTreeMap<String, Vec<f64>>,
}

impl Series {
    pub fn new(
        code: impl Into<String>,
        dates: Vec<NaiveDate>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Result<Self, SeriesError> {
        let series = Self {
            code: code.into(),
            dates,
            open,
            high,
            low,
            close,
            volume,
            extras: BTreeMap::new(),
        };
        series.validate()?;
        Ok(series)
    }

    /// Build from bars. Bars are expected in date order.
    pub fn from_bars(code: impl Into<String>, bars: &[OhlcvBar]) -> Result<Self, SeriesError> {
        Self::new(
            code,
            bars.iter().map(|b| b.date).collect(),
            bars.iter().map(|b| b.open).collect(),
            bars.iter().map(|b| b.high).collect(),
            bars.iter().map(|b| b.low).collect(),
            bars.iter().map(|b| b.close).collect(),
            bars.iter().map(|b| b.volume).collect(),
        )
    }

    /// Attach an extra numeric field. Replaces any field with the same name.
    pub fn with_extra(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, SeriesError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SeriesError::EmptyFieldName {
                code: self.code.clone(),
            });
        }
        check_field(&self.code, &name, &values, self.dates.len())?;
        self.extras.insert(name, values);
        Ok(self)
    }

    /// Check the structural contract: equal lengths, strictly ascending
    /// dates, finite values everywhere.
    pub fn validate(&self) -> Result<(), SeriesError> {
        let n = self.dates.len();
        for (field, values) in self.core_fields() {
            check_field(&self.code, field, values, n)?;
        }
        for (field, values) in &self.extras {
            check_field(&self.code, field, values, n)?;
        }
        for i in 1..n {
            if self.dates[i] <= self.dates[i - 1] {
                return Err(SeriesError::NotAscending {
                    code: self.code.clone(),
                    index: i,
                });
            }
        }
        Ok(())
    }

    fn core_fields(&self) -> [(&'static str, &Vec<f64>); 5] {
        [
            ("open", &self.open),
            ("high", &self.high),
            ("low", &self.low),
            ("close", &self.close),
            ("volume", &self.volume),
        ]
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.len().checked_sub(1)
    }

    pub fn extra(&self, name: &str) -> Option<&[f64]> {
        self.extras.get(name).map(Vec::as_slice)
    }

    pub fn bar(&self, index: usize) -> Option<OhlcvBar> {
        if index >= self.len() {
            return None;
        }
        Some(OhlcvBar {
            date: self.dates[index],
            open: self.open[index],
            high: self.high[index],
            low: self.low[index],
            close: self.close[index],
            volume: self.volume[index],
        })
    }

    pub fn bars(&self) -> Vec<OhlcvBar> {
        (0..self.len()).filter_map(|i| self.bar(i)).collect()
    }

    pub fn typical_prices(&self) -> Vec<f64> {
        self.bars().iter().map(OhlcvBar::typical_price).collect()
    }

    /// True range per bar. The first bar has no previous close and uses
    /// high - low.
    pub fn true_ranges(&self) -> Vec<f64> {
        let bars = self.bars();
        bars.iter()
            .enumerate()
            .map(|(i, bar)| match i.checked_sub(1) {
                Some(prev) => bar.true_range(bars[prev].close),
                None => bar.range(),
            })
            .collect()
    }
}

fn check_field(code: &str, field: &str, values: &[f64], expected: usize) -> Result<(), SeriesError> {
    if values.len() != expected {
        return Err(SeriesError::LengthMismatch {
            code: code.to_string(),
            field: field.to_string(),
            expected,
            actual: values.len(),
        });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(SeriesError::NonFinite {
            code: code.to_string(),
            field: field.to_string(),
            index,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn three_bars() -> Series {
        Series::new(
            "TEST",
            vec![d(1), d(2), d(3)],
            vec![10.0, 11.0, 12.0],
            vec![11.0, 12.0, 13.0],
            vec![9.0, 10.0, 11.0],
            vec![10.5, 11.5, 12.5],
            vec![100.0, 200.0, 300.0],
        )
        .unwrap()
    }

    #[test]
    fn new_accepts_valid_series() {
        let s = three_bars();
        assert_eq!(s.len(), 3);
        assert_eq!(s.last_date(), Some(d(3)));
        assert_eq!(s.last_index(), Some(2));
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = Series::new(
            "TEST",
            vec![d(1), d(2)],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, SeriesError::LengthMismatch { ref field, .. } if field == "low"));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let err = Series::new(
            "TEST",
            vec![d(1), d(1)],
            vec![1.0; 2],
            vec![1.0; 2],
            vec![1.0; 2],
            vec![1.0; 2],
            vec![1.0; 2],
        )
        .unwrap_err();
        assert_eq!(
            err,
            SeriesError::NotAscending {
                code: "TEST".into(),
                index: 1
            }
        );
    }

    #[test]
    fn rejects_nan() {
        let err = Series::new(
            "TEST",
            vec![d(1), d(2)],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![1.0, f64::NAN],
            vec![1.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, SeriesError::NonFinite { index: 1, .. }));
    }

    #[test]
    fn extras_are_checked() {
        let s = three_bars();
        assert!(s.clone().with_extra(MARGIN_BALANCE, vec![1.0, 2.0]).is_err());
        assert!(s.clone().with_extra("", vec![1.0, 2.0, 3.0]).is_err());
        let s = s.with_extra(MARGIN_BALANCE, vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(s.extra(MARGIN_BALANCE), Some(&[1.0, 2.0, 3.0][..]));
        assert!(s.extra(SHORT_BALANCE).is_none());
    }

    #[test]
    fn validate_detects_tampering() {
        let mut s = three_bars();
        s.close.pop();
        assert!(s.validate().is_err());
    }

    #[test]
    fn bar_roundtrip_and_true_range() {
        let s = three_bars();
        let bar = s.bar(1).unwrap();
        assert_eq!(bar.date, d(2));
        assert!(s.bar(3).is_none());
        let tr = s.true_ranges();
        assert!((tr[0] - 2.0).abs() < f64::EPSILON);
        // high 12, low 10, prev close 10.5 → max(2, 1.5, 0.5)
        assert!((tr[1] - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn from_bars_matches_fields() {
        let s = three_bars();
        let rebuilt = Series::from_bars("TEST", &s.bars()).unwrap();
        assert_eq!(rebuilt, s);
    }
}
