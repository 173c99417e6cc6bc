//! CSV file series adapter.
//!
//! One file per instrument, `<base>/<CODE>.csv`. Columns are found by header
//! name; `date,open,high,low,close,volume` are required and every other
//! column becomes an extra numeric field of the series.

use crate::domain::error::QuantscanError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::Series;
use crate::ports::series_port::SeriesPort;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

const REQUIRED: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvSeriesAdapter {
    base_path: PathBuf,
}

struct Row {
    bar: OhlcvBar,
    extras: Vec<f64>,
}

impl CsvSeriesAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

fn data_error(reason: String) -> QuantscanError {
    QuantscanError::Data { reason }
}

impl SeriesPort for CsvSeriesAdapter {
    fn fetch_series(
        &self,
        code: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Series, QuantscanError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| data_error(format!("{}: CSV header error: {}", code, e)))?
            .iter()
            .map(|h| h.to_lowercase())
            .collect();

        let mut columns = Vec::with_capacity(headers.len());
        for name in REQUIRED {
            let idx = headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| data_error(format!("{}: missing {} column", code, name)))?;
            columns.push(idx);
        }
        let extra_names: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !REQUIRED.contains(&h.as_str()))
            .map(|(i, h)| (i, h.clone()))
            .collect();

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result
                .map_err(|e| data_error(format!("{}: CSV parse error: {}", code, e)))?;

            let date_str = record.get(columns[0]).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                data_error(format!("{}: invalid date '{}' on row {}: {}", code, date_str, line + 1, e))
            })?;
            if start.is_some_and(|s| date < s) || end.is_some_and(|e| date > e) {
                continue;
            }

            let mut values = Vec::with_capacity(headers.len() - 1);
            for idx in columns[1..]
                .iter()
                .copied()
                .chain(extra_names.iter().map(|(i, _)| *i))
            {
                let raw = record.get(idx).unwrap_or_default();
                let value: f64 = raw.parse().map_err(|e| {
                    data_error(format!(
                        "{}: invalid {} value '{}' on row {}: {}",
                        code,
                        headers[idx],
                        raw,
                        line + 1,
                        e
                    ))
                })?;
                values.push(value);
            }
            let extras = values.split_off(5);
            rows.push(Row {
                bar: OhlcvBar {
                    date,
                    open: values[0],
                    high: values[1],
                    low: values[2],
                    close: values[3],
                    volume: values[4],
                },
                extras,
            });
        }

        rows.sort_by_key(|r| r.bar.date);
        let bars: Vec<OhlcvBar> = rows.iter().map(|r| r.bar.clone()).collect();
        let mut series = Series::from_bars(code, &bars)?;
        let extras: BTreeMap<&str, Vec<f64>> = extra_names
            .iter()
            .enumerate()
            .map(|(k, (_, name))| (name.as_str(), rows.iter().map(|r| r.extras[k]).collect()))
            .collect();
        for (name, values) in extras {
            series = series.with_extra(name, values)?;
        }

        tracing::debug!(code, bars = series.len(), extras = series.extras.len(), "loaded series");
        Ok(series)
    }

    fn list_codes(&self) -> Result<Vec<String>, QuantscanError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut codes = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(code) = name_str.strip_suffix(".csv") {
                if !code.is_empty() {
                    codes.push(code.to_string());
                }
            }
        }

        codes.sort();
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::{MARGIN_BALANCE, SHORT_BALANCE};
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n";
        fs::write(path.join("600000.csv"), csv_content).unwrap();

        let margin = "date,close,open,high,low,volume,margin_balance,short_balance\n\
            2024-01-15,10.5,10.0,11.0,9.5,1000,500.0,20.0\n\
            2024-01-16,10.8,10.5,11.2,10.1,1200,520.0,18.0\n";
        fs::write(path.join("000001.csv"), margin).unwrap();
        fs::write(path.join("notes.txt"), "ignored").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_series_sorts_rows() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvSeriesAdapter::new(path);

        let series = adapter.fetch_series("600000", None, None).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.code, "600000");
        assert_eq!(series.dates[0], NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(series.open[0], 100.0);
        assert_eq!(series.high[0], 110.0);
        assert_eq!(series.low[0], 90.0);
        assert_eq!(series.close[0], 105.0);
        assert_eq!(series.volume[0], 50000.0);
        assert_eq!(series.close[2], 115.0);
        assert!(series.extras.is_empty());
    }

    #[test]
    fn fetch_series_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvSeriesAdapter::new(path);

        let day = NaiveDate::from_ymd_opt(2024, 1, 16);
        let series = adapter.fetch_series("600000", day, day).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.dates[0], day.unwrap());
    }

    #[test]
    fn extra_columns_become_fields() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvSeriesAdapter::new(path);

        let series = adapter.fetch_series("000001", None, None).unwrap();
        assert_eq!(series.close, vec![10.5, 10.8]);
        assert_eq!(series.open, vec![10.0, 10.5]);
        assert_eq!(series.extra(MARGIN_BALANCE), Some(&[500.0, 520.0][..]));
        assert_eq!(series.extra(SHORT_BALANCE), Some(&[20.0, 18.0][..]));
    }

    #[test]
    fn missing_file_is_data_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvSeriesAdapter::new(path);

        let err = adapter.fetch_series("XYZ", None, None).unwrap_err();
        assert!(matches!(err, QuantscanError::Data { .. }));
    }

    #[test]
    fn missing_required_column_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.csv"), "date,open,high,low,close\n2024-01-02,1,1,1,1\n").unwrap();
        let adapter = CsvSeriesAdapter::new(dir.path().to_path_buf());

        let err = adapter.fetch_series("A", None, None).unwrap_err();
        assert!(err.to_string().contains("volume"));
    }

    #[test]
    fn bad_number_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("A.csv"),
            "date,open,high,low,close,volume\n2024-01-02,1,abc,1,1,1\n",
        )
        .unwrap();
        let adapter = CsvSeriesAdapter::new(dir.path().to_path_buf());

        let err = adapter.fetch_series("A", None, None).unwrap_err();
        assert!(matches!(err, QuantscanError::Data { .. }));
        assert!(err.to_string().contains("high"));
    }

    #[test]
    fn duplicate_dates_surface_as_series_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("A.csv"),
            "date,open,high,low,close,volume\n2024-01-02,1,1,1,1,1\n2024-01-02,1,1,1,1,1\n",
        )
        .unwrap();
        let adapter = CsvSeriesAdapter::new(dir.path().to_path_buf());

        let err = adapter.fetch_series("A", None, None).unwrap_err();
        assert!(matches!(err, QuantscanError::Series(_)));
    }

    #[test]
    fn list_codes_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvSeriesAdapter::new(path);

        assert_eq!(adapter.list_codes().unwrap(), vec!["000001", "600000"]);
    }
}
