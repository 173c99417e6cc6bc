//! Flattening results for persistence.
//!
//! Each category bucket becomes one [`FlatRecord`]. Well-known numeric
//! outputs land in typed columns; everything else (labels, composites,
//! the remaining numbers, occurrences) goes into a JSON blob. This is the
//! only place typed outputs turn into string-keyed JSON.

use crate::domain::capability::Category;
use crate::domain::output::OutputValue;
use crate::domain::result::AnalysisResult;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Typed columns shared by every record; only those of the record's
/// category are ever filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Columns {
    pub trend_strength: Option<f64>,
    pub ma_short: Option<f64>,
    pub ma_medium: Option<f64>,
    pub ma_long: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub adx: Option<f64>,
    pub rsi: Option<f64>,
    pub kdj_k: Option<f64>,
    pub kdj_d: Option<f64>,
    pub kdj_j: Option<f64>,
    pub cci: Option<f64>,
    pub boll_upper: Option<f64>,
    pub boll_middle: Option<f64>,
    pub boll_lower: Option<f64>,
    pub atr: Option<f64>,
    pub obv: Option<f64>,
    pub mfi: Option<f64>,
    pub vwap: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub margin_balance: Option<f64>,
    pub margin_change_pct: Option<f64>,
}

impl Columns {
    /// Column for `(unit, key)`, if it is promoted.
    fn slot(&mut self, unit: &str, key: &str) -> Option<&mut Option<f64>> {
        let slot = match (unit, key) {
            ("trend_classifier", "trend_strength") => &mut self.trend_strength,
            ("ma", "ma_short") => &mut self.ma_short,
            ("ma", "ma_medium") => &mut self.ma_medium,
            ("ma", "ma_long") => &mut self.ma_long,
            ("macd", "macd") => &mut self.macd,
            ("macd", "signal") => &mut self.macd_signal,
            ("macd", "histogram") => &mut self.macd_histogram,
            ("adx", "adx") => &mut self.adx,
            ("rsi", "rsi") => &mut self.rsi,
            ("kdj", "k") => &mut self.kdj_k,
            ("kdj", "d") => &mut self.kdj_d,
            ("kdj", "j") => &mut self.kdj_j,
            ("cci", "cci") => &mut self.cci,
            ("bollinger", "upper") => &mut self.boll_upper,
            ("bollinger", "middle") => &mut self.boll_middle,
            ("bollinger", "lower") => &mut self.boll_lower,
            ("atr", "atr") => &mut self.atr,
            ("obv", "obv") => &mut self.obv,
            ("mfi", "mfi") => &mut self.mfi,
            ("vwap", "vwap") => &mut self.vwap,
            ("volume_ratio", "volume_ratio") => &mut self.volume_ratio,
            ("margin_trend", "margin_balance") => &mut self.margin_balance,
            ("margin_trend", "margin_change_pct") => &mut self.margin_change_pct,
            _ => return None,
        };
        Some(slot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    pub code: String,
    pub date: Option<NaiveDate>,
    /// `None` only for the single record of a failed instrument.
    pub category: Option<Category>,
    #[serde(flatten)]
    pub columns: Columns,
    pub occurrence_count: usize,
    pub payload: Value,
    pub error: Option<String>,
}

pub fn flatten(result: &AnalysisResult) -> Vec<FlatRecord> {
    if let Some(error) = result.error() {
        return vec![FlatRecord {
            code: result.code().to_string(),
            date: result.computation_date(),
            category: None,
            columns: Columns::default(),
            occurrence_count: 0,
            payload: Value::Null,
            error: Some(error.to_string()),
        }];
    }

    result
        .buckets()
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(category, bucket)| {
            let mut columns = Columns::default();
            let mut values = Map::new();
            for (unit, outputs) in &bucket.values {
                let mut rest = Map::new();
                for (key, value) in outputs {
                    match (value, columns.slot(unit, key)) {
                        (OutputValue::Number(v), Some(slot)) => *slot = Some(*v),
                        _ => {
                            rest.insert(key.clone(), json!(value));
                        }
                    }
                }
                if !rest.is_empty() {
                    values.insert(unit.clone(), Value::Object(rest));
                }
            }
            let mut payload = Map::new();
            if !values.is_empty() {
                payload.insert("values".into(), Value::Object(values));
            }
            if !bucket.occurrences.is_empty() {
                payload.insert("occurrences".into(), json!(bucket.occurrences));
            }
            if category == Category::Trend {
                if let Some(trend) = result.trend() {
                    payload.insert("trend_context".into(), json!(trend));
                }
            }
            FlatRecord {
                code: result.code().to_string(),
                date: result.computation_date(),
                category: Some(category),
                columns,
                occurrence_count: bucket.occurrences.len(),
                payload: Value::Object(payload),
                error: None,
            }
        })
        .collect()
}
