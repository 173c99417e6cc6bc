//! Analysis results.
//!
//! One [`AnalysisResult`] per instrument and compute call. Outputs are
//! partitioned by category; inside a bucket values are keyed by unit name
//! and then output key. Only the engine and batch layer mutate a result.

use crate::domain::capability::Category;
use crate::domain::diagnostics::Diagnostics;
use crate::domain::output::{Occurrence, OutputValue, TrendContext, UnitOutput};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryBucket {
    pub values: BTreeMap<String, BTreeMap<String, OutputValue>>,
    pub occurrences: Vec<Occurrence>,
}

impl CategoryBucket {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.occurrences.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    code: String,
    computation_date: Option<NaiveDate>,
    trend: Option<TrendContext>,
    buckets: BTreeMap<Category, CategoryBucket>,
    diagnostics: Diagnostics,
    error: Option<String>,
}

impl AnalysisResult {
    pub(crate) fn new(code: impl Into<String>, computation_date: Option<NaiveDate>) -> Self {
        Self {
            code: code.into(),
            computation_date,
            trend: None,
            buckets: BTreeMap::new(),
            diagnostics: Diagnostics::new(),
            error: None,
        }
    }

    /// A result carrying only an instrument-level error.
    pub(crate) fn failed(code: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut result = Self::new(code, None);
        let reason = reason.into();
        result.diagnostics.error(None, reason.clone());
        result.error = Some(reason);
        result
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Date of the last bar of the input series.
    pub fn computation_date(&self) -> Option<NaiveDate> {
        self.computation_date
    }

    pub fn trend(&self) -> Option<&TrendContext> {
        self.trend.as_ref()
    }

    pub fn bucket(&self, category: Category) -> Option<&CategoryBucket> {
        self.buckets.get(&category)
    }

    pub fn buckets(&self) -> impl Iterator<Item = (Category, &CategoryBucket)> {
        self.buckets.iter().map(|(c, b)| (*c, b))
    }

    pub fn value(&self, category: Category, unit: &str, key: &str) -> Option<&OutputValue> {
        self.buckets.get(&category)?.values.get(unit)?.get(key)
    }

    /// Every occurrence across buckets, in category order.
    pub fn occurrences(&self) -> impl Iterator<Item = &Occurrence> {
        self.buckets.values().flat_map(|b| b.occurrences.iter())
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub(crate) fn set_trend(&mut self, trend: TrendContext) {
        self.trend = Some(trend);
    }

    pub(crate) fn bucket_mut(&mut self, category: Category) -> &mut CategoryBucket {
        self.buckets.entry(category).or_default()
    }

    /// Merge one unit's values and occurrences into its category bucket.
    pub(crate) fn merge(&mut self, category: Category, unit: &str, output: UnitOutput) {
        let bucket = self.bucket_mut(category);
        if !output.values.is_empty() {
            bucket
                .values
                .entry(unit.to_string())
                .or_default()
                .extend(output.values);
        }
        bucket.occurrences.extend(output.occurrences);
    }

    /// Drop occurrences failing `keep`; returns how many were dropped.
    pub(crate) fn retain_occurrences(&mut self, mut keep: impl FnMut(&Occurrence) -> bool) -> usize {
        let mut dropped = 0;
        for bucket in self.buckets.values_mut() {
            let before = bucket.occurrences.len();
            bucket.occurrences.retain(|o| keep(o));
            dropped += before - bucket.occurrences.len();
        }
        dropped
    }
}
