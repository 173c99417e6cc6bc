//! Batch orchestration across instruments.
//!
//! Every instrument gets exactly one result. Engine errors and panics are
//! caught per instrument and turned into failed results, so one bad series
//! never aborts the batch. With the `parallel` feature instruments are
//! spread over the rayon pool and gathered once all have finished.

use crate::domain::engine::{Engine, panic_message};
use crate::domain::error::EngineError;
use crate::domain::plan::ExecutionPlan;
use crate::domain::result::AnalysisResult;
use crate::domain::series::Series;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

fn compute_one(engine: &Engine, code: &str, series: &Series, plan: &ExecutionPlan) -> AnalysisResult {
    match catch_unwind(AssertUnwindSafe(|| engine.compute(series, plan))) {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            tracing::error!(code, error = %err, "instrument failed");
            AnalysisResult::failed(code, err.to_string())
        }
        Err(payload) => {
            let err = EngineError::Panicked {
                code: code.to_string(),
                reason: panic_message(payload.as_ref()),
            };
            tracing::error!(code, error = %err, "instrument panicked");
            AnalysisResult::failed(code, err.to_string())
        }
    }
}

pub fn batch_compute(
    engine: &Engine,
    series: &BTreeMap<String, Series>,
    plan: &ExecutionPlan,
) -> BTreeMap<String, AnalysisResult> {
    tracing::info!(instruments = series.len(), "batch started");

    #[cfg(feature = "parallel")]
    let results: BTreeMap<String, AnalysisResult> = series
        .par_iter()
        .map(|(code, s)| (code.clone(), compute_one(engine, code, s, plan)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect();

    #[cfg(not(feature = "parallel"))]
    let results: BTreeMap<String, AnalysisResult> = series
        .iter()
        .map(|(code, s)| (code.clone(), compute_one(engine, code, s, plan)))
        .collect();

    let summary = BatchSummary::from_results(&results);
    tracing::info!(
        instruments = summary.instruments,
        failed = summary.failed_instruments,
        "batch finished"
    );
    results
}

/// Aggregate counts for the job layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub instruments: usize,
    pub failed_instruments: usize,
    pub units_succeeded: usize,
    pub units_skipped: usize,
    pub units_failed: usize,
    pub occurrences: usize,
    pub signals: usize,
}

impl BatchSummary {
    pub fn from_results(results: &BTreeMap<String, AnalysisResult>) -> Self {
        results.values().fold(Self::default(), |mut acc, r| {
            let c = r.diagnostics().counters();
            acc.instruments += 1;
            acc.failed_instruments += usize::from(r.is_failed());
            acc.units_succeeded += c.units_succeeded;
            acc.units_skipped += c.units_skipped;
            acc.units_failed += c.units_failed;
            acc.occurrences += r.occurrences().count();
            acc.signals += c.signals_synthesized;
            acc
        })
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} instruments ({} failed), units: {} ok / {} skipped / {} failed, {} occurrences, {} signals",
            self.instruments,
            self.failed_instruments,
            self.units_succeeded,
            self.units_skipped,
            self.units_failed,
            self.occurrences,
            self.signals
        )
    }
}
