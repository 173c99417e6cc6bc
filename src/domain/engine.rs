//! Single-instrument computation engine.
//!
//! Runs the units a plan selects against one series:
//! 1. validate the series
//! 2. bootstrap the trend context when trend-dependent categories run
//! 3. run every eligible unit in registration order, isolating failures
//! 4. drop weak or stale occurrences
//! 5. optionally synthesize signals from the surviving patterns
//!
//! A failing or panicking unit becomes one diagnostics error; it never
//! stops the remaining units.

use crate::domain::capability::Category;
use crate::domain::error::{EngineError, UnitError};
use crate::domain::output::{Context, OutputValue, TrendContext, UnitOutput};
use crate::domain::params::Params;
use crate::domain::plan::ExecutionPlan;
use crate::domain::registry::Registry;
use crate::domain::result::AnalysisResult;
use crate::domain::series::Series;
use crate::domain::synthesis::{self, PATTERN_SIGNAL};
use crate::domain::unit::Unit;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

/// Unit name under which synthesized values are stored.
pub const SYNTHESIS_UNIT: &str = "synthesis";

/// What happened to one unit in one compute call.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Succeeded(UnitOutput),
    Skipped { required: usize, available: usize },
    Failed(UnitError),
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run one unit with the insufficient-data check and panic isolation.
pub fn run_unit(unit: &dyn Unit, series: &Series, params: &Params, ctx: &Context) -> UnitOutcome {
    let guarded = catch_unwind(AssertUnwindSafe(|| {
        let required = unit.min_data_points(params);
        if series.len() < required {
            return UnitOutcome::Skipped {
                required,
                available: series.len(),
            };
        }
        match unit.compute(series, params, ctx) {
            Ok(output) => UnitOutcome::Succeeded(output),
            Err(err) => UnitOutcome::Failed(err),
        }
    }));
    guarded.unwrap_or_else(|payload| {
        UnitOutcome::Failed(UnitError::Panicked {
            reason: panic_message(payload.as_ref()),
        })
    })
}

#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<Registry>,
}

impl Engine {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// A unit is eligible when its category is included and at least one of
    /// its capabilities passes the plan.
    fn eligible(&self, unit: &dyn Unit, plan: &ExecutionPlan) -> bool {
        plan.includes(unit.category())
            && self
                .registry
                .capabilities_of(unit.name())
                .into_iter()
                .any(|m| plan.capability_enabled(m))
    }

    fn fully_denied(&self, unit: &dyn Unit, plan: &ExecutionPlan) -> bool {
        self.registry
            .capabilities_of(unit.name())
            .into_iter()
            .all(|m| plan.is_denied(&m.id))
    }

    /// Record an outcome; returns the output to merge when it succeeded.
    /// Uncounted runs (a classifier consulted only for context) leave no
    /// diagnostics entries.
    fn record(
        result: &mut AnalysisResult,
        unit: &dyn Unit,
        outcome: UnitOutcome,
        counted: bool,
    ) -> Option<UnitOutput> {
        let name = unit.name();
        if !counted {
            return match outcome {
                UnitOutcome::Succeeded(output) => Some(output),
                UnitOutcome::Skipped { required, available } => {
                    tracing::debug!(unit = name, required, available, "context classifier skipped");
                    None
                }
                UnitOutcome::Failed(err) => {
                    tracing::debug!(unit = name, error = %err, "context classifier failed");
                    None
                }
            };
        }
        let diagnostics = result.diagnostics_mut();
        diagnostics.counters_mut().units_checked += 1;
        match outcome {
            UnitOutcome::Succeeded(output) => {
                tracing::debug!(
                    unit = name,
                    values = output.values.len(),
                    occurrences = output.occurrences.len(),
                    "unit succeeded"
                );
                diagnostics.counters_mut().units_succeeded += 1;
                Some(output)
            }
            UnitOutcome::Skipped {
                required,
                available,
            } => {
                tracing::warn!(unit = name, required, available, "insufficient data, skipped");
                diagnostics.warn(
                    Some(name),
                    format!("insufficient data: need {required} bars, have {available}"),
                );
                diagnostics.counters_mut().units_skipped += 1;
                None
            }
            UnitOutcome::Failed(err) => {
                tracing::error!(unit = name, error = %err, "unit failed");
                diagnostics.error(Some(name), err.to_string());
                diagnostics.counters_mut().units_failed += 1;
                None
            }
        }
    }

    /// Merge a unit's output, dropping occurrences of disabled capabilities.
    fn merge(&self, result: &mut AnalysisResult, unit: &dyn Unit, plan: &ExecutionPlan, mut output: UnitOutput) {
        let before = output.occurrences.len();
        output.occurrences.retain(|o| match self.registry.metadata(&o.pattern_id) {
            Some(meta) => plan.capability_enabled(meta),
            None => true,
        });
        let counters = result.diagnostics_mut().counters_mut();
        counters.occurrences_detected += before;
        counters.occurrences_filtered += before - output.occurrences.len();
        result.merge(unit.category(), unit.name(), output);
    }

    /// Run trend classifiers until one yields a context. Eligible classifiers
    /// are merged and reported in `done`.
    fn bootstrap_trend(
        &self,
        series: &Series,
        plan: &ExecutionPlan,
        result: &mut AnalysisResult,
        done: &mut Vec<usize>,
    ) -> Option<TrendContext> {
        let ctx = Context::new(plan.lookback());
        for (i, unit) in self.registry.all().iter().enumerate() {
            let unit = unit.as_ref();
            if !unit.provides_trend_context() || self.fully_denied(unit, plan) {
                continue;
            }
            let eligible = self.eligible(unit, plan);
            let params = plan.params_for(unit);
            let outcome = run_unit(unit, series, &params, &ctx);
            let output = Self::record(result, unit, outcome, eligible);
            if eligible {
                done.push(i);
            }
            let Some(output) = output else {
                continue;
            };
            let trend = output.trend.clone();
            if eligible {
                self.merge(result, unit, plan, output);
            }
            if let Some(trend) = trend {
                tracing::debug!(unit = unit.name(), direction = ?trend.direction, "trend context");
                return Some(trend);
            }
        }
        None
    }

    pub fn compute(&self, series: &Series, plan: &ExecutionPlan) -> Result<AnalysisResult, EngineError> {
        let started = Instant::now();
        series.validate()?;
        let mut result = AnalysisResult::new(series.code.clone(), series.last_date());
        result.diagnostics_mut().set_series_length(series.len());

        let mut done = Vec::new();
        let mut ctx = Context::new(plan.lookback());
        if plan.needs_trend_context() {
            match self.bootstrap_trend(series, plan, &mut result, &mut done) {
                Some(trend) => {
                    result.set_trend(trend.clone());
                    ctx = ctx.with_trend(trend);
                }
                None => result
                    .diagnostics_mut()
                    .info(None, "no trend context; detectors fall back to local slope"),
            }
        }

        for (i, unit) in self.registry.all().iter().enumerate() {
            let unit = unit.as_ref();
            if done.contains(&i) || !self.eligible(unit, plan) {
                continue;
            }
            let params = plan.params_for(unit);
            let outcome = run_unit(unit, series, &params, &ctx);
            if let Some(output) = Self::record(&mut result, unit, outcome, true) {
                self.merge(&mut result, unit, plan, output);
            }
        }

        let scan_start = ctx.scan_start(series.len());
        let min_strength = plan.min_strength();
        let filtered =
            result.retain_occurrences(|o| o.strength >= min_strength && o.index >= scan_start);
        result.diagnostics_mut().counters_mut().occurrences_filtered += filtered;

        if plan.synthesize_signals() && plan.includes(Category::Signal) {
            let signals = synthesis::synthesize(result.occurrences());
            let label = synthesis::pattern_label(&signals);
            result.diagnostics_mut().counters_mut().signals_synthesized += signals.len();
            let bucket = result.bucket_mut(Category::Signal);
            bucket
                .values
                .entry(SYNTHESIS_UNIT.to_string())
                .or_default()
                .insert(PATTERN_SIGNAL.to_string(), OutputValue::Label(label));
            bucket.occurrences.extend(signals);
        }

        let elapsed = started.elapsed();
        result.diagnostics_mut().set_elapsed(elapsed);
        let counters = *result.diagnostics().counters();
        tracing::info!(
            code = %series.code,
            bars = series.len(),
            succeeded = counters.units_succeeded,
            skipped = counters.units_skipped,
            failed = counters.units_failed,
            occurrences = counters.occurrences_detected - counters.occurrences_filtered,
            signals = counters.signals_synthesized,
            elapsed_ms = elapsed.as_millis() as u64,
            "instrument computed"
        );
        Ok(result)
    }
}
