//! End-to-end engine tests through the public API.
//!
//! Tests cover:
//! - Preset plans over realistic series
//! - Occurrence filtering by strength and lookback
//! - Batch isolation with a mock series port
//! - Factor rules registered next to the built-in units
//! - Flattening for persistence

mod common;

use common::*;
use quantscan::domain::batch::{BatchSummary, batch_compute};
use quantscan::domain::capability::Category;
use quantscan::domain::engine::{Engine, SYNTHESIS_UNIT};
use quantscan::domain::flatten::flatten;
use quantscan::domain::output::{OutputValue, SignalLabel};
use quantscan::domain::plan::{ExecutionPlan, ExecutionPlanBuilder, Preset};
use quantscan::domain::registry::Registry;
use quantscan::domain::series::{MARGIN_BALANCE, Series};
use quantscan::domain::synthesis::PATTERN_SIGNAL;
use quantscan::domain::units::rules::FactorRule;
use quantscan::ports::series_port::SeriesPort;
use std::collections::BTreeMap;
use std::sync::Arc;

fn engine() -> Engine {
    Engine::new(Arc::new(Registry::with_default_units().unwrap()))
}

fn wavy_uptrend(code: &str, n: usize) -> Series {
    let closes: Vec<f64> = trending(n, 50.0, 0.15)
        .iter()
        .zip(wave(n, 0.0, 3.0, 17.0))
        .map(|(t, w)| t + w)
        .collect();
    make_series(code, &closes)
}

mod presets {
    use super::*;

    #[test]
    fn full_plan_counts_add_up() {
        let engine = engine();
        let series = wavy_uptrend("600000", 200);
        let result = engine.compute(&series, &ExecutionPlan::FULL).unwrap();

        assert!(!result.is_failed());
        assert_eq!(result.code(), "600000");
        assert_eq!(result.computation_date(), series.last_date());

        let c = result.diagnostics().counters();
        assert_eq!(c.units_failed, 0);
        assert_eq!(
            c.units_checked,
            c.units_succeeded + c.units_skipped + c.units_failed
        );
        assert_eq!(c.units_checked, engine.registry().len());
        assert_eq!(result.diagnostics().series_length(), 200);
    }

    #[test]
    fn full_plan_fills_indicator_buckets() {
        let result = engine()
            .compute(&wavy_uptrend("A", 200), &ExecutionPlan::FULL)
            .unwrap();

        assert!(result.trend().is_some());
        for (category, unit, key) in [
            (Category::Trend, "ma", "ma_short"),
            (Category::Trend, "macd", "macd"),
            (Category::Momentum, "rsi", "rsi"),
            (Category::Volatility, "bollinger", "upper"),
            (Category::Volume, "obv", "obv"),
        ] {
            assert!(
                result
                    .value(category, unit, key)
                    .and_then(OutputValue::as_number)
                    .is_some(),
                "missing {unit}.{key}"
            );
        }
        assert!(
            result
                .value(Category::Signal, SYNTHESIS_UNIT, PATTERN_SIGNAL)
                .and_then(OutputValue::as_label)
                .is_some()
        );
    }

    #[test]
    fn occurrences_respect_strength_and_lookback() {
        let series = wavy_uptrend("A", 200);
        let plan = ExecutionPlan::FULL;
        let result = engine().compute(&series, &plan).unwrap();

        let scan_start = series.len() - plan.lookback();
        for occ in result.occurrences() {
            assert!(occ.strength >= plan.min_strength(), "{occ:?}");
            assert!(occ.strength <= 100.0, "{occ:?}");
            assert!(occ.index >= scan_start, "{occ:?}");
        }
    }

    #[test]
    fn quick_plan_skips_patterns() {
        let result = engine()
            .compute(&wavy_uptrend("A", 200), &ExecutionPlan::QUICK)
            .unwrap();

        for category in [Category::Kline, Category::Chart, Category::Signal, Category::Margin] {
            assert!(result.bucket(category).is_none(), "{category}");
        }
        assert!(result.bucket(Category::Momentum).is_some());
        assert_eq!(result.diagnostics().counters().signals_synthesized, 0);
    }

    #[test]
    fn scan_plan_uses_trend_context_without_trend_bucket() {
        let result = engine()
            .compute(&wavy_uptrend("A", 200), &ExecutionPlan::SCAN)
            .unwrap();

        assert!(result.trend().is_some());
        assert!(result.bucket(Category::Trend).is_none());
        assert!(result.bucket(Category::Momentum).is_none());
    }

    #[test]
    fn short_series_skips_without_errors() {
        let result = engine()
            .compute(&make_series("S", &trending(8, 10.0, 0.1)), &ExecutionPlan::FULL)
            .unwrap();

        assert!(!result.is_failed());
        assert_eq!(result.diagnostics().error_count(), 0);
        assert!(result.diagnostics().counters().units_skipped > 0);
        assert!(result.diagnostics().warning_count() > 0);
    }

    #[test]
    fn results_are_deterministic() {
        let engine = engine();
        let series = wavy_uptrend("A", 150);
        let a = engine.compute(&series, &ExecutionPlan::FULL).unwrap();
        let b = engine.compute(&series, &ExecutionPlan::FULL).unwrap();

        assert!(a.buckets().eq(b.buckets()));
        assert_eq!(a.trend(), b.trend());
    }

    #[test]
    fn margin_field_reaches_margin_unit() {
        let n = 60;
        let series = wavy_uptrend("M", n)
            .with_extra(MARGIN_BALANCE, trending(n, 1_000.0, 10.0))
            .unwrap();
        let result = engine().compute(&series, &ExecutionPlan::FULL).unwrap();

        assert!(
            result
                .value(Category::Margin, "margin_trend", "margin_balance")
                .is_some()
        );
    }
}

mod plans {
    use super::*;

    #[test]
    fn allow_list_limits_units() {
        let engine = engine();
        let plan = ExecutionPlanBuilder::new(Preset::Full)
            .allow("rsi")
            .synthesize_signals(false)
            .build(engine.registry())
            .unwrap();
        let result = engine.compute(&wavy_uptrend("A", 120), &plan).unwrap();

        let units: Vec<&String> = result
            .buckets()
            .flat_map(|(_, b)| b.values.keys())
            .collect();
        assert_eq!(units, vec!["rsi"]);
        assert_eq!(result.diagnostics().counters().units_checked, 1);
    }

    #[test]
    fn overrides_change_outputs() {
        let engine = engine();
        let series = wavy_uptrend("A", 120);
        let plan = ExecutionPlanBuilder::new(Preset::Quick)
            .allow("rsi")
            .override_param("rsi", "period", 6.0)
            .build(engine.registry())
            .unwrap();

        let default_rsi = engine
            .compute(&series, &ExecutionPlanBuilder::new(Preset::Quick).allow("rsi").build(engine.registry()).unwrap())
            .unwrap()
            .value(Category::Momentum, "rsi", "rsi")
            .and_then(OutputValue::as_number)
            .unwrap();
        let short_rsi = engine
            .compute(&series, &plan)
            .unwrap()
            .value(Category::Momentum, "rsi", "rsi")
            .and_then(OutputValue::as_number)
            .unwrap();
        assert!((default_rsi - short_rsi).abs() > 1e-9);
    }
}

mod batch {
    use super::*;

    #[test]
    fn batch_from_series_port_isolates_failures() {
        let port = MockSeriesPort::new()
            .with_series(wavy_uptrend("A", 120))
            .with_series(make_series("B", &wave(120, 30.0, 2.0, 11.0)))
            .with_error("C", "connection refused");

        let mut series = BTreeMap::new();
        for code in ["A", "B", "C"] {
            if let Ok(s) = port.fetch_series(code, None, None) {
                series.insert(code.to_string(), s);
            }
        }
        let mut bad = wavy_uptrend("D", 50);
        bad.close.pop();
        series.insert("D".to_string(), bad);

        let results = batch_compute(&engine(), &series, &ExecutionPlan::FULL);
        assert_eq!(results.len(), 3);
        assert!(!results["A"].is_failed());
        assert!(!results["B"].is_failed());
        assert!(results["D"].is_failed());

        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.instruments, 3);
        assert_eq!(summary.failed_instruments, 1);
        assert!(summary.units_succeeded > 0);
        assert!(summary.to_string().contains("3 instruments (1 failed)"));
    }

    #[test]
    fn flattened_batch_has_one_record_per_bucket() {
        let mut series = BTreeMap::new();
        series.insert("A".to_string(), wavy_uptrend("A", 120));
        let results = batch_compute(&engine(), &series, &ExecutionPlan::QUICK);

        let records = flatten(&results["A"]);
        let buckets = results["A"].buckets().filter(|(_, b)| !b.is_empty()).count();
        assert_eq!(records.len(), buckets);
        assert!(records.iter().all(|r| r.code == "A" && r.error.is_none()));
        let momentum = records
            .iter()
            .find(|r| r.category == Some(Category::Momentum))
            .unwrap();
        assert!(momentum.columns.rsi.is_some());
    }
}

mod factor_rules {
    use super::*;

    #[test]
    fn registered_rule_runs_with_builtins() {
        let mut registry = Registry::with_default_units().unwrap();
        let rule = FactorRule::parse("above_zero", "ABOVE(close, 0)", "BELOW(close, 0)").unwrap();
        registry.register(Box::new(rule)).unwrap();
        let engine = Engine::new(Arc::new(registry));

        let plan = ExecutionPlanBuilder::new(Preset::Full)
            .allow("rule.above_zero")
            .synthesize_signals(false)
            .build(engine.registry())
            .unwrap();
        let result = engine.compute(&wavy_uptrend("A", 60), &plan).unwrap();

        assert_eq!(
            result.value(Category::Signal, "rule.above_zero", "signal"),
            Some(&OutputValue::Label(SignalLabel::Buy))
        );
    }

    #[test]
    fn duplicate_rule_rejected() {
        let mut registry = Registry::with_default_units().unwrap();
        let first = FactorRule::parse("x", "ABOVE(close, 1)", "BELOW(close, 1)").unwrap();
        let second = FactorRule::parse("x", "ABOVE(close, 2)", "BELOW(close, 2)").unwrap();
        registry.register(Box::new(first)).unwrap();
        assert!(registry.register(Box::new(second)).is_err());
    }
}
