//! Core domain types and logic. Nothing in here performs I/O.

pub mod ohlcv;
pub mod series;
pub mod params;
pub mod capability;
pub mod output;
pub mod labels;
pub mod unit;
pub mod units;
pub mod indicator;
pub mod rule;
pub mod rule_parser;
pub mod rule_eval;
pub mod registry;
pub mod plan;
pub mod plan_config;
pub mod diagnostics;
pub mod result;
pub mod engine;
pub mod synthesis;
pub mod batch;
pub mod flatten;
pub mod error;
