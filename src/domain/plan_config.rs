//! Plan configuration.
//!
//! Checks raw INI values before anything is built, registers configured
//! factor rules, and turns the `[plan]` and `[params.<unit>]` sections into
//! an [`ExecutionPlan`].

use crate::domain::capability::{Category, Priority};
use crate::domain::error::QuantscanError;
use crate::domain::plan::{ExecutionPlan, ExecutionPlanBuilder, Preset};
use crate::domain::registry::Registry;
use crate::domain::units::rules::FactorRule;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

const PARAMS_PREFIX: &str = "params.";
const RULE_PREFIX: &str = "rule.";

/// Split a comma-separated list, dropping blanks.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> QuantscanError {
    QuantscanError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn non_blank(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, QuantscanError> {
    non_blank(config, section, key)
        .map(|raw| {
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid(section, key, format!("'{raw}' is not a number")))
        })
        .transpose()
}

fn date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, QuantscanError> {
    non_blank(config, "data", key)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| invalid("data", key, "invalid date format (expected YYYY-MM-DD)"))
        })
        .transpose()
}

/// The optional `[data] start_date` / `end_date` window.
pub fn date_range(
    config: &dyn ConfigPort,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), QuantscanError> {
    let start = date(config, "start_date")?;
    let end = date(config, "end_date")?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(invalid("data", "start_date", "start_date must not be after end_date"));
        }
    }
    Ok((start, end))
}

fn preset(config: &dyn ConfigPort) -> Result<Preset, QuantscanError> {
    match non_blank(config, "plan", "preset") {
        Some(name) => Ok(name.parse::<Preset>()?),
        None => Ok(Preset::Full),
    }
}

/// Check every raw value that does not need the registry.
pub fn validate_plan_config(config: &dyn ConfigPort) -> Result<(), QuantscanError> {
    preset(config)?;
    if let Some(raw) = non_blank(config, "plan", "max_priority") {
        raw.parse::<Priority>()?;
    }
    if let Some(raw) = non_blank(config, "plan", "categories") {
        for name in parse_list(&raw) {
            name.parse::<Category>()?;
        }
    }
    if let Some(v) = number(config, "plan", "min_strength")? {
        if !(0.0..=100.0).contains(&v) {
            return Err(invalid("plan", "min_strength", "min_strength must be between 0 and 100"));
        }
    }
    if let Some(raw) = non_blank(config, "plan", "lookback") {
        match raw.parse::<usize>() {
            Ok(n) if n > 0 => {}
            _ => return Err(invalid("plan", "lookback", "lookback must be a positive integer")),
        }
    }
    if let Some(raw) = non_blank(config, "plan", "synthesize_signals") {
        if !matches!(raw.to_lowercase().as_str(), "true" | "false" | "yes" | "no" | "1" | "0") {
            return Err(invalid("plan", "synthesize_signals", "expected true or false"));
        }
    }
    date_range(config)?;

    for section in config.sections() {
        if section.starts_with(PARAMS_PREFIX) {
            for (key, _) in config.section_entries(&section) {
                number(config, &section, &key)?;
            }
        } else if section.starts_with(RULE_PREFIX) {
            for key in ["entry", "exit"] {
                if non_blank(config, &section, key).is_none() {
                    return Err(QuantscanError::ConfigMissing {
                        section: section.clone(),
                        key: key.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Parse every `[rule.<name>]` section and register it as a factor rule.
/// Returns the number of rules registered.
pub fn register_rules(
    config: &dyn ConfigPort,
    registry: &mut Registry,
) -> Result<usize, QuantscanError> {
    let mut count = 0;
    for section in config.sections() {
        let Some(name) = section.strip_prefix(RULE_PREFIX) else {
            continue;
        };
        let entry = non_blank(config, &section, "entry").ok_or_else(|| {
            QuantscanError::ConfigMissing {
                section: section.clone(),
                key: "entry".into(),
            }
        })?;
        let exit = non_blank(config, &section, "exit").ok_or_else(|| {
            QuantscanError::ConfigMissing {
                section: section.clone(),
                key: "exit".into(),
            }
        })?;
        let rule = FactorRule::parse(name, &entry, &exit)?;
        registry.register(Box::new(rule))?;
        tracing::debug!(rule = name, "registered factor rule");
        count += 1;
    }
    Ok(count)
}

/// Build the plan from `[plan]` and `[params.<unit>]`. `preset` replaces the
/// configured preset when given.
pub fn build_plan(
    config: &dyn ConfigPort,
    registry: &Registry,
    preset_override: Option<Preset>,
) -> Result<ExecutionPlan, QuantscanError> {
    let preset = match preset_override {
        Some(p) => p,
        None => preset(config)?,
    };
    let mut builder = ExecutionPlanBuilder::new(preset);

    if let Some(raw) = non_blank(config, "plan", "allow") {
        builder = parse_list(&raw).into_iter().fold(builder, |b, id| b.allow(id));
    }
    if let Some(raw) = non_blank(config, "plan", "deny") {
        builder = parse_list(&raw).into_iter().fold(builder, |b, id| b.deny(id));
    }
    if let Some(raw) = non_blank(config, "plan", "categories") {
        let categories = parse_list(&raw)
            .iter()
            .map(|name| name.parse::<Category>())
            .collect::<Result<Vec<_>, _>>()?;
        builder = builder.categories(categories);
    }
    if let Some(raw) = non_blank(config, "plan", "max_priority") {
        builder = builder.max_priority(raw.parse::<Priority>()?);
    }
    if let Some(v) = number(config, "plan", "min_strength")? {
        builder = builder.min_strength(v);
    }
    if non_blank(config, "plan", "lookback").is_some() {
        let bars = config.get_int("plan", "lookback", 0);
        builder = builder.lookback(usize::try_from(bars).unwrap_or(0));
    }
    if non_blank(config, "plan", "synthesize_signals").is_some() {
        builder = builder.synthesize_signals(config.get_bool("plan", "synthesize_signals", true));
    }

    for section in config.sections() {
        let Some(unit) = section.strip_prefix(PARAMS_PREFIX) else {
            continue;
        };
        for (key, _) in config.section_entries(&section) {
            if let Some(value) = number(config, &section, &key)? {
                builder = builder.override_param(unit, key, value);
            }
        }
    }

    Ok(builder.build(registry)?)
}
