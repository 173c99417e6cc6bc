//! Execution plans.
//!
//! A plan selects which capabilities run and how: allow/deny lists,
//! category flags, a priority ceiling, per-unit parameter overrides, the
//! minimum occurrence strength, the lookback window and whether pattern
//! signals are synthesized. Plans are immutable; the presets are `const`
//! values and custom plans go through [`ExecutionPlanBuilder`], which
//! checks everything against a [`Registry`] up front.

use crate::domain::capability::{CapabilityMetadata, Category, Priority};
use crate::domain::error::{PlanError, UnitError};
use crate::domain::params::Params;
use crate::domain::registry::Registry;
use crate::domain::unit::Unit;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Set of categories a plan includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategorySet(u8);

impl CategorySet {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u8::MAX);

    const fn bit(category: Category) -> u8 {
        1 << (category as u8)
    }

    pub const fn with(self, category: Category) -> Self {
        Self(self.0 | Self::bit(category))
    }

    pub const fn without(self, category: Category) -> Self {
        Self(self.0 & !Self::bit(category))
    }

    pub const fn contains(self, category: Category) -> bool {
        self.0 & Self::bit(category) != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Category> {
        Category::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    allow: BTreeSet<String>,
    deny: BTreeSet<String>,
    categories: CategorySet,
    max_priority: Priority,
    /// Keyed by unit name.
    overrides: BTreeMap<String, Params>,
    min_strength: f64,
    lookback: usize,
    synthesize_signals: bool,
}

impl ExecutionPlan {
    /// Everything, with signal synthesis.
    pub const FULL: Self = Self {
        allow: BTreeSet::new(),
        deny: BTreeSet::new(),
        categories: CategorySet::ALL,
        max_priority: Priority::P2,
        overrides: BTreeMap::new(),
        min_strength: 50.0,
        lookback: 5,
        synthesize_signals: true,
    };

    /// Urgent indicators only; no pattern work.
    pub const QUICK: Self = Self {
        allow: BTreeSet::new(),
        deny: BTreeSet::new(),
        categories: CategorySet::NONE
            .with(Category::Trend)
            .with(Category::Momentum)
            .with(Category::Volatility)
            .with(Category::Volume),
        max_priority: Priority::P1,
        overrides: BTreeMap::new(),
        min_strength: 60.0,
        lookback: 1,
        synthesize_signals: false,
    };

    /// Pattern and signal scan over the last few bars.
    pub const SCAN: Self = Self {
        allow: BTreeSet::new(),
        deny: BTreeSet::new(),
        categories: CategorySet::NONE
            .with(Category::Kline)
            .with(Category::Chart)
            .with(Category::Signal),
        max_priority: Priority::P2,
        overrides: BTreeMap::new(),
        min_strength: 60.0,
        lookback: 3,
        synthesize_signals: true,
    };

    pub fn is_denied(&self, id: &str) -> bool {
        self.deny.contains(id)
    }

    /// Deny wins; a non-empty allow-list must name the id.
    pub fn should_run(&self, id: &str) -> bool {
        if self.is_denied(id) {
            return false;
        }
        self.allow.is_empty() || self.allow.contains(id)
    }

    pub fn includes(&self, category: Category) -> bool {
        self.categories.contains(category)
    }

    /// Whether any included category reads the trend context.
    pub fn needs_trend_context(&self) -> bool {
        self.categories.iter().any(Category::is_trend_dependent)
    }

    /// Category, priority ceiling and allow/deny lists together.
    pub fn capability_enabled(&self, meta: &CapabilityMetadata) -> bool {
        self.includes(meta.category) && meta.priority <= self.max_priority && self.should_run(&meta.id)
    }

    /// The unit's defaults overlaid with this plan's overrides.
    pub fn params_for(&self, unit: &dyn Unit) -> Params {
        match self.overrides.get(unit.name()) {
            Some(overrides) => unit.default_params().merged(overrides),
            None => unit.default_params().clone(),
        }
    }

    pub fn categories(&self) -> CategorySet {
        self.categories
    }

    pub fn max_priority(&self) -> Priority {
        self.max_priority
    }

    pub fn min_strength(&self) -> f64 {
        self.min_strength
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn synthesize_signals(&self) -> bool {
        self.synthesize_signals
    }

    pub fn allow_list(&self) -> &BTreeSet<String> {
        &self.allow
    }

    pub fn deny_list(&self) -> &BTreeSet<String> {
        &self.deny
    }

    pub fn overrides(&self) -> &BTreeMap<String, Params> {
        &self.overrides
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Full,
    Quick,
    Scan,
}

impl Preset {
    pub fn plan(self) -> ExecutionPlan {
        match self {
            Preset::Full => ExecutionPlan::FULL,
            Preset::Quick => ExecutionPlan::QUICK,
            Preset::Scan => ExecutionPlan::SCAN,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Full => write!(f, "full"),
            Preset::Quick => write!(f, "quick"),
            Preset::Scan => write!(f, "scan"),
        }
    }
}

impl FromStr for Preset {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(Preset::Full),
            "quick" => Ok(Preset::Quick),
            "scan" => Ok(Preset::Scan),
            _ => Err(PlanError::UnknownPreset {
                name: s.to_string(),
            }),
        }
    }
}

/// Mutable staging area for an [`ExecutionPlan`].
///
/// Ids and unit names are stored as given; `build` resolves and checks them.
#[derive(Debug, Clone)]
pub struct ExecutionPlanBuilder {
    plan: ExecutionPlan,
    overrides: Vec<(String, String, f64)>,
}

impl ExecutionPlanBuilder {
    pub fn new(preset: Preset) -> Self {
        Self::from_plan(preset.plan())
    }

    pub fn from_plan(plan: ExecutionPlan) -> Self {
        Self {
            plan,
            overrides: Vec::new(),
        }
    }

    pub fn allow(mut self, id: impl Into<String>) -> Self {
        self.plan.allow.insert(id.into());
        self
    }

    pub fn deny(mut self, id: impl Into<String>) -> Self {
        self.plan.deny.insert(id.into());
        self
    }

    /// Replace the category flags.
    pub fn categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.plan.categories = categories.into_iter().collect();
        self
    }

    pub fn include(mut self, category: Category, included: bool) -> Self {
        self.plan.categories = if included {
            self.plan.categories.with(category)
        } else {
            self.plan.categories.without(category)
        };
        self
    }

    pub fn max_priority(mut self, priority: Priority) -> Self {
        self.plan.max_priority = priority;
        self
    }

    pub fn min_strength(mut self, value: f64) -> Self {
        self.plan.min_strength = value;
        self
    }

    pub fn lookback(mut self, bars: usize) -> Self {
        self.plan.lookback = bars;
        self
    }

    pub fn synthesize_signals(mut self, enabled: bool) -> Self {
        self.plan.synthesize_signals = enabled;
        self
    }

    /// `target` is a unit name or any capability id of the unit.
    pub fn override_param(mut self, target: impl Into<String>, key: impl Into<String>, value: f64) -> Self {
        self.overrides.push((target.into(), key.into(), value));
        self
    }

    pub fn build(self, registry: &Registry) -> Result<ExecutionPlan, PlanError> {
        let Self { mut plan, overrides } = self;

        if !plan.min_strength.is_finite() || !(0.0..=100.0).contains(&plan.min_strength) {
            return Err(PlanError::InvalidThreshold {
                value: plan.min_strength,
            });
        }
        if plan.lookback == 0 {
            return Err(PlanError::InvalidLookback);
        }

        plan.allow = expand_ids(registry, &plan.allow)?;
        plan.deny = expand_ids(registry, &plan.deny)?;

        let mut resolved: BTreeMap<String, Params> = plan.overrides;
        for (target, key, value) in overrides {
            let unit = registry
                .unit(&target)
                .or_else(|| registry.unit_for_capability(&target))
                .ok_or_else(|| PlanError::UnknownCapability { id: target.clone() })?;
            let name = unit.name().to_string();
            if !unit.default_params().contains(&key) {
                return Err(PlanError::UnknownParameter { unit: name, key });
            }
            if !value.is_finite() {
                return Err(PlanError::InvalidParameter {
                    unit: name,
                    source: UnitError::InvalidParameter {
                        name: key,
                        reason: format!("{value} is not finite"),
                    },
                });
            }
            resolved.entry(name).or_default().insert(key, value);
        }
        for (name, params) in &resolved {
            let unit = registry
                .unit(name)
                .ok_or_else(|| PlanError::UnknownCapability { id: name.clone() })?;
            unit.validate_params(&unit.default_params().merged(params))
                .map_err(|source| PlanError::InvalidParameter {
                    unit: name.clone(),
                    source,
                })?;
        }
        plan.overrides = resolved;

        tracing::debug!(
            allow = plan.allow.len(),
            deny = plan.deny.len(),
            overrides = plan.overrides.len(),
            max_priority = %plan.max_priority,
            "built execution plan"
        );
        Ok(plan)
    }
}

/// Capability ids stay as they are; unit names expand to every capability
/// id of that unit.
fn expand_ids(registry: &Registry, ids: &BTreeSet<String>) -> Result<BTreeSet<String>, PlanError> {
    let mut out = BTreeSet::new();
    for id in ids {
        if registry.metadata(id).is_some() {
            out.insert(id.clone());
        } else if registry.unit(id).is_some() {
            out.extend(registry.capabilities_of(id).into_iter().map(|m| m.id.clone()));
        } else {
            return Err(PlanError::UnknownCapability { id: id.clone() });
        }
    }
    Ok(out)
}
