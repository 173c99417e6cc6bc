//! The shared contract every calculation unit implements.

use crate::domain::capability::{Category, CapabilityMetadata, UnitKind};
use crate::domain::error::UnitError;
use crate::domain::output::{Context, UnitOutput};
use crate::domain::params::Params;
use crate::domain::series::Series;

/// A stateless computation over one series.
///
/// Implementations must be pure: same series, parameters and context give the
/// same output. When the series is shorter than `min_data_points` a unit
/// returns [`UnitOutput::empty`] instead of an error.
pub trait Unit: Send + Sync {
    /// Registry key. Unique across the registry.
    fn name(&self) -> &str;

    fn kind(&self) -> UnitKind;

    /// Primary capability; also supplies the category, priority and default
    /// parameters used by the engine.
    fn metadata(&self) -> &CapabilityMetadata;

    /// Every capability id this unit answers for. Pattern detectors that
    /// emit several named patterns override this.
    fn capabilities(&self) -> Vec<CapabilityMetadata> {
        vec![self.metadata().clone()]
    }

    fn category(&self) -> Category {
        self.metadata().category
    }

    fn default_params(&self) -> &Params {
        &self.metadata().default_params
    }

    /// Bars required with the given effective parameters.
    fn min_data_points(&self, _params: &Params) -> usize {
        self.metadata().min_data_points
    }

    /// Reject parameter combinations the unit cannot work with.
    fn validate_params(&self, _params: &Params) -> Result<(), UnitError> {
        Ok(())
    }

    /// Trend classifiers run before every other unit and their output
    /// becomes the shared [`Context`].
    fn provides_trend_context(&self) -> bool {
        false
    }

    fn compute(
        &self,
        series: &Series,
        params: &Params,
        ctx: &Context,
    ) -> Result<UnitOutput, UnitError>;
}
