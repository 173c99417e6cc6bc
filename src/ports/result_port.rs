//! Result sink port trait.

use crate::domain::error::QuantscanError;
use crate::domain::flatten::{FlatRecord, flatten};
use crate::domain::result::AnalysisResult;

pub trait ResultPort {
    fn write_records(&mut self, records: &[FlatRecord]) -> Result<(), QuantscanError>;

    /// Default implementation: flattens each result and writes the records.
    fn write_results<'a>(
        &mut self,
        results: impl IntoIterator<Item = &'a AnalysisResult>,
    ) -> Result<usize, QuantscanError>
    where
        Self: Sized,
    {
        let records: Vec<FlatRecord> = results.into_iter().flat_map(flatten).collect();
        self.write_records(&records)?;
        Ok(records.len())
    }
}
