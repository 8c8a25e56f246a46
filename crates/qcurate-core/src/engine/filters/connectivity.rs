use super::RecordFilter;
use crate::core::chem::connectivity::is_connectivity_consistent;
use crate::core::models::record::Record;
use crate::engine::error::FilterError;
use serde_json::json;

/// Drops records in which any conformer's geometry implies a different bond graph than the
/// molecule declares.
#[derive(Debug, Clone, Copy)]
pub struct ConnectivityFilter {
    pub tolerance: f64,
}

impl ConnectivityFilter {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl RecordFilter for ConnectivityFilter {
    fn name(&self) -> &'static str {
        "ConnectivityFilter"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "tolerance": self.tolerance })
    }

    fn keep(&self, record: &Record) -> Result<bool, FilterError> {
        Ok(is_connectivity_consistent(&record.molecule, self.tolerance))
    }
}
