use super::RecordFilter;
use crate::core::charges::ChargeAssigner;
use crate::core::models::record::Record;
use crate::engine::error::FilterError;
use serde_json::json;
use tracing::debug;

/// Drops records whose molecule cannot be given partial charges.
///
/// Only charge-calculation and conformer-generation failures count as a drop. Every other
/// toolkit error is returned and stops the pipeline.
pub struct ChargeCheckFilter<'a> {
    assigner: &'a dyn ChargeAssigner,
    method: String,
}

impl<'a> ChargeCheckFilter<'a> {
    pub fn new(assigner: &'a dyn ChargeAssigner, method: impl Into<String>) -> Self {
        Self {
            assigner,
            method: method.into(),
        }
    }
}

impl RecordFilter for ChargeCheckFilter<'_> {
    fn name(&self) -> &'static str {
        "ChargeCheckFilter"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "charge_method": self.method })
    }

    fn keep(&self, record: &Record) -> Result<bool, FilterError> {
        match self
            .assigner
            .assign_partial_charges(&record.molecule, &self.method)
        {
            Ok(_) => Ok(true),
            Err(error) if error.is_charge_failure() => {
                debug!(record = record.id, %error, "Dropping record that failed charge assignment.");
                Ok(false)
            }
            Err(source) => Err(FilterError::ChargeAssignment {
                record_id: record.id,
                source,
            }),
        }
    }
}
