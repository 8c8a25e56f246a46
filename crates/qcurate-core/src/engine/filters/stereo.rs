use super::RecordFilter;
use crate::core::chem::perception::{StereoDescriptor, find_stereo_elements};
use crate::core::models::record::Record;
use crate::engine::error::FilterError;
use serde_json::json;

/// Drops records whose stereochemistry cannot be read back from at least one conformer.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnperceivableStereoFilter;

impl RecordFilter for UnperceivableStereoFilter {
    fn name(&self) -> &'static str {
        "UnperceivableStereoFilter"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({})
    }

    fn keep(&self, record: &Record) -> Result<bool, FilterError> {
        let elements = find_stereo_elements(&record.molecule);
        Ok(record.molecule.conformers().iter().all(|conformer| {
            elements
                .iter()
                .all(|element| element.descriptor(conformer) != StereoDescriptor::Ambiguous)
        }))
    }
}
