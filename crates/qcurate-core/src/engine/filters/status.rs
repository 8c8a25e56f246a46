use super::RecordFilter;
use crate::core::models::record::{Record, RecordStatus};
use crate::engine::error::FilterError;
use serde_json::json;

/// Keeps records whose status is one of the given statuses.
#[derive(Debug, Clone)]
pub struct RecordStatusFilter {
    statuses: Vec<RecordStatus>,
}

impl RecordStatusFilter {
    pub fn new(statuses: impl IntoIterator<Item = RecordStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }

    pub fn complete() -> Self {
        Self::new([RecordStatus::Complete])
    }
}

impl RecordFilter for RecordStatusFilter {
    fn name(&self) -> &'static str {
        "RecordStatusFilter"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "status": self.statuses })
    }

    fn keep(&self, record: &Record) -> Result<bool, FilterError> {
        Ok(self.statuses.contains(&record.status))
    }
}
