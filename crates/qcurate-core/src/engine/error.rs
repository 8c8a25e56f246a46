use thiserror::Error;

use super::config::ConfigError;
use crate::core::charges::ToolkitError;
use crate::core::models::ModelError;
use crate::core::models::collection::CollectionKind;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Entry references record {0}, which is missing from the record store")]
    MissingRecord(u64),

    #[error("Charge assignment for record {record_id} failed: {source}")]
    ChargeAssignment {
        record_id: u64,
        #[source]
        source: ToolkitError,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid filter configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Invalid result collection: {source}")]
    InvalidCollection {
        #[from]
        source: ModelError,
    },

    #[error("Expected a {expected} but got a {found}")]
    CollectionKind {
        expected: CollectionKind,
        found: CollectionKind,
    },

    #[error("Filter '{name}' failed: {source}")]
    Filter {
        name: &'static str,
        #[source]
        source: FilterError,
    },
}
