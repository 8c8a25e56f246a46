use qcurate::core::forcefield::params::ForceFieldError;
use qcurate::core::io::cache::CacheError;
use qcurate::core::models::ModelError;
use qcurate::engine::error::EngineError;
use qcurate::engine::report::ReportError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Dataset cache error: {0}")]
    Cache(#[from] CacheError),

    #[error(transparent)]
    ForceField(#[from] ForceFieldError),

    #[error("Invalid molecule: {0}")]
    Model(#[from] ModelError),

    #[error("Failed to write filter report: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
