use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileRetrieveConfig {
    pub address: Option<String>,
    pub spec_name: Option<String>,
    #[serde(default)]
    pub datasets: Vec<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileFilterConfig {
    pub include_iodine: Option<bool>,
    pub max_conformers: Option<usize>,
    pub tolerance: Option<f64>,
    pub rmsd_tolerance: Option<f64>,
    #[serde(default)]
    pub denylist: Vec<u64>,
    /// Symbols or atomic numbers replacing the built-in element allow-list.
    pub elements: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileChargesConfig {
    pub method: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub retrieve: Option<FileRetrieveConfig>,
    pub filter: Option<FileFilterConfig>,
    pub charges: Option<FileChargesConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Reads `path` if given, otherwise returns an empty configuration.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }
}
