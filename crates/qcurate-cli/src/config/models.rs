use qcurate::core::models::collection::CollectionKind;
use qcurate::engine::config::FilterConfig;
use std::path::PathBuf;

pub struct FetchConfig {
    pub kind: CollectionKind,
    pub address: String,
    pub spec_name: String,
    pub datasets: Vec<String>,
    pub output_path: PathBuf,
}

pub struct FilterAppConfig {
    pub kind: CollectionKind,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub report_path: Option<PathBuf>,
    pub reject_hydrogen_bonds: bool,
    pub core_config: FilterConfig,
}
