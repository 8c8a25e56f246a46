use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{FetchConfig, FilterAppConfig};
use crate::cli::{FetchArgs, FilterArgs};
use crate::error::{CliError, Result};
use qcurate::core::models::element::Element;
use qcurate::engine::config::FilterConfigBuilder;

pub fn build_fetch_config(args: &FetchArgs) -> Result<FetchConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::load_optional(args.config.as_deref())?;
    let retrieve = file_config.retrieve.unwrap_or_default();

    let datasets = if args.datasets.is_empty() {
        retrieve.datasets
    } else {
        args.datasets.clone()
    };
    if datasets.is_empty() {
        return Err(CliError::Config(
            "At least one dataset is required, via --dataset or 'retrieve.datasets'.".to_string(),
        ));
    }

    Ok(FetchConfig {
        kind: args.kind,
        address: args
            .address
            .clone()
            .or(retrieve.address)
            .unwrap_or(defaults.address),
        spec_name: args
            .spec_name
            .clone()
            .or(retrieve.spec_name)
            .unwrap_or(defaults.spec_name),
        datasets,
        output_path: args.output.clone(),
    })
}

pub fn build_filter_config(args: &FilterArgs) -> Result<FilterAppConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::load_optional(args.config.as_deref())?;
    let filter = file_config.filter.unwrap_or_default();
    let charges = file_config.charges.unwrap_or_default();

    let include_iodine = args.include_iodine
        || filter.include_iodine.unwrap_or(defaults.include_iodine);
    let max_conformers = args
        .max_conformers
        .or(filter.max_conformers)
        .unwrap_or(defaults.max_conformers);
    let tolerance = args
        .tolerance
        .or(filter.tolerance)
        .unwrap_or(defaults.tolerance);
    let rmsd_tolerance = args
        .rmsd_tolerance
        .or(filter.rmsd_tolerance)
        .unwrap_or(defaults.rmsd_tolerance);
    let charge_method = args
        .charge_method
        .clone()
        .or(charges.method)
        .unwrap_or(defaults.charge_method);

    let mut builder = FilterConfigBuilder::new()
        .denylist(filter.denylist)
        .denylist(args.deny.iter().copied())
        .include_iodine(include_iodine)
        .max_conformers(max_conformers)
        .tolerance(tolerance)
        .rmsd_tolerance(rmsd_tolerance)
        .charge_method(charge_method);
    if let Some(names) = &filter.elements {
        let elements = names
            .iter()
            .map(|name| name.parse::<Element>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        builder = builder.base_elements(elements);
    }
    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(FilterAppConfig {
        kind: args.kind,
        input_path: args.input.clone(),
        output_path: args.output.clone(),
        report_path: args.report.clone(),
        reject_hydrogen_bonds: args.reject_hydrogen_bonds,
        core_config,
    })
}
