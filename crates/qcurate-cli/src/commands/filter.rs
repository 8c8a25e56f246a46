use crate::cli::FilterArgs;
use crate::config::builder::build_filter_config;
use crate::config::models::FilterAppConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use qcurate::core::charges::elf::Elf10ChargeAssigner;
use qcurate::core::charges::qeq::QeqEngine;
use qcurate::core::io::cache::{load_collection, save_collection};
use qcurate::core::models::collection::{CollectionKind, ResultCollection};
use qcurate::engine::filters::{FilterStage, HydrogenBondFilter};
use qcurate::engine::pipeline::FilterPipeline;
use qcurate::engine::progress::ProgressReporter;
use qcurate::engine::report::FilterReport;
use qcurate::workflows;
use tracing::info;

pub async fn run(args: FilterArgs) -> Result<()> {
    let config = build_filter_config(&args)?;

    info!("Loading collection from {:?}", &config.input_path);
    let dataset = load_collection(&config.input_path)?;
    println!(
        "Loaded {} results for {} molecules.",
        dataset.n_results(),
        dataset.n_molecules()
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Curating {} dataset...", config.kind);
    let (filtered, report) =
        tokio::task::block_in_place(|| curate(&dataset, &config, &reporter))?;

    info!("Writing curated collection to {:?}", &config.output_path);
    save_collection(&filtered, &config.output_path)?;

    if let Some(path) = &config.report_path {
        info!("Writing filter report to {:?}", path);
        report.save_csv(path)?;
    }

    println!(
        "✓ Kept {} of {} results ({} removed). Written to: {}",
        filtered.n_results(),
        dataset.n_results(),
        report.n_dropped(),
        config.output_path.display()
    );
    for stage in &report.stages {
        println!("  {:<28} {:>6} dropped", stage.name, stage.dropped.len());
    }
    Ok(())
}

fn curate(
    dataset: &ResultCollection,
    config: &FilterAppConfig,
    reporter: &ProgressReporter,
) -> Result<(ResultCollection, FilterReport)> {
    let (mut filtered, mut report) = match config.kind {
        CollectionKind::Optimization => {
            workflows::curate::filter_optimization_dataset(dataset, &config.core_config, reporter)?
        }
        CollectionKind::TorsionDrive => {
            let assigner = Elf10ChargeAssigner::<QeqEngine>::default();
            workflows::curate::filter_torsiondrive_dataset(
                dataset,
                &config.core_config,
                &assigner,
                reporter,
            )?
        }
    };

    if config.reject_hydrogen_bonds {
        let stages = FilterPipeline::new()
            .with_stage(FilterStage::record(HydrogenBondFilter::default()))
            .apply(&mut filtered, reporter)?;
        report.stages.extend(stages);
    }
    Ok((filtered, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcurate::engine::config::FilterConfig;
    use std::path::PathBuf;

    fn app_config(kind: CollectionKind, reject_hydrogen_bonds: bool) -> FilterAppConfig {
        FilterAppConfig {
            kind,
            input_path: PathBuf::from("in.json"),
            output_path: PathBuf::from("out.json"),
            report_path: None,
            reject_hydrogen_bonds,
            core_config: FilterConfig::default(),
        }
    }

    #[test]
    fn hydrogen_bond_stage_is_appended_on_request() {
        let dataset = ResultCollection::new(CollectionKind::Optimization);
        let reporter = ProgressReporter::new();

        let (_, plain) =
            curate(&dataset, &app_config(CollectionKind::Optimization, false), &reporter).unwrap();
        assert!(plain.stage("HydrogenBondFilter").is_none());

        let (filtered, extended) =
            curate(&dataset, &app_config(CollectionKind::Optimization, true), &reporter).unwrap();
        assert_eq!(
            extended.stages.last().map(|s| s.name.as_str()),
            Some("HydrogenBondFilter")
        );
        assert_eq!(
            filtered.provenance.last().map(|p| p.name.as_str()),
            Some("HydrogenBondFilter")
        );
    }

    #[test]
    fn kind_mismatch_is_reported_as_an_engine_error() {
        let dataset = ResultCollection::new(CollectionKind::Optimization);
        let result = curate(
            &dataset,
            &app_config(CollectionKind::TorsionDrive, false),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(crate::error::CliError::Engine(_))));
    }
}
