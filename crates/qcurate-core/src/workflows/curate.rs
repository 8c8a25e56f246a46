use crate::core::charges::ChargeAssigner;
use crate::core::models::collection::{CollectionKind, ResultCollection};
use crate::engine::config::FilterConfig;
use crate::engine::error::EngineError;
use crate::engine::filters::{
    ChargeCheckFilter, ConformerRmsdFilter, ConnectivityFilter, ElementFilter, FilterStage,
    RecordStatusFilter, UnperceivableStereoFilter,
};
use crate::engine::pipeline::FilterPipeline;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::report::FilterReport;
use tracing::{info, instrument};

/// Curates an optimization dataset.
///
/// After denylist removal the records must be complete, connectivity-consistent, free of
/// unperceivable stereochemistry, built from allowed elements, and geometrically distinct
/// from the other retained conformers of the same molecule.
#[instrument(skip_all, name = "filter_optimization_dataset")]
pub fn filter_optimization_dataset(
    dataset: &ResultCollection,
    config: &FilterConfig,
    reporter: &ProgressReporter,
) -> Result<(ResultCollection, FilterReport), EngineError> {
    let pipeline = FilterPipeline::new()
        .with_stage(FilterStage::record(RecordStatusFilter::complete()))
        .with_stage(FilterStage::record(ConnectivityFilter::new(config.tolerance)))
        .with_stage(FilterStage::record(UnperceivableStereoFilter))
        .with_stage(FilterStage::record(ElementFilter::new(config.allowed_elements())))
        .with_stage(FilterStage::collection(ConformerRmsdFilter::new(
            config.max_conformers,
            config.rmsd_tolerance,
        )));
    curate(dataset, CollectionKind::Optimization, &pipeline, config, reporter)
}

/// Curates a torsion-drive dataset.
///
/// After denylist removal the records must be complete, connectivity-consistent, and
/// chargeable with `config.charge_method` by `assigner`. `config.include_iodine` has no
/// effect here.
#[instrument(skip_all, name = "filter_torsiondrive_dataset")]
pub fn filter_torsiondrive_dataset(
    dataset: &ResultCollection,
    config: &FilterConfig,
    assigner: &dyn ChargeAssigner,
    reporter: &ProgressReporter,
) -> Result<(ResultCollection, FilterReport), EngineError> {
    let pipeline = FilterPipeline::new()
        .with_stage(FilterStage::record(RecordStatusFilter::complete()))
        .with_stage(FilterStage::record(ConnectivityFilter::new(config.tolerance)))
        .with_stage(FilterStage::record(ChargeCheckFilter::new(
            assigner,
            config.charge_method.as_str(),
        )));
    curate(dataset, CollectionKind::TorsionDrive, &pipeline, config, reporter)
}

fn curate(
    dataset: &ResultCollection,
    expected: CollectionKind,
    pipeline: &FilterPipeline,
    config: &FilterConfig,
    reporter: &ProgressReporter,
) -> Result<(ResultCollection, FilterReport), EngineError> {
    config.validate()?;
    if dataset.kind != expected {
        return Err(EngineError::CollectionKind {
            expected,
            found: dataset.kind,
        });
    }
    dataset.validate()?;

    info!(
        entries = dataset.n_results(),
        molecules = dataset.n_molecules(),
        stages = pipeline.stage_names().len(),
        "Starting curation."
    );
    reporter.report(Progress::Message(format!(
        "Filtering {} {} entries",
        dataset.n_results(),
        expected.entry_type()
    )));

    let mut curated = dataset.clone();
    let report = pipeline.run(&mut curated, &config.denylist, reporter)?;

    info!(
        entries = curated.n_results(),
        molecules = curated.n_molecules(),
        dropped = report.n_dropped(),
        "Curation finished."
    );
    Ok((curated, report))
}
