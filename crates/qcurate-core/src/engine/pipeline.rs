use super::error::EngineError;
use super::filters::FilterStage;
use super::progress::{Progress, ProgressReporter};
use super::report::{DENYLIST_STAGE, FilterReport, StageReport};
use crate::core::models::collection::{AppliedFilter, ResultCollection};
use serde_json::json;
use std::collections::HashSet;
use tracing::{debug, info};

/// An ordered list of filter stages applied as a logical conjunction.
#[derive(Default)]
pub struct FilterPipeline<'a> {
    stages: Vec<FilterStage<'a>>,
}

impl<'a> FilterPipeline<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: FilterStage<'a>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn push(&mut self, stage: FilterStage<'a>) {
        self.stages.push(stage);
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(FilterStage::name).collect()
    }

    /// Removes denylisted entries of the first dataset key, then runs every stage in order.
    ///
    /// Each stage sees only what the stages before it kept. The collection is modified in
    /// place; stage provenance is appended to it as the stages run.
    pub fn run(
        &self,
        collection: &mut ResultCollection,
        denylist: &HashSet<u64>,
        reporter: &ProgressReporter,
    ) -> Result<FilterReport, EngineError> {
        let mut report = FilterReport::new(collection.kind);

        report.denylisted = collection.remove_denylisted(denylist);
        let mut denied: Vec<u64> = denylist.iter().copied().collect();
        denied.sort_unstable();
        collection.provenance.push(AppliedFilter {
            name: DENYLIST_STAGE.to_string(),
            parameters: json!({ "record_ids": denied }),
        });
        if !report.denylisted.is_empty() {
            info!(removed = report.denylisted.len(), "Removed denylisted records.");
        }

        report.stages = self.apply(collection, reporter)?;
        Ok(report)
    }

    /// Runs every stage in order without touching the denylist.
    pub fn apply(
        &self,
        collection: &mut ResultCollection,
        reporter: &ProgressReporter,
    ) -> Result<Vec<StageReport>, EngineError> {
        let mut stages = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let name = stage.name();
            let records_in = collection.record_ids().len();
            reporter.report(Progress::StageStart {
                name,
                total_records: records_in as u64,
            });

            let rejected = stage
                .rejected(collection, reporter)
                .map_err(|source| EngineError::Filter { name, source })?;
            for id in &rejected {
                debug!(filter = name, record = id, "Dropped record.");
            }
            collection.remove_records(&rejected);
            collection.provenance.push(AppliedFilter {
                name: name.to_string(),
                parameters: stage.parameters(),
            });

            let records_out = collection.record_ids().len();
            info!(
                filter = name,
                kept = records_out,
                dropped = rejected.len(),
                "Applied filter."
            );
            reporter.report(Progress::StageFinish {
                kept: records_out as u64,
                dropped: rejected.len() as u64,
            });
            stages.push(StageReport {
                name: name.to_string(),
                records_in,
                records_out,
                dropped: rejected.into_iter().collect(),
            });
        }
        Ok(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::tests::water;
    use crate::core::models::record::RecordStatus;
    use crate::engine::filters::tests::{KEY, collection_of};
    use crate::engine::filters::{ElementFilter, RecordStatusFilter};
    use crate::core::models::element::Element;

    #[test]
    fn stages_run_in_order_and_are_recorded() {
        let mut collection = collection_of(vec![
            (1, RecordStatus::Complete, water()),
            (2, RecordStatus::Error, water()),
            (3, RecordStatus::Complete, water()),
        ]);
        let pipeline = FilterPipeline::new()
            .with_stage(FilterStage::record(RecordStatusFilter::complete()))
            .with_stage(FilterStage::record(ElementFilter::new([Element::C])));
        assert_eq!(pipeline.stage_names(), vec!["RecordStatusFilter", "ElementFilter"]);

        let report = pipeline
            .run(&mut collection, &HashSet::from([3]), &ProgressReporter::new())
            .unwrap();

        assert_eq!(report.denylisted, vec![3]);
        assert_eq!(report.stages[0].records_in, 2);
        assert_eq!(report.stages[0].dropped, vec![2]);
        assert_eq!(report.stages[1].dropped, vec![1]);
        assert_eq!(collection.n_results(), 0);
        assert_eq!(collection.records().count(), 0);
        assert!(collection.entries.get(KEY).unwrap().is_empty());

        let names: Vec<_> = collection.provenance.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["denylist", "RecordStatusFilter", "ElementFilter"]);
    }

    #[test]
    fn stage_events_are_reported() {
        use std::sync::Mutex;

        let mut collection = collection_of(vec![
            (1, RecordStatus::Complete, water()),
            (2, RecordStatus::Running, water()),
        ]);
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::StageFinish { kept, dropped } = event {
                events.lock().unwrap().push((kept, dropped));
            }
        }));
        FilterPipeline::new()
            .with_stage(FilterStage::record(RecordStatusFilter::complete()))
            .run(&mut collection, &HashSet::new(), &reporter)
            .unwrap();
        drop(reporter);
        assert_eq!(events.into_inner().unwrap(), vec![(1, 1)]);
    }

    #[test]
    fn apply_skips_the_denylist() {
        let mut collection = collection_of(vec![
            (1, RecordStatus::Complete, water()),
            (2, RecordStatus::Error, water()),
        ]);
        let stages = FilterPipeline::new()
            .with_stage(FilterStage::record(RecordStatusFilter::complete()))
            .apply(&mut collection, &ProgressReporter::new())
            .unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].dropped, vec![2]);
        let names: Vec<_> = collection.provenance.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["RecordStatusFilter"]);
    }
}
