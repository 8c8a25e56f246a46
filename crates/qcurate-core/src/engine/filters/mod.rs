//! Predicates that decide which entries of a collection survive curation.
//!
//! Record filters judge one [`Record`] at a time and are evaluated in parallel when the
//! `parallel` feature is enabled. Collection filters see every entry at once.

pub mod charge_check;
pub mod connectivity;
pub mod conformer_rmsd;
pub mod element;
pub mod hbond;
pub mod status;
pub mod stereo;

pub use charge_check::ChargeCheckFilter;
pub use connectivity::ConnectivityFilter;
pub use conformer_rmsd::ConformerRmsdFilter;
pub use element::ElementFilter;
pub use hbond::HydrogenBondFilter;
pub use status::RecordStatusFilter;
pub use stereo::UnperceivableStereoFilter;

use super::error::FilterError;
use super::progress::{Progress, ProgressReporter};
use crate::core::models::collection::ResultCollection;
use crate::core::models::record::Record;
use std::collections::BTreeSet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A keep/drop decision about a single record.
pub trait RecordFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// The settings this filter runs with, as recorded in the collection provenance.
    fn parameters(&self) -> serde_json::Value;

    fn keep(&self, record: &Record) -> Result<bool, FilterError>;
}

/// A filter that needs the whole collection to decide which records to drop.
pub trait CollectionFilter: Send + Sync {
    fn name(&self) -> &'static str;

    fn parameters(&self) -> serde_json::Value;

    /// Ids of the records to remove.
    fn rejected(&self, collection: &ResultCollection) -> Result<BTreeSet<u64>, FilterError>;
}

/// One step of a curation pipeline.
pub enum FilterStage<'a> {
    Record(Box<dyn RecordFilter + 'a>),
    Collection(Box<dyn CollectionFilter + 'a>),
}

impl<'a> FilterStage<'a> {
    pub fn record(filter: impl RecordFilter + 'a) -> Self {
        Self::Record(Box::new(filter))
    }

    pub fn collection(filter: impl CollectionFilter + 'a) -> Self {
        Self::Collection(Box::new(filter))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Record(filter) => filter.name(),
            Self::Collection(filter) => filter.name(),
        }
    }

    pub fn parameters(&self) -> serde_json::Value {
        match self {
            Self::Record(filter) => filter.parameters(),
            Self::Collection(filter) => filter.parameters(),
        }
    }

    pub fn rejected(
        &self,
        collection: &ResultCollection,
        reporter: &ProgressReporter,
    ) -> Result<BTreeSet<u64>, FilterError> {
        match self {
            Self::Record(filter) => reject_records(filter.as_ref(), collection, reporter),
            Self::Collection(filter) => filter.rejected(collection),
        }
    }
}

/// Evaluates a record filter on every record the collection's entries reference.
pub fn reject_records<F: RecordFilter + ?Sized>(
    filter: &F,
    collection: &ResultCollection,
    reporter: &ProgressReporter,
) -> Result<BTreeSet<u64>, FilterError> {
    let ids: Vec<u64> = collection.record_ids().into_iter().collect();

    let judge = |&id: &u64| -> Result<Option<u64>, FilterError> {
        let record = collection.record(id).ok_or(FilterError::MissingRecord(id))?;
        let keep = filter.keep(record)?;
        reporter.report(Progress::RecordEvaluated);
        Ok((!keep).then_some(id))
    };

    #[cfg(feature = "parallel")]
    let verdicts: Result<Vec<Option<u64>>, FilterError> = ids.par_iter().map(judge).collect();
    #[cfg(not(feature = "parallel"))]
    let verdicts: Result<Vec<Option<u64>>, FilterError> = ids.iter().map(judge).collect();

    Ok(verdicts?.into_iter().flatten().collect())
}
