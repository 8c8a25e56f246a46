use crate::core::models::collection::CollectionKind;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Stage name used for records removed by the denylist.
pub const DENYLIST_STAGE: &str = "denylist";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// The outcome of one filter stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub name: String,
    pub records_in: usize,
    pub records_out: usize,
    pub dropped: Vec<u64>,
}

/// What a curation run removed, and where.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterReport {
    pub kind: CollectionKind,
    pub denylisted: Vec<u64>,
    pub stages: Vec<StageReport>,
}

#[derive(Serialize)]
struct Row<'a> {
    record_id: u64,
    stage: &'a str,
}

impl FilterReport {
    pub fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            denylisted: Vec::new(),
            stages: Vec::new(),
        }
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Number of records removed by the denylist and every stage together.
    pub fn n_dropped(&self) -> usize {
        self.denylisted.len() + self.stages.iter().map(|s| s.dropped.len()).sum::<usize>()
    }

    /// Writes one `record_id,stage` row per removed record, denylisted ones first.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv = csv::Writer::from_writer(writer);
        for &record_id in &self.denylisted {
            csv.serialize(Row {
                record_id,
                stage: DENYLIST_STAGE,
            })?;
        }
        for stage in &self.stages {
            for &record_id in &stage.dropped {
                csv.serialize(Row {
                    record_id,
                    stage: &stage.name,
                })?;
            }
        }
        csv.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: &Path) -> Result<(), ReportError> {
        self.write_csv(File::create(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> FilterReport {
        FilterReport {
            kind: CollectionKind::Optimization,
            denylisted: vec![4],
            stages: vec![
                StageReport {
                    name: "RecordStatusFilter".into(),
                    records_in: 5,
                    records_out: 3,
                    dropped: vec![1, 2],
                },
                StageReport {
                    name: "ElementFilter".into(),
                    records_in: 3,
                    records_out: 3,
                    dropped: vec![],
                },
            ],
        }
    }

    #[test]
    fn csv_lists_every_dropped_record_with_its_stage() {
        let mut buffer = Vec::new();
        report().write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "record_id,stage\n4,denylist\n1,RecordStatusFilter\n2,RecordStatusFilter\n"
        );
    }

    #[test]
    fn empty_report_writes_nothing() {
        let mut buffer = Vec::new();
        FilterReport::new(CollectionKind::TorsionDrive)
            .write_csv(&mut buffer)
            .unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn counts_and_lookup() {
        let report = report();
        assert_eq!(report.n_dropped(), 3);
        assert_eq!(report.stage("ElementFilter").unwrap().records_out, 3);
        assert!(report.stage("ConnectivityFilter").is_none());
    }
}
