use super::ModelError;
use super::molecule::Molecule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a computation in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Cancelled,
    Complete,
    Deleted,
    Error,
    Invalid,
    Running,
    Waiting,
}

#[derive(Debug, Error)]
#[error("Invalid record status '{0}'")]
pub struct ParseRecordStatusError(String);

impl FromStr for RecordStatus {
    type Err = ParseRecordStatusError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cancelled" => Ok(Self::Cancelled),
            "complete" => Ok(Self::Complete),
            "deleted" => Ok(Self::Deleted),
            "error" => Ok(Self::Error),
            "invalid" => Ok(Self::Invalid),
            "running" => Ok(Self::Running),
            "waiting" => Ok(Self::Waiting),
            _ => Err(ParseRecordStatusError(s.to_string())),
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cancelled => "cancelled",
            Self::Complete => "complete",
            Self::Deleted => "deleted",
            Self::Error => "error",
            Self::Invalid => "invalid",
            Self::Running => "running",
            Self::Waiting => "waiting",
        })
    }
}

/// Scan metadata of a torsion-drive record: the driven dihedrals and, parallel to the
/// molecule's conformers, the grid point each conformer was optimized at.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TorsionScan {
    pub dihedrals: Vec<[usize; 4]>,
    pub grid_ids: Vec<Vec<i32>>,
}

/// One computed trajectory (optimization or torsion drive) in the archive.
///
/// The molecule carries the final geometries as conformers: exactly one for an optimization,
/// one per grid point for a torsion drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub status: RecordStatus,
    pub molecule: Molecule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torsion_scan: Option<TorsionScan>,
}

impl Record {
    pub fn new(id: u64, status: RecordStatus, molecule: Molecule) -> Self {
        Self {
            id,
            status,
            molecule,
            torsion_scan: None,
        }
    }

    pub fn with_torsion_scan(mut self, scan: TorsionScan) -> Self {
        self.torsion_scan = Some(scan);
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        self.molecule.validate()?;
        if let Some(scan) = &self.torsion_scan {
            for dihedral in &scan.dihedrals {
                for &index in dihedral {
                    if index >= self.molecule.n_atoms() {
                        return Err(ModelError::AtomIndexOutOfRange {
                            index,
                            n_atoms: self.molecule.n_atoms(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::tests::water;

    #[test]
    fn status_parses_case_insensitively_and_displays_lowercase() {
        assert_eq!(
            "COMPLETE".parse::<RecordStatus>().unwrap(),
            RecordStatus::Complete
        );
        assert_eq!(
            "error".parse::<RecordStatus>().unwrap(),
            RecordStatus::Error
        );
        assert!("done".parse::<RecordStatus>().is_err());
        assert_eq!(RecordStatus::Waiting.to_string(), "waiting");
    }

    #[test]
    fn status_serializes_as_lowercase_string() {
        let json = serde_json::to_string(&RecordStatus::Complete).unwrap();
        assert_eq!(json, "\"complete\"");
    }

    #[test]
    fn validate_rejects_dihedral_outside_molecule() {
        let record = Record::new(1, RecordStatus::Complete, water()).with_torsion_scan(
            TorsionScan {
                dihedrals: vec![[0, 1, 2, 7]],
                grid_ids: vec![],
            },
        );
        assert!(matches!(
            record.validate(),
            Err(ModelError::AtomIndexOutOfRange { index: 7, .. })
        ));
    }

    #[test]
    fn optimization_record_omits_scan_in_json() {
        let record = Record::new(5, RecordStatus::Complete, water());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("torsion_scan").is_none());
        assert_eq!(json["status"], "complete");
    }
}
