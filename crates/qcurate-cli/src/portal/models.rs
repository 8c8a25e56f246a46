use qcurate::core::models::record::RecordStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Entry attribute holding the mapped, explicit-hydrogen SMILES of the molecule.
pub const CMILES_ATTRIBUTE: &str = "canonical_isomeric_explicit_hydrogen_mapped_smiles";
/// Entry attributes that may hold the molecule's InChIKey, in order of preference.
pub const INCHI_KEY_ATTRIBUTES: [&str; 2] = ["fixed_hydrogen_inchi_key", "inchi_key"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetInfo {
    pub id: u64,
    pub dataset_type: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetEntry {
    pub name: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl DatasetEntry {
    pub fn cmiles(&self) -> Option<&str> {
        self.attributes.get(CMILES_ATTRIBUTE).and_then(Value::as_str)
    }

    pub fn inchi_key(&self) -> Option<&str> {
        INCHI_KEY_ATTRIBUTES
            .iter()
            .find_map(|key| self.attributes.get(*key).and_then(Value::as_str))
    }
}

/// The record attached to one dataset entry under one specification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetRecordItem {
    pub entry_name: String,
    pub specification_name: String,
    pub record_id: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OptimizationRecordData {
    pub id: u64,
    pub status: RecordStatus,
    #[serde(default)]
    pub initial_molecule_id: Option<u64>,
    #[serde(default)]
    pub final_molecule_id: Option<u64>,
}

impl OptimizationRecordData {
    /// The optimized geometry if the optimization finished, the starting one otherwise.
    pub fn geometry_molecule_id(&self) -> Option<u64> {
        self.final_molecule_id.or(self.initial_molecule_id)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TorsionDriveKeywords {
    #[serde(default)]
    pub dihedrals: Vec<[usize; 4]>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TorsionDriveSpecification {
    #[serde(default)]
    pub keywords: TorsionDriveKeywords,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TorsionDriveRecordData {
    pub id: u64,
    pub status: RecordStatus,
    #[serde(default)]
    pub specification: TorsionDriveSpecification,
}

/// A molecule in QCSchema layout: symbols plus a flat geometry in bohr.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PortalMolecule {
    pub id: u64,
    pub symbols: Vec<String>,
    pub geometry: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct DatasetQueryBody<'a> {
    pub dataset_type: &'a str,
    pub dataset_name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct EntriesFetchBody<'a> {
    pub names: &'a [String],
    pub missing_ok: bool,
}

#[derive(Debug, Serialize)]
pub struct DatasetRecordsFetchBody<'a> {
    pub entry_names: &'a [String],
    pub specification_names: [&'a str; 1],
}

#[derive(Debug, Serialize)]
pub struct IdsFetchBody<'a> {
    pub ids: &'a [u64],
    pub missing_ok: bool,
}
