use super::RecordFilter;
use crate::core::chem::hbonds::{HydrogenBondCriteria, find_hydrogen_bonds};
use crate::core::models::record::Record;
use crate::engine::error::FilterError;
use serde_json::json;
use tracing::trace;

/// Drops records with an intramolecular hydrogen bond in any conformer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HydrogenBondFilter {
    pub criteria: HydrogenBondCriteria,
}

impl HydrogenBondFilter {
    pub fn new(criteria: HydrogenBondCriteria) -> Self {
        Self { criteria }
    }
}

impl RecordFilter for HydrogenBondFilter {
    fn name(&self) -> &'static str {
        "HydrogenBondFilter"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "method": "baker-hubbard",
            "max_distance": self.criteria.max_distance,
            "min_angle": self.criteria.min_angle,
            "min_bond_separation": self.criteria.min_bond_separation,
        })
    }

    fn keep(&self, record: &Record) -> Result<bool, FilterError> {
        for (index, conformer) in record.molecule.conformers().iter().enumerate() {
            if let Some(bond) = find_hydrogen_bonds(&record.molecule, conformer, &self.criteria).first() {
                trace!(
                    record = record.id,
                    conformer = index,
                    donor = bond.donor,
                    acceptor = bond.acceptor,
                    "Intramolecular hydrogen bond found."
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}
