use super::{ConformerChargeEngine, ToolkitError};
use crate::core::models::element::Element;
use crate::core::models::molecule::{Conformer, Molecule};
use cheq::{AtomView, QEqSolver, get_default_parameters};
use nalgebra::Point3;
use tracing::trace;

/// One atom of a conformer as seen by the `cheq` solver.
#[derive(Debug, Clone, Copy)]
struct ConformerAtom<'a> {
    element: Element,
    position: &'a Point3<f64>,
}

impl AtomView for ConformerAtom<'_> {
    #[inline]
    fn atomic_number(&self) -> u8 {
        self.element.atomic_number()
    }

    #[inline]
    fn position(&self) -> [f64; 3] {
        [self.position.x, self.position.y, self.position.z]
    }
}

/// Pairs a molecule's elements with the positions of one conformer.
struct ConformerAtoms<'a>(Vec<ConformerAtom<'a>>);

impl<'a> ConformerAtoms<'a> {
    fn new(molecule: &Molecule, conformer: &'a Conformer) -> Result<Self, ToolkitError> {
        if conformer.len() != molecule.n_atoms() {
            return Err(ToolkitError::ChargeCalculation(format!(
                "conformer has {} positions for {} atoms",
                conformer.len(),
                molecule.n_atoms()
            )));
        }
        Ok(Self(
            molecule
                .atoms()
                .iter()
                .zip(conformer)
                .map(|(atom, position)| ConformerAtom {
                    element: atom.element,
                    position,
                })
                .collect(),
        ))
    }
}

/// Charge-equilibration engine backed by the `cheq` solver with its default parameter set.
///
/// The solver is constrained to the molecule's total formal charge; a result whose charges
/// drift from that total by more than `charge_tolerance` is rejected.
#[derive(Debug, Clone, Copy)]
pub struct QeqEngine {
    pub charge_tolerance: f64,
}

impl Default for QeqEngine {
    fn default() -> Self {
        Self {
            charge_tolerance: 1e-3,
        }
    }
}

impl ConformerChargeEngine for QeqEngine {
    fn name(&self) -> &str {
        "qeq"
    }

    fn compute_charges(
        &self,
        molecule: &Molecule,
        conformer: &Conformer,
    ) -> Result<Vec<f64>, ToolkitError> {
        let atoms = ConformerAtoms::new(molecule, conformer)?;
        let total_charge = molecule.total_formal_charge() as f64;

        let solver = QEqSolver::new(get_default_parameters());
        let result = solver
            .solve(&atoms.0, total_charge)
            .map_err(|e| ToolkitError::ChargeCalculation(e.to_string()))?;
        let charges = result.charges;

        if charges.iter().any(|q| !q.is_finite()) {
            return Err(ToolkitError::ChargeCalculation(
                "charge equilibration produced non-finite charges".into(),
            ));
        }
        let sum: f64 = charges.iter().sum();
        if (sum - total_charge).abs() > self.charge_tolerance {
            return Err(ToolkitError::ChargeCalculation(format!(
                "charges sum to {sum:.6} instead of {total_charge}"
            )));
        }
        trace!(atoms = charges.len(), "QEq charges computed.");
        Ok(charges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::tests::water;

    #[test]
    fn water_oxygen_is_negative_and_charges_are_neutral() {
        let mol = water();
        let charges = QeqEngine::default()
            .compute_charges(&mol, &mol.conformers()[0])
            .unwrap();
        assert_eq!(charges.len(), 3);
        assert!(charges[0] < 0.0);
        assert!(charges[1] > 0.0);
        assert!((charges[1] - charges[2]).abs() < 1e-6);
        assert!(charges.iter().sum::<f64>().abs() < 1e-6);
    }

    #[test]
    fn charged_molecule_sums_to_formal_charge() {
        let mol = Molecule::from_smiles("[OH-]").unwrap();
        let conformer = vec![Point3::origin(), Point3::new(0.97, 0.0, 0.0)];
        let charges = QeqEngine::default().compute_charges(&mol, &conformer).unwrap();
        assert!((charges.iter().sum::<f64>() + 1.0).abs() < 1e-6);
        assert!(charges[0] < charges[1]);
    }

    #[test]
    fn atoms_view_carries_atomic_numbers_and_positions() {
        let mol = water();
        let conformer = &mol.conformers()[0];
        let atoms = ConformerAtoms::new(&mol, conformer).unwrap();
        assert_eq!(atoms.0[0].atomic_number(), 8);
        assert_eq!(atoms.0[1].atomic_number(), 1);
        let p = conformer[2];
        assert_eq!(atoms.0[2].position(), [p.x, p.y, p.z]);
    }

    #[test]
    fn conformer_of_wrong_length_is_a_calculation_error() {
        let mol = water();
        let result = QeqEngine::default().compute_charges(&mol, &vec![Point3::origin()]);
        assert!(matches!(result, Err(ToolkitError::ChargeCalculation(_))));
    }
}
