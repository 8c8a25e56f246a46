use super::qeq::QeqEngine;
use super::{ChargeAssigner, ChargeMethod, ConformerChargeEngine, ToolkitError};
use crate::core::models::molecule::{Conformer, Molecule};
use crate::core::utils::geometry::kabsch_rmsd;
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// Tunables of electrostatically-least-interacting-functional-group (ELF) conformer
/// selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElfSettings {
    /// Conformers with any atom pair closer than this (Å) are discarded before charging.
    pub min_interatomic_distance: f64,
    /// Share of lowest-energy conformers (in percent) kept as the selection pool.
    pub percentage: f64,
    /// Maximum number of conformers whose charges are averaged.
    pub limit: usize,
    /// Minimum Kabsch RMSD (Å) between two selected conformers.
    pub rmsd_cutoff: f64,
    /// Atom pairs at most this many bonds apart do not contribute to the ELF energy.
    pub excluded_separation: usize,
}

impl Default for ElfSettings {
    fn default() -> Self {
        Self {
            min_interatomic_distance: 0.5,
            percentage: 2.0,
            limit: 10,
            rmsd_cutoff: 0.05,
            excluded_separation: 3,
        }
    }
}

/// The crate's [`ChargeAssigner`]: ELF10 conformer selection over a pluggable
/// per-conformer engine.
#[derive(Debug, Clone, Default)]
pub struct Elf10ChargeAssigner<E = QeqEngine> {
    engine: E,
    settings: ElfSettings,
}

impl<E: ConformerChargeEngine> Elf10ChargeAssigner<E> {
    pub fn new(engine: E, settings: ElfSettings) -> Self {
        Self { engine, settings }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn settings(&self) -> &ElfSettings {
        &self.settings
    }

    fn usable_conformers<'a>(&self, molecule: &'a Molecule) -> Vec<&'a Conformer> {
        let cutoff = self.settings.min_interatomic_distance.powi(2);
        molecule
            .conformers()
            .iter()
            .filter(|conformer| {
                conformer.iter().enumerate().all(|(i, a)| {
                    conformer[i + 1..]
                        .iter()
                        .all(|b| (a - b).norm_squared() >= cutoff)
                })
            })
            .collect()
    }

    fn elf_energy(&self, charges: &[f64], conformer: &Conformer, separation: &[Vec<Option<usize>>]) -> f64 {
        let mut energy = 0.0;
        for i in 0..charges.len() {
            for j in (i + 1)..charges.len() {
                let far = separation[i][j].is_none_or(|d| d > self.settings.excluded_separation);
                if far {
                    let r = (conformer[i] - conformer[j]).norm();
                    energy += charges[i].abs() * charges[j].abs() / r;
                }
            }
        }
        energy
    }

    #[instrument(skip_all, name = "elf10_charges")]
    fn elf10(&self, molecule: &Molecule) -> Result<Vec<f64>, ToolkitError> {
        let conformers = self.usable_conformers(molecule);
        if conformers.is_empty() {
            return Err(ToolkitError::ConformerGeneration(format!(
                "none of the {} conformers is free of atom clashes",
                molecule.n_conformers()
            )));
        }

        let separation = molecule.topological_distances();
        let mut scored = Vec::with_capacity(conformers.len());
        for conformer in conformers {
            let charges = self.engine.compute_charges(molecule, conformer)?;
            let energy = self.elf_energy(&charges, conformer, &separation);
            scored.push((energy, conformer, charges));
        }
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let pool_size = ((scored.len() as f64 * self.settings.percentage / 100.0).ceil() as usize)
            .clamp(1, scored.len());
        let mut selected: Vec<(&Conformer, &Vec<f64>)> = Vec::new();
        for (_, conformer, charges) in &scored[..pool_size] {
            if selected.len() >= self.settings.limit {
                break;
            }
            let distinct = selected.iter().all(|(kept, _)| {
                kabsch_rmsd(kept, conformer).is_none_or(|rmsd| rmsd >= self.settings.rmsd_cutoff)
            });
            if distinct {
                selected.push((*conformer, charges));
            }
        }

        debug!(
            usable = scored.len(),
            pool = pool_size,
            selected = selected.len(),
            "ELF10 conformer selection finished."
        );

        if selected.is_empty() {
            return Err(ToolkitError::ChargeCalculation(
                "ELF selection limit is zero".into(),
            ));
        }
        let mut averaged = vec![0.0; molecule.n_atoms()];
        for (_, charges) in &selected {
            for (total, q) in averaged.iter_mut().zip(charges.iter()) {
                *total += q;
            }
        }
        let count = selected.len() as f64;
        averaged.iter_mut().for_each(|q| *q /= count);
        Ok(averaged)
    }
}

impl<E: ConformerChargeEngine> ChargeAssigner for Elf10ChargeAssigner<E> {
    fn assign_partial_charges(
        &self,
        molecule: &Molecule,
        method: &str,
    ) -> Result<Vec<f64>, ToolkitError> {
        let method: ChargeMethod = method.parse()?;
        molecule.validate()?;
        match method {
            ChargeMethod::Zeros => Ok(vec![0.0; molecule.n_atoms()]),
            ChargeMethod::FormalCharge => Ok(molecule
                .atoms()
                .iter()
                .map(|a| a.formal_charge as f64)
                .collect()),
            ChargeMethod::Am1Bcc => {
                let conformer = self.usable_conformers(molecule).into_iter().next().ok_or_else(
                    || ToolkitError::ConformerGeneration("no clash-free conformer".into()),
                )?;
                self.engine.compute_charges(molecule, conformer)
            }
            ChargeMethod::Am1BccElf10 => self.elf10(molecule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::tests::water;
    use nalgebra::{Point3, Vector3};

    struct FailingEngine;

    impl ConformerChargeEngine for FailingEngine {
        fn name(&self) -> &str {
            "failing"
        }
        fn compute_charges(&self, _: &Molecule, _: &Conformer) -> Result<Vec<f64>, ToolkitError> {
            Err(ToolkitError::ChargeCalculation("engine refused".into()))
        }
    }

    /// Returns the x coordinate of every atom as its "charge", so that averaging is visible.
    struct CoordinateEngine;

    impl ConformerChargeEngine for CoordinateEngine {
        fn name(&self) -> &str {
            "coordinate"
        }
        fn compute_charges(&self, _: &Molecule, c: &Conformer) -> Result<Vec<f64>, ToolkitError> {
            Ok(c.iter().map(|p| p.x).collect())
        }
    }

    fn clashing(mol: &Molecule) -> Conformer {
        let mut conformer = mol.conformers()[0].clone();
        conformer[2] = conformer[1] + Vector3::new(0.1, 0.0, 0.0);
        conformer
    }

    #[test]
    fn trivial_methods_need_no_conformers() {
        let mol = Molecule::from_smiles("[NH4+]").unwrap();
        let assigner = Elf10ChargeAssigner::<QeqEngine>::default();
        assert_eq!(
            assigner.assign_partial_charges(&mol, "zeros").unwrap(),
            vec![0.0; 5]
        );
        let formal = assigner.assign_partial_charges(&mol, "formal_charge").unwrap();
        assert_eq!(formal[0], 1.0);
        assert_eq!(formal.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn elf10_charges_water_with_qeq() {
        let mol = water();
        let charges = Elf10ChargeAssigner::<QeqEngine>::default()
            .assign_partial_charges(&mol, "am1bccelf10")
            .unwrap();
        assert_eq!(charges.len(), 3);
        assert!(charges[0] < 0.0);
        assert!(charges.iter().sum::<f64>().abs() < 1e-6);
    }

    #[test]
    fn molecule_without_conformers_is_a_conformer_generation_error() {
        let mol = water().with_conformers(vec![]).unwrap();
        let result = Elf10ChargeAssigner::<QeqEngine>::default()
            .assign_partial_charges(&mol, "am1bccelf10");
        assert!(matches!(result, Err(ToolkitError::ConformerGeneration(_))));
    }

    #[test]
    fn clashing_conformers_are_discarded() {
        let mol = water();
        let only_clash = mol.with_conformers(vec![clashing(&mol)]).unwrap();
        let assigner = Elf10ChargeAssigner::<QeqEngine>::default();
        assert!(matches!(
            assigner.assign_partial_charges(&only_clash, "am1bcc"),
            Err(ToolkitError::ConformerGeneration(_))
        ));

        let mixed = mol
            .with_conformers(vec![clashing(&mol), mol.conformers()[0].clone()])
            .unwrap();
        assert!(assigner.assign_partial_charges(&mixed, "am1bccelf10").is_ok());
    }

    #[test]
    fn engine_failures_surface_as_charge_calculation_errors() {
        let assigner = Elf10ChargeAssigner::new(FailingEngine, ElfSettings::default());
        let result = assigner.assign_partial_charges(&water(), "am1bccelf10");
        assert!(matches!(result, Err(ToolkitError::ChargeCalculation(_))));
    }

    #[test]
    fn unknown_method_is_unavailable() {
        let result = Elf10ChargeAssigner::<QeqEngine>::default()
            .assign_partial_charges(&water(), "resp");
        assert!(matches!(result, Err(ToolkitError::ChargeMethodUnavailable(_))));
    }

    #[test]
    fn selection_averages_distinct_low_energy_conformers() {
        let mol = water();
        let base = mol.conformers()[0].clone();
        let shifted: Conformer = base.iter().map(|p| p + Vector3::new(1.0, 0.0, 0.0)).collect();
        let mol = mol.with_conformers(vec![base.clone(), shifted]).unwrap();

        // With a 100% pool both conformers are candidates, but the shifted copy is the same
        // shape and is rejected by the RMSD cutoff.
        let settings = ElfSettings {
            percentage: 100.0,
            ..Default::default()
        };
        let assigner = Elf10ChargeAssigner::new(CoordinateEngine, settings);
        let charges = assigner.assign_partial_charges(&mol, "am1bccelf10").unwrap();
        assert_eq!(charges.len(), 3);
        let first_x: Vec<f64> = base.iter().map(|p| p.x).collect();
        let second_x: Vec<f64> = first_x.iter().map(|x| x + 1.0).collect();
        assert!(charges == first_x || charges == second_x);

        let mut bent = base.clone();
        bent[2] = Point3::new(-0.9575, 0.0, 0.0);
        let mol = mol.with_conformers(vec![base.clone(), bent.clone()]).unwrap();
        let charges = assigner.assign_partial_charges(&mol, "am1bccelf10").unwrap();
        let expected: Vec<f64> = base
            .iter()
            .zip(bent.iter())
            .map(|(a, b)| (a.x + b.x) / 2.0)
            .collect();
        for (q, e) in charges.iter().zip(expected.iter()) {
            assert!((q - e).abs() < 1e-12);
        }
    }
}
