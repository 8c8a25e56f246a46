use crate::core::models::molecule::{Conformer, Molecule};
use std::collections::BTreeSet;

pub const DEFAULT_BOND_TOLERANCE: f64 = 1.2;

/// Bonds implied by a conformer's geometry: every pair closer than `tolerance` times the
/// sum of their covalent radii, as sorted index pairs.
///
/// Returns `None` if an atom's element has no covalent radius.
pub fn guess_bonds(
    molecule: &Molecule,
    conformer: &Conformer,
    tolerance: f64,
) -> Option<BTreeSet<(usize, usize)>> {
    let radii: Vec<f64> = molecule
        .atoms()
        .iter()
        .map(|a| a.element.covalent_radius())
        .collect();
    if radii.iter().any(|&r| r <= 0.0) {
        return None;
    }
    let mut bonds = BTreeSet::new();
    for i in 0..conformer.len() {
        for j in (i + 1)..conformer.len() {
            let cutoff = tolerance * (radii[i] + radii[j]);
            if (conformer[i] - conformer[j]).norm_squared() < cutoff * cutoff {
                bonds.insert((i, j));
            }
        }
    }
    Some(bonds)
}

/// True when every conformer's geometry-derived bond set equals the molecule's bond graph.
pub fn is_connectivity_consistent(molecule: &Molecule, tolerance: f64) -> bool {
    let expected: BTreeSet<(usize, usize)> = molecule.bonds().iter().map(|b| b.key()).collect();
    molecule
        .conformers()
        .iter()
        .all(|conformer| guess_bonds(molecule, conformer, tolerance).as_ref() == Some(&expected))
}
