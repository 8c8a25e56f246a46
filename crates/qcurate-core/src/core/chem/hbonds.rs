use crate::core::models::element::Element;
use crate::core::models::molecule::{Conformer, Molecule};
use crate::core::utils::geometry::angle_degrees;

/// Geometric criteria of the Baker–Hubbard hydrogen-bond definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HydrogenBondCriteria {
    /// Maximum H···acceptor distance in Å.
    pub max_distance: f64,
    /// Minimum donor-H···acceptor angle in degrees.
    pub min_angle: f64,
    /// Donor/acceptor pairs fewer than this many bonds apart are ignored.
    pub min_bond_separation: usize,
}

impl Default for HydrogenBondCriteria {
    fn default() -> Self {
        Self {
            max_distance: 2.5,
            min_angle: 120.0,
            min_bond_separation: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HydrogenBond {
    pub donor: usize,
    pub hydrogen: usize,
    pub acceptor: usize,
    pub distance: f64,
    pub angle: f64,
}

fn is_polar(element: Element) -> bool {
    element == Element::N || element == Element::O
}

/// Every intramolecular hydrogen bond in one conformer.
pub fn find_hydrogen_bonds(
    molecule: &Molecule,
    conformer: &Conformer,
    criteria: &HydrogenBondCriteria,
) -> Vec<HydrogenBond> {
    let atoms = molecule.atoms();
    let distances = molecule.topological_distances();
    let mut found = Vec::new();

    for bond in molecule.bonds() {
        let (donor, hydrogen) = match (atoms[bond.atom1].element, atoms[bond.atom2].element) {
            (d, h) if is_polar(d) && h.is_hydrogen() => (bond.atom1, bond.atom2),
            (h, d) if is_polar(d) && h.is_hydrogen() => (bond.atom2, bond.atom1),
            _ => continue,
        };
        for (acceptor, atom) in atoms.iter().enumerate() {
            if acceptor == donor || !is_polar(atom.element) {
                continue;
            }
            let separated = distances[donor][acceptor]
                .is_none_or(|d| d >= criteria.min_bond_separation);
            if !separated {
                continue;
            }
            let distance = (conformer[hydrogen] - conformer[acceptor]).norm();
            if distance >= criteria.max_distance {
                continue;
            }
            let angle = angle_degrees(&conformer[donor], &conformer[hydrogen], &conformer[acceptor]);
            if angle > criteria.min_angle {
                found.push(HydrogenBond {
                    donor,
                    hydrogen,
                    acceptor,
                    distance,
                    angle,
                });
            }
        }
    }
    found
}
