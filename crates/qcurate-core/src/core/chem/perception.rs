use super::rings::RingInfo;
use crate::core::models::molecule::{Conformer, Molecule};
use crate::core::models::topology::BondOrder;
use crate::core::utils::geometry::{dihedral_degrees, normalized_signed_volume};
use itertools::Itertools;
use std::collections::HashMap;

/// Below this normalized signed volume a tetrahedral center has no usable handedness.
pub const CENTER_VOLUME_TOLERANCE: f64 = 0.2;
/// A double-bond dihedral within this many degrees of 90° has no usable cis/trans sense.
pub const DOUBLE_BOND_DIHEDRAL_TOLERANCE: f64 = 15.0;

/// Graph-symmetry classes of every atom.
///
/// Two atoms share a class when iterative refinement of their (atomic number, degree,
/// formal charge, hydrogen count, aromaticity) invariants over the neighborhood cannot tell
/// them apart.
pub fn symmetry_classes(molecule: &Molecule) -> Vec<usize> {
    let adjacency = molecule.adjacency();
    let initial: Vec<(u8, usize, i8, usize, bool)> = molecule
        .atoms()
        .iter()
        .enumerate()
        .map(|(i, atom)| {
            (
                atom.element.atomic_number(),
                adjacency[i].len(),
                atom.formal_charge,
                molecule.hydrogen_count(i),
                atom.is_aromatic,
            )
        })
        .collect();
    let mut classes = rank(&initial);
    let mut n_classes = count_distinct(&classes);

    loop {
        let refined: Vec<(usize, Vec<usize>)> = (0..classes.len())
            .map(|i| {
                let neighbors = adjacency[i].iter().map(|&n| classes[n]).sorted().collect();
                (classes[i], neighbors)
            })
            .collect();
        let next = rank(&refined);
        let n_next = count_distinct(&next);
        classes = next;
        if n_next == n_classes {
            break;
        }
        n_classes = n_next;
    }
    classes
}

fn rank<T: Ord + Clone + std::hash::Hash + Eq>(invariants: &[T]) -> Vec<usize> {
    let ordered: HashMap<&T, usize> = invariants
        .iter()
        .sorted()
        .dedup()
        .enumerate()
        .map(|(rank, value)| (value, rank))
        .collect();
    invariants.iter().map(|value| ordered[value]).collect()
}

fn count_distinct(classes: &[usize]) -> usize {
    classes.iter().unique().count()
}

/// A stereogenic unit found on the molecular graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StereoElement {
    /// A tetrahedral center and its three or four neighbors.
    Center { atom: usize, neighbors: Vec<usize> },
    /// A double bond `begin=end` with one reference substituent on each side.
    DoubleBond {
        begin: usize,
        end: usize,
        begin_substituent: usize,
        end_substituent: usize,
    },
}

/// The 3D sense of a stereo element in one conformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoDescriptor {
    Positive,
    Negative,
    Cis,
    Trans,
    Ambiguous,
}

impl StereoElement {
    /// Reads the element's configuration off a conformer.
    ///
    /// A four-coordinate center is ambiguous when any three of its neighbors are close to
    /// coplanar with it.
    pub fn descriptor(&self, conformer: &Conformer) -> StereoDescriptor {
        match self {
            Self::Center { atom, neighbors } => {
                let center = &conformer[*atom];
                let volume = |a: usize, b: usize, c: usize| {
                    normalized_signed_volume(center, &conformer[a], &conformer[b], &conformer[c])
                };
                let smallest = neighbors
                    .iter()
                    .combinations(3)
                    .map(|t| volume(*t[0], *t[1], *t[2]).abs())
                    .fold(f64::INFINITY, f64::min);
                if !smallest.is_finite() || smallest < CENTER_VOLUME_TOLERANCE {
                    return StereoDescriptor::Ambiguous;
                }
                if volume(neighbors[0], neighbors[1], neighbors[2]) > 0.0 {
                    StereoDescriptor::Positive
                } else {
                    StereoDescriptor::Negative
                }
            }
            Self::DoubleBond {
                begin,
                end,
                begin_substituent,
                end_substituent,
            } => {
                let dihedral = dihedral_degrees(
                    &conformer[*begin_substituent],
                    &conformer[*begin],
                    &conformer[*end],
                    &conformer[*end_substituent],
                )
                .abs();
                if !dihedral.is_finite() || (dihedral - 90.0).abs() < DOUBLE_BOND_DIHEDRAL_TOLERANCE {
                    StereoDescriptor::Ambiguous
                } else if dihedral < 90.0 {
                    StereoDescriptor::Cis
                } else {
                    StereoDescriptor::Trans
                }
            }
        }
    }
}

/// Finds every potential tetrahedral stereocenter and stereogenic double bond.
pub fn find_stereo_elements(molecule: &Molecule) -> Vec<StereoElement> {
    let classes = symmetry_classes(molecule);
    let adjacency = molecule.adjacency();
    let rings = RingInfo::perceive(molecule);
    let mut elements = Vec::new();

    for (atom, neighbors) in adjacency.iter().enumerate() {
        let element = molecule.atoms()[atom].element.atomic_number();
        let candidate = match neighbors.len() {
            4 => true,
            3 => matches!(element, 15 | 16),
            _ => false,
        };
        if candidate && neighbors.iter().map(|&n| classes[n]).all_unique() {
            elements.push(StereoElement::Center {
                atom,
                neighbors: neighbors.clone(),
            });
        }
    }

    for (index, bond) in molecule.bonds().iter().enumerate() {
        if bond.order != BondOrder::Double {
            continue;
        }
        if rings.bond_smallest_ring(index).is_some_and(|size| size < 8) {
            continue;
        }
        let substituents = |atom: usize, partner: usize| -> Option<usize> {
            let others: Vec<usize> = adjacency[atom]
                .iter()
                .copied()
                .filter(|&n| n != partner)
                .collect();
            match others.as_slice() {
                [only] => Some(*only),
                [a, b] if classes[*a] != classes[*b] => {
                    Some(if classes[*a] > classes[*b] { *a } else { *b })
                }
                _ => None,
            }
        };
        if let (Some(begin_substituent), Some(end_substituent)) = (
            substituents(bond.atom1, bond.atom2),
            substituents(bond.atom2, bond.atom1),
        ) {
            elements.push(StereoElement::DoubleBond {
                begin: bond.atom1,
                end: bond.atom2,
                begin_substituent,
                end_substituent,
            });
        }
    }

    elements
}
