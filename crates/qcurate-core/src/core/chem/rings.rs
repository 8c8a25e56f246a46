use crate::core::models::molecule::Molecule;
use std::collections::VecDeque;

/// Ring membership of atoms and bonds, derived from a smallest set of smallest rings.
#[derive(Debug, Clone, Default)]
pub struct RingInfo {
    rings: Vec<Vec<usize>>,
    bond_in_ring: Vec<bool>,
    bond_min_ring: Vec<Option<usize>>,
    atom_min_ring: Vec<Option<usize>>,
    atom_ring_count: Vec<usize>,
    atom_ring_bonds: Vec<usize>,
}

impl RingInfo {
    pub fn perceive(molecule: &Molecule) -> Self {
        let n_atoms = molecule.n_atoms();
        let n_bonds = molecule.n_bonds();
        let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n_atoms];
        for (index, bond) in molecule.bonds().iter().enumerate() {
            adjacency[bond.atom1].push((bond.atom2, index));
            adjacency[bond.atom2].push((bond.atom1, index));
        }

        // Smallest cycle through every bond that has one; a bond without one is a bridge.
        let mut candidates: Vec<(Vec<usize>, Vec<usize>)> = Vec::new();
        let mut bond_min_ring = vec![None; n_bonds];
        for (index, bond) in molecule.bonds().iter().enumerate() {
            if let Some((atoms, bonds)) = shortest_cycle(&adjacency, bond.atom1, bond.atom2, index) {
                bond_min_ring[index] = Some(atoms.len());
                candidates.push((atoms, bonds));
            }
        }
        candidates.sort_by_key(|(atoms, _)| atoms.len());
        candidates.dedup_by(|a, b| {
            let mut x = a.1.clone();
            let mut y = b.1.clone();
            x.sort_unstable();
            y.sort_unstable();
            x == y
        });

        let rank = n_bonds + count_components(&adjacency) - n_atoms;
        let rings = independent_cycles(candidates, n_bonds, rank);

        let mut atom_min_ring = vec![None; n_atoms];
        let mut atom_ring_count = vec![0; n_atoms];
        for ring in &rings {
            for &atom in ring {
                atom_ring_count[atom] += 1;
            }
        }
        let mut atom_ring_bonds = vec![0; n_atoms];
        for (index, bond) in molecule.bonds().iter().enumerate() {
            if let Some(size) = bond_min_ring[index] {
                for atom in [bond.atom1, bond.atom2] {
                    atom_ring_bonds[atom] += 1;
                    let current: &mut Option<usize> = &mut atom_min_ring[atom];
                    *current = Some(current.map_or(size, |c| c.min(size)));
                }
            }
        }

        Self {
            rings,
            bond_in_ring: bond_min_ring.iter().map(Option::is_some).collect(),
            bond_min_ring,
            atom_min_ring,
            atom_ring_count,
            atom_ring_bonds,
        }
    }

    /// The smallest set of smallest rings, each as an ordered cycle of atom indices.
    pub fn rings(&self) -> &[Vec<usize>] {
        &self.rings
    }

    pub fn is_ring_bond(&self, bond_index: usize) -> bool {
        self.bond_in_ring.get(bond_index).copied().unwrap_or(false)
    }

    pub fn is_ring_atom(&self, atom: usize) -> bool {
        self.atom_ring_bonds.get(atom).is_some_and(|&n| n > 0)
    }

    /// Size of the smallest ring containing the bond.
    pub fn bond_smallest_ring(&self, bond_index: usize) -> Option<usize> {
        self.bond_min_ring.get(bond_index).copied().flatten()
    }

    /// Size of the smallest ring containing the atom.
    pub fn atom_smallest_ring(&self, atom: usize) -> Option<usize> {
        self.atom_min_ring.get(atom).copied().flatten()
    }

    /// Number of rings of the smallest set that contain the atom.
    pub fn atom_ring_count(&self, atom: usize) -> usize {
        self.atom_ring_count.get(atom).copied().unwrap_or(0)
    }

    /// Number of ring bonds at the atom.
    pub fn atom_ring_connectivity(&self, atom: usize) -> usize {
        self.atom_ring_bonds.get(atom).copied().unwrap_or(0)
    }
}

fn shortest_cycle(
    adjacency: &[Vec<(usize, usize)>],
    start: usize,
    end: usize,
    excluded_bond: usize,
) -> Option<(Vec<usize>, Vec<usize>)> {
    let mut parent: Vec<Option<(usize, usize)>> = vec![None; adjacency.len()];
    let mut visited = vec![false; adjacency.len()];
    visited[start] = true;
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        if current == end {
            break;
        }
        for &(next, bond) in &adjacency[current] {
            if bond == excluded_bond || visited[next] {
                continue;
            }
            visited[next] = true;
            parent[next] = Some((current, bond));
            queue.push_back(next);
        }
    }
    if !visited[end] {
        return None;
    }
    let mut atoms = vec![end];
    let mut bonds = vec![excluded_bond];
    let mut current = end;
    while let Some((previous, bond)) = parent[current] {
        atoms.push(previous);
        bonds.push(bond);
        current = previous;
    }
    atoms.reverse();
    Some((atoms, bonds))
}

fn count_components(adjacency: &[Vec<(usize, usize)>]) -> usize {
    let mut seen = vec![false; adjacency.len()];
    let mut components = 0;
    for start in 0..adjacency.len() {
        if seen[start] {
            continue;
        }
        components += 1;
        seen[start] = true;
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            for &(next, _) in &adjacency[current] {
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
    }
    components
}

/// Picks cycles in order of size while they are linearly independent over GF(2) in bond
/// space, until `rank` cycles have been chosen.
fn independent_cycles(
    candidates: Vec<(Vec<usize>, Vec<usize>)>,
    n_bonds: usize,
    rank: usize,
) -> Vec<Vec<usize>> {
    let words = n_bonds.div_ceil(64).max(1);
    let mut basis: Vec<(usize, Vec<u64>)> = Vec::new();
    let mut chosen = Vec::new();

    for (atoms, bonds) in candidates {
        if chosen.len() >= rank {
            break;
        }
        let mut vector = vec![0u64; words];
        for bond in bonds {
            vector[bond / 64] ^= 1 << (bond % 64);
        }
        for (pivot, row) in &basis {
            if vector[pivot / 64] & (1 << (pivot % 64)) != 0 {
                for (v, r) in vector.iter_mut().zip(row) {
                    *v ^= r;
                }
            }
        }
        let pivot = vector
            .iter()
            .enumerate()
            .find(|(_, word)| **word != 0)
            .map(|(i, word)| i * 64 + word.trailing_zeros() as usize);
        if let Some(pivot) = pivot {
            for (_, row) in basis.iter_mut() {
                if row[pivot / 64] & (1 << (pivot % 64)) != 0 {
                    for (r, v) in row.iter_mut().zip(&vector) {
                        *r ^= v;
                    }
                }
            }
            basis.push((pivot, vector));
            chosen.push(atoms);
        }
    }
    chosen
}
