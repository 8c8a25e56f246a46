use super::ModelError;
use super::element::Element;
use super::topology::{Bond, BondOrder};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// One 3D geometry of a molecule, one position per atom, in Å.
pub type Conformer = Vec<Point3<f64>>;

/// An atom of a [`Molecule`]. Hydrogens are always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    pub element: Element,
    #[serde(default)]
    pub formal_charge: i8,
    #[serde(default)]
    pub is_aromatic: bool,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            formal_charge: 0,
            is_aromatic: false,
        }
    }
}

/// A molecular graph with explicit hydrogens and any number of conformers.
///
/// Atoms are addressed by their index. The bond list is the "expected" bonding of the
/// molecule (as encoded by its CMILES) and is what geometry-derived connectivity is compared
/// against.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    #[serde(default)]
    conformers: Vec<Conformer>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, element: Element, formal_charge: i8, is_aromatic: bool) -> usize {
        self.atoms.push(Atom {
            element,
            formal_charge,
            is_aromatic,
        });
        self.atoms.len() - 1
    }

    pub fn add_bond(
        &mut self,
        atom1: usize,
        atom2: usize,
        order: BondOrder,
    ) -> Result<usize, ModelError> {
        self.check_index(atom1)?;
        self.check_index(atom2)?;
        if atom1 == atom2 {
            return Err(ModelError::SelfBond(atom1));
        }
        if self.bond_between(atom1, atom2).is_some() {
            return Err(ModelError::DuplicateBond(atom1, atom2));
        }
        self.bonds.push(Bond::new(atom1, atom2, order));
        Ok(self.bonds.len() - 1)
    }

    pub fn add_conformer(&mut self, conformer: Conformer) -> Result<usize, ModelError> {
        if conformer.len() != self.atoms.len() {
            return Err(ModelError::ConformerSize {
                expected: self.atoms.len(),
                found: conformer.len(),
            });
        }
        self.conformers.push(conformer);
        Ok(self.conformers.len() - 1)
    }

    pub fn clear_conformers(&mut self) {
        self.conformers.clear();
    }

    /// Re-checks every structural invariant. Deserialized molecules skip the checks done by
    /// the builder methods, so loaders call this once after parsing.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = BTreeSet::new();
        for bond in &self.bonds {
            self.check_index(bond.atom1)?;
            self.check_index(bond.atom2)?;
            if bond.atom1 == bond.atom2 {
                return Err(ModelError::SelfBond(bond.atom1));
            }
            if !seen.insert(bond.key()) {
                return Err(ModelError::DuplicateBond(bond.atom1, bond.atom2));
            }
        }
        for conformer in &self.conformers {
            if conformer.len() != self.atoms.len() {
                return Err(ModelError::ConformerSize {
                    expected: self.atoms.len(),
                    found: conformer.len(),
                });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    #[inline]
    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    #[inline]
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    #[inline]
    pub fn conformers(&self) -> &[Conformer] {
        &self.conformers
    }

    #[inline]
    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn n_bonds(&self) -> usize {
        self.bonds.len()
    }

    #[inline]
    pub fn n_conformers(&self) -> usize {
        self.conformers.len()
    }

    pub fn bond_between(&self, atom1: usize, atom2: usize) -> Option<&Bond> {
        self.bonds
            .iter()
            .find(|b| b.partner(atom1) == Some(atom2))
    }

    pub fn neighbors(&self, atom: usize) -> impl Iterator<Item = usize> + '_ {
        self.bonds.iter().filter_map(move |b| b.partner(atom))
    }

    /// Neighbor lists for every atom, built in one pass over the bonds.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.atoms.len()];
        for bond in &self.bonds {
            adjacency[bond.atom1].push(bond.atom2);
            adjacency[bond.atom2].push(bond.atom1);
        }
        adjacency
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.neighbors(atom).count()
    }

    pub fn hydrogen_count(&self, atom: usize) -> usize {
        self.neighbors(atom)
            .filter(|&n| self.atoms[n].element.is_hydrogen())
            .count()
    }

    pub fn elements(&self) -> BTreeSet<Element> {
        self.atoms.iter().map(|a| a.element).collect()
    }

    pub fn total_formal_charge(&self) -> i32 {
        self.atoms.iter().map(|a| a.formal_charge as i32).sum()
    }

    /// Molecular formula in Hill order (C, H, then alphabetical).
    pub fn hill_formula(&self) -> String {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for atom in &self.atoms {
            *counts.entry(atom.element.symbol()).or_default() += 1;
        }
        let mut formula = String::new();
        let mut push = |symbol: &str, count: usize| {
            formula.push_str(symbol);
            if count > 1 {
                formula.push_str(&count.to_string());
            }
        };
        if let Some(c) = counts.remove("C") {
            push("C", c);
            if let Some(h) = counts.remove("H") {
                push("H", h);
            }
        }
        for (symbol, count) in counts {
            push(symbol, count);
        }
        formula
    }

    /// Shortest-path bond counts between every pair of atoms; `None` for disconnected pairs.
    pub fn topological_distances(&self) -> Vec<Vec<Option<usize>>> {
        let adjacency = self.adjacency();
        let n = self.atoms.len();
        let mut distances = vec![vec![None; n]; n];
        for (start, row) in distances.iter_mut().enumerate() {
            row[start] = Some(0);
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                let d = row[current].unwrap_or(0);
                for &next in &adjacency[current] {
                    if row[next].is_none() {
                        row[next] = Some(d + 1);
                        queue.push_back(next);
                    }
                }
            }
        }
        distances
    }

    /// True when both molecules have the same atoms in the same order and the same bonds,
    /// regardless of bond direction or listing order. Conformers are ignored.
    pub fn is_graph_identical(&self, other: &Molecule) -> bool {
        if self.atoms != other.atoms || self.bonds.len() != other.bonds.len() {
            return false;
        }
        let ours: BTreeSet<_> = self
            .bonds
            .iter()
            .map(|b| (b.key(), b.order as u8))
            .collect();
        let theirs: BTreeSet<_> = other
            .bonds
            .iter()
            .map(|b| (b.key(), b.order as u8))
            .collect();
        ours == theirs
    }

    /// A copy of the molecule graph carrying only the given conformers.
    pub fn with_conformers(&self, conformers: Vec<Conformer>) -> Result<Self, ModelError> {
        let mut molecule = Self {
            atoms: self.atoms.clone(),
            bonds: self.bonds.clone(),
            conformers: Vec::with_capacity(conformers.len()),
        };
        for conformer in conformers {
            molecule.add_conformer(conformer)?;
        }
        Ok(molecule)
    }

    fn check_index(&self, index: usize) -> Result<(), ModelError> {
        if index < self.atoms.len() {
            Ok(())
        } else {
            Err(ModelError::AtomIndexOutOfRange {
                index,
                n_atoms: self.atoms.len(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn water() -> Molecule {
        let mut mol = Molecule::new();
        let o = mol.add_atom(Element::O, 0, false);
        let h1 = mol.add_atom(Element::H, 0, false);
        let h2 = mol.add_atom(Element::H, 0, false);
        mol.add_bond(o, h1, BondOrder::Single).unwrap();
        mol.add_bond(o, h2, BondOrder::Single).unwrap();
        let angle = 104.45f64.to_radians();
        mol.add_conformer(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.9575, 0.0, 0.0),
            Point3::new(0.9575 * angle.cos(), 0.9575 * angle.sin(), 0.0),
        ])
        .unwrap();
        mol
    }

    #[test]
    fn add_bond_rejects_invalid_bonds() {
        let mut mol = water();
        assert_eq!(
            mol.add_bond(0, 0, BondOrder::Single),
            Err(ModelError::SelfBond(0))
        );
        assert_eq!(
            mol.add_bond(1, 0, BondOrder::Single),
            Err(ModelError::DuplicateBond(1, 0))
        );
        assert!(matches!(
            mol.add_bond(0, 9, BondOrder::Single),
            Err(ModelError::AtomIndexOutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn add_conformer_checks_atom_count() {
        let mut mol = water();
        let result = mol.add_conformer(vec![Point3::origin()]);
        assert_eq!(
            result,
            Err(ModelError::ConformerSize {
                expected: 3,
                found: 1
            })
        );
    }

    #[test]
    fn neighbors_and_hydrogen_counts_follow_bonds() {
        let mol = water();
        let mut neighbors: Vec<_> = mol.neighbors(0).collect();
        neighbors.sort();
        assert_eq!(neighbors, vec![1, 2]);
        assert_eq!(mol.hydrogen_count(0), 2);
        assert_eq!(mol.degree(1), 1);
    }

    #[test]
    fn hill_formula_orders_carbon_then_hydrogen() {
        assert_eq!(water().hill_formula(), "H2O");
        let mut mol = Molecule::new();
        mol.add_atom(Element::CL, 0, false);
        mol.add_atom(Element::C, 0, false);
        mol.add_atom(Element::H, 0, false);
        mol.add_atom(Element::H, 0, false);
        assert_eq!(mol.hill_formula(), "CH2Cl");
    }

    #[test]
    fn topological_distances_are_bond_counts() {
        let d = water().topological_distances();
        assert_eq!(d[0][1], Some(1));
        assert_eq!(d[1][2], Some(2));
        assert_eq!(d[2][2], Some(0));
    }

    #[test]
    fn graph_identity_ignores_bond_direction_and_conformers() {
        let a = water();
        let mut b = Molecule::new();
        b.add_atom(Element::O, 0, false);
        b.add_atom(Element::H, 0, false);
        b.add_atom(Element::H, 0, false);
        b.add_bond(2, 0, BondOrder::Single).unwrap();
        b.add_bond(1, 0, BondOrder::Single).unwrap();
        assert!(a.is_graph_identical(&b));
    }

    #[test]
    fn validate_catches_bad_deserialized_bonds() {
        let json = r#"{"atoms":[{"element":"H"},{"element":"H"}],
                       "bonds":[{"atom1":0,"atom2":5,"order":"single"}]}"#;
        let mol: Molecule = serde_json::from_str(json).unwrap();
        assert!(mol.validate().is_err());
    }
}
