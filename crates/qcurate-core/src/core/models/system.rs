use super::molecule::Molecule;
use serde::{Deserialize, Serialize};

/// A collection of molecules to be labeled together.
///
/// Molecules are kept in insertion order; duplicates (by graph identity) are allowed and are
/// collapsed by [`Topology::unique_molecules`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    molecules: Vec<Molecule>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_molecules(molecules: Vec<Molecule>) -> Self {
        Self { molecules }
    }

    pub fn add_molecule(&mut self, molecule: Molecule) -> usize {
        self.molecules.push(molecule);
        self.molecules.len() - 1
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    pub fn n_molecules(&self) -> usize {
        self.molecules.len()
    }

    pub fn n_atoms(&self) -> usize {
        self.molecules.iter().map(Molecule::n_atoms).sum()
    }

    /// The first occurrence of every distinct molecule graph, in insertion order.
    pub fn unique_molecules(&self) -> Vec<&Molecule> {
        let mut unique: Vec<&Molecule> = Vec::new();
        for molecule in &self.molecules {
            if !unique.iter().any(|seen| seen.is_graph_identical(molecule)) {
                unique.push(molecule);
            }
        }
        unique
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::molecule::tests::water;

    #[test]
    fn unique_molecules_collapses_identical_graphs() {
        let mut topology = Topology::new();
        topology.add_molecule(water());
        topology.add_molecule(water().with_conformers(vec![]).unwrap());
        assert_eq!(topology.n_molecules(), 2);
        assert_eq!(topology.n_atoms(), 6);
        assert_eq!(topology.unique_molecules().len(), 1);
    }
}
