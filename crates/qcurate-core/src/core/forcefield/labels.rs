use super::params::{ForceField, HandlerKind, Parameter};
use super::smirks::MatchContext;
use crate::core::models::molecule::Molecule;
use crate::core::models::system::Topology;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Plain parameter assignments: atom-index tuple to parameter.
pub type ParameterStore = BTreeMap<Vec<usize>, Parameter>;

/// Rule that maps every ordering of the same valence term onto one key.
pub trait KeyTransform {
    fn canonical(key: &[usize]) -> Vec<usize>;
}

/// Bonds, angles, proper torsions and single atoms: a key and its reverse are the same term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValenceKey;

impl KeyTransform for ValenceKey {
    fn canonical(key: &[usize]) -> Vec<usize> {
        match (key.first(), key.last()) {
            (Some(first), Some(last)) if first > last => key.iter().rev().copied().collect(),
            _ => key.to_vec(),
        }
    }
}

/// Impropers: the central atom (second position) is fixed, the three others are unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImproperKey;

impl KeyTransform for ImproperKey {
    fn canonical(key: &[usize]) -> Vec<usize> {
        if key.len() != 4 {
            return key.to_vec();
        }
        let mut outer = [key[0], key[2], key[3]];
        outer.sort_unstable();
        vec![outer[0], key[1], outer[1], outer[2]]
    }
}

/// A parameter store whose keys are canonicalized on every insert and lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDict<K> {
    store: ParameterStore,
    _key: PhantomData<K>,
}

pub type ValenceDict = LabelDict<ValenceKey>;
pub type ImproperDict = LabelDict<ImproperKey>;

impl<K> Default for LabelDict<K> {
    fn default() -> Self {
        Self {
            store: ParameterStore::new(),
            _key: PhantomData,
        }
    }
}

impl<K: KeyTransform> LabelDict<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `parameter` under the canonical form of `key`, replacing any earlier one.
    pub fn insert(&mut self, key: &[usize], parameter: Parameter) {
        self.store.insert(K::canonical(key), parameter);
    }

    pub fn get(&self, key: &[usize]) -> Option<&Parameter> {
        self.store.get(&K::canonical(key))
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<usize>, &Parameter)> {
        self.store.iter()
    }

    pub fn into_store(self) -> ParameterStore {
        self.store
    }
}

/// The labels of one handler, held in the container that handler canonicalizes with.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelSet {
    Valence(ValenceDict),
    Improper(ImproperDict),
}

impl LabelSet {
    pub fn for_handler(kind: HandlerKind) -> Self {
        match kind {
            HandlerKind::ImproperTorsions => Self::Improper(ImproperDict::new()),
            _ => Self::Valence(ValenceDict::new()),
        }
    }

    pub fn insert(&mut self, key: &[usize], parameter: Parameter) {
        match self {
            Self::Valence(dict) => dict.insert(key, parameter),
            Self::Improper(dict) => dict.insert(key, parameter),
        }
    }

    pub fn get(&self, key: &[usize]) -> Option<&Parameter> {
        match self {
            Self::Valence(dict) => dict.get(key),
            Self::Improper(dict) => dict.get(key),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Valence(dict) => dict.len(),
            Self::Improper(dict) => dict.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops the canonicalizing container and returns the plain key/parameter map.
    pub fn into_store(self) -> ParameterStore {
        match self {
            Self::Valence(dict) => dict.into_store(),
            Self::Improper(dict) => dict.into_store(),
        }
    }
}

/// Labels one molecule with every handler of the force field.
///
/// Parameters are applied in file order, so a later match overwrites an earlier one on the
/// same term.
pub fn label_molecule(forcefield: &ForceField, molecule: &Molecule) -> BTreeMap<HandlerKind, LabelSet> {
    let context = MatchContext::new(molecule);
    let mut labels = BTreeMap::new();
    for handler in forcefield.handlers() {
        let mut set = LabelSet::for_handler(handler.kind);
        for (parameter, smirks) in &handler.parameters {
            for key in smirks.find_matches(&context) {
                set.insert(&key, parameter.clone());
            }
        }
        debug!(handler = %handler.kind, terms = set.len(), "Labeled handler.");
        labels.insert(handler.kind, set);
    }
    labels
}

/// Labels every unique molecule of a topology and returns plain parameter maps, one per
/// unique molecule in order of first appearance.
#[instrument(skip_all, name = "label_molecules")]
pub fn label_molecules(
    forcefield: &ForceField,
    topology: &Topology,
) -> Vec<BTreeMap<HandlerKind, ParameterStore>> {
    let unique = topology.unique_molecules();
    info!(
        molecules = topology.n_molecules(),
        unique = unique.len(),
        "Labeling molecules."
    );

    let to_plain = |molecule: &&Molecule| {
        label_molecule(forcefield, molecule)
            .into_iter()
            .map(|(kind, set)| (kind, set.into_store()))
            .collect::<BTreeMap<_, _>>()
    };

    #[cfg(feature = "parallel")]
    let labeled = unique.par_iter().map(to_plain).collect();
    #[cfg(not(feature = "parallel"))]
    let labeled = unique.iter().map(to_plain).collect();

    labeled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::tests::MINI_FORCEFIELD;

    fn forcefield() -> ForceField {
        ForceField::from_toml_str(MINI_FORCEFIELD).unwrap()
    }

    #[test]
    fn valence_keys_are_reversed_when_first_exceeds_last() {
        assert_eq!(ValenceKey::canonical(&[3, 1]), vec![1, 3]);
        assert_eq!(ValenceKey::canonical(&[1, 3]), vec![1, 3]);
        assert_eq!(ValenceKey::canonical(&[5, 0, 2]), vec![2, 0, 5]);
        assert_eq!(ValenceKey::canonical(&[7]), vec![7]);
    }

    #[test]
    fn improper_keys_fix_the_center_and_sort_the_rest() {
        assert_eq!(ImproperKey::canonical(&[9, 4, 2, 6]), vec![2, 4, 6, 9]);
        assert_eq!(ImproperKey::canonical(&[6, 4, 9, 2]), vec![2, 4, 6, 9]);
    }

    #[test]
    fn later_parameters_override_earlier_ones() {
        let ethane = Molecule::from_smiles("CC").unwrap();
        let labels = label_molecule(&forcefield(), &ethane);

        let bonds = &labels[&HandlerKind::Bonds];
        assert_eq!(bonds.len(), 7);
        assert_eq!(bonds.get(&[0, 1]).unwrap().id, "b1");
        // b86 comes after b83 and is more specific, so it wins for every C-H.
        assert_eq!(bonds.get(&[2, 0]).unwrap().id, "b86");
        assert_eq!(bonds.get(&[0, 2]).unwrap().id, "b86");

        assert_eq!(labels[&HandlerKind::Angles].len(), 12);
        assert_eq!(labels[&HandlerKind::ProperTorsions].len(), 9);
        assert!(labels[&HandlerKind::ImproperTorsions].is_empty());
        assert_eq!(labels[&HandlerKind::VdW].len(), 8);
    }

    #[test]
    fn impropers_are_keyed_by_center() {
        let ethylene = Molecule::from_smiles("C=C").unwrap();
        let labels = label_molecule(&forcefield(), &ethylene);
        let impropers = &labels[&HandlerKind::ImproperTorsions];
        // One improper per sp2 carbon, however its outer atoms are permuted.
        assert_eq!(impropers.len(), 2);
        assert!(impropers.get(&[1, 0, 2, 3]).is_some());
        assert!(impropers.get(&[3, 0, 1, 2]).is_some());
        assert!(impropers.get(&[5, 1, 0, 4]).is_some());
    }

    #[test]
    fn two_atom_topology_yields_plain_maps() {
        let forcefield = ForceField::from_toml_str(
            r#"
[[Bonds]]
id = "hh"
smirks = "[#1:1]-[#1:2]"
length = "0.74 * angstrom"

[[vdW]]
id = "h"
smirks = "[#1:1]"
epsilon = 0.01
"#,
        )
        .unwrap();
        let hydrogen = Molecule::from_smiles("[H][H]").unwrap();
        let topology = Topology::from_molecules(vec![hydrogen.clone(), hydrogen.clone()]);

        let specialized = label_molecule(&forcefield, &hydrogen);
        let plain = label_molecules(&forcefield, &topology);
        assert_eq!(plain.len(), 1);

        for (kind, set) in specialized {
            let store = &plain[0][&kind];
            let expected: Vec<_> = match &set {
                LabelSet::Valence(dict) => dict.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                LabelSet::Improper(dict) => dict.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            };
            let actual: Vec<_> = store.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            assert_eq!(actual, expected);
        }
        assert_eq!(plain[0][&HandlerKind::Bonds][&vec![0, 1]].id, "hh");
        assert_eq!(plain[0][&HandlerKind::VdW].len(), 2);
    }
}
