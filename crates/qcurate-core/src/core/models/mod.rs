//! # Core Models Module
//!
//! Data structures describing a curated dataset.
//!
//! - [`element`] - Chemical elements with symbols and covalent radii
//! - [`topology`] - Bonds and bond orders between atom indices
//! - [`molecule`] - Atoms, bonds and 3D conformers of one molecule
//! - [`record`] - A computed optimization or torsion-drive trajectory and its status
//! - [`collection`] - Result collections: ordered dataset entries plus their record store
//! - [`system`] - Multi-molecule topologies used for force-field labeling
//!
//! ```ignore
//! use qcurate::core::models::molecule::Molecule;
//!
//! let ethanol = Molecule::from_smiles("CCO")?;
//! assert_eq!(ethanol.n_atoms(), 9);
//! ```

pub mod collection;
pub mod element;
pub mod molecule;
pub mod record;
pub mod system;
pub mod topology;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Atom index {index} is out of range for a molecule with {n_atoms} atoms")]
    AtomIndexOutOfRange { index: usize, n_atoms: usize },

    #[error("An atom cannot be bonded to itself (atom {0})")]
    SelfBond(usize),

    #[error("Atoms {0} and {1} are already bonded")]
    DuplicateBond(usize, usize),

    #[error("Conformer has {found} positions but the molecule has {expected} atoms")]
    ConformerSize { expected: usize, found: usize },

    #[error("Unknown element '{0}'")]
    UnknownElement(String),

    #[error("Invalid SMILES at position {position}: {message}")]
    Smiles { position: usize, message: String },

    #[error("Entry references record {0}, which is missing from the record store")]
    MissingRecord(u64),

    #[error("Entry for record {record_id} has type '{found}' in a collection of '{expected}' entries")]
    EntryTypeMismatch {
        record_id: u64,
        expected: String,
        found: String,
    },
}
