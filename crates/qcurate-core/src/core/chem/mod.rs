//! Chemical perception on molecule graphs and conformers.
//!
//! - [`smiles`] - SMILES parsing into explicit-hydrogen molecules
//! - [`rings`] - Ring membership of atoms and bonds
//! - [`perception`] - Symmetry classes and stereo elements
//! - [`connectivity`] - Geometry-derived bonding
//! - [`hbonds`] - Intramolecular hydrogen-bond detection

pub mod connectivity;
pub mod hbonds;
pub mod perception;
pub mod rings;
pub mod smiles;
