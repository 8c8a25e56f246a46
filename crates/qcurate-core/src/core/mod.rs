//! # Core Module
//!
//! The computational foundation of qcurate: everything needed to represent a dataset and to
//! reason about the molecules inside it, without any notion of a pipeline.
//!
//! - **Data Models** ([`models`]) - Elements, molecules, records and result collections
//! - **Chemistry Perception** ([`chem`]) - SMILES parsing, ring analysis, stereo and connectivity
//! - **Partial Charges** ([`charges`]) - Charge assignment methods and the QEq engine
//! - **Force Fields** ([`forcefield`]) - SMIRNOFF-style parameters, SMIRKS matching and labeling
//! - **File I/O** ([`io`]) - The JSON dataset cache

pub mod charges;
pub mod chem;
pub mod forcefield;
pub mod io;
pub mod models;
pub(crate) mod utils;
