//! SMIRNOFF-style force fields and parameter labeling.
//!
//! - [`params`] - Loading force-field parameter files
//! - [`smirks`] - SMIRKS pattern parsing and substructure matching
//! - [`labels`] - Assigning parameters to molecules

pub mod labels;
pub mod params;
pub mod smirks;
