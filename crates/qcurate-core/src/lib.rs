//! # qcurate Core Library
//!
//! Curation of quantum-chemistry reference datasets (geometry optimizations and
//! torsion-drive scans) for force-field fitting.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`ResultCollection`, `Molecule`),
//!   chemistry perception (rings, stereochemistry, connectivity), partial-charge assignment,
//!   SMIRKS-based force-field labeling and the JSON cache format.
//!
//! - **[`engine`]: The Filter Engine.** Record predicates, collection-level filters, the
//!   validated `FilterConfig`, progress reporting and engine errors.
//!
//! - **[`workflows`]: The Public API.** The fixed optimization and torsion-drive curation
//!   pipelines that tie the denylist, the filters and the report together.
//!
//! Network retrieval is not part of this crate. The archive client lives in the
//! command-line crate and hands finished collections to this library.

pub mod core;
pub mod engine;
pub mod workflows;
