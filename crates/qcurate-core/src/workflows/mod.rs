//! # Workflows Module
//!
//! The fixed curation pipelines, the top-level entry points of the library.
//!
//! ## Overview
//!
//! Each workflow takes a raw [`ResultCollection`](crate::core::models::collection::ResultCollection)
//! and a validated [`FilterConfig`](crate::engine::config::FilterConfig), removes the
//! denylisted records, runs its filter sequence and returns the curated copy together with a
//! [`FilterReport`](crate::engine::report::FilterReport). The input collection is never
//! modified.
//!
//! - **Curation** ([`curate`]) - The optimization and torsion-drive pipelines

pub mod curate;
