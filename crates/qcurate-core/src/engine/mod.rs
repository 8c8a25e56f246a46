//! # Engine Module
//!
//! The filter engine that turns a raw result collection into a curated one.
//!
//! ## Overview
//!
//! A curation run is a sequence of stages. Each stage either judges records one at a time
//! ([`filters::RecordFilter`]) or looks at the whole collection at once
//! ([`filters::CollectionFilter`]). Stages only ever remove entries, and every stage that
//! runs is recorded in the collection's provenance and in the returned
//! [`report::FilterReport`].
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Validated filter tunables and their builder
//! - **Filters** ([`filters`]) - Record and collection predicates
//! - **Pipeline** ([`pipeline`]) - Ordered stage execution with denylist removal
//! - **Reporting** ([`report`]) - Per-stage counts and dropped record ids, CSV export
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine and filter errors

pub mod config;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod progress;
pub mod report;
