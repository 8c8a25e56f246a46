//! Reading and writing curated datasets.
//!
//! Collections are cached on disk as indented JSON so that retrieval, filtering and
//! downstream fitting can run as separate steps.

pub mod cache;
pub mod traits;
