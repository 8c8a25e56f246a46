//! Access to a QCArchive (QCFractal) server.
//!
//! [`retrieve::ArchiveSource`] is the seam between the retrieval workflow and the network;
//! [`client::PortalClient`] implements it over the server's REST API.

pub mod client;
pub mod models;
pub mod retrieve;
