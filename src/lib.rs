//! Load domain-scan results into a dated, agency-attributed document store
//! snapshot.
//!
//! The pipeline: normalize the agency roster and domain inventory
//! ([`agency`]), resolve each scan row's owning agency ([`resolver`]), type
//! the row ([`scan`]), then rotate the `latest` flag and insert the new
//! snapshot ([`snapshot`]) into a [`store::DocumentStore`].

pub mod agency;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domains;
pub mod export;
pub mod logger;
pub mod resolver;
pub mod scan;
pub mod snapshot;
pub mod sources;
pub mod store;

pub use agency::{canonicalize_agency_name, AgencyRef, AgencyRoster};
pub use resolver::AgencyResolver;
pub use scan::ScanKind;
pub use snapshot::{scan_date, write_snapshot, SnapshotSummary};
pub use store::{DocumentStore, MemoryDocumentStore, SqliteDocumentStore};
