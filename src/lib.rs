//! # PubMed Harvester
//!
//! Retrieves PubMed bibliographic records through the NCBI E-utilities API and
//! enriches them with full-text availability from PubMed Central.
//!
//! ## Architecture
//!
//! - [`models`]: Articles, search criteria, date windows and the run report
//! - [`query`]: Field-qualified boolean query construction
//! - [`sources`]: PubMed search/fetch client and the PMC Open Access resolver
//! - [`pipeline`]: [`Harvester`], which wires the clients together
//! - [`utils`]: HTTP client, JSON export and console display
//! - [`config`]: Configuration management

pub mod config;
pub mod models;
pub mod pipeline;
pub mod query;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{Article, DateWindow, SearchCriteria, SearchReport, TermCategory};
pub use pipeline::Harvester;
pub use sources::{PmcOaService, PubMedSource, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
