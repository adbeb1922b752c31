//! Utility modules supporting the harvest pipeline.
//!
//! - [`HttpClient`]: shared reqwest client with a configurable timeout
//! - [`encode_params`]: query-string encoding for NCBI requests
//! - [`write_report`]: JSON artifact export
//! - [`print_results`], [`print_summary`]: console report
//! - [`truncate_with_ellipsis`]: unicode-aware text truncation

mod display;
mod export;
mod http;

pub use display::{
    format_article, format_results, is_terminal, mesh_preview, print_results, print_summary,
    summary_table, truncate_with_ellipsis, ABSTRACT_PREVIEW_WIDTH, MESH_PREVIEW_COUNT,
};
pub use export::{write_report, ExportError};
pub use http::{encode_params, HttpClient, DEFAULT_TIMEOUT_SECS};
