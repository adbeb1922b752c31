//! NCBI service clients.
//!
//! - [`PubMedSource`]: E-utilities search and batched record fetch
//! - [`PmcOaService`]: PMC Open Access status lookups that classify full-text access
//!
//! Both clients are built from an explicit [`NcbiIdentity`] (tool name and contact
//! email sent with every request, as NCBI asks of E-utilities callers) rather than
//! from global state.
//!
//! `search`, `fetch_articles` and `resolve` never fail: a failed call is logged and
//! yields an empty or unresolved result. The `try_*`/`*_batch` variants expose the
//! underlying [`SourceError`].

pub mod pmc;
pub mod pubmed;

pub use pmc::{FullTextSummary, PmcOaService, OA_BATCH_SIZE};
pub use pubmed::{PubMedSource, FETCH_BATCH_SIZE};

/// Tool name and contact email attached to every NCBI request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcbiIdentity {
    pub tool: String,
    pub email: String,
}

impl NcbiIdentity {
    pub fn new(tool: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            email: email.into(),
        }
    }

    /// Query parameters identifying the caller
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![("tool", self.tool.clone()), ("email", self.email.clone())]
    }

    /// Log once if no contact email is configured (not an error)
    pub fn warn_if_anonymous(&self) {
        if self.email.trim().is_empty() {
            tracing::warn!("No contact email configured; NCBI asks E-utilities callers to provide one");
        }
    }
}

impl Default for NcbiIdentity {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TOOL, crate::config::DEFAULT_EMAIL)
    }
}

/// Errors that can occur when talking to an NCBI service
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// API error from the service
    #[error("API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<quick_xml::DeError> for SourceError {
    fn from(err: quick_xml::DeError) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
