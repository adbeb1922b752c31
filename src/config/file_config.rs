//! Sample configuration file support.
//!
//! # Configuration File Format
//!
//! ```toml
//! [search]
//! mesh_terms = ["Endometrial Neoplasms", "Ovarian Neoplasms"]
//! authors = []
//! days = 30
//! max_results = 1000
//! output_file = "pubmed_articles.json"
//!
//! [ncbi]
//! email = "user@example.com"
//! tool = "pubmed_harvester"
//!
//! [rate_limits]
//! fetch_delay_ms = 1000
//! status_delay_ms = 500
//!
//! [http]
//! timeout_seconds = 30
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every key is optional; omitted keys take their built-in default.

use std::path::Path;

/// Commented sample written by `--create-config`
pub const SAMPLE_CONFIG: &str = r#"# pubmed-harvester configuration
#
# Values given on the command line take precedence over this file.
# Environment overrides use the PUBMED_HARVESTER prefix with "__" between
# section and key, e.g. PUBMED_HARVESTER__NCBI__EMAIL=you@example.org

[search]
# MeSH descriptors, OR-ed together
mesh_terms = ["Endometrial Neoplasms", "Ovarian Neoplasms"]

# Other field-qualified term lists; each populated list is AND-ed with the rest
authors = []
affiliations = []
journals = []
publication_types = []
title_abstract = []

# Publication-date window, counted back from today
days = 30

# Maximum number of articles to retrieve
max_results = 1000

output_file = "pubmed_articles.json"

[ncbi]
# NCBI asks E-utilities callers to identify themselves
email = "user@example.com"
tool = "pubmed_harvester"

[rate_limits]
# Pause before each record batch (200 ids)
fetch_delay_ms = 1000
# Pause before each Open Access status batch (50 ids)
status_delay_ms = 500

[http]
timeout_seconds = 30

[endpoints]
eutils_base_url = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils"
oa_service_url = "https://www.ncbi.nlm.nih.gov/pmc/utils/oa/oa.fcgi"

[logging]
# error, warn, info, debug or trace
level = "info"
"#;

/// Write the sample configuration to `path`
pub fn create_sample_config(path: &Path) -> Result<(), ConfigFileError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
    }

    std::fs::write(path, SAMPLE_CONFIG).map_err(|e| ConfigFileError::Io(e.to_string()))
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
