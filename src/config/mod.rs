//! Configuration management.

mod file_config;

pub use file_config::{create_sample_config, ConfigFileError, SAMPLE_CONFIG};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{CriteriaError, SearchCriteria, TermCategory};
use crate::sources::NcbiIdentity;

/// Tool name sent to NCBI when none is configured
pub const DEFAULT_TOOL: &str = "pubmed_harvester";

/// Contact email sent to NCBI when none is configured
pub const DEFAULT_EMAIL: &str = "user@example.com";

/// Config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "pubmed-harvester.toml";

/// Prefix for environment overrides (`PUBMED_HARVESTER__NCBI__EMAIL=...`)
pub const ENV_PREFIX: &str = "PUBMED_HARVESTER";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    /// Identity sent with every NCBI request
    #[serde(default)]
    pub ncbi: NcbiConfig,

    /// Courtesy delays between requests
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    #[serde(default)]
    pub http: HttpConfig,

    /// Service endpoints (overridable for mirrors and tests)
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub mesh_terms: Vec<String>,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub affiliations: Vec<String>,

    #[serde(default)]
    pub journals: Vec<String>,

    #[serde(default)]
    pub publication_types: Vec<String>,

    #[serde(default)]
    pub title_abstract: Vec<String>,

    /// Days to look back from today
    #[serde(default = "default_days")]
    pub days: u32,

    /// Maximum identifiers to retrieve
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mesh_terms: Vec::new(),
            authors: Vec::new(),
            affiliations: Vec::new(),
            journals: Vec::new(),
            publication_types: Vec::new(),
            title_abstract: Vec::new(),
            days: default_days(),
            max_results: default_max_results(),
            output_file: default_output_file(),
        }
    }
}

fn default_days() -> u32 {
    30
}

fn default_max_results() -> usize {
    1000
}

fn default_output_file() -> PathBuf {
    PathBuf::from("pubmed_articles.json")
}

impl SearchConfig {
    /// Configured terms for one category
    pub fn terms(&self, category: TermCategory) -> &[String] {
        match category {
            TermCategory::Descriptor => &self.mesh_terms,
            TermCategory::Author => &self.authors,
            TermCategory::Affiliation => &self.affiliations,
            TermCategory::Journal => &self.journals,
            TermCategory::PublicationType => &self.publication_types,
            TermCategory::TitleAbstract => &self.title_abstract,
        }
    }

    fn terms_mut(&mut self, category: TermCategory) -> &mut Vec<String> {
        match category {
            TermCategory::Descriptor => &mut self.mesh_terms,
            TermCategory::Author => &mut self.authors,
            TermCategory::Affiliation => &mut self.affiliations,
            TermCategory::Journal => &mut self.journals,
            TermCategory::PublicationType => &mut self.publication_types,
            TermCategory::TitleAbstract => &mut self.title_abstract,
        }
    }

    /// Build search criteria from every configured category
    pub fn criteria(&self) -> Result<SearchCriteria, CriteriaError> {
        TermCategory::ALL
            .iter()
            .fold(SearchCriteria::builder(), |builder, &category| {
                builder.terms(category, self.terms(category))
            })
            .build()
    }
}

/// NCBI identity settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NcbiConfig {
    #[serde(default = "default_email")]
    pub email: String,

    #[serde(default = "default_tool")]
    pub tool: String,
}

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            email: default_email(),
            tool: default_tool(),
        }
    }
}

fn default_email() -> String {
    DEFAULT_EMAIL.to_string()
}

fn default_tool() -> String {
    DEFAULT_TOOL.to_string()
}

impl NcbiConfig {
    pub fn identity(&self) -> NcbiIdentity {
        NcbiIdentity::new(&self.tool, &self.email)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Delay before each record fetch batch
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,

    /// Delay before each Open Access status batch
    #[serde(default = "default_status_delay_ms")]
    pub status_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            fetch_delay_ms: default_fetch_delay_ms(),
            status_delay_ms: default_status_delay_ms(),
        }
    }
}

fn default_fetch_delay_ms() -> u64 {
    1000
}

fn default_status_delay_ms() -> u64 {
    500
}

impl RateLimitConfig {
    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    pub fn status_delay(&self) -> Duration {
        Duration::from_millis(self.status_delay_ms)
    }
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    crate::utils::DEFAULT_TIMEOUT_SECS
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Service endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_eutils_base_url")]
    pub eutils_base_url: String,

    #[serde(default = "default_oa_service_url")]
    pub oa_service_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            eutils_base_url: default_eutils_base_url(),
            oa_service_url: default_oa_service_url(),
        }
    }
}

fn default_eutils_base_url() -> String {
    crate::sources::pubmed::DEFAULT_EUTILS_BASE_URL.to_string()
}

fn default_oa_service_url() -> String {
    crate::sources::pmc::DEFAULT_OA_SERVICE_URL.to_string()
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level used when neither RUST_LOG nor a verbosity flag is given
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values given explicitly on the command line.
///
/// `None` means "not given"; a given value always wins over the config file,
/// even when it equals the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// Per-category term lists; a given list replaces the configured one
    pub terms: BTreeMap<TermCategory, Vec<String>>,
    pub days: Option<u32>,
    pub max_results: Option<usize>,
    pub output_file: Option<PathBuf>,
    pub email: Option<String>,
}

impl Config {
    /// Merge command-line values over this configuration
    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        for (category, terms) in overrides.terms {
            *self.search.terms_mut(category) = terms;
        }
        if let Some(days) = overrides.days {
            self.search.days = days;
        }
        if let Some(max_results) = overrides.max_results {
            self.search.max_results = max_results;
        }
        if let Some(output_file) = overrides.output_file {
            self.search.output_file = output_file;
        }
        if let Some(email) = overrides.email {
            self.ncbi.email = email;
        }
    }
}

/// Load configuration from a TOML file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigFileError> {
    if !path.is_file() {
        return Err(ConfigFileError::Io(format!(
            "Config file '{}' not found",
            path.display()
        )));
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(path).format(config::FileFormat::Toml))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .map_err(|e| ConfigFileError::Parse(e.to_string()))?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigFileError::Parse(e.to_string()))
}

/// Find the default config file, if one exists.
///
/// Looks for `pubmed-harvester.toml` in the working directory, then
/// `pubmed-harvester/config.toml` in the platform config directory.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("pubmed-harvester").join("config.toml"))
        .filter(|path| path.is_file())
}
