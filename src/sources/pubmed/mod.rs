//! PubMed search and fetch using the NCBI E-utilities API.

pub mod parser;

use quick_xml::de::from_str;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::{Article, DateWindow, SearchResult};
use crate::sources::{NcbiIdentity, SourceError};
use crate::utils::{encode_params, HttpClient};

pub use parser::{parse_articles, parse_record};

/// E-utilities base URL
pub const DEFAULT_EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Identifiers per EFetch request
pub const FETCH_BATCH_SIZE: usize = 200;

/// Courtesy delay before each EFetch request
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_secs(1);

/// PubMed client
///
/// Runs one ESearch call for identifiers, then EFetch calls in batches of
/// [`FETCH_BATCH_SIZE`], one at a time, each preceded by a fixed delay.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: Arc<HttpClient>,
    identity: NcbiIdentity,
    base_url: String,
    fetch_delay: Duration,
}

impl PubMedSource {
    /// Create a PubMed source against the public E-utilities endpoint
    pub fn new(client: Arc<HttpClient>, identity: NcbiIdentity) -> Self {
        Self {
            client,
            identity,
            base_url: DEFAULT_EUTILS_BASE_URL.to_string(),
            fetch_delay: DEFAULT_FETCH_DELAY,
        }
    }

    /// Point the source at another E-utilities base URL (mirrors, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Build the ESearch URL for a query and date window
    pub fn build_search_url(&self, query: &str, window: &DateWindow, max_results: usize) -> String {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", query.to_string()),
            ("datetype", "pdat".to_string()),
            ("mindate", window.api_start()),
            ("maxdate", window.api_end()),
            ("usehistory", "y".to_string()),
            ("retmax", max_results.to_string()),
        ];
        params.extend(self.identity.params());

        format!("{}/esearch.fcgi?{}", self.base_url, encode_params(&params))
    }

    /// Build the EFetch URL for a batch of identifiers
    pub fn build_fetch_url(&self, ids: &[String]) -> String {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("id", ids.join(",")),
            ("retmode", "xml".to_string()),
        ];
        params.extend(self.identity.params());

        format!("{}/efetch.fcgi?{}", self.base_url, encode_params(&params))
    }

    /// Parse an ESearch response, keeping at most `max_results` identifiers
    pub fn parse_search_response(xml: &str, max_results: usize) -> Result<SearchResult, SourceError> {
        #[derive(Debug, Deserialize)]
        #[allow(non_snake_case)]
        struct ESearchResult {
            Count: Option<String>,
            IdList: Option<IdList>,
            QueryTranslation: Option<String>,
            ERROR: Option<String>,
        }

        #[derive(Debug, Deserialize)]
        struct IdList {
            #[serde(rename = "Id", default)]
            ids: Vec<String>,
        }

        let result: ESearchResult = from_str(xml)
            .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed search XML: {}", e)))?;

        if let Some(error) = result.ERROR {
            warn!(error = %error, "PubMed search reported an error");
        }
        if let Some(translation) = result.QueryTranslation {
            debug!(translation = %translation, "PubMed query translation");
        }

        let total_count = match result.Count {
            Some(count) => count.trim().parse::<u64>().map_err(|e| {
                SourceError::Parse(format!("Invalid Count '{}': {}", count.trim(), e))
            })?,
            None => 0,
        };

        let mut ids: Vec<String> = result
            .IdList
            .map(|list| list.ids)
            .unwrap_or_default()
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        ids.truncate(max_results);

        Ok(SearchResult { total_count, ids })
    }

    /// Run the search, propagating transport and parse failures
    pub async fn try_search(
        &self,
        query: &str,
        window: &DateWindow,
        max_results: usize,
    ) -> Result<SearchResult, SourceError> {
        let url = self.build_search_url(query, window, max_results);

        let xml = self
            .client
            .get_text(&url)
            .await
            .map_err(|e| SourceError::Network(format!("Failed to search PubMed: {}", e)))?;

        Self::parse_search_response(&xml, max_results)
    }

    /// Search PubMed for identifiers in the date window.
    ///
    /// Never fails: a transport or parse failure is logged and yields an empty result.
    pub async fn search(&self, query: &str, window: &DateWindow, max_results: usize) -> SearchResult {
        self.identity.warn_if_anonymous();
        info!(
            query = %query,
            from = %window.api_start(),
            to = %window.api_end(),
            "Searching PubMed"
        );

        match self.try_search(query, window, max_results).await {
            Ok(result) => {
                info!("Found {} articles", result.total_count);
                if result.total_count > result.ids.len() as u64 {
                    warn!(
                        "Retrieving {} of {} matches (max results cap)",
                        result.ids.len(),
                        result.total_count
                    );
                }
                result
            }
            Err(e) => {
                warn!(error = %e, "Error searching PubMed");
                SearchResult::empty()
            }
        }
    }

    /// Fetch and parse one batch of records
    pub async fn fetch_batch(&self, ids: &[String]) -> Result<Vec<Article>, SourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.build_fetch_url(ids);
        let xml = self
            .client
            .get_text(&url)
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch PubMed details: {}", e)))?;

        parse_articles(&xml)
    }

    /// Fetch records for all identifiers in sequential batches.
    ///
    /// A batch that fails is logged and skipped; its articles are missing from the
    /// result. Output order is batch order, then document order within a batch.
    pub async fn fetch_articles(&self, ids: &[String]) -> Vec<Article> {
        if ids.is_empty() {
            return Vec::new();
        }

        info!("Fetching details for {} articles...", ids.len());

        let total_batches = ids.len().div_ceil(FETCH_BATCH_SIZE);
        let mut articles = Vec::with_capacity(ids.len());

        for (index, batch) in ids.chunks(FETCH_BATCH_SIZE).enumerate() {
            let batch_num = index + 1;
            info!(
                "Processing batch {}/{} ({} articles)...",
                batch_num,
                total_batches,
                batch.len()
            );

            tokio::time::sleep(self.fetch_delay).await;

            match self.fetch_batch(batch).await {
                Ok(batch_articles) => {
                    info!(
                        "Retrieved {} articles from batch {}",
                        batch_articles.len(),
                        batch_num
                    );
                    articles.extend(batch_articles);
                }
                Err(e) => {
                    warn!(batch = batch_num, error = %e, "Error fetching batch, skipping");
                }
            }
        }

        info!("Total articles retrieved: {}", articles.len());
        articles
    }
}
