//! Harvest pipeline: query → search → fetch → resolve.

use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::models::{DateWindow, SearchCriteria, SearchReport};
use crate::sources::{PmcOaService, PubMedSource, SourceError};
use crate::utils::HttpClient;

/// Runs one harvest end to end
#[derive(Debug, Clone)]
pub struct Harvester {
    pubmed: PubMedSource,
    pmc: PmcOaService,
}

impl Harvester {
    pub fn new(pubmed: PubMedSource, pmc: PmcOaService) -> Self {
        Self { pubmed, pmc }
    }

    /// Build both clients from configuration, sharing one HTTP client
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = Arc::new(HttpClient::with_timeout(config.http.timeout())?);
        let identity = config.ncbi.identity();

        let pubmed = PubMedSource::new(Arc::clone(&client), identity.clone())
            .with_base_url(&config.endpoints.eutils_base_url)
            .with_fetch_delay(config.rate_limits.fetch_delay());

        let pmc = PmcOaService::new(client, identity)
            .with_service_url(&config.endpoints.oa_service_url)
            .with_status_delay(config.rate_limits.status_delay());

        Ok(Self::new(pubmed, pmc))
    }

    pub fn pmc(&self) -> &PmcOaService {
        &self.pmc
    }

    /// Search, fetch and resolve full text for one set of criteria.
    ///
    /// Network failures never abort the run; they shrink the result instead.
    pub async fn run(
        &self,
        criteria: &SearchCriteria,
        window: &DateWindow,
        max_results: usize,
    ) -> SearchReport {
        let query = criteria.to_query();

        let result = self.pubmed.search(&query, window, max_results).await;
        if result.is_empty() {
            info!("No articles found for the given criteria");
            return SearchReport::new(criteria, query, window, result.total_count, Vec::new());
        }

        let mut articles = self.pubmed.fetch_articles(&result.ids).await;
        if !articles.is_empty() {
            self.pmc.resolve(&mut articles).await;
        }

        SearchReport::new(criteria, query, window, result.total_count, articles)
    }
}
