//! PubMed Central full-text resolution.
//!
//! Attaches a full-text record to each article in three passes:
//!
//! 1. Articles with a PMC id get a provisional PMC link.
//! 2. Those links are checked against the PMC Open Access service in batches of
//!    [`OA_BATCH_SIZE`] and classified as open or closed.
//! 3. Articles still without full text but with a DOI get a DOI resolver link.

use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::{AccessType, Article, DownloadLink, FullText};
use crate::sources::{NcbiIdentity, SourceError};
use crate::utils::{encode_params, HttpClient};

/// PMC Open Access web service
pub const DEFAULT_OA_SERVICE_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/utils/oa/oa.fcgi";

/// PMC identifiers per status request
pub const OA_BATCH_SIZE: usize = 50;

/// Courtesy delay before each status request
pub const DEFAULT_STATUS_DELAY: Duration = Duration::from_millis(500);

pub const PMC_SOURCE: &str = "PMC";
pub const DOI_SOURCE: &str = "Publisher (via DOI)";

/// License recorded when an OA record declares none
const UNKNOWN_LICENSE: &str = "unknown";

/// PMC id with the `PMC` prefix ("12345" → "PMC12345")
pub fn normalize_pmcid(pmcid: &str) -> String {
    format!("PMC{}", bare_pmcid(pmcid))
}

/// Numeric part of a PMC id ("PMC12345" → "12345")
pub fn bare_pmcid(pmcid: &str) -> &str {
    let trimmed = pmcid.trim();
    trimmed
        .strip_prefix("PMC")
        .or_else(|| trimmed.strip_prefix("pmc"))
        .unwrap_or(trimmed)
}

/// PMC article page
pub fn pmc_article_url(pmcid: &str) -> String {
    format!(
        "https://www.ncbi.nlm.nih.gov/pmc/articles/{}/",
        normalize_pmcid(pmcid)
    )
}

/// DOI resolver link
pub fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{}", doi.trim())
}

#[derive(Debug, Deserialize)]
struct OaResponse {
    error: Option<OaError>,
    records: Option<OaRecords>,
}

#[derive(Debug, Deserialize)]
struct OaError {
    #[serde(rename = "@code")]
    code: Option<String>,
    #[serde(rename = "$text", default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OaRecords {
    #[serde(rename = "record", default)]
    record: Vec<OaRecord>,
}

#[derive(Debug, Deserialize)]
struct OaRecord {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "@license")]
    license: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<OaLink>,
}

#[derive(Debug, Deserialize)]
struct OaLink {
    #[serde(rename = "@format")]
    format: Option<String>,
    #[serde(rename = "@href")]
    href: Option<String>,
}

/// Open Access status of one PMC article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OaRecordStatus {
    pub license: String,
    pub download_links: Vec<DownloadLink>,
}

/// Parse an OA service response into statuses keyed by bare PMC id.
///
/// An `<error>` response (e.g. "not Open Access") parses to an empty map.
pub fn parse_oa_response(xml: &str) -> Result<HashMap<String, OaRecordStatus>, SourceError> {
    let response: OaResponse = from_str(xml)
        .map_err(|e| SourceError::Parse(format!("Failed to parse OA service response: {}", e)))?;

    if let Some(error) = response.error {
        debug!(
            code = error.code.as_deref().unwrap_or("unknown"),
            message = %error.message.trim(),
            "OA service returned an error element"
        );
    }

    let records = response.records.map(|r| r.record).unwrap_or_default();

    Ok(records
        .into_iter()
        .filter_map(|record| {
            let id = record.id?;
            let download_links = record
                .links
                .into_iter()
                .filter_map(|link| {
                    let url = link.href.filter(|href| !href.is_empty())?;
                    Some(DownloadLink {
                        format: link.format.unwrap_or_default(),
                        url,
                    })
                })
                .collect();

            Some((
                bare_pmcid(&id).to_string(),
                OaRecordStatus {
                    license: record
                        .license
                        .unwrap_or_else(|| UNKNOWN_LICENSE.to_string()),
                    download_links,
                },
            ))
        })
        .collect())
}

/// Counts reported after resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullTextSummary {
    pub with_fulltext: usize,
    pub open_access: usize,
}

impl FullTextSummary {
    pub fn from_articles(articles: &[Article]) -> Self {
        Self {
            with_fulltext: articles.iter().filter(|a| a.has_fulltext()).count(),
            open_access: articles.iter().filter(|a| a.is_open_access()).count(),
        }
    }
}

/// Client for the PMC Open Access service
#[derive(Debug, Clone)]
pub struct PmcOaService {
    client: Arc<HttpClient>,
    identity: NcbiIdentity,
    service_url: String,
    status_delay: Duration,
}

impl PmcOaService {
    pub fn new(client: Arc<HttpClient>, identity: NcbiIdentity) -> Self {
        Self {
            client,
            identity,
            service_url: DEFAULT_OA_SERVICE_URL.to_string(),
            status_delay: DEFAULT_STATUS_DELAY,
        }
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    /// Build the status URL for a batch of PMC ids (sent without prefix)
    pub fn build_status_url(&self, pmcids: &[&str]) -> String {
        let ids = pmcids
            .iter()
            .map(|id| bare_pmcid(id))
            .collect::<Vec<_>>()
            .join(",");

        let mut params = vec![("id", ids)];
        params.extend(self.identity.params());

        format!("{}?{}", self.service_url, encode_params(&params))
    }

    /// Query the OA service for one batch
    pub async fn check_batch(
        &self,
        pmcids: &[&str],
    ) -> Result<HashMap<String, OaRecordStatus>, SourceError> {
        let url = self.build_status_url(pmcids);
        let xml = self
            .client
            .get_text(&url)
            .await
            .map_err(|e| SourceError::Network(format!("Failed to check PMC OA status: {}", e)))?;

        parse_oa_response(&xml)
    }

    /// Resolve full-text availability for every article in place
    pub async fn resolve(&self, articles: &mut [Article]) -> FullTextSummary {
        info!("Checking full-text availability...");

        let linked = attach_pmc_links(articles);
        debug!(linked, "Attached PMC links");

        self.classify_open_access(articles).await;

        let via_doi = attach_doi_links(articles);
        debug!(via_doi, "Attached DOI links");

        let summary = FullTextSummary::from_articles(articles);
        info!(
            "Found full-text links for {} articles ({} open access)",
            summary.with_fulltext, summary.open_access
        );
        summary
    }

    /// Classify every PMC link still marked unknown.
    ///
    /// Matched records become open; the rest of a successfully checked batch
    /// becomes closed. A failed batch keeps its members unknown.
    pub async fn classify_open_access(&self, articles: &mut [Article]) {
        let pending: Vec<usize> = articles
            .iter()
            .enumerate()
            .filter(|(_, a)| needs_status_check(a))
            .map(|(i, _)| i)
            .collect();

        if pending.is_empty() {
            return;
        }

        let total_batches = pending.len().div_ceil(OA_BATCH_SIZE);
        for (index, batch) in pending.chunks(OA_BATCH_SIZE).enumerate() {
            debug!(
                "Checking Open Access status, batch {}/{} ({} articles)",
                index + 1,
                total_batches,
                batch.len()
            );

            tokio::time::sleep(self.status_delay).await;

            let pmcids: Vec<&str> = batch
                .iter()
                .filter_map(|&i| articles[i].pmc_id.as_deref())
                .collect();

            let statuses = match self.check_batch(&pmcids).await {
                Ok(statuses) => statuses,
                Err(e) => {
                    warn!(batch = index + 1, error = %e, "Open Access check failed, leaving batch unknown");
                    continue;
                }
            };

            for &i in batch {
                let article = &mut articles[i];
                let status = article
                    .pmc_id
                    .as_deref()
                    .and_then(|id| statuses.get(bare_pmcid(id)));

                if let Some(fulltext) = article.fulltext.as_mut() {
                    match status {
                        Some(status) => {
                            fulltext.access_type = AccessType::Open;
                            fulltext.license = Some(status.license.clone());
                            fulltext.download_links = status.download_links.clone();
                        }
                        None => fulltext.access_type = AccessType::Closed,
                    }
                }
            }
        }
    }
}

fn is_pmc_fulltext(article: &Article) -> bool {
    article
        .fulltext
        .as_ref()
        .is_some_and(|f| f.source == PMC_SOURCE)
}

fn needs_status_check(article: &Article) -> bool {
    article.pmc_id.is_some()
        && article
            .fulltext
            .as_ref()
            .is_some_and(|f| f.source == PMC_SOURCE && f.access_type == AccessType::Unknown)
}

/// Give every article with a PMC id a provisional PMC link.
///
/// Articles that already carry a PMC record are left untouched. Returns the
/// number of links added.
pub fn attach_pmc_links(articles: &mut [Article]) -> usize {
    let mut added = 0;
    for article in articles.iter_mut() {
        if is_pmc_fulltext(article) {
            continue;
        }
        let Some(pmcid) = article.pmc_id.as_deref().filter(|id| !id.trim().is_empty()) else {
            continue;
        };

        let pmcid = normalize_pmcid(pmcid);
        article.fulltext = Some(FullText::provisional(pmc_article_url(&pmcid), PMC_SOURCE));
        article.pmc_id = Some(pmcid);
        added += 1;
    }
    added
}

/// Give articles without full text but with a DOI a resolver link.
/// Returns the number of links added.
pub fn attach_doi_links(articles: &mut [Article]) -> usize {
    let mut added = 0;
    for article in articles.iter_mut().filter(|a| a.fulltext.is_none()) {
        if let Some(doi) = article.doi.as_deref().filter(|d| !d.trim().is_empty()) {
            article.fulltext = Some(FullText::provisional(doi_url(doi), DOI_SOURCE));
            added += 1;
        }
    }
    added
}
