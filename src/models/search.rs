//! Search criteria, date window, and run report models.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Article;

/// A field-qualified term category
///
/// Declaration order is the order categories are AND-joined in the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermCategory {
    Descriptor,
    Author,
    Affiliation,
    Journal,
    PublicationType,
    TitleAbstract,
}

impl TermCategory {
    pub const ALL: [TermCategory; 6] = [
        TermCategory::Descriptor,
        TermCategory::Author,
        TermCategory::Affiliation,
        TermCategory::Journal,
        TermCategory::PublicationType,
        TermCategory::TitleAbstract,
    ];

    /// PubMed field qualifier appended to every term of this category
    pub fn qualifier(&self) -> &'static str {
        match self {
            TermCategory::Descriptor => "MeSH Terms",
            TermCategory::Author => "Author",
            TermCategory::Affiliation => "Affiliation",
            TermCategory::Journal => "Journal",
            TermCategory::PublicationType => "Publication Type",
            TermCategory::TitleAbstract => "Title/Abstract",
        }
    }

    /// Key used in config files and in the output artifact
    pub fn key(&self) -> &'static str {
        match self {
            TermCategory::Descriptor => "mesh_terms",
            TermCategory::Author => "authors",
            TermCategory::Affiliation => "affiliations",
            TermCategory::Journal => "journals",
            TermCategory::PublicationType => "publication_types",
            TermCategory::TitleAbstract => "title_abstract",
        }
    }

    /// Human-readable label for console output
    pub fn label(&self) -> &'static str {
        match self {
            TermCategory::Descriptor => "MeSH terms",
            TermCategory::Author => "Authors",
            TermCategory::Affiliation => "Affiliations",
            TermCategory::Journal => "Journals",
            TermCategory::PublicationType => "Publication types",
            TermCategory::TitleAbstract => "Title/abstract terms",
        }
    }
}

impl std::fmt::Display for TermCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Errors raised while assembling search criteria
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("No search terms specified. Use --mesh-terms (or another term flag) or provide a config file.")]
    Empty,
}

/// Category → ordered, de-duplicated terms. At least one category is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchCriteria {
    terms: BTreeMap<TermCategory, Vec<String>>,
}

impl SearchCriteria {
    pub fn builder() -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::default()
    }

    /// Terms of one category (empty slice if none)
    pub fn terms(&self, category: TermCategory) -> &[String] {
        self.terms.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Populated categories in query order
    pub fn iter(&self) -> impl Iterator<Item = (TermCategory, &[String])> {
        self.terms.iter().map(|(c, t)| (*c, t.as_slice()))
    }

    /// Terms keyed by their config/artifact key
    pub fn to_keyed_map(&self) -> BTreeMap<&'static str, Vec<String>> {
        self.terms
            .iter()
            .map(|(category, terms)| (category.key(), terms.clone()))
            .collect()
    }
}

/// Builder for [`SearchCriteria`]
#[derive(Debug, Clone, Default)]
pub struct SearchCriteriaBuilder {
    terms: BTreeMap<TermCategory, Vec<String>>,
}

impl SearchCriteriaBuilder {
    /// Add one term; blanks and duplicates are ignored
    pub fn term(mut self, category: TermCategory, term: impl AsRef<str>) -> Self {
        let term = term.as_ref().trim();
        if term.is_empty() {
            return self;
        }
        let entry = self.terms.entry(category).or_default();
        if !entry.iter().any(|t| t == term) {
            entry.push(term.to_string());
        }
        self
    }

    /// Add several terms to one category
    pub fn terms<I, S>(self, category: TermCategory, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        terms
            .into_iter()
            .fold(self, |builder, term| builder.term(category, term))
    }

    pub fn build(self) -> Result<SearchCriteria, CriteriaError> {
        let terms: BTreeMap<_, _> = self
            .terms
            .into_iter()
            .filter(|(_, terms)| !terms.is_empty())
            .collect();

        if terms.is_empty() {
            return Err(CriteriaError::Empty);
        }

        Ok(SearchCriteria { terms })
    }
}

/// Inclusive publication-date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Window covering `days` days back from `today`
    pub fn days_back(days: u32, today: NaiveDate) -> Self {
        let start = today
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Start date as E-utilities expects it (YYYY/MM/DD)
    pub fn api_start(&self) -> String {
        self.start.format("%Y/%m/%d").to_string()
    }

    /// End date as E-utilities expects it (YYYY/MM/DD)
    pub fn api_end(&self) -> String {
        self.end.format("%Y/%m/%d").to_string()
    }
}

/// Result of one search call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Total matches declared by the server (may exceed `ids.len()`)
    pub total_count: u64,

    /// Identifiers in server order, capped at the requested maximum
    pub ids: Vec<String>,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Date range section of the output artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl From<&DateWindow> for DateRange {
    fn from(window: &DateWindow) -> Self {
        Self {
            start_date: window.start.format("%Y-%m-%d").to_string(),
            end_date: window.end.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Search metadata written alongside the articles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchInfo {
    pub terms: BTreeMap<String, Vec<String>>,
    pub query: String,
    pub generated_on: String,
    pub date_range: DateRange,
    pub total_matches: u64,
    pub total_articles: usize,
}

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub search_info: SearchInfo,
    pub articles: Vec<Article>,
}

impl SearchReport {
    pub fn new(
        criteria: &SearchCriteria,
        query: impl Into<String>,
        window: &DateWindow,
        total_matches: u64,
        articles: Vec<Article>,
    ) -> Self {
        let terms = criteria
            .to_keyed_map()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        Self {
            search_info: SearchInfo {
                terms,
                query: query.into(),
                generated_on: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                date_range: DateRange::from(window),
                total_matches,
                total_articles: articles.len(),
            },
            articles,
        }
    }

    pub fn fulltext_count(&self) -> usize {
        self.articles.iter().filter(|a| a.has_fulltext()).count()
    }

    pub fn open_access_count(&self) -> usize {
        self.articles.iter().filter(|a| a.is_open_access()).count()
    }
}
