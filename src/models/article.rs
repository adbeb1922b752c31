//! Article model representing one parsed PubMed record.

use serde::{Deserialize, Serialize};

/// Sentinel used for required text fields missing from a record
pub const NOT_AVAILABLE: &str = "N/A";

/// Number of authors shown in the display string before "et al."
pub const DISPLAY_AUTHOR_LIMIT: usize = 5;

/// Full-text access classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Open,
    Closed,
    Unknown,
}

impl AccessType {
    /// Console marker for this access type, if any
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            AccessType::Open => Some("[Open Access]"),
            AccessType::Closed => Some("[Closed Access]"),
            AccessType::Unknown => None,
        }
    }
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccessType::Open => "open",
            AccessType::Closed => "closed",
            AccessType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A downloadable full-text package advertised by the OA service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub format: String,
    pub url: String,
}

/// Full-text availability attached by the resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullText {
    /// Browse link to the full text
    pub url: String,

    /// Where the link points ("PMC", "Publisher (via DOI)")
    pub source: String,

    pub access_type: AccessType,

    /// License declared by the OA service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub download_links: Vec<DownloadLink>,
}

impl FullText {
    /// Provisional full-text record with unknown access
    pub fn provisional(url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
            access_type: AccessType::Unknown,
            license: None,
            download_links: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.access_type == AccessType::Open
    }
}

/// One author entry (family name required, given name optional)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorName {
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fore_name: Option<String>,
}

impl AuthorName {
    pub fn new(last_name: impl Into<String>, fore_name: Option<String>) -> Self {
        Self {
            last_name: last_name.into(),
            fore_name,
        }
    }
}

impl std::fmt::Display for AuthorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.fore_name {
            Some(fore) => write!(f, "{}, {}", self.last_name, fore),
            None => write!(f, "{}", self.last_name),
        }
    }
}

/// Build the capped author display string ("A; B; C; D; E et al.")
pub fn authors_display(authors: &[AuthorName]) -> String {
    let mut display = authors
        .iter()
        .take(DISPLAY_AUTHOR_LIMIT)
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    if authors.len() > DISPLAY_AUTHOR_LIMIT {
        display.push_str(" et al.");
    }
    display
}

/// A PubMed article
///
/// Created by the record parser with `fulltext` unset; the full-text
/// resolver attaches availability afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// PubMed identifier, copied verbatim from the record
    pub pmid: String,

    pub title: String,

    /// Full author list in record order
    pub authors: Vec<AuthorName>,

    /// First five authors, "et al." appended when truncated
    pub authors_display: String,

    pub journal: String,

    /// Partial publication date ("2024", "2024-Jan", "2024-Jan-05") or "N/A"
    pub date: String,

    pub r#abstract: String,

    /// MeSH descriptor names in record order
    pub mesh_terms: Vec<String>,

    pub doi: Option<String>,

    pub pmc_id: Option<String>,

    /// PubMed browse URL
    pub url: String,

    pub fulltext: Option<FullText>,
}

impl Article {
    /// Create an article with sentinel values for every optional field
    pub fn new(pmid: impl Into<String>) -> Self {
        let pmid = pmid.into();
        Self {
            url: pubmed_url(&pmid),
            pmid,
            title: NOT_AVAILABLE.to_string(),
            authors: Vec::new(),
            authors_display: String::new(),
            journal: NOT_AVAILABLE.to_string(),
            date: NOT_AVAILABLE.to_string(),
            r#abstract: String::new(),
            mesh_terms: Vec::new(),
            doi: None,
            pmc_id: None,
            fulltext: None,
        }
    }

    pub fn has_fulltext(&self) -> bool {
        self.fulltext.is_some()
    }

    pub fn is_open_access(&self) -> bool {
        self.fulltext.as_ref().is_some_and(FullText::is_open)
    }
}

/// PubMed browse URL for an identifier
pub fn pubmed_url(pmid: &str) -> String {
    format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)
}

/// Builder for constructing Article objects
#[derive(Debug, Clone)]
pub struct ArticleBuilder {
    article: Article,
}

impl ArticleBuilder {
    pub fn new(pmid: impl Into<String>) -> Self {
        Self {
            article: Article::new(pmid),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.article.title = title.into();
        self
    }

    /// Set authors; also refreshes the display string
    pub fn authors(mut self, authors: Vec<AuthorName>) -> Self {
        self.article.authors_display = authors_display(&authors);
        self.article.authors = authors;
        self
    }

    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.article.journal = journal.into();
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.article.date = date.into();
        self
    }

    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.article.r#abstract = abstract_text.into();
        self
    }

    pub fn mesh_terms(mut self, terms: Vec<String>) -> Self {
        self.article.mesh_terms = terms;
        self
    }

    pub fn doi(mut self, doi: Option<String>) -> Self {
        self.article.doi = doi;
        self
    }

    pub fn pmc_id(mut self, pmc_id: Option<String>) -> Self {
        self.article.pmc_id = pmc_id;
        self
    }

    pub fn build(self) -> Article {
        self.article
    }
}
