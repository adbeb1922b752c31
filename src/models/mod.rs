//! Core data models for articles and search operations.

mod article;
mod search;

pub use article::{
    authors_display, pubmed_url, AccessType, Article, ArticleBuilder, AuthorName, DownloadLink,
    FullText, DISPLAY_AUTHOR_LIMIT, NOT_AVAILABLE,
};
pub use search::{
    CriteriaError, DateRange, DateWindow, SearchCriteria, SearchCriteriaBuilder, SearchInfo,
    SearchReport, SearchResult, TermCategory,
};
