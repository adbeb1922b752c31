//! Boolean query construction for PubMed search.
//!
//! Every term is tagged with its category's field qualifier, terms within a
//! category are OR-ed, and categories are AND-ed in [`TermCategory`] order:
//!
//! ```
//! use pubmed_harvester::models::{SearchCriteria, TermCategory};
//!
//! let criteria = SearchCriteria::builder()
//!     .term(TermCategory::Descriptor, "Breast Neoplasms")
//!     .terms(TermCategory::Author, ["Smith J", "Lee K"])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     criteria.to_query(),
//!     "Breast Neoplasms[MeSH Terms] AND (Smith J[Author] OR Lee K[Author])"
//! );
//! ```

use crate::models::{SearchCriteria, TermCategory};

/// Tag a single term with a category qualifier: `term[Qualifier]`
pub fn qualify(term: &str, category: TermCategory) -> String {
    format!("{}[{}]", term, category.qualifier())
}

/// OR-group for one category; parenthesized only when it has several terms
pub fn category_group(category: TermCategory, terms: &[String]) -> Option<String> {
    match terms {
        [] => None,
        [single] => Some(qualify(single, category)),
        many => Some(format!(
            "({})",
            many.iter()
                .map(|t| qualify(t, category))
                .collect::<Vec<_>>()
                .join(" OR ")
        )),
    }
}

impl SearchCriteria {
    /// Build the PubMed query string
    pub fn to_query(&self) -> String {
        self.iter()
            .filter_map(|(category, terms)| category_group(category, terms))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}
