//! EFetch XML record parsing.
//!
//! A fetch response is split into its `<PubmedArticle>` elements with a streaming
//! reader, and each record is deserialized on its own. Every field is optional in
//! the XML types; missing values map to the documented sentinels, so the only way a
//! record fails is a structurally broken fragment, which drops that record alone.

use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::models::{Article, ArticleBuilder, AuthorName, NOT_AVAILABLE};
use crate::sources::SourceError;

const RECORD_TAG: &[u8] = b"PubmedArticle";

/// Parse every `<PubmedArticle>` in an EFetch response.
///
/// Fails only if the response as a whole is not well-formed XML; records that fail
/// individually are logged and skipped.
pub fn parse_articles(xml: &str) -> Result<Vec<Article>, SourceError> {
    let records = split_records(xml)?;
    let total = records.len();

    let articles: Vec<Article> = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match parse_record(record) {
            Ok(article) => Some(article),
            Err(e) => {
                warn!(record = index + 1, error = %e, "Error parsing article, skipping");
                None
            }
        })
        .collect();

    debug!(parsed = articles.len(), total, "Parsed fetch response");
    Ok(articles)
}

/// Split a response into raw `<PubmedArticle>` fragments, in document order
pub fn split_records(xml: &str) -> Result<Vec<&str>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut records = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == RECORD_TAG => {
                let start = tag_start(xml, reader.buffer_position() as usize);
                reader.read_to_end(e.name())?;
                let end = reader.buffer_position() as usize;
                records.push(&xml[start..end]);
            }
            Event::Empty(e) if e.name().as_ref() == RECORD_TAG => {
                let end = reader.buffer_position() as usize;
                records.push(&xml[tag_start(xml, end)..end]);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

/// Offset of the `<` opening the tag that ends at `tag_end`
fn tag_start(xml: &str, tag_end: usize) -> usize {
    xml[..tag_end].rfind('<').unwrap_or(0)
}

/// Parse one raw `<PubmedArticle>` record
pub fn parse_record(xml: &str) -> Result<Article, SourceError> {
    let cleaned = strip_inline_tags(xml);
    let record: PubmedArticleXml = from_str(&cleaned)?;
    Ok(record.into_article())
}

/// Remove inline formatting tags that split text nodes in titles and abstracts
pub fn strip_inline_tags(xml: &str) -> Cow<'_, str> {
    static INLINE_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = INLINE_TAG_REGEX.get_or_init(|| {
        Regex::new(r"</?(?:i|b|u|sup|sub|em|strong|italic|bold)(?:\s[^>]*)?>")
            .expect("Failed to compile inline tag regex")
    });
    re.replace_all(xml, "")
}

// ===== EFetch XML types =====

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubmedArticleXml {
    MedlineCitation: Option<MedlineCitation>,
    PubmedData: Option<PubmedData>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MedlineCitation {
    PMID: Option<XmlText>,
    Article: Option<ArticleXml>,
    MeshHeadingList: Option<MeshHeadingList>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct ArticleXml {
    Journal: Option<Journal>,
    ArticleTitle: Option<XmlText>,
    Abstract: Option<AbstractXml>,
    AuthorList: Option<AuthorList>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct Journal {
    JournalIssue: Option<JournalIssue>,
    Title: Option<XmlText>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JournalIssue {
    PubDate: Option<PubDate>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubDate {
    Year: Option<XmlText>,
    Month: Option<XmlText>,
    Day: Option<XmlText>,
}

#[derive(Debug, Deserialize)]
struct AbstractXml {
    #[serde(rename = "AbstractText", default)]
    segments: Vec<XmlText>,
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<AuthorXml>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct AuthorXml {
    LastName: Option<XmlText>,
    ForeName: Option<XmlText>,
}

#[derive(Debug, Deserialize)]
struct MeshHeadingList {
    #[serde(rename = "MeshHeading", default)]
    headings: Vec<MeshHeading>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MeshHeading {
    DescriptorName: Option<XmlText>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubmedData {
    ArticleIdList: Option<ArticleIdList>,
}

#[derive(Debug, Deserialize)]
struct ArticleIdList {
    #[serde(rename = "ArticleId", default)]
    ids: Vec<ArticleId>,
}

#[derive(Debug, Deserialize)]
struct ArticleId {
    #[serde(rename = "@IdType", default)]
    id_type: String,
    #[serde(rename = "$text", default)]
    value: String,
}

/// Text content of an element plus its optional `Label` attribute.
///
/// Accepts plain strings as well as maps carrying `$text`/`$value` parts, so mixed
/// content and attributes never fail the record.
#[derive(Debug, Default)]
struct XmlText {
    label: Option<String>,
    text: String,
}

impl XmlText {
    /// Trimmed text, or `None` when empty
    fn value(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }
}

impl<'de> Deserialize<'de> for XmlText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, IgnoredAny, MapAccess, Visitor};

        struct XmlTextVisitor;

        impl<'de> Visitor<'de> for XmlTextVisitor {
            type Value = XmlText;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("element text content")
            }

            fn visit_str<E>(self, value: &str) -> Result<XmlText, E>
            where
                E: de::Error,
            {
                Ok(XmlText {
                    label: None,
                    text: value.to_string(),
                })
            }

            fn visit_string<E>(self, value: String) -> Result<XmlText, E>
            where
                E: de::Error,
            {
                Ok(XmlText {
                    label: None,
                    text: value,
                })
            }

            fn visit_unit<E>(self) -> Result<XmlText, E>
            where
                E: de::Error,
            {
                Ok(XmlText::default())
            }

            fn visit_map<M>(self, mut map: M) -> Result<XmlText, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut parts = Vec::new();
                let mut label = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "$text" | "$value" => parts.push(map.next_value::<String>()?),
                        "@Label" => label = Some(map.next_value::<String>()?),
                        attr if attr.starts_with('@') => {
                            map.next_value::<IgnoredAny>()?;
                        }
                        // Nested markup (<sc>, <mml:math>, ...) keeps its text
                        _ => parts.push(map.next_value::<XmlText>()?.text),
                    }
                }
                // Text pieces arrive trimmed, so rejoin them on word boundaries
                let text = parts
                    .iter()
                    .flat_map(|part| part.split_whitespace())
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok(XmlText { label, text })
            }
        }

        deserializer.deserialize_any(XmlTextVisitor)
    }
}

fn text_of(node: Option<&XmlText>) -> Option<&str> {
    node.and_then(XmlText::value)
}

impl PubmedArticleXml {
    fn into_article(self) -> Article {
        let citation = self.MedlineCitation.as_ref();
        let article = citation.and_then(|c| c.Article.as_ref());
        let journal = article.and_then(|a| a.Journal.as_ref());

        let pmid = text_of(citation.and_then(|c| c.PMID.as_ref())).unwrap_or(NOT_AVAILABLE);

        let title = text_of(article.and_then(|a| a.ArticleTitle.as_ref())).unwrap_or(NOT_AVAILABLE);

        let journal_title = text_of(journal.and_then(|j| j.Title.as_ref())).unwrap_or(NOT_AVAILABLE);

        let date = format_pub_date(
            journal
                .and_then(|j| j.JournalIssue.as_ref())
                .and_then(|ji| ji.PubDate.as_ref()),
        );

        let authors = article
            .and_then(|a| a.AuthorList.as_ref())
            .map(|al| al.authors.iter().filter_map(author_name).collect())
            .unwrap_or_default();

        let abstract_text = article
            .and_then(|a| a.Abstract.as_ref())
            .map(format_abstract)
            .unwrap_or_default();

        let mesh_terms = citation
            .and_then(|c| c.MeshHeadingList.as_ref())
            .map(|list| {
                list.headings
                    .iter()
                    .filter_map(|h| text_of(h.DescriptorName.as_ref()))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let ids = self
            .PubmedData
            .as_ref()
            .and_then(|d| d.ArticleIdList.as_ref())
            .map(|list| list.ids.as_slice())
            .unwrap_or(&[]);

        ArticleBuilder::new(pmid)
            .title(title)
            .authors(authors)
            .journal(journal_title)
            .date(date)
            .abstract_text(abstract_text)
            .mesh_terms(mesh_terms)
            .doi(first_id_of_type(ids, "doi"))
            .pmc_id(first_id_of_type(ids, "pmc"))
            .build()
    }
}

/// "Family, Given", "Family", or nothing when the family name is missing
fn author_name(author: &AuthorXml) -> Option<AuthorName> {
    let last = text_of(author.LastName.as_ref())?;
    let fore = text_of(author.ForeName.as_ref()).map(String::from);
    Some(AuthorName::new(last, fore))
}

/// Year, then "-Month", then "-Day", stopping at the first missing part
fn format_pub_date(date: Option<&PubDate>) -> String {
    let Some(date) = date else {
        return NOT_AVAILABLE.to_string();
    };
    let Some(year) = text_of(date.Year.as_ref()) else {
        return NOT_AVAILABLE.to_string();
    };

    let mut formatted = year.to_string();
    if let Some(month) = text_of(date.Month.as_ref()) {
        formatted.push('-');
        formatted.push_str(month);
        if let Some(day) = text_of(date.Day.as_ref()) {
            formatted.push('-');
            formatted.push_str(day);
        }
    }
    formatted
}

fn format_abstract(abstract_xml: &AbstractXml) -> String {
    abstract_xml
        .segments
        .iter()
        .map(|segment| {
            let text = segment.text.trim();
            match segment.label() {
                Some(label) => format!("{}: {}", label, text),
                None => text.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn first_id_of_type(ids: &[ArticleId], id_type: &str) -> Option<String> {
    ids.iter()
        .find(|id| id.id_type == id_type)
        .map(|id| id.value.trim().to_string())
        .filter(|v| !v.is_empty())
}
