//! Console report formatting.
//!
//! Article blocks are built as plain strings (optionally styled) so they can
//! be tested without a terminal; the `print_*` helpers write them to stdout.

use comfy_table::{presets, Attribute, Cell, Table};
use owo_colors::OwoColorize;
use std::io::{self, IsTerminal};
use std::path::Path;

use crate::models::{AccessType, Article, SearchReport};

/// Characters of abstract shown before "..."
pub const ABSTRACT_PREVIEW_WIDTH: usize = 200;

/// MeSH terms shown per article before "..."
pub const MESH_PREVIEW_COUNT: usize = 5;

const RULE_WIDTH: usize = 80;
const ARTICLE_RULE_WIDTH: usize = 40;

/// Check if stdout is a terminal.
#[inline]
pub fn is_terminal() -> bool {
    io::stdout().is_terminal()
}

/// Keep the longest prefix of `text` that fits in `max_width` columns,
/// appending "..." if anything was cut.
///
/// # Examples
///
/// ```
/// use pubmed_harvester::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Hello World", 5), "Hello...");
/// assert_eq!(truncate_with_ellipsis("Hi", 5), "Hi");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    let mut width = 0;
    for (idx, c) in text.char_indices() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(1);
        if width + w > max_width {
            return format!("{}...", &text[..idx]);
        }
        width += w;
    }
    text.to_string()
}

/// MeSH terms line content: first five, "..." appended when more exist
pub fn mesh_preview(terms: &[String]) -> String {
    let mut preview = terms
        .iter()
        .take(MESH_PREVIEW_COUNT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if terms.len() > MESH_PREVIEW_COUNT {
        preview.push_str("...");
    }
    preview
}

/// Format one numbered article block
pub fn format_article(index: usize, article: &Article, styled: bool) -> String {
    let mut lines = Vec::new();

    if styled {
        lines.push(format!("{}. {}", index, article.title.bold()));
    } else {
        lines.push(format!("{}. {}", index, article.title));
    }
    lines.push(format!("   Authors: {}", article.authors_display));
    lines.push(format!("   Journal: {}", article.journal));
    lines.push(format!("   Date: {}", article.date));
    lines.push(format!("   PMID: {}", article.pmid));
    lines.push(format!("   URL: {}", article.url));

    if !article.mesh_terms.is_empty() {
        lines.push(format!("   MeSH Terms: {}", mesh_preview(&article.mesh_terms)));
    }
    if !article.r#abstract.is_empty() {
        lines.push(format!(
            "   Abstract: {}",
            truncate_with_ellipsis(&article.r#abstract, ABSTRACT_PREVIEW_WIDTH)
        ));
    }
    if let Some(pmc_id) = &article.pmc_id {
        lines.push(format!("   PMC ID: {}", pmc_id));
    }

    if let Some(fulltext) = &article.fulltext {
        let marker = match (fulltext.access_type.marker(), styled) {
            (None, _) => String::new(),
            (Some(marker), false) => format!(" {}", marker),
            (Some(marker), true) if fulltext.access_type == AccessType::Open => {
                format!(" {}", marker.green())
            }
            (Some(marker), true) => format!(" {}", marker.red()),
        };
        lines.push(format!("   Full-text: {}{}", fulltext.url, marker));

        if !fulltext.download_links.is_empty() {
            let formats = fulltext
                .download_links
                .iter()
                .map(|link| link.format.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("   Downloads: {} available", formats));
        }
    }

    lines.push("-".repeat(ARTICLE_RULE_WIDTH));
    lines.join("\n")
}

/// Format the full article listing
pub fn format_results(report: &SearchReport, days: u32, styled: bool) -> String {
    if report.articles.is_empty() {
        return "No articles found.".to_string();
    }

    let mut out = format!(
        "\nFound {} articles matching: {} (past {} days)\n{}\n",
        report.articles.len(),
        report.search_info.query,
        days,
        "=".repeat(RULE_WIDTH)
    );

    for (i, article) in report.articles.iter().enumerate() {
        out.push('\n');
        out.push_str(&format_article(i + 1, article, styled));
        out.push('\n');
    }
    out
}

/// Print the article listing to stdout
pub fn print_results(report: &SearchReport, days: u32) {
    println!("{}", format_results(report, days, is_terminal()));
}

/// Summary table for the run
pub fn summary_table(report: &SearchReport, output: Option<&Path>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.set_header(vec![
        Cell::new("Summary").add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);

    let info = &report.search_info;
    table.add_row(vec![
        "Date range".to_string(),
        format!("{} to {}", info.date_range.start_date, info.date_range.end_date),
    ]);
    table.add_row(vec!["Total matches".to_string(), info.total_matches.to_string()]);
    table.add_row(vec!["Articles retrieved".to_string(), info.total_articles.to_string()]);
    table.add_row(vec![
        "Full-text links".to_string(),
        report.fulltext_count().to_string(),
    ]);
    table.add_row(vec![
        "Open access".to_string(),
        report.open_access_count().to_string(),
    ]);
    if let Some(path) = output {
        table.add_row(vec!["Saved to".to_string(), path.display().to_string()]);
    }
    table
}

/// Print the summary table to stdout
pub fn print_summary(report: &SearchReport, output: Option<&Path>) {
    println!("\n{}", summary_table(report, output));
}
