use anyhow::{anyhow, Result};
use clap::Parser;
use pubmed_harvester::config::{
    create_sample_config, find_config_file, load_config, CliOverrides, Config,
};
use pubmed_harvester::models::{DateWindow, TermCategory};
use pubmed_harvester::utils::{print_results, print_summary, write_report};
use pubmed_harvester::Harvester;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXAMPLES: &str = "\
Examples:
  pubmed-harvester --mesh-terms \"Endometrial Neoplasms\" \"Ovarian Neoplasms\" --days 30
  pubmed-harvester --config pubmed-harvester.toml
  pubmed-harvester --mesh-terms \"Breast Neoplasms\" --authors \"Smith J\" \"Lee K\" --days 7 --output results.json
  pubmed-harvester --mesh-terms \"COVID-19\" --days 30 --max-results 10";

/// PubMed Harvester - Search PubMed by MeSH descriptors and other fields, with full-text links
#[derive(Parser, Debug)]
#[command(name = "pubmed-harvester")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search PubMed for recent articles and check full-text availability", long_about = None)]
#[command(after_help = EXAMPLES)]
struct Cli {
    /// MeSH terms to search for (space-separated)
    #[arg(long, num_args = 1.., value_name = "TERM")]
    mesh_terms: Option<Vec<String>>,

    /// Author names, e.g. "Smith J"
    #[arg(long, alias = "author", num_args = 1.., value_name = "NAME")]
    authors: Option<Vec<String>>,

    /// Author affiliations (institutions, organizations)
    #[arg(long, aliases = ["affiliation", "organizations"], num_args = 1.., value_name = "NAME")]
    affiliations: Option<Vec<String>>,

    /// Journal titles or abbreviations
    #[arg(long, alias = "journal", num_args = 1.., value_name = "JOURNAL")]
    journals: Option<Vec<String>>,

    /// Publication types, e.g. "Review", "Clinical Trial"
    #[arg(long, alias = "publication-type", num_args = 1.., value_name = "TYPE")]
    publication_types: Option<Vec<String>>,

    /// Free-text terms matched against title and abstract
    #[arg(long, num_args = 1.., value_name = "TERM")]
    title_abstract: Option<Vec<String>>,

    /// Number of past days to include in search [default: 30]
    #[arg(long, short)]
    days: Option<u32>,

    /// Maximum number of results to fetch [default: 1000]
    #[arg(long)]
    max_results: Option<usize>,

    /// Output JSON filename [default: pubmed_articles.json]
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Your email address for the NCBI API (recommended)
    #[arg(long)]
    email: Option<String>,

    /// Configuration file (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Create a sample configuration file and exit
    #[arg(long, value_name = "PATH")]
    create_config: Option<PathBuf>,

    /// Skip the per-article console listing
    #[arg(long)]
    no_display: bool,

    /// Enable verbose logging (-v debug, -vv trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let lists = [
            (TermCategory::Descriptor, &self.mesh_terms),
            (TermCategory::Author, &self.authors),
            (TermCategory::Affiliation, &self.affiliations),
            (TermCategory::Journal, &self.journals),
            (TermCategory::PublicationType, &self.publication_types),
            (TermCategory::TitleAbstract, &self.title_abstract),
        ];

        let terms: BTreeMap<_, _> = lists
            .into_iter()
            .filter_map(|(category, terms)| terms.clone().map(|t| (category, t)))
            .collect();

        CliOverrides {
            terms,
            days: self.days,
            max_results: self.max_results,
            output_file: self.output.clone(),
            email: self.email.clone(),
        }
    }

    /// Log level from flags, falling back to the configured level
    fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pubmed_harvester={}", level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.create_config {
        create_sample_config(path)?;
        println!("Sample configuration file created: {}", path.display());
        println!("Edit the file with your desired search parameters.");
        return Ok(());
    }

    // An explicit --config must exist; otherwise fall back to default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = match &config_path {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    init_tracing(cli.log_level(&config.logging.level));
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    config.apply_overrides(cli.overrides());

    let criteria = config.search.criteria().map_err(|e| {
        anyhow!(
            "{}\nUse --help for usage information or --create-config to create a sample config file.",
            e
        )
    })?;

    let days = config.search.days;
    let window = DateWindow::days_back(days, chrono::Local::now().date_naive());

    let harvester = Harvester::from_config(&config)?;
    let report = harvester
        .run(&criteria, &window, config.search.max_results)
        .await;

    if !cli.no_display {
        print_results(&report, days);
    }

    let output = &config.search.output_file;
    let saved = if report.articles.is_empty() {
        None
    } else {
        match write_report(&report, output) {
            Ok(()) => {
                println!("\nResults saved to: {}", output.display());
                Some(output.as_path())
            }
            Err(e) => {
                tracing::error!("Error saving to file: {}", e);
                None
            }
        }
    };

    if !cli.no_display {
        print_summary(&report, saved);
    }

    println!(
        "\nSearch completed. Found {} articles.",
        report.articles.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_parse_terms_and_numbers() {
        let cli = Cli::try_parse_from([
            "pubmed-harvester",
            "--mesh-terms",
            "Breast Neoplasms",
            "Ovarian Neoplasms",
            "--author",
            "Gilbert P",
            "--days",
            "45",
            "--max-results",
            "25",
        ])
        .unwrap();

        assert_eq!(
            cli.mesh_terms,
            Some(vec![
                "Breast Neoplasms".to_string(),
                "Ovarian Neoplasms".to_string()
            ])
        );
        assert_eq!(cli.authors, Some(vec!["Gilbert P".to_string()]));
        assert_eq!(cli.days, Some(45));
        assert_eq!(cli.max_results, Some(25));
    }

    #[test]
    fn test_unset_flags_are_none() {
        let cli = Cli::try_parse_from(["pubmed-harvester"]).unwrap();
        let overrides = cli.overrides();

        assert!(overrides.terms.is_empty());
        assert_eq!(overrides.days, None);
        assert_eq!(overrides.max_results, None);
        assert_eq!(overrides.output_file, None);
        assert_eq!(cli.log_level("warn"), "warn");
    }

    #[test]
    fn test_explicit_default_days_overrides_config() {
        let cli = Cli::try_parse_from(["pubmed-harvester", "--days", "30"]).unwrap();
        let mut config = Config::default();
        config.search.days = 7;

        config.apply_overrides(cli.overrides());
        assert_eq!(config.search.days, 30);
    }

    #[test]
    fn test_organizations_alias_maps_to_affiliations() {
        let cli = Cli::try_parse_from(["pubmed-harvester", "--organizations", "NIH"]).unwrap();
        let overrides = cli.overrides();
        assert_eq!(
            overrides.terms.get(&TermCategory::Affiliation),
            Some(&vec!["NIH".to_string()])
        );
    }

    #[test]
    fn test_log_level_flags() {
        let cli = Cli::try_parse_from(["pubmed-harvester", "-vv"]).unwrap();
        assert_eq!(cli.log_level("info"), "trace");

        let cli = Cli::try_parse_from(["pubmed-harvester", "-q"]).unwrap();
        assert_eq!(cli.log_level("info"), "error");

        assert!(Cli::try_parse_from(["pubmed-harvester", "-q", "-v"]).is_err());
    }
}
