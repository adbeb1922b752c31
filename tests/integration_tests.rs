//! Integration tests for PubMed Harvester
//!
//! These tests run the full pipeline against local mock NCBI endpoints.

use chrono::NaiveDate;
use mockito::{Matcher, Server, ServerGuard};
use pubmed_harvester::config::Config;
use pubmed_harvester::models::{AccessType, DateWindow, SearchCriteria, TermCategory};
use pubmed_harvester::utils::write_report;
use pubmed_harvester::Harvester;

fn test_config(server: &ServerGuard) -> Config {
    let mut config = Config::default();
    config.endpoints.eutils_base_url = server.url();
    config.endpoints.oa_service_url = format!("{}/oa.fcgi", server.url());
    config.rate_limits.fetch_delay_ms = 0;
    config.rate_limits.status_delay_ms = 0;
    config.ncbi.email = "test@example.org".to_string();
    config
}

fn criteria() -> SearchCriteria {
    SearchCriteria::builder()
        .term(TermCategory::Descriptor, "Breast Neoplasms")
        .terms(TermCategory::Author, ["Smith J", "Lee K"])
        .build()
        .unwrap()
}

fn window() -> DateWindow {
    DateWindow::days_back(30, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap())
}

fn esearch_body(count: usize, ids: &[String]) -> String {
    let ids: String = ids.iter().map(|id| format!("<Id>{}</Id>", id)).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" ?>
<eSearchResult><Count>{}</Count><RetMax>{}</RetMax><RetStart>0</RetStart><IdList>{}</IdList></eSearchResult>"#,
        count,
        count,
        ids
    )
}

fn record(pmid: &str, pmc: Option<&str>, doi: Option<&str>) -> String {
    let mut article_ids = format!(r#"<ArticleId IdType="pubmed">{}</ArticleId>"#, pmid);
    if let Some(doi) = doi {
        article_ids.push_str(&format!(r#"<ArticleId IdType="doi">{}</ArticleId>"#, doi));
    }
    if let Some(pmc) = pmc {
        article_ids.push_str(&format!(r#"<ArticleId IdType="pmc">{}</ArticleId>"#, pmc));
    }

    format!(
        r#"<PubmedArticle>
  <MedlineCitation Status="MEDLINE" Owner="NLM">
    <PMID Version="1">{pmid}</PMID>
    <Article PubModel="Print">
      <Journal>
        <JournalIssue CitedMedium="Internet"><PubDate><Year>2024</Year><Month>Mar</Month></PubDate></JournalIssue>
        <Title>Journal of Tests</Title>
      </Journal>
      <ArticleTitle>Article {pmid}</ArticleTitle>
      <Abstract><AbstractText>Abstract for {pmid}.</AbstractText></Abstract>
      <AuthorList CompleteYN="Y">
        <Author ValidYN="Y"><LastName>Smith</LastName><ForeName>Jane</ForeName><Initials>J</Initials></Author>
      </AuthorList>
    </Article>
    <MeshHeadingList>
      <MeshHeading><DescriptorName UI="D001943" MajorTopicYN="Y">Breast Neoplasms</DescriptorName></MeshHeading>
    </MeshHeadingList>
  </MedlineCitation>
  <PubmedData><ArticleIdList>{article_ids}</ArticleIdList></PubmedData>
</PubmedArticle>"#
    )
}

fn efetch_body(records: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
{}
</PubmedArticleSet>"#,
        records.join("\n")
    )
}

fn ids(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
    range.map(|i| i.to_string()).collect()
}

#[tokio::test]
async fn test_zero_results_makes_no_fetch_requests() {
    let mut server = Server::new_async().await;

    let search = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("db".into(), "pubmed".into()),
            Matcher::UrlEncoded("datetype".into(), "pdat".into()),
            Matcher::UrlEncoded("mindate".into(), "2024/03/01".into()),
            Matcher::UrlEncoded("maxdate".into(), "2024/03/31".into()),
            Matcher::UrlEncoded(
                "term".into(),
                "Breast Neoplasms[MeSH Terms] AND (Smith J[Author] OR Lee K[Author])".into(),
            ),
            Matcher::UrlEncoded("email".into(), "test@example.org".into()),
        ]))
        .with_status(200)
        .with_body(esearch_body(0, &[]))
        .create_async()
        .await;

    let fetch = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let harvester = Harvester::from_config(&test_config(&server)).unwrap();
    let report = harvester.run(&criteria(), &window(), 1000).await;

    assert!(report.articles.is_empty());
    assert_eq!(report.search_info.total_matches, 0);
    assert_eq!(report.search_info.total_articles, 0);

    search.assert_async().await;
    fetch.assert_async().await;
}

#[tokio::test]
async fn test_search_failure_yields_empty_report() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let harvester = Harvester::from_config(&test_config(&server)).unwrap();
    let report = harvester.run(&criteria(), &window(), 1000).await;

    assert!(report.articles.is_empty());
    assert_eq!(report.search_info.total_matches, 0);
}

#[tokio::test]
async fn test_failed_batch_is_skipped() {
    let mut server = Server::new_async().await;
    let all_ids = ids(1..=450);

    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(esearch_body(450, &all_ids))
        .create_async()
        .await;

    let batch_one = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), all_ids[..200].join(",")))
        .with_status(200)
        .with_body(efetch_body(
            &all_ids[..200]
                .iter()
                .map(|id| record(id, None, None))
                .collect::<Vec<_>>(),
        ))
        .expect(1)
        .create_async()
        .await;

    let batch_two = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), all_ids[200..400].join(",")))
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let batch_three = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), all_ids[400..].join(",")))
        .with_status(200)
        .with_body(efetch_body(
            &all_ids[400..]
                .iter()
                .map(|id| record(id, None, None))
                .collect::<Vec<_>>(),
        ))
        .expect(1)
        .create_async()
        .await;

    let harvester = Harvester::from_config(&test_config(&server)).unwrap();
    let report = harvester.run(&criteria(), &window(), 1000).await;

    batch_one.assert_async().await;
    batch_two.assert_async().await;
    batch_three.assert_async().await;

    assert_eq!(report.search_info.total_matches, 450);
    assert_eq!(report.articles.len(), 250);
    assert_eq!(report.search_info.total_articles, 250);
    assert_eq!(report.articles[0].pmid, "1");
    assert_eq!(report.articles[199].pmid, "200");
    assert_eq!(report.articles[200].pmid, "401");
    assert_eq!(report.articles[249].pmid, "450");
    assert!(report.articles.iter().all(|a| a.fulltext.is_none()));
}

#[tokio::test]
async fn test_end_to_end_open_and_closed_access() {
    let mut server = Server::new_async().await;
    let found = vec!["101".to_string(), "102".to_string(), "103".to_string()];

    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(esearch_body(3, &found))
        .create_async()
        .await;

    server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), "101,102,103".into()))
        .with_status(200)
        .with_body(efetch_body(&[
            record("101", Some("PMC1"), Some("10.1000/one")),
            record("102", Some("PMC2"), None),
            record("103", None, Some("10.1000/three")),
        ]))
        .create_async()
        .await;

    let oa = server
        .mock("GET", "/oa.fcgi")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("id".into(), "1,2".into()),
            Matcher::UrlEncoded("tool".into(), "pubmed_harvester".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"<OA><responseDate>2024-03-31 10:00:00</responseDate>
<request id="1,2">https://www.ncbi.nlm.nih.gov/pmc/utils/oa/oa.fcgi?id=1,2</request>
<records returned-count="1" total-count="1">
  <record id="PMC1" citation="J Tests. 2024" license="CC BY" retracted="no">
    <link format="tgz" updated="2024-03-01 00:00:00" href="ftp://ftp.ncbi.nlm.nih.gov/pub/pmc/oa_package/00/01/PMC1.tar.gz" />
  </record>
</records></OA>"#,
        )
        .expect(1)
        .create_async()
        .await;

    let harvester = Harvester::from_config(&test_config(&server)).unwrap();
    let report = harvester.run(&criteria(), &window(), 1000).await;

    oa.assert_async().await;
    assert_eq!(report.articles.len(), 3);

    let first = &report.articles[0];
    assert_eq!(first.title, "Article 101");
    assert_eq!(first.date, "2024-Mar");
    assert_eq!(first.authors_display, "Smith, Jane");
    assert_eq!(first.mesh_terms, vec!["Breast Neoplasms"]);
    let fulltext = first.fulltext.as_ref().unwrap();
    assert_eq!(fulltext.url, "https://www.ncbi.nlm.nih.gov/pmc/articles/PMC1/");
    assert_eq!(fulltext.source, "PMC");
    assert_eq!(fulltext.access_type, AccessType::Open);
    assert_eq!(fulltext.license.as_deref(), Some("CC BY"));
    assert_eq!(fulltext.download_links.len(), 1);
    assert_eq!(fulltext.download_links[0].format, "tgz");

    let second = report.articles[1].fulltext.as_ref().unwrap();
    assert_eq!(second.access_type, AccessType::Closed);
    assert!(second.license.is_none());
    assert!(second.download_links.is_empty());

    let third = report.articles[2].fulltext.as_ref().unwrap();
    assert_eq!(third.url, "https://doi.org/10.1000/three");
    assert_eq!(third.source, "Publisher (via DOI)");
    assert_eq!(third.access_type, AccessType::Unknown);

    assert_eq!(report.fulltext_count(), 3);
    assert_eq!(report.open_access_count(), 1);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pubmed_articles.json");
    write_report(&report, &path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["search_info"]["total_articles"], 3);
    assert_eq!(json["articles"][0]["fulltext"]["access_type"], "open");
    assert_eq!(json["articles"][1]["fulltext"]["access_type"], "closed");
}

#[tokio::test]
async fn test_status_check_failure_leaves_access_unknown() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(esearch_body(1, &["201".to_string()]))
        .create_async()
        .await;

    server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(efetch_body(&[record("201", Some("PMC77"), Some("10.1/x"))]))
        .create_async()
        .await;

    server
        .mock("GET", "/oa.fcgi")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let harvester = Harvester::from_config(&test_config(&server)).unwrap();
    let report = harvester.run(&criteria(), &window(), 1000).await;

    let fulltext = report.articles[0].fulltext.as_ref().unwrap();
    assert_eq!(fulltext.source, "PMC");
    assert_eq!(fulltext.access_type, AccessType::Unknown);
    assert_eq!(report.open_access_count(), 0);
}

#[tokio::test]
async fn test_resolve_is_idempotent() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(esearch_body(2, &["301".to_string(), "302".to_string()]))
        .create_async()
        .await;

    server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(efetch_body(&[
            record("301", Some("PMC31"), None),
            record("302", Some("32"), None),
        ]))
        .create_async()
        .await;

    // Only the first status check may reach the service
    let oa = server
        .mock("GET", "/oa.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), "31,32".into()))
        .with_status(200)
        .with_body(
            r#"<OA><records><record id="PMC31" license="CC0"><link format="pdf" href="ftp://example.org/PMC31.pdf"/></record></records></OA>"#,
        )
        .expect(1)
        .create_async()
        .await;

    let harvester = Harvester::from_config(&test_config(&server)).unwrap();
    let mut report = harvester.run(&criteria(), &window(), 1000).await;
    let first_pass = report.articles.clone();

    harvester.pmc().resolve(&mut report.articles).await;

    oa.assert_async().await;
    assert_eq!(report.articles, first_pass);
    assert_eq!(report.articles[0].fulltext.as_ref().unwrap().download_links.len(), 1);
    assert_eq!(
        report.articles[1].fulltext.as_ref().unwrap().access_type,
        AccessType::Closed
    );
    assert_eq!(report.articles[1].pmc_id.as_deref(), Some("PMC32"));
}

#[tokio::test]
async fn test_max_results_caps_identifiers() {
    let mut server = Server::new_async().await;
    let all_ids = ids(1..=5);

    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::UrlEncoded("retmax".into(), "2".into()))
        .with_status(200)
        .with_body(esearch_body(5, &all_ids))
        .create_async()
        .await;

    let fetch = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), "1,2".into()))
        .with_status(200)
        .with_body(efetch_body(&[record("1", None, None), record("2", None, None)]))
        .expect(1)
        .create_async()
        .await;

    let harvester = Harvester::from_config(&test_config(&server)).unwrap();
    let report = harvester.run(&criteria(), &window(), 2).await;

    fetch.assert_async().await;
    assert_eq!(report.search_info.total_matches, 5);
    assert_eq!(report.articles.len(), 2);
}

#[tokio::test]
async fn test_status_checks_run_in_batches_of_fifty() {
    let mut server = Server::new_async().await;
    let all_ids = ids(1..=120);

    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(esearch_body(120, &all_ids))
        .create_async()
        .await;

    server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(efetch_body(
            &all_ids
                .iter()
                .map(|id| record(id, Some(&format!("PMC{}", id)), None))
                .collect::<Vec<_>>(),
        ))
        .create_async()
        .await;

    let oa = server
        .mock("GET", "/oa.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"<OA><error code="idIsNotOpenAccess">not Open Access</error></OA>"#)
        .expect(3)
        .create_async()
        .await;

    let harvester = Harvester::from_config(&test_config(&server)).unwrap();
    let report = harvester.run(&criteria(), &window(), 1000).await;

    oa.assert_async().await;
    assert_eq!(report.articles.len(), 120);
    assert!(report.articles.iter().all(|a| {
        a.fulltext
            .as_ref()
            .is_some_and(|f| f.access_type == AccessType::Closed)
    }));
}

#[tokio::test]
async fn test_malformed_fetch_batch_is_skipped() {
    let mut server = Server::new_async().await;
    let all_ids = ids(1..=201);

    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(esearch_body(201, &all_ids))
        .create_async()
        .await;

    let broken = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), all_ids[..200].join(",")))
        .with_status(200)
        .with_body("<PubmedArticleSet><PubmedArticle><MedlineCitation></PubmedArticle>")
        .expect(1)
        .create_async()
        .await;

    let last = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), "201".into()))
        .with_status(200)
        .with_body(efetch_body(&[record("201", None, None)]))
        .expect(1)
        .create_async()
        .await;

    let harvester = Harvester::from_config(&test_config(&server)).unwrap();
    let report = harvester.run(&criteria(), &window(), 1000).await;

    broken.assert_async().await;
    last.assert_async().await;
    let pmids: Vec<&str> = report.articles.iter().map(|a| a.pmid.as_str()).collect();
    assert_eq!(pmids, ["201"]);
}
