//! Web search over the DuckDuckGo HTML endpoint.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, instrument, warn};
use url::Url;

use postcraft_shared::{PostcraftError, ResearchConfig, Result};

use crate::{DEFAULT_TIMEOUT_SECS, SearchDocument, WebSearch, build_client};

/// Origin that relative result links resolve against.
const RESULT_LINK_BASE: &str = "https://duckduckgo.com/";

/// Scrapes result titles, links and snippets from the HTML search page.
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(config: &ResearchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT_SECS)?,
            base_url: config.search_base_url.clone(),
            max_results: config.max_search_results,
        })
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    #[instrument(skip_all, fields(query = %query, max = self.max_results))]
    async fn search(&self, query: &str) -> Result<Vec<SearchDocument>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| PostcraftError::Network(format!("{}: {e}", self.base_url)))?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "search request failed");
            return Err(PostcraftError::Upstream(format!(
                "search failed: HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PostcraftError::Network(format!("search body read failed: {e}")))?;

        let documents = parse_results(&body, self.max_results);
        if documents.is_empty() {
            warn!("search returned no results");
        } else {
            debug!(count = documents.len(), "search complete");
        }
        Ok(documents)
    }
}

/// Extract up to `max_results` documents from a results page.
fn parse_results(html: &str, max_results: usize) -> Vec<SearchDocument> {
    let doc = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    doc.select(&result_sel)
        .filter_map(|result| {
            let link = result.select(&link_sel).next()?;
            let url = resolve_result_link(link.value().attr("href")?)?;
            let title = element_text(&link);
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default();

            (!title.is_empty()).then_some(SearchDocument {
                title,
                url,
                snippet,
            })
        })
        .take(max_results)
        .collect()
}

/// Resolve a result href, unwrapping `/l/?uddg=` redirect links.
fn resolve_result_link(href: &str) -> Option<String> {
    let base = Url::parse(RESULT_LINK_BASE).ok()?;
    let url = base.join(href).ok()?;

    if url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }

    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Whitespace-collapsed text content of an element.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
