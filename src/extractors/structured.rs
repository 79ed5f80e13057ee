//! Bing Web Search API response parsing.
//!
//! Only the `webPages.value` list is read. Field names follow the v7 API
//! (`name`, `url`, `snippet`, `datePublished`, `dateLastCrawled`); the
//! shorter `title`/`date` spellings are accepted as aliases.

use super::canonical_link;
use crate::models::{CandidateRecord, SearchQuery};
use crate::utils::collapse_whitespace;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "webPages")]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Deserialize)]
struct WebPage {
    #[serde(alias = "title")]
    name: Option<String>,
    url: Option<String>,
    snippet: Option<String>,
    #[serde(rename = "datePublished", alias = "date")]
    date_published: Option<String>,
    #[serde(rename = "dateLastCrawled")]
    date_last_crawled: Option<String>,
}

/// Map the first usable API entry onto a [`CandidateRecord`].
///
/// Entries without a title, without an absolute link, or outside the site
/// restriction are skipped. A missing date yields an empty `raw_date`.
pub fn extract(body: &str, query: &SearchQuery) -> Option<CandidateRecord> {
    let response: SearchResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Structured search response is not valid JSON");
            return None;
        }
    };

    response
        .web_pages?
        .value
        .into_iter()
        .find_map(|page| to_candidate(page, query))
}

fn to_candidate(page: WebPage, query: &SearchQuery) -> Option<CandidateRecord> {
    let title = collapse_whitespace(page.name.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }
    let link = canonical_link(page.url.as_deref()?, None)?;
    if !query.matches(&link) {
        return None;
    }

    let raw_date = page
        .date_published
        .filter(|d| !d.trim().is_empty())
        .or(page.date_last_crawled)
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    Some(CandidateRecord {
        title,
        link,
        summary: collapse_whitespace(page.snippet.as_deref().unwrap_or_default()),
        raw_date,
    })
}
