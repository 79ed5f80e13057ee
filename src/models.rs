//! Data models shared across the feed pipeline.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SearchQuery`]: The site-restricted query issued once per run
//! - [`RawProviderResult`]: Unparsed provider output tagged with its origin
//! - [`CandidateRecord`]: An extracted result before date normalization
//! - [`CanonicalItem`]: The provider-agnostic record handed to the renderer
//! - [`FeedMeta`] and [`FeedDocument`]: Channel metadata and the rendered feed

use chrono::{DateTime, Utc};
use std::fmt;
use url::Url;

/// A site-restricted search, built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Host plus optional path prefix, e.g. `hedgepointhub.com.br/blog`.
    pub site: String,
    /// Free-text term appended after the `site:` operator. May be empty.
    pub term: String,
}

impl SearchQuery {
    pub fn new(site: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            term: term.into(),
        }
    }

    /// Render the query the way search engines expect it: `site:<site> <term>`.
    pub fn to_query_string(&self) -> String {
        format!("site:{} {}", self.site, self.term).trim().to_string()
    }

    /// Whether `url` falls under the site restriction.
    ///
    /// A leading `www.` is ignored on both sides, so `www.example.com/blog/x`
    /// matches a restriction of `example.com/blog`.
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.strip_prefix("www.").unwrap_or(host);
        let site = self.site.trim().trim_end_matches('/');
        let site = site.strip_prefix("www.").unwrap_or(site);
        if site.is_empty() {
            return false;
        }
        let candidate = format!("{}{}", host.to_ascii_lowercase(), url.path());
        let site = site.to_ascii_lowercase();
        candidate == site || candidate.starts_with(&format!("{site}/"))
    }
}

/// Which search provider produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Bing Web Search API (JSON, credentialed).
    BingApi,
    /// Bing public result page (HTML, anonymous).
    BingHtml,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::BingApi => f.write_str("bing_api"),
            ProviderKind::BingHtml => f.write_str("bing_html"),
        }
    }
}

/// Body of a provider response, kept opaque until extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPayload {
    /// JSON returned by a structured search API.
    Structured(String),
    /// HTML of a human-oriented result page.
    Markup(String),
}

/// Raw output of a single provider call. Consumed once by extraction.
#[derive(Debug, Clone)]
pub struct RawProviderResult {
    pub provider: ProviderKind,
    /// The URL that was requested; relative links in markup resolve against it.
    pub source_url: Url,
    pub payload: RawPayload,
}

/// A result extracted from provider output, before its date is normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub title: String,
    pub link: Url,
    pub summary: String,
    /// Date text exactly as the provider exposed it; empty when absent.
    pub raw_date: String,
}

/// Publication time of an item: a valid instant or explicitly unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishedAt {
    Known(DateTime<Utc>),
    Unknown,
}

impl PublishedAt {
    pub fn known(&self) -> Option<DateTime<Utc>> {
        match self {
            PublishedAt::Known(dt) => Some(*dt),
            PublishedAt::Unknown => None,
        }
    }
}

/// The provider-agnostic record rendered into the feed.
///
/// `title` is non-empty and `link` is an absolute http(s) URL whenever one of
/// these exists; both are guaranteed by the extractors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalItem {
    pub title: String,
    pub link: Url,
    pub published_at: PublishedAt,
    pub summary: String,
}

impl CanonicalItem {
    pub fn from_candidate(candidate: CandidateRecord, published_at: PublishedAt) -> Self {
        Self {
            title: candidate.title,
            link: candidate.link,
            published_at,
            summary: candidate.summary,
        }
    }
}

/// Channel-level metadata of the published feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMeta {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Public URL of the feed itself, rendered as `atom:link rel="self"`.
    pub self_url: Option<String>,
}

/// A rendered single-item RSS document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    pub xml: String,
    pub built_at: DateTime<Utc>,
}
