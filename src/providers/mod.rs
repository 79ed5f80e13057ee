//! Search providers queried for the newest indexed post.
//!
//! Each provider fetches raw output for a [`SearchQuery`] and nothing more;
//! parsing lives in [`crate::extractors`].
//!
//! | Provider | Module | Method | Notes |
//! |----------|--------|--------|-------|
//! | Bing Web Search API | [`bing_api`] | JSON API | Requires `BING_API_KEY` |
//! | Bing result page | [`bing_html`] | HTML scraping | Anonymous, last resort |
//!
//! Every request goes through one shared [`reqwest::Client`] built with an
//! explicit timeout; a timed-out call is reported as
//! [`SearchError::ProviderUnavailable`] like any other network failure.

pub mod bing_api;
pub mod bing_html;

use crate::error::SearchError;
use crate::models::{ProviderKind, RawProviderResult, SearchQuery};
use async_trait::async_trait;
use std::time::Duration;

/// A search backend able to run the site-restricted query once.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Tag attached to everything this provider produces.
    fn kind(&self) -> ProviderKind;

    /// Execute the query and return the unparsed response body.
    ///
    /// A single call is conclusive: implementations never retry.
    async fn fetch(&self, query: &SearchQuery) -> Result<RawProviderResult, SearchError>;
}

/// Build the HTTP client shared by all providers.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Map a transport-level reqwest failure onto the error taxonomy.
pub(crate) fn request_failed(provider: ProviderKind, e: reqwest::Error) -> SearchError {
    let reason = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    };
    SearchError::unavailable(provider, reason)
}
