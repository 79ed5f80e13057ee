//! Anonymous Bing result page client.
//!
//! Requests `https://www.bing.com/search?q=…&setlang=…&cc=…` the way a
//! desktop browser would and returns the raw HTML. No credentials; always the
//! last provider in the chain.

use super::{SearchProvider, request_failed};
use crate::error::SearchError;
use crate::models::{ProviderKind, RawPayload, RawProviderResult, SearchQuery};
use async_trait::async_trait;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://www.bing.com/search";

/// Bing serves a stripped-down page to unknown agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

#[derive(Debug)]
pub struct BingHtmlClient {
    client: reqwest::Client,
    endpoint: Url,
    market: String,
}

impl BingHtmlClient {
    pub fn new(client: reqwest::Client, endpoint: Url, market: String) -> Self {
        Self {
            client,
            endpoint,
            market,
        }
    }

    fn request_url(&self, query: &SearchQuery) -> Url {
        // "pt-BR" -> setlang=pt-BR, cc=br
        let country = self
            .market
            .rsplit('-')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &query.to_query_string())
            .append_pair("setlang", &self.market)
            .append_pair("cc", &country);
        url
    }
}

#[async_trait]
impl SearchProvider for BingHtmlClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::BingHtml
    }

    #[instrument(level = "info", skip_all, fields(endpoint = %self.endpoint))]
    async fn fetch(&self, query: &SearchQuery) -> Result<RawProviderResult, SearchError> {
        let provider = self.kind();
        let url = self.request_url(query);

        let resp = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .header(reqwest::header::ACCEPT, "text/html")
            .send()
            .await
            .map_err(|e| request_failed(provider, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::unavailable(provider, format!("HTTP {status}")));
        }

        let body = resp.text().await.map_err(|e| request_failed(provider, e))?;
        info!(bytes = body.len(), "Fetched search result page");

        Ok(RawProviderResult {
            provider,
            source_url: url,
            payload: RawPayload::Markup(body),
        })
    }
}
