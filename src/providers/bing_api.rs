//! Bing Web Search API v7 client.
//!
//! Only constructed when a subscription key is configured. The key travels
//! in the `Ocp-Apim-Subscription-Key` header; a 401 or 403 answer is reported
//! as [`SearchError::ProviderAuth`] and never retried.

use super::{SearchProvider, request_failed};
use crate::error::SearchError;
use crate::models::{ProviderKind, RawPayload, RawProviderResult, SearchQuery};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::fmt;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/search";

pub struct BingApiClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    market: String,
}

impl BingApiClient {
    pub fn new(client: reqwest::Client, endpoint: Url, api_key: String, market: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            market,
        }
    }

    fn request_url(&self, query: &SearchQuery) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &query.to_query_string())
            .append_pair("mkt", &self.market)
            .append_pair("count", "10")
            .append_pair("responseFilter", "Webpages")
            .append_pair("freshness", "Week")
            .append_pair("textDecorations", "false")
            .append_pair("textFormat", "Raw");
        url
    }
}

// Keeps the subscription key out of logs.
impl fmt::Debug for BingApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BingApiClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("market", &self.market)
            .finish()
    }
}

#[async_trait]
impl SearchProvider for BingApiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::BingApi
    }

    #[instrument(level = "info", skip_all, fields(endpoint = %self.endpoint))]
    async fn fetch(&self, query: &SearchQuery) -> Result<RawProviderResult, SearchError> {
        let provider = self.kind();
        let url = self.request_url(query);

        let resp = self
            .client
            .get(url.clone())
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| request_failed(provider, e))?;

        let status = resp.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(SearchError::ProviderAuth {
                provider,
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(SearchError::unavailable(provider, format!("HTTP {status}")));
        }

        let body = resp.text().await.map_err(|e| request_failed(provider, e))?;
        info!(bytes = body.len(), "Fetched structured search response");

        Ok(RawProviderResult {
            provider,
            source_url: url,
            payload: RawPayload::Structured(body),
        })
    }
}
