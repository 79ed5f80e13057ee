//! Run orchestration: provider selection, extraction, normalization, rendering.
//!
//! A run is a single linear pass through
//! `Idle → Querying → Extracting → Normalizing → Rendering → Done`, with
//! `Failed` reachable from any state. The only branch is provider selection:
//! providers are tried in priority order and the first one whose output
//! yields a matching result wins.

use crate::config::Settings;
use crate::dates;
use crate::error::SearchError;
use crate::extractors;
use crate::models::{CanonicalItem, FeedDocument, FeedMeta, ProviderKind, SearchQuery};
use crate::outputs::{artifact, rss};
use crate::providers::bing_api::BingApiClient;
use crate::providers::bing_html::BingHtmlClient;
use crate::providers::{SearchProvider, build_http_client};
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt;
use tracing::{debug, error, info, instrument, warn};

/// Where a run currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Querying(ProviderKind),
    Extracting(ProviderKind),
    Normalizing,
    Rendering,
    Done,
    Failed(String),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::Querying(p) => write!(f, "querying({p})"),
            RunState::Extracting(p) => write!(f, "extracting({p})"),
            RunState::Normalizing => f.write_str("normalizing"),
            RunState::Rendering => f.write_str("rendering"),
            RunState::Done => f.write_str("done"),
            RunState::Failed(reason) => write!(f, "failed({reason})"),
        }
    }
}

/// Build the provider priority list for this run.
///
/// The structured API is only included when a credential is configured; the
/// scrape client is always present and always last.
pub fn provider_chain(settings: &Settings, client: reqwest::Client) -> Vec<Box<dyn SearchProvider>> {
    let mut chain: Vec<Box<dyn SearchProvider>> = Vec::with_capacity(2);
    match &settings.api_key {
        Some(key) => chain.push(Box::new(BingApiClient::new(
            client.clone(),
            settings.api_endpoint.clone(),
            key.clone(),
            settings.market.clone(),
        ))),
        None => info!("No Bing API key configured; using result page scraping only"),
    }
    chain.push(Box::new(BingHtmlClient::new(
        client,
        settings.html_endpoint.clone(),
        settings.market.clone(),
    )));
    chain
}

fn transition(state: &mut RunState, next: RunState) {
    debug!(from = %state, to = %next, "State transition");
    *state = next;
}

/// One feed-building run over a fixed provider chain.
pub struct Pipeline {
    providers: Vec<Box<dyn SearchProvider>>,
    query: SearchQuery,
    feed: FeedMeta,
    state: RunState,
}

impl Pipeline {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>, query: SearchQuery, feed: FeedMeta) -> Self {
        Self {
            providers,
            query,
            feed,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Run the pipeline once, resolving relative dates against `now`.
    ///
    /// # Errors
    ///
    /// [`SearchError::NoResultsAvailable`] when no provider yields a matching
    /// result. Individual provider failures are logged and skipped.
    #[instrument(level = "info", skip_all, fields(query = %self.query.to_query_string()))]
    pub async fn run(&mut self, now: DateTime<Utc>) -> Result<FeedDocument, SearchError> {
        let mut failures = Vec::new();
        let mut candidate = None;

        for provider in &self.providers {
            let kind = provider.kind();

            transition(&mut self.state, RunState::Querying(kind));
            let raw = match provider.fetch(&self.query).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(provider = %kind, error = %e, "Provider failed; falling through");
                    failures.push(e);
                    continue;
                }
            };

            transition(&mut self.state, RunState::Extracting(kind));
            match extractors::extract(&raw, &self.query) {
                Ok(record) => {
                    info!(provider = %kind, title = %record.title, link = %record.link, "Selected result");
                    candidate = Some(record);
                    break;
                }
                Err(e) => {
                    warn!(provider = %kind, error = %e, "No usable result; falling through");
                    failures.push(e);
                }
            }
        }

        let Some(record) = candidate else {
            let err = SearchError::NoResultsAvailable { failures };
            error!(error = %err, "All providers exhausted");
            transition(&mut self.state, RunState::Failed(err.to_string()));
            return Err(err);
        };

        transition(&mut self.state, RunState::Normalizing);
        let published_at = dates::normalize(&record.raw_date, now);
        if published_at.known().is_none() && !record.raw_date.is_empty() {
            debug!(raw_date = %record.raw_date, "Unrecognized date; leaving it unknown");
        }
        let item = CanonicalItem::from_candidate(record, published_at);

        transition(&mut self.state, RunState::Rendering);
        let document = rss::render(&item, &self.feed, now);

        transition(&mut self.state, RunState::Done);
        Ok(document)
    }
}

/// Build, run and publish one feed for `settings`.
///
/// On failure nothing is written and any previously published file stays
/// untouched.
#[instrument(level = "info", skip_all, fields(output = %settings.output.display()))]
pub async fn execute(settings: &Settings, now: DateTime<Utc>) -> Result<FeedDocument, Box<dyn Error>> {
    let client = build_http_client(settings.timeout)?;
    let mut pipeline = Pipeline::new(
        provider_chain(settings, client),
        settings.query.clone(),
        settings.feed.clone(),
    );

    let outcome = pipeline.run(now).await;
    info!(state = %pipeline.state(), "Pipeline finished");
    let document = outcome?;
    artifact::write_feed(&settings.output, &document).await?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawPayload, RawProviderResult};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use httpmock::prelude::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use url::Url;

    /// Canned provider that counts how often it is asked.
    struct FakeProvider {
        kind: ProviderKind,
        response: Result<RawPayload, ()>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn boxed(kind: ProviderKind, response: Result<RawPayload, ()>) -> (Box<dyn SearchProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = FakeProvider {
                kind,
                response,
                calls: Arc::clone(&calls),
            };
            (Box::new(provider), calls)
        }
    }

    #[async_trait]
    impl SearchProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn fetch(&self, _query: &SearchQuery) -> Result<RawProviderResult, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(payload) => Ok(RawProviderResult {
                    provider: self.kind,
                    source_url: Url::parse("https://www.bing.com/search").unwrap(),
                    payload: payload.clone(),
                }),
                Err(()) => Err(SearchError::unavailable(self.kind, "HTTP 503")),
            }
        }
    }

    fn query() -> SearchQuery {
        SearchQuery::new("hedgepointhub.com.br/blog", "")
    }

    fn meta() -> FeedMeta {
        FeedMeta {
            title: "Hedgepoint HUB".to_string(),
            link: "https://www.hedgepointhub.com.br/blog/".to_string(),
            description: "Feed".to_string(),
            self_url: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 12, 0, 0, 0).unwrap()
    }

    const API_Q3: &str = r#"{"webPages":{"value":[
        {"title":"Relatório Q3","url":"https://hedgepointhub.com.br/blog/q3","date":"2024-09-10T12:00:00Z"}
    ]}}"#;

    const HTML_Q2: &str = r#"<html><body><ol id="b_results">
        <li class="b_algo">
          <h2><a href="https://www.bing.com/ck/a?!&amp;&amp;p=f00&amp;u=a1aHR0cHM6Ly9oZWRnZXBvaW50aHViLmNvbS5ici9ibG9nL3Ey&amp;ntb=1">Relatório Q2</a></h2>
          <div class="b_caption"><p>Resumo ... 2 days ago ... mercado</p></div>
        </li>
    </ol></body></html>"#;

    const HTML_EMPTY: &str = r#"<html><body><ol id="b_results"></ol></body></html>"#;

    fn settings(server: &MockServer, api_key: Option<&str>, output: PathBuf) -> Settings {
        Settings {
            query: query(),
            feed: meta(),
            api_key: api_key.map(str::to_string),
            api_endpoint: Url::parse(&server.url("/v7.0/search")).unwrap(),
            html_endpoint: Url::parse(&server.url("/search")).unwrap(),
            market: "pt-BR".to_string(),
            timeout: Duration::from_secs(5),
            output,
        }
    }

    #[test]
    fn test_chain_without_credential_is_scrape_only() {
        let server = MockServer::start();
        let s = settings(&server, None, PathBuf::from("feed.xml"));
        let chain = provider_chain(&s, build_http_client(s.timeout).unwrap());
        let kinds: Vec<ProviderKind> = chain.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec![ProviderKind::BingHtml]);
    }

    #[test]
    fn test_chain_with_credential_tries_api_first() {
        let server = MockServer::start();
        let s = settings(&server, Some("key"), PathBuf::from("feed.xml"));
        let chain = provider_chain(&s, build_http_client(s.timeout).unwrap());
        let kinds: Vec<ProviderKind> = chain.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec![ProviderKind::BingApi, ProviderKind::BingHtml]);
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let (api, api_calls) = FakeProvider::boxed(ProviderKind::BingApi, Ok(RawPayload::Structured(API_Q3.to_string())));
        let (html, html_calls) = FakeProvider::boxed(ProviderKind::BingHtml, Ok(RawPayload::Markup(HTML_Q2.to_string())));

        let mut pipeline = Pipeline::new(vec![api, html], query(), meta());
        let doc = pipeline.run(now()).await.unwrap();

        assert_eq!(api_calls.load(Ordering::SeqCst), 1);
        assert_eq!(html_calls.load(Ordering::SeqCst), 0);
        assert!(doc.xml.contains("<title>Relatório Q3</title>"));
        assert_eq!(pipeline.state(), &RunState::Done);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_through() {
        let (api, api_calls) = FakeProvider::boxed(ProviderKind::BingApi, Err(()));
        let (html, html_calls) = FakeProvider::boxed(ProviderKind::BingHtml, Ok(RawPayload::Markup(HTML_Q2.to_string())));

        let mut pipeline = Pipeline::new(vec![api, html], query(), meta());
        let doc = pipeline.run(now()).await.unwrap();

        assert_eq!(api_calls.load(Ordering::SeqCst), 1);
        assert_eq!(html_calls.load(Ordering::SeqCst), 1);
        assert!(doc.xml.contains("<link>https://hedgepointhub.com.br/blog/q2</link>"));
    }

    #[tokio::test]
    async fn test_no_match_on_first_provider_falls_through() {
        let (api, _) = FakeProvider::boxed(
            ProviderKind::BingApi,
            Ok(RawPayload::Structured(r#"{"webPages":{"value":[]}}"#.to_string())),
        );
        let (html, html_calls) = FakeProvider::boxed(ProviderKind::BingHtml, Ok(RawPayload::Markup(HTML_Q2.to_string())));

        let mut pipeline = Pipeline::new(vec![api, html], query(), meta());
        assert!(pipeline.run(now()).await.is_ok());
        assert_eq!(html_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_providers_fail() {
        let (api, _) = FakeProvider::boxed(ProviderKind::BingApi, Err(()));
        let (html, _) = FakeProvider::boxed(ProviderKind::BingHtml, Ok(RawPayload::Markup(HTML_EMPTY.to_string())));

        let mut pipeline = Pipeline::new(vec![api, html], query(), meta());
        match pipeline.run(now()).await {
            Err(SearchError::NoResultsAvailable { failures }) => {
                assert_eq!(failures.len(), 2);
                assert!(matches!(failures[0], SearchError::ProviderUnavailable { .. }));
                assert!(matches!(failures[1], SearchError::NoMatchFound { .. }));
            }
            other => panic!("expected NoResultsAvailable, got {other:?}"),
        }
        assert!(matches!(pipeline.state(), RunState::Failed(_)));
    }

    #[tokio::test]
    async fn test_unknown_date_omits_pub_date() {
        let html = r#"<ol id="b_results"><li class="b_algo">
            <h2><a href="https://hedgepointhub.com.br/blog/q1">Relatório Q1</a></h2>
            <div class="b_caption"><p>Sem data no resumo</p></div>
        </li></ol>"#;
        let (scrape, _) = FakeProvider::boxed(ProviderKind::BingHtml, Ok(RawPayload::Markup(html.to_string())));

        let doc = Pipeline::new(vec![scrape], query(), meta()).run(now()).await.unwrap();
        assert!(!doc.xml.contains("pubDate"));
    }

    // Scenario A: structured API configured and answering.
    #[tokio::test]
    async fn test_structured_api_end_to_end() {
        let server = MockServer::start_async().await;
        let api = server
            .mock_async(|when, then| {
                when.method(GET).path("/v7.0/search").header("Ocp-Apim-Subscription-Key", "key");
                then.status(200).body(API_Q3);
            })
            .await;
        let html = server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(200).body(HTML_Q2);
            })
            .await;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("feed.xml");
        let doc = execute(&settings(&server, Some("key"), output.clone()), now())
            .await
            .unwrap();

        api.assert_async().await;
        assert_eq!(html.calls(), 0, "scrape fallback must not run after an API hit");
        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written, doc.xml);
        assert!(written.contains("<title>Relatório Q3</title>"));
        assert!(written.contains("<link>https://hedgepointhub.com.br/blog/q3</link>"));
        assert!(written.contains("<pubDate>Tue, 10 Sep 2024 12:00:00 +0000</pubDate>"));
    }

    // Scenario B: no credential, scrape fallback with a wrapped link and a relative date.
    #[tokio::test]
    async fn test_scrape_fallback_end_to_end() {
        let server = MockServer::start_async().await;
        let api = server
            .mock_async(|when, then| {
                when.method(GET).path("/v7.0/search");
                then.status(200).body(API_Q3);
            })
            .await;
        let html = server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(200).body(HTML_Q2);
            })
            .await;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("feed.xml");
        execute(&settings(&server, None, output.clone()), now()).await.unwrap();

        assert_eq!(api.calls(), 0, "API must not be queried without a key");
        html.assert_async().await;
        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains("<title>Relatório Q2</title>"));
        assert!(written.contains("<link>https://hedgepointhub.com.br/blog/q2</link>"));
        assert!(written.contains("<pubDate>Tue, 10 Sep 2024 00:00:00 +0000</pubDate>"));
    }

    // Scenario C: nothing usable anywhere; the published file must survive.
    #[tokio::test]
    async fn test_total_failure_leaves_previous_feed_untouched() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v7.0/search");
                then.status(401);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(200).body(HTML_EMPTY);
            })
            .await;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("feed.xml");
        let previous = "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>old</title></channel></rss>";
        std::fs::write(&output, previous).unwrap();

        let err = execute(&settings(&server, Some("bad-key"), output.clone()), now())
            .await
            .unwrap_err();

        let err = err.downcast::<SearchError>().unwrap();
        assert!(matches!(*err, SearchError::NoResultsAvailable { .. }));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), previous);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_total_failure_without_previous_feed_writes_nothing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search");
                then.status(503);
            })
            .await;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("feed.xml");
        assert!(execute(&settings(&server, None, output.clone()), now()).await.is_err());
        assert!(!output.exists());
    }
}
