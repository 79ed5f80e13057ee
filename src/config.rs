//! Run configuration: built-in defaults, an optional YAML file, and the CLI.
//!
//! Precedence, lowest to highest: constants in this module, the YAML file
//! given with `--config`, then command-line flags and environment variables.
//!
//! # YAML file
//!
//! ```yaml
//! site: hedgepointhub.com.br/blog
//! term: ""
//! feed_title: Hedgepoint HUB – Novos Relatórios (via índice)
//! feed_link: https://www.hedgepointhub.com.br/blog/
//! feed_description: Feed não-oficial gerado a partir de resultados indexados em buscadores.
//! feed_self_url: https://example.github.io/hub-feed/feed.xml
//! market: pt-BR
//! ```

use crate::cli::Cli;
use crate::models::{FeedMeta, SearchQuery};
use serde::Deserialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_SITE: &str = "hedgepointhub.com.br/blog";
pub const DEFAULT_FEED_TITLE: &str = "Hedgepoint HUB – Novos Relatórios (via índice)";
pub const DEFAULT_FEED_LINK: &str = "https://www.hedgepointhub.com.br/blog/";
pub const DEFAULT_FEED_DESCRIPTION: &str =
    "Feed não-oficial gerado a partir de resultados indexados em buscadores.";
pub const DEFAULT_MARKET: &str = "pt-BR";

/// Optional overrides read from the `--config` YAML file.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub site: Option<String>,
    pub term: Option<String>,
    pub feed_title: Option<String>,
    pub feed_link: Option<String>,
    pub feed_description: Option<String>,
    pub feed_self_url: Option<String>,
    pub market: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub query: SearchQuery,
    pub feed: FeedMeta,
    /// Bing API key; `None` means scrape-only mode.
    pub api_key: Option<String>,
    pub api_endpoint: Url,
    pub html_endpoint: Url,
    pub market: String,
    pub timeout: Duration,
    pub output: PathBuf,
}

impl Settings {
    /// Merge defaults, the optional YAML file and CLI/env values.
    #[instrument(level = "info", skip_all)]
    pub async fn load(cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let file = match &cli.config {
            Some(path) => read_file_config(path).await?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    fn resolve(cli: &Cli, file: FileConfig) -> Result<Self, Box<dyn Error>> {
        if cli.timeout_secs == 0 {
            return Err("timeout must be at least one second".into());
        }

        let api_key = cli
            .bing_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        Ok(Self {
            query: SearchQuery::new(
                file.site.unwrap_or_else(|| DEFAULT_SITE.to_string()),
                file.term.unwrap_or_default(),
            ),
            feed: FeedMeta {
                title: file.feed_title.unwrap_or_else(|| DEFAULT_FEED_TITLE.to_string()),
                link: file.feed_link.unwrap_or_else(|| DEFAULT_FEED_LINK.to_string()),
                description: file
                    .feed_description
                    .unwrap_or_else(|| DEFAULT_FEED_DESCRIPTION.to_string()),
                self_url: file.feed_self_url.filter(|u| !u.trim().is_empty()),
            },
            api_key,
            api_endpoint: Url::parse(&cli.api_endpoint)?,
            html_endpoint: Url::parse(&cli.html_endpoint)?,
            market: cli
                .market
                .clone()
                .or(file.market)
                .unwrap_or_else(|| DEFAULT_MARKET.to_string()),
            timeout: Duration::from_secs(cli.timeout_secs),
            output: cli.output.clone(),
        })
    }
}

async fn read_file_config(path: &Path) -> Result<FileConfig, Box<dyn Error>> {
    let raw = fs::read_to_string(path).await?;
    let config: FileConfig = serde_yaml::from_str(&raw)?;
    info!(path = %path.display(), "Loaded configuration file");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["hedgepoint_hub_feed"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&cli(&["--bing-api-key", ""]), FileConfig::default()).unwrap();

        assert_eq!(settings.query, SearchQuery::new("hedgepointhub.com.br/blog", ""));
        assert_eq!(settings.feed.title, DEFAULT_FEED_TITLE);
        assert_eq!(settings.feed.link, DEFAULT_FEED_LINK);
        assert_eq!(settings.feed.self_url, None);
        assert_eq!(settings.market, "pt-BR");
        assert_eq!(settings.timeout, Duration::from_secs(25));
        assert_eq!(settings.api_key, None);
    }

    #[test]
    fn test_blank_key_means_no_credential() {
        let settings = Settings::resolve(&cli(&["--bing-api-key", "   "]), FileConfig::default()).unwrap();
        assert_eq!(settings.api_key, None);

        let settings = Settings::resolve(&cli(&["--bing-api-key", " k "]), FileConfig::default()).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_cli_market_beats_file() {
        let file = FileConfig {
            market: Some("en-US".to_string()),
            ..Default::default()
        };
        let settings = Settings::resolve(&cli(&["--market", "es-ES"]), file).unwrap();
        assert_eq!(settings.market, "es-ES");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Settings::resolve(&cli(&["--timeout-secs", "0"]), FileConfig::default()).is_err());
        assert!(Settings::resolve(&cli(&["--api-endpoint", "not a url"]), FileConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_load_yaml_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.yaml");
        std::fs::write(
            &path,
            "site: example.com/news\nterm: relatório\nfeed_title: Example\nfeed_self_url: https://example.com/feed.xml\nmarket: en-US\n",
        )
        .unwrap();

        let settings = Settings::load(&cli(&["-c", path.to_str().unwrap()])).await.unwrap();
        assert_eq!(settings.query, SearchQuery::new("example.com/news", "relatório"));
        assert_eq!(settings.feed.title, "Example");
        assert_eq!(settings.feed.link, DEFAULT_FEED_LINK);
        assert_eq!(settings.feed.self_url.as_deref(), Some("https://example.com/feed.xml"));
        assert_eq!(settings.market, "en-US");
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.yaml");
        std::fs::write(&path, "sitee: typo.example\n").unwrap();

        assert!(Settings::load(&cli(&["-c", path.to_str().unwrap()])).await.is_err());
    }
}
