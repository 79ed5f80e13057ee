//! Command-line interface definitions for the Hedgepoint HUB feed builder.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! All arguments can be provided via command-line flags or environment variables.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the feed builder.
///
/// # Examples
///
/// ```sh
/// # Scrape-only mode, writes ./feed.xml
/// hedgepoint_hub_feed
///
/// # With the Bing Web Search API and a custom output path
/// BING_API_KEY=... hedgepoint_hub_feed -o public/feed.xml
///
/// # Overriding query and channel metadata from a YAML file
/// hedgepoint_hub_feed -c feed.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path of the RSS file to (over)write
    #[arg(short, long, env = "FEED_OUTPUT", default_value = "feed.xml")]
    pub output: PathBuf,

    /// Optional path to a YAML file overriding the query and feed metadata
    #[arg(short, long, env = "FEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bing Web Search API subscription key; scrape-only mode when absent
    #[arg(long, env = "BING_API_KEY", hide_env_values = true)]
    pub bing_api_key: Option<String>,

    /// Bing Web Search API endpoint
    #[arg(long, env = "BING_API_ENDPOINT", default_value = crate::providers::bing_api::DEFAULT_ENDPOINT)]
    pub api_endpoint: String,

    /// Bing public result page endpoint
    #[arg(long, env = "BING_HTML_ENDPOINT", default_value = crate::providers::bing_html::DEFAULT_ENDPOINT)]
    pub html_endpoint: String,

    /// Market used for both providers (language-region)
    #[arg(long, env = "BING_MARKET")]
    pub market: Option<String>,

    /// Per-request network timeout in seconds
    #[arg(long, env = "FEED_TIMEOUT_SECS", default_value_t = 25)]
    pub timeout_secs: u64,
}
