//! # Hedgepoint HUB Feed
//!
//! Publishes a single-item RSS 2.0 feed pointing at the most recent
//! Hedgepoint HUB blog post, discovered through Bing's index of
//! `site:hedgepointhub.com.br/blog`.
//!
//! ## Features
//!
//! - Queries the Bing Web Search API when a key is configured
//! - Falls back to scraping Bing's public result page otherwise, or when the
//!   API fails or returns nothing usable
//! - Normalizes ISO, RFC 2822, relative ("2 days ago", "há 3 horas") and
//!   human-readable ("Sep 10, 2024", "10 de set. de 2024") dates to UTC
//! - Writes the feed atomically; a failed run never clobbers the last good feed
//!
//! ## Usage
//!
//! ```sh
//! BING_API_KEY=... hedgepoint_hub_feed -o public/feed.xml
//! ```
//!
//! ## Architecture
//!
//! One linear pass per invocation:
//! 1. **Querying**: ask each provider in priority order
//! 2. **Extracting**: pick the first result under the restricted site
//! 3. **Normalizing**: resolve the result's date against the run clock
//! 4. **Rendering**: serialize the channel and its single item
//! 5. **Output**: atomically replace the feed file

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dates;
mod error;
mod extractors;
mod models;
mod outputs;
mod pipeline;
mod providers;
mod utils;

use cli::Cli;
use config::Settings;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "hedgepoint_hub_feed starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(output = %args.output.display(), config = ?args.config, "Parsed CLI arguments");

    let settings = match Settings::load(&args).await {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e);
        }
    };
    info!(
        query = %settings.query.to_query_string(),
        market = %settings.market,
        structured_api = settings.api_key.is_some(),
        "Configuration loaded"
    );

    // A single clock reading anchors relative dates and lastBuildDate
    let now = Utc::now();

    match pipeline::execute(&settings, now).await {
        Ok(document) => {
            info!(
                path = %settings.output.display(),
                built_at = %document.built_at.to_rfc3339(),
                bytes = document.xml.len(),
                "Feed published"
            );
        }
        Err(e) => {
            error!(error = %e, "Feed build failed; previous feed left untouched");
            return Err(e);
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
