//! Extraction of a single candidate record from raw provider output.
//!
//! Both submodules converge on [`CandidateRecord`]:
//!
//! | Payload | Module | Source |
//! |---------|--------|--------|
//! | JSON | [`structured`] | Bing Web Search API `webPages.value[]` |
//! | HTML | [`markup`] | Bing result page `li.b_algo` cards |
//!
//! The first qualifying result in provider order wins. Results are never
//! re-ranked by date: ranking is delegated to the search provider.

pub mod markup;
pub mod structured;

use crate::error::SearchError;
use crate::models::{CandidateRecord, RawPayload, RawProviderResult, SearchQuery};
use crate::utils::truncate_for_log;
use tracing::{debug, instrument};
use url::Url;

/// Extract the first result matching `query`'s site restriction.
///
/// # Errors
///
/// [`SearchError::NoMatchFound`] when the payload holds no result with a
/// title and an absolute link under the restricted site.
#[instrument(level = "debug", skip_all, fields(provider = %raw.provider))]
pub fn extract(raw: &RawProviderResult, query: &SearchQuery) -> Result<CandidateRecord, SearchError> {
    let candidate = match &raw.payload {
        RawPayload::Structured(body) => structured::extract(body, query),
        RawPayload::Markup(body) => markup::extract(body, &raw.source_url, query),
    };

    match candidate {
        Some(record) => {
            debug!(title = %record.title, link = %record.link, raw_date = %record.raw_date, "Extracted candidate");
            Ok(record)
        }
        None => {
            let body = match &raw.payload {
                RawPayload::Structured(body) | RawPayload::Markup(body) => body,
            };
            debug!(preview = %truncate_for_log(body, 300), "No matching result in payload");
            Err(SearchError::no_match(raw.provider, query.site.clone()))
        }
    }
}

/// Canonicalize an extracted link: absolute http(s), no query string, no fragment.
pub(crate) fn canonical_link(href: &str, base: Option<&Url>) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let mut url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url)
}
