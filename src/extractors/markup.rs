//! Bing result page scraping.
//!
//! Result cards are `li.b_algo` elements holding an `h2 a` title link, a
//! `.b_caption p` snippet and, for recent pages, a `.news_dt` date label.
//! Bing reshuffles this layout regularly, so every element is looked up
//! through an ordered list of fallback selectors.
//!
//! Outbound links are usually wrapped in a click-tracking redirect of the
//! form `https://www.bing.com/ck/a?!&&p=…&u=a1<base64url>&ntb=1`; these are
//! unwrapped to the destination URL before canonicalization.

use super::canonical_link;
use crate::dates::{find_date_in_label, find_date_like};
use crate::models::{CandidateRecord, SearchQuery};
use crate::utils::collapse_whitespace;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

fn selectors(patterns: &[&str]) -> Vec<Selector> {
    patterns
        .iter()
        .map(|p| Selector::parse(p).expect("static selector parses"))
        .collect()
}

static CARD_SELECTORS: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["li.b_algo", "div.b_algo", "#b_results > li"]));
static LINK_SELECTORS: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["h2 a[href]", "h3 a[href]", "a.tilk[href]", "a[href]"]));
static HEADING_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["h2", "h3"]));
static SNIPPET_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[".b_caption p", ".b_lineclamp2", ".b_lineclamp3", ".b_algoSlug", "p"])
});
static DATE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&[".news_dt"]));

/// Query parameters that carry the destination of a redirect wrapper.
const REDIRECT_PARAMS: &[&str] = &["u", "uddg", "url", "q", "RU", "ru"];

/// Extract the first result card that links under the site restriction.
///
/// Cards without a title or an absolute link are skipped. Missing snippet
/// or date sub-elements become empty strings.
pub fn extract(body: &str, page_url: &Url, query: &SearchQuery) -> Option<CandidateRecord> {
    let document = Html::parse_document(body);

    let cards: Vec<ElementRef> = CARD_SELECTORS
        .iter()
        .map(|sel| document.select(sel).collect::<Vec<_>>())
        .find(|found| !found.is_empty())
        .unwrap_or_default();
    debug!(cards = cards.len(), "Located result cards");

    cards
        .into_iter()
        .enumerate()
        .find_map(|(index, card)| {
            let record = card_to_candidate(card, page_url, query);
            if record.is_none() {
                debug!(index, "Skipping result card");
            }
            record
        })
}

fn card_to_candidate(card: ElementRef, page_url: &Url, query: &SearchQuery) -> Option<CandidateRecord> {
    let anchor = first_match(card, &LINK_SELECTORS)?;

    let mut title = text_of(anchor);
    if title.is_empty() {
        title = first_match(card, &HEADING_SELECTORS)
            .map(text_of)
            .unwrap_or_default();
    }
    if title.is_empty() {
        return None;
    }

    let href = anchor.value().attr("href")?;
    let link = resolve_link(href, page_url, query)?;

    let summary = first_match(card, &SNIPPET_SELECTORS)
        .map(text_of)
        .unwrap_or_default();

    let raw_date = first_match(card, &DATE_SELECTORS)
        .map(text_of)
        .and_then(|label| find_date_in_label(&label).map(str::to_string))
        .or_else(|| find_date_like(&summary).map(str::to_string))
        .unwrap_or_default();

    Some(CandidateRecord {
        title,
        link,
        summary,
        raw_date,
    })
}

fn first_match<'a>(card: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| card.select(sel).next())
}

fn text_of(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Turn a card's `href` into a canonical destination under the restricted site.
///
/// Redirect wrappers may be nested; a few levels are unwrapped before giving up.
fn resolve_link(href: &str, page_url: &Url, query: &SearchQuery) -> Option<Url> {
    let mut current = page_url.join(href.trim()).ok()?;
    for _ in 0..3 {
        if query.matches(&current) {
            return canonical_link(current.as_str(), None);
        }
        current = Url::parse(&unwrap_redirect(&current)?).ok()?;
    }
    None
}

/// Destination URL carried by a redirect wrapper, if `url` is one.
pub(crate) fn unwrap_redirect(url: &Url) -> Option<String> {
    url.query_pairs().find_map(|(key, value)| {
        if !REDIRECT_PARAMS.iter().any(|param| *param == key) {
            return None;
        }
        // Bing click tracking: "a1" followed by unpadded base64url
        if let Some(encoded) = value.strip_prefix("a1") {
            if let Some(decoded) = decode_base64_url(encoded) {
                return Some(decoded);
            }
        }
        is_absolute_http(&value).then(|| value.into_owned())
    })
}

fn decode_base64_url(encoded: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    is_absolute_http(&decoded).then_some(decoded)
}

fn is_absolute_http(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}
