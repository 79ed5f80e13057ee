//! Error taxonomy for the search-to-feed pipeline.
//!
//! Provider-level variants are recovered locally by falling through to the
//! next provider in the chain. Only [`SearchError::NoResultsAvailable`] ends a
//! run.

use crate::models::ProviderKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Network failure, timeout or non-success HTTP status.
    #[error("{provider} unavailable: {reason}")]
    ProviderUnavailable {
        provider: ProviderKind,
        reason: String,
    },

    /// The configured credential was rejected. It is not retried.
    #[error("{provider} rejected the configured credential (HTTP {status})")]
    ProviderAuth { provider: ProviderKind, status: u16 },

    /// The payload held no result matching the site restriction.
    #[error("{provider} returned no result matching site:{site}")]
    NoMatchFound { provider: ProviderKind, site: String },

    /// Every provider in the chain failed; nothing is published.
    #[error("no search provider produced a usable result ({} attempted)", .failures.len())]
    NoResultsAvailable { failures: Vec<SearchError> },
}

impl SearchError {
    pub fn unavailable(provider: ProviderKind, reason: impl ToString) -> Self {
        SearchError::ProviderUnavailable {
            provider,
            reason: reason.to_string(),
        }
    }

    pub fn no_match(provider: ProviderKind, site: impl Into<String>) -> Self {
        SearchError::NoMatchFound {
            provider,
            site: site.into(),
        }
    }
}
