//! Output generation for the published feed.
//!
//! # Submodules
//!
//! - [`rss`]: Renders a [`crate::models::CanonicalItem`] into an RSS 2.0 document
//! - [`artifact`]: Atomically replaces the feed file on disk
//!
//! # Output Structure
//!
//! ```text
//! <output path>          # e.g. public/feed.xml, fully replaced each run
//! ```
//!
//! Nothing is written when a run fails.

pub mod artifact;
pub mod rss;
