//! RSS 2.0 rendering of the single canonical item.
//!
//! # Output Structure
//!
//! ```text
//! <rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
//!   <channel>
//!     <title/> <link/> <description/> <lastBuildDate/> <generator/>
//!     <atom:link rel="self"/>          (only when a self URL is configured)
//!     <item>
//!       <title/> <link/> <guid isPermaLink="true"/>
//!       <pubDate/>                     (only when the date is known)
//!       <description/>                 (only when the summary is non-empty)
//!     </item>
//!   </channel>
//! </rss>
//! ```
//!
//! Given the same item and metadata the output is byte-identical apart from
//! `lastBuildDate`.

use crate::models::{CanonicalItem, FeedDocument, FeedMeta};
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::error::Error;

const GENERATOR: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));
const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Render `item` as a one-entry RSS 2.0 document.
///
/// Total for any well-formed [`CanonicalItem`]: writing into an in-memory
/// buffer cannot fail, so a failure here is a bug rather than a run-time
/// condition.
pub fn render(item: &CanonicalItem, meta: &FeedMeta, built_at: DateTime<Utc>) -> FeedDocument {
    let bytes = write_document(item, meta, built_at)
        .expect("serializing a feed into an in-memory buffer cannot fail");
    let xml = String::from_utf8(bytes).expect("quick-xml writes UTF-8 for UTF-8 input");
    FeedDocument { xml, built_at }
}

type XmlWriter = Writer<Vec<u8>>;

fn write_document(
    item: &CanonicalItem,
    meta: &FeedMeta,
    built_at: DateTime<Utc>,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    if meta.self_url.is_some() {
        rss.push_attribute(("xmlns:atom", ATOM_NS));
    }
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &meta.title)?;
    text_element(&mut writer, "link", &meta.link)?;
    text_element(&mut writer, "description", &meta.description)?;
    text_element(&mut writer, "lastBuildDate", &built_at.to_rfc2822())?;
    text_element(&mut writer, "generator", GENERATOR)?;
    if let Some(self_url) = &meta.self_url {
        writer
            .create_element("atom:link")
            .with_attribute(("href", self_url.as_str()))
            .with_attribute(("rel", "self"))
            .with_attribute(("type", "application/rss+xml"))
            .write_empty()?;
    }

    write_item(&mut writer, item)?;

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_item(writer: &mut XmlWriter, item: &CanonicalItem) -> Result<(), Box<dyn Error>> {
    writer.write_event(Event::Start(BytesStart::new("item")))?;

    text_element(writer, "title", &item.title)?;
    text_element(writer, "link", item.link.as_str())?;
    writer
        .create_element("guid")
        .with_attribute(("isPermaLink", "true"))
        .write_text_content(BytesText::new(item.link.as_str()))?;
    if let Some(published) = item.published_at.known() {
        text_element(writer, "pubDate", &published.to_rfc2822())?;
    }
    if !item.summary.is_empty() {
        text_element(writer, "description", &item.summary)?;
    }

    writer.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), Box<dyn Error>> {
    writer
        .create_element(name)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}
