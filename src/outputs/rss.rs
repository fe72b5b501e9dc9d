//! RSS 2.0 serialization.
//!
//! The document depends only on the [`Feed`] passed in, so two renders of the
//! same articles with the same `built_at` are byte-identical.
//!
//! ```text
//! <rss version="2.0">
//!   <channel>
//!     <title/> <link/> <description/> <lastBuildDate/> <ttl/>
//!     <item> <title/> <link/> <guid isPermaLink="false"/> <pubDate/> <description/> </item>
//!     ...
//! ```

use crate::error::RenderError;
use crate::models::{Article, Feed};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;
use tracing::{debug, instrument};

/// Render `feed` as an RSS 2.0 document.
#[instrument(level = "info", skip_all, fields(items = feed.articles.len()))]
pub fn render(feed: &Feed) -> Result<String, RenderError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let rss = BytesStart::new("rss").with_attributes([("version", "2.0")]);
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    let build_date = feed.built_at.to_rfc2822();
    write_text_element(&mut writer, "title", &feed.title)?;
    write_text_element(&mut writer, "link", &feed.link)?;
    write_text_element(&mut writer, "description", &feed.description)?;
    write_text_element(&mut writer, "lastBuildDate", &build_date)?;
    write_text_element(&mut writer, "ttl", &feed.ttl_minutes.to_string())?;

    for article in &feed.articles {
        write_item(&mut writer, article, &build_date)?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    let xml = String::from_utf8(bytes)?;
    debug!(bytes = xml.len(), "Rendered RSS document");
    Ok(xml)
}

// The site lists no publication dates, so every item carries the build time.
fn write_item<W: Write>(
    w: &mut Writer<W>,
    article: &Article,
    pub_date: &str,
) -> Result<(), RenderError> {
    w.write_event(Event::Start(BytesStart::new("item")))?;
    write_text_element(w, "title", &article.title)?;
    write_text_element(w, "link", &article.link)?;

    let guid = BytesStart::new("guid").with_attributes([("isPermaLink", "false")]);
    w.write_event(Event::Start(guid))?;
    w.write_event(Event::Text(BytesText::new(&article.guid())))?;
    w.write_event(Event::End(BytesEnd::new("guid")))?;

    write_text_element(w, "pubDate", pub_date)?;
    write_text_element(w, "description", &article.title)?;
    w.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

fn write_text_element<W: Write>(
    w: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), RenderError> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(&strip_control_chars(text))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Drop control characters XML 1.0 cannot carry (everything below 0x20
/// except tab, LF and CR).
fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= '\u{20}')
        .collect()
}
