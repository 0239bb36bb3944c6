use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::config::FeedSource;

/// Maximum allowed nesting depth for OPML outline elements.
/// Prevents stack-depth abuse from maliciously nested subscription files.
const MAX_OPML_DEPTH: usize = 50;

/// Errors that can occur during OPML parsing.
#[derive(Debug, Error)]
pub enum OpmlError {
    /// OPML nesting depth exceeds safety limit.
    #[error("OPML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// File I/O error.
    #[error("Failed to read OPML file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses an OPML subscription file into feed sources.
///
/// Every `<outline>` element carrying a URL attribute becomes a source;
/// outlines without one are treated as category folders and traversed.
/// The URL is taken from `xmlUrl`, falling back to `htmlUrl` then `url`.
/// The `title` (or `text`) attribute becomes the source's display name.
pub async fn parse_opml(path: &str) -> Result<Vec<FeedSource>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read OPML file: {}", path))?;
    parse_opml_content(&content)
}

fn parse_opml_content(content: &str) -> Result<Vec<FeedSource>> {
    // XXE note: quick-xml (0.37) never parses <!ENTITY> declarations from
    // DOCTYPE; custom entities fail with an unrecognized-entity error, so
    // no configuration toggle is needed here.
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut sources = Vec::new();
    let mut buf = Vec::new();
    let mut depth: usize = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"outline" => {
                depth += 1;
                if depth > MAX_OPML_DEPTH {
                    return Err(OpmlError::MaxDepthExceeded(MAX_OPML_DEPTH).into());
                }

                if let Some(source) = parse_outline_attributes(&e, &reader)? {
                    sources.push(source);
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"outline" => {
                // Self-closing outline doesn't affect depth
                if let Some(source) = parse_outline_attributes(&e, &reader)? {
                    sources.push(source);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"outline" => {
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpmlError::XmlParse(e.to_string()).into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(sources)
}

/// Extracts a feed source from an outline element, or `None` for
/// category/folder outlines that carry no URL.
fn parse_outline_attributes(
    e: &quick_xml::events::BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<Option<FeedSource>> {
    let mut xml_url = None;
    let mut html_url = None;
    let mut bare_url = None;
    let mut title = None;
    let mut text = None;

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed OPML attribute");
                continue;
            }
        };
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| OpmlError::XmlParse(e.to_string()))?
            .into_owned();

        match attr.key.as_ref() {
            b"xmlUrl" => xml_url = Some(value),
            b"htmlUrl" => html_url = Some(value),
            b"url" => bare_url = Some(value),
            b"title" => title = Some(value),
            b"text" => text = Some(value),
            _ => {}
        }
    }

    let Some(url) = xml_url.or(html_url).or(bare_url) else {
        return Ok(None);
    };
    if url.trim().is_empty() {
        return Ok(None);
    }

    let display_name = title.or(text).filter(|t| !t.trim().is_empty());
    Ok(Some(FeedSource { url, display_name }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_flat_outlines() {
        let opml = r#"<?xml version="1.0"?>
<opml version="2.0"><body>
    <outline text="Rust Blog" title="Rust Blog" xmlUrl="https://blog.rust-lang.org/feed.xml"/>
    <outline text="HN" xmlUrl="https://news.ycombinator.com/rss"/>
</body></opml>"#;

        let sources = parse_opml_content(opml).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].url, "https://blog.rust-lang.org/feed.xml");
        assert_eq!(sources[0].display_name.as_deref(), Some("Rust Blog"));
        assert_eq!(sources[1].display_name.as_deref(), Some("HN"));
    }

    #[test]
    fn test_parse_nested_outlines() {
        let opml = r#"<?xml version="1.0"?>
<opml version="2.0"><body>
    <outline text="Tech">
        <outline text="Nested" xmlUrl="https://example.com/feed.xml"/>
    </outline>
</body></opml>"#;

        let sources = parse_opml_content(opml).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://example.com/feed.xml");
    }

    #[test]
    fn test_url_attribute_fallback() {
        let opml = r#"<?xml version="1.0"?>
<opml version="2.0"><body>
    <outline text="Html only" htmlUrl="https://a.example.com/"/>
    <outline text="Bare url" url="https://b.example.com/feed"/>
</body></opml>"#;

        let sources = parse_opml_content(opml).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].url, "https://a.example.com/");
        assert_eq!(sources[1].url, "https://b.example.com/feed");
    }

    #[test]
    fn test_folder_without_url_skipped() {
        let opml = r#"<?xml version="1.0"?>
<opml version="2.0"><body>
    <outline text="Just a folder"/>
</body></opml>"#;

        let sources = parse_opml_content(opml).unwrap();
        assert!(sources.is_empty());
    }

    #[test]
    fn test_invalid_xml_fails() {
        assert!(parse_opml_content("<opml><body><outline").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut opml = String::from(r#"<?xml version="1.0"?><opml version="2.0"><body>"#);
        for _ in 0..60 {
            opml.push_str(r#"<outline text="deep">"#);
        }
        opml.push_str(r#"<outline text="leaf" xmlUrl="https://example.com/f"/>"#);
        for _ in 0..60 {
            opml.push_str("</outline>");
        }
        opml.push_str("</body></opml>");

        assert!(parse_opml_content(&opml).is_err());
    }
}
