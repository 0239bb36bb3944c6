use anyhow::Result;
use chrono::{DateTime, Utc};
use feed_rs::parser;

use super::fetcher::FetchedFeed;

/// A single raw item from a parsed feed, before reconciliation.
///
/// `published` and `updated` are kept separate — the engine applies the
/// published → updated → fetch-time fallback, not the parser.
#[derive(Debug, Clone)]
pub struct FetchedItem {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub body: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// Parse RSS/Atom bytes into the feed's self-reported title and its items.
///
/// The title matters: articles are grouped and deduplicated by the title the
/// feed reports about itself, not by the configured URL.
pub fn parse_feed(bytes: &[u8]) -> Result<FetchedFeed> {
    let feed = parser::parse(bytes)?;

    let title = feed.title.map(|t| t.content).unwrap_or_default();

    let items: Vec<FetchedItem> = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let description = entry.summary.map(|s| s.content);
            let body = entry.content.and_then(|c| c.body);
            let item_title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());

            FetchedItem {
                title: item_title,
                link,
                description,
                body,
                published: entry.published,
                updated: entry.updated,
            }
        })
        .collect();

    Ok(FetchedFeed { title, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Tech Weekly</title>
    <item>
        <title>A</title>
        <link>https://example.com/a</link>
        <description>Summary of A</description>
        <pubDate>Mon, 06 Jan 2025 10:00:00 GMT</pubDate>
    </item>
    <item>
        <title>B</title>
        <link>https://example.com/b</link>
    </item>
</channel></rss>"#;

    #[test]
    fn test_parse_reports_feed_title() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.title, "Tech Weekly");
        assert_eq!(feed.items.len(), 2);
    }

    #[test]
    fn test_parse_item_fields() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        let a = &feed.items[0];
        assert_eq!(a.title, "A");
        assert_eq!(a.link, "https://example.com/a");
        assert_eq!(a.description.as_deref(), Some("Summary of A"));
        assert!(a.published.is_some());
    }

    #[test]
    fn test_parse_item_without_date_or_description() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        let b = &feed.items[1];
        assert!(b.published.is_none());
        assert!(b.updated.is_none());
        assert!(b.description.is_none());
    }

    #[test]
    fn test_parse_untitled_entry() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>F</title>
    <item><link>https://example.com/x</link></item>
</channel></rss>"#;
        let feed = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(feed.items[0].title, "Untitled");
    }

    #[test]
    fn test_parse_invalid_xml_fails() {
        assert!(parse_feed(b"<not a feed").is_err());
    }
}
