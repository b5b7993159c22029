use serde::Deserialize;

use super::fetcher::FetchError;
use crate::util::unescape_html;

/// A parsed feed document, normalized to the RSS 2.0 channel shape.
///
/// Every field is plain text with HTML entities decoded; dates are kept as
/// the strings the publisher wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RssFeed {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "item")]
    pub items: Vec<RssItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RssItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "pubDate")]
    pub pub_date: String,
}

#[derive(Deserialize)]
struct RssDocument {
    channel: RssFeed,
}

/// Parse a feed body.
///
/// RSS 2.0 is read directly so `pubDate` survives verbatim. Anything else
/// (Atom, RSS 1.0, RSS with interleaved items) goes through `feed-rs` and is
/// mapped onto the same shape. Text fields are HTML-unescaped afterwards.
///
/// # Errors
///
/// `FetchError::Parse` when neither reader accepts the document.
pub fn parse_feed(bytes: &[u8]) -> Result<RssFeed, FetchError> {
    let feed = match quick_xml::de::from_reader::<_, RssDocument>(bytes) {
        Ok(doc) => doc.channel,
        Err(rss_err) => {
            tracing::debug!(error = %rss_err, "Not a plain RSS 2.0 document, trying feed-rs");
            let parsed = feed_rs::parser::parse(bytes)
                .map_err(|e| FetchError::Parse(e.to_string()))?;
            from_feed_rs(parsed)
        }
    };

    Ok(feed.unescaped())
}

fn from_feed_rs(feed: feed_rs::model::Feed) -> RssFeed {
    let items = feed
        .entries
        .into_iter()
        .map(|entry| RssItem {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            link: entry
                .links
                .into_iter()
                .next()
                .map(|l| l.href)
                .unwrap_or_default(),
            description: entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default(),
            pub_date: entry
                .published
                .or(entry.updated)
                .map(|dt| dt.to_rfc2822())
                .unwrap_or_default(),
        })
        .collect();

    RssFeed {
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        link: feed
            .links
            .into_iter()
            .next()
            .map(|l| l.href)
            .unwrap_or_default(),
        description: feed.description.map(|d| d.content).unwrap_or_default(),
        items,
    }
}

impl RssFeed {
    fn unescaped(self) -> Self {
        let unescape = |s: String| unescape_html(&s).into_owned();
        RssFeed {
            title: unescape(self.title),
            link: unescape(self.link),
            description: unescape(self.description),
            items: self
                .items
                .into_iter()
                .map(|item| RssItem {
                    title: unescape(item.title),
                    link: unescape(item.link),
                    description: unescape(item.description),
                    pub_date: unescape(item.pub_date),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
  <title>Example &amp;amp; Co</title>
  <link>https://example.com/</link>
  <description>News &amp;lt;daily&amp;gt;</description>
  <item>
    <title>First &amp;#8217;post</title>
    <link>https://example.com/1</link>
    <description><![CDATA[<p>Hello &amp; welcome</p>]]></description>
    <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
  </item>
  <item>
    <title>Second</title>
    <link>https://example.com/2</link>
  </item>
</channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <link href="https://atom.example.com/"/>
  <id>urn:uuid:60a76c80-d399-11d9-b91C-0003939e0af6</id>
  <updated>2024-01-02T00:00:00Z</updated>
  <entry>
    <title>Atom entry</title>
    <link href="https://atom.example.com/entry"/>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2024-01-02T00:00:00Z</updated>
    <summary>Summary text</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_channel_and_items() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.link, "https://example.com/");
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].link, "https://example.com/1");
        assert_eq!(feed.items[0].pub_date, "Mon, 01 Jan 2024 00:00:00 +0000");
        assert_eq!(feed.items[1].title, "Second");
        assert_eq!(feed.items[1].pub_date, "");
    }

    #[test]
    fn test_parse_rss_unescapes_double_encoded_text() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.title, "Example & Co");
        assert_eq!(feed.description, "News <daily>");
        assert_eq!(feed.items[0].title, "First \u{2019}post");
        assert_eq!(feed.items[0].description, "<p>Hello & welcome</p>");
    }

    #[test]
    fn test_parse_atom_fallback() {
        let feed = parse_feed(ATOM.as_bytes()).unwrap();
        assert_eq!(feed.title, "Atom Example");
        assert_eq!(feed.link, "https://atom.example.com/");
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].title, "Atom entry");
        assert_eq!(feed.items[0].link, "https://atom.example.com/entry");
        assert_eq!(feed.items[0].description, "Summary text");
        assert!(!feed.items[0].pub_date.is_empty());
    }

    #[test]
    fn test_parse_empty_channel() {
        let feed = parse_feed(br#"<rss version="2.0"><channel></channel></rss>"#).unwrap();
        assert!(feed.items.is_empty());
        assert_eq!(feed.title, "");
    }

    #[test]
    fn test_parse_malformed_xml() {
        let err = parse_feed(b"<not valid xml").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn test_parse_non_feed_document() {
        let err = parse_feed(b"<html><body>hello</body></html>").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
