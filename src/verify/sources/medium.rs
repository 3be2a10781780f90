// src/verify/sources/medium.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use super::{tag_slug, MAX_TAG_QUERIES, PER_TAG_RESULTS};
use crate::verify::{Corroboration, CorroborationSource};

pub const DEFAULT_FEED_URL: &str = "https://medium.com/feed/tag";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<FeedItem>,
}
#[derive(Debug, Deserialize)]
struct FeedItem {
    title: Option<String>,
    link: Option<String>,
}

/// Entries of one tag feed, newest first as Medium serves them, capped.
fn parse_feed(s: &str, limit: usize) -> Result<Vec<Corroboration>> {
    let xml_clean = scrub_html_entities_for_xml(s);
    let rss: Rss = from_str(&xml_clean).context("parsing medium rss xml")?;
    Ok(rss
        .channel
        .item
        .into_iter()
        .take(limit)
        .filter_map(|it| {
            Some(Corroboration {
                title: crate::ingest::normalize_text(it.title.as_deref()?),
                link: it.link?.trim().to_string(),
            })
        })
        .collect())
}

pub struct MediumSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        feed_url: String,
        client: reqwest::Client,
    },
}

impl MediumSource {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(feed_url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                feed_url: feed_url.into(),
                client: reqwest::Client::new(),
            },
        }
    }
}

impl Default for MediumSource {
    fn default() -> Self {
        Self::from_url(DEFAULT_FEED_URL)
    }
}

#[async_trait]
impl CorroborationSource for MediumSource {
    fn name(&self) -> &str {
        "medium"
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<Corroboration>> {
        match &self.mode {
            Mode::Fixture(s) => parse_feed(s, PER_TAG_RESULTS),
            Mode::Http { feed_url, client } => {
                let mut out = Vec::new();
                for kw in keywords.iter().take(MAX_TAG_QUERIES) {
                    let tag = tag_slug(kw, "-");
                    if tag.is_empty() {
                        continue;
                    }
                    let body = client
                        .get(format!("{feed_url}/{tag}"))
                        .timeout(Duration::from_secs(10))
                        .send()
                        .await
                        .context("medium get()")?
                        .error_for_status()
                        .context("medium status")?
                        .text()
                        .await
                        .context("medium body")?;
                    out.extend(parse_feed(&body, PER_TAG_RESULTS)?);
                }
                Ok(out)
            }
        }
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>LLM on Medium</title>
    <item>
      <title><![CDATA[What the new LLM release means&nbsp;for you]]></title>
      <link>https://medium.com/@x/llm-release-1</link>
      <dc:creator>x</dc:creator>
      <pubDate>Tue, 04 Mar 2025 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>No link here</title>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn feed_entries_with_title_and_link_are_kept() {
        let src = MediumSource::from_fixture_str(FEED);
        let hits = src.search(&["LLM".into()]).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "What the new LLM release means for you");
        assert_eq!(hits[0].link, "https://medium.com/@x/llm-release-1");
    }

    #[test]
    fn empty_channel_parses() {
        let hits = parse_feed("<rss><channel><title>t</title></channel></rss>", 10).unwrap();
        assert!(hits.is_empty());
    }
}
