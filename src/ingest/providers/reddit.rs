// src/ingest/providers/reddit.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use super::TopicFilter;
use crate::ingest::normalize_text;
use crate::ingest::types::{within_lookback, Item, Provenance, SourceCollector};

pub const DEFAULT_SUBREDDITS: &[&str] = &["MachineLearning", "artificial", "singularity", "MachineLearningNews"];
const USER_AGENT: &str = "news-feeder/0.1 (topic monitor)";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: RedditPost,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub permalink: String,
}

impl RedditPost {
    fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_utc as i64, 0)
    }
}

pub fn to_item(post: RedditPost) -> Item {
    let observed_at = post.observed_at().unwrap_or_default();
    let permalink = if post.permalink.is_empty() {
        String::new()
    } else {
        format!("https://www.reddit.com{}", post.permalink)
    };
    Item::new(
        Provenance::Reddit,
        normalize_text(&post.title),
        post.url.trim().to_string(),
        post.score,
        observed_at,
    )
    .with_body(normalize_text(&post.selftext))
    .with_meta("subreddit", post.subreddit)
    .with_meta("author", post.author)
    .with_meta("num_comments", post.num_comments)
    .with_meta("permalink", permalink)
}

/// Parse one `/r/<sub>/hot.json` listing into posts.
pub fn parse_listing(s: &str) -> Result<Vec<RedditPost>> {
    let listing: Listing = serde_json::from_str(s).context("parsing reddit listing json")?;
    Ok(listing.data.children.into_iter().map(|c| c.data).collect())
}

pub struct RedditCollector {
    mode: Mode,
    filter: TopicFilter,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        subreddits: Vec<String>,
        client: reqwest::Client,
    },
}

impl RedditCollector {
    pub fn from_fixture_str(s: &str, filter: TopicFilter) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            filter,
        }
    }

    pub fn new(subreddits: Vec<String>, filter: TopicFilter) -> Self {
        Self::from_url("https://www.reddit.com", subreddits, filter)
    }

    pub fn from_url(base_url: impl Into<String>, subreddits: Vec<String>, filter: TopicFilter) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.into(),
                subreddits,
                client: reqwest::Client::new(),
            },
            filter,
        }
    }

    fn select(&self, posts: Vec<RedditPost>, lookback: Duration, now: DateTime<Utc>) -> Vec<Item> {
        posts
            .into_iter()
            .filter(|p| {
                p.observed_at()
                    .is_some_and(|ts| within_lookback(ts, lookback, now))
            })
            .filter(|p| self.filter.accepts(p.score, &[p.title.as_str(), p.selftext.as_str()]))
            .map(to_item)
            .collect()
    }
}

#[async_trait]
impl SourceCollector for RedditCollector {
    fn provenance(&self) -> Provenance {
        Provenance::Reddit
    }

    async fn fetch(&self, lookback: Duration, max_items: usize) -> Result<Vec<Item>> {
        let now = Utc::now();
        match &self.mode {
            Mode::Fixture(s) => {
                let mut items = self.select(parse_listing(s)?, lookback, now);
                items.truncate(max_items);
                Ok(items)
            }
            Mode::Http {
                base_url,
                subreddits,
                client,
            } => {
                let per_sub = (max_items / subreddits.len().max(1)).max(1) * 2;
                let mut out = Vec::new();
                let mut last_err = None;
                for sub in subreddits {
                    if out.len() >= max_items {
                        break;
                    }
                    let url = format!("{base_url}/r/{sub}/hot.json?limit={per_sub}");
                    let body = client
                        .get(&url)
                        .header(reqwest::header::USER_AGENT, USER_AGENT)
                        .timeout(Duration::from_secs(10))
                        .send()
                        .await
                        .and_then(|r| r.error_for_status());
                    let text = match body {
                        Ok(r) => r.text().await.context("reddit body")?,
                        Err(e) => {
                            tracing::debug!(target: "ingest", subreddit = %sub, error = %e, "subreddit fetch failed");
                            last_err = Some(e);
                            continue;
                        }
                    };
                    out.extend(self.select(parse_listing(&text)?, lookback, now));
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                // Every subreddit failing is a source failure.
                if out.is_empty() {
                    if let Some(e) = last_err {
                        return Err(e).context("reddit: all subreddits failed");
                    }
                }
                out.sort_by(|a, b| b.popularity_score.cmp(&a.popularity_score));
                out.truncate(max_items);
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(now: i64) -> String {
        serde_json::json!({
            "kind": "Listing",
            "data": {"children": [
                {"kind": "t3", "data": {
                    "title": "OpenAI&#39;s new model", "url": "https://openai.com/blog/x",
                    "score": 420, "created_utc": (now - 300) as f64, "selftext": "",
                    "subreddit": "OpenAI", "author": "someone", "num_comments": 12,
                    "permalink": "/r/OpenAI/comments/abc/x/"
                }},
                {"kind": "t3", "data": {
                    "title": "Weekly thread", "url": "https://reddit.com/r/x",
                    "score": 5, "created_utc": (now - 300) as f64
                }},
                {"kind": "t3", "data": {
                    "title": "Old LLM news", "url": "https://a.com/old",
                    "score": 999, "created_utc": (now - 200_000) as f64
                }}
            ]}
        })
        .to_string()
    }

    #[tokio::test]
    async fn fixture_listing_is_filtered() {
        let c = RedditCollector::from_fixture_str(
            &listing(Utc::now().timestamp()),
            TopicFilter::new(vec!["OpenAI".into(), "LLM".into()], 10),
        );
        let items = c.fetch(Duration::from_secs(24 * 3600), 10).await.unwrap();
        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.title, "OpenAI's new model");
        assert_eq!(it.provenance, Provenance::Reddit);
        assert_eq!(it.popularity_score, 420);
        assert_eq!(
            it.provenance_metadata["permalink"],
            serde_json::json!("https://www.reddit.com/r/OpenAI/comments/abc/x/")
        );
    }

    #[test]
    fn listing_without_children_is_empty() {
        let posts = parse_listing(r#"{"data": {}}"#).unwrap();
        assert!(posts.is_empty());
    }
}
