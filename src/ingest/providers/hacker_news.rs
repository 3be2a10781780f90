// src/ingest/providers/hacker_news.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use super::TopicFilter;
use crate::ingest::normalize_text;
use crate::ingest::types::{within_lookback, Item, Provenance, SourceCollector};

pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

#[derive(Debug, Clone, Deserialize)]
pub struct HnStory {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub descendants: Option<i64>,
}

/// Explicit conversion from the Firebase item shape.
pub fn to_item(story: HnStory) -> Item {
    let observed_at = story
        .time
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .unwrap_or_default();
    Item::new(
        Provenance::HackerNews,
        normalize_text(story.title.as_deref().unwrap_or_default()),
        story.url.unwrap_or_default().trim().to_string(),
        story.score.unwrap_or(0),
        observed_at,
    )
    .with_body(normalize_text(story.text.as_deref().unwrap_or_default()))
    .with_meta("id", story.id)
    .with_meta("descendants", story.descendants.unwrap_or(0))
    .with_meta("by", story.by.unwrap_or_default())
}

pub struct HackerNewsCollector {
    mode: Mode,
    filter: TopicFilter,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
        /// How many top story ids to inspect per run.
        scan_limit: usize,
    },
}

impl HackerNewsCollector {
    /// Parse a captured JSON array of stories instead of calling the API.
    pub fn from_fixture_str(s: &str, filter: TopicFilter) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            filter,
        }
    }

    pub fn from_url(base_url: impl Into<String>, filter: TopicFilter) -> Self {
        Self {
            mode: Mode::Http {
                base_url: base_url.into(),
                client: reqwest::Client::new(),
                scan_limit: 200,
            },
            filter,
        }
    }

    fn accept(&self, story: &HnStory, lookback: Duration, now: DateTime<Utc>) -> bool {
        let recent = story
            .time
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .is_some_and(|ts| within_lookback(ts, lookback, now));
        recent
            && self.filter.accepts(
                story.score.unwrap_or(0),
                &[
                    story.title.as_deref().unwrap_or_default(),
                    story.text.as_deref().unwrap_or_default(),
                    story.url.as_deref().unwrap_or_default(),
                ],
            )
    }

    async fn fetch_http(
        &self,
        base_url: &str,
        client: &reqwest::Client,
        scan_limit: usize,
        lookback: Duration,
        max_items: usize,
    ) -> Result<Vec<Item>> {
        let ids: Vec<u64> = client
            .get(format!("{base_url}/topstories.json"))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("hn topstories get()")?
            .error_for_status()
            .context("hn topstories status")?
            .json()
            .await
            .context("hn topstories json")?;

        let now = Utc::now();
        let mut out = Vec::new();
        for id in ids.into_iter().take(scan_limit) {
            if out.len() >= max_items {
                break;
            }
            let story = match fetch_story(client, base_url, id).await {
                Ok(Some(s)) => s,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(target: "ingest", id, error = %e, "hn item fetch failed");
                    continue;
                }
            };
            if self.accept(&story, lookback, now) {
                out.push(to_item(story));
            }
            // Stay polite with the Firebase API.
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok(out)
    }
}

async fn fetch_story(client: &reqwest::Client, base_url: &str, id: u64) -> Result<Option<HnStory>> {
    let story = client
        .get(format!("{base_url}/item/{id}.json"))
        .timeout(Duration::from_secs(10))
        .send()
        .await?
        .error_for_status()?
        .json::<Option<HnStory>>()
        .await?;
    Ok(story)
}

#[async_trait]
impl SourceCollector for HackerNewsCollector {
    fn provenance(&self) -> Provenance {
        Provenance::HackerNews
    }

    async fn fetch(&self, lookback: Duration, max_items: usize) -> Result<Vec<Item>> {
        match &self.mode {
            Mode::Fixture(s) => {
                let stories: Vec<HnStory> =
                    serde_json::from_str(s).context("parsing hn fixture json")?;
                let now = Utc::now();
                Ok(stories
                    .into_iter()
                    .filter(|st| self.accept(st, lookback, now))
                    .take(max_items)
                    .map(to_item)
                    .collect())
            }
            Mode::Http {
                base_url,
                client,
                scan_limit,
            } => {
                self.fetch_http(base_url, client, *scan_limit, lookback, max_items)
                    .await
            }
        }
    }
}
