// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Originating source of an [`Item`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    HackerNews,
    Reddit,
    GitHub,
}

impl Provenance {
    pub const ALL: [Provenance; 3] = [Provenance::HackerNews, Provenance::Reddit, Provenance::GitHub];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::HackerNews => "hackernews",
            Provenance::Reddit => "reddit",
            Provenance::GitHub => "github",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hackernews" | "hacker_news" | "hn" => Ok(Provenance::HackerNews),
            "reddit" => Ok(Provenance::Reddit),
            "github" => Ok(Provenance::GitHub),
            other => anyhow::bail!("unknown provenance: {other}"),
        }
    }
}

/// Canonical news mention, produced by a [`SourceCollector`].
///
/// `provenance_metadata` is provider-specific and only ever used as the
/// last tie-breaker when two duplicates compete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub provenance: Provenance,
    pub title: String,
    pub canonical_link: String,
    pub popularity_score: i64,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub body_excerpt: String,
    #[serde(default)]
    pub provenance_metadata: BTreeMap<String, serde_json::Value>,
}

impl Item {
    pub fn new(
        provenance: Provenance,
        title: impl Into<String>,
        canonical_link: impl Into<String>,
        popularity_score: i64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            provenance,
            title: title.into(),
            canonical_link: canonical_link.into(),
            popularity_score,
            observed_at,
            body_excerpt: String::new(),
            provenance_metadata: BTreeMap::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body_excerpt = body.into();
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.provenance_metadata.insert(key.into(), value.into());
        self
    }

    /// Items without a title or link can never be compared; they are kept as-is.
    pub fn is_mergeable(&self) -> bool {
        !self.title.trim().is_empty() && !self.canonical_link.trim().is_empty()
    }

    /// Short stable id for logs: hash of the link (or title when the link is missing).
    pub fn log_id(&self) -> String {
        let basis = if self.canonical_link.trim().is_empty() {
            &self.title
        } else {
            &self.canonical_link
        };
        crate::ingest::anon_hash(basis)
    }
}

/// A topic-mention provider (Hacker News, Reddit, ...).
///
/// Implementations convert their native payload into [`Item`]s and apply their
/// own lookback/popularity filtering. Failures are reported through `Err` and
/// stay local to that source.
#[async_trait::async_trait]
pub trait SourceCollector: Send + Sync {
    fn provenance(&self) -> Provenance;
    async fn fetch(&self, lookback: Duration, max_items: usize) -> Result<Vec<Item>>;
}

/// Is `observed_at` inside the lookback window ending at `now`?
pub fn within_lookback(observed_at: DateTime<Utc>, lookback: Duration, now: DateTime<Utc>) -> bool {
    // Window too large to represent: everything is recent.
    chrono::Duration::from_std(lookback)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .map_or(true, |cutoff| observed_at >= cutoff)
}
