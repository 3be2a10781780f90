// src/ingest/providers/github.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use super::TopicFilter;
use crate::ingest::normalize_text;
use crate::ingest::types::{within_lookback, Item, Provenance, SourceCollector};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_QUERY: &str = "(topic:machine-learning OR topic:artificial-intelligence OR topic:deep-learning OR topic:neural-networks OR topic:nlp)";
const DESCRIPTION_TITLE_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repo {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub forks_count: i64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub owner: Owner,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// `"{full_name}: {description}"`, description cut to 100 chars.
fn repo_title(repo: &Repo) -> String {
    let desc = normalize_text(repo.description.as_deref().unwrap_or_default());
    if desc.is_empty() {
        return repo.full_name.clone();
    }
    let mut short: String = desc.chars().take(DESCRIPTION_TITLE_CHARS).collect();
    if desc.chars().count() > DESCRIPTION_TITLE_CHARS {
        short.push_str("...");
    }
    format!("{}: {}", repo.full_name, short)
}

pub fn to_item(repo: Repo) -> Item {
    let title = repo_title(&repo);
    Item::new(
        Provenance::GitHub,
        title,
        repo.html_url.trim().to_string(),
        repo.stargazers_count,
        repo.pushed_at.unwrap_or_default(),
    )
    .with_body(normalize_text(repo.description.as_deref().unwrap_or_default()))
    .with_meta("full_name", repo.full_name)
    .with_meta("forks", repo.forks_count)
    .with_meta("language", repo.language.unwrap_or_default())
    .with_meta("topics", repo.topics)
    .with_meta("owner", repo.owner.login)
}

pub fn parse_search(s: &str) -> Result<Vec<Repo>> {
    let resp: SearchResponse = serde_json::from_str(s).context("parsing github search json")?;
    Ok(resp.items)
}

pub struct GitHubCollector {
    mode: Mode,
    filter: TopicFilter,
}

enum Mode {
    Fixture(String),
    Http {
        api_url: String,
        query: String,
        token: Option<String>,
        client: reqwest::Client,
    },
}

impl GitHubCollector {
    pub fn from_fixture_str(s: &str, filter: TopicFilter) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            filter,
        }
    }

    /// Search API client; picks up `GITHUB_TOKEN` when set.
    pub fn from_env(query: impl Into<String>, filter: TopicFilter) -> Self {
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Self {
            mode: Mode::Http {
                api_url: DEFAULT_API_URL.to_string(),
                query: query.into(),
                token,
                client: reqwest::Client::new(),
            },
            filter,
        }
    }

    fn select(&self, repos: Vec<Repo>, lookback: Duration, now: DateTime<Utc>) -> Vec<Item> {
        repos
            .into_iter()
            .filter(|r| r.pushed_at.is_some_and(|ts| within_lookback(ts, lookback, now)))
            .filter(|r| {
                let topics = r.topics.join(" ");
                self.filter.accepts(
                    r.stargazers_count,
                    &[
                        r.full_name.as_str(),
                        r.description.as_deref().unwrap_or_default(),
                        topics.as_str(),
                    ],
                )
            })
            .map(to_item)
            .collect()
    }
}

#[async_trait]
impl SourceCollector for GitHubCollector {
    fn provenance(&self) -> Provenance {
        Provenance::GitHub
    }

    async fn fetch(&self, lookback: Duration, max_items: usize) -> Result<Vec<Item>> {
        let now = Utc::now();
        let repos = match &self.mode {
            Mode::Fixture(s) => parse_search(s)?,
            Mode::Http {
                api_url,
                query,
                token,
                client,
            } => {
                let since = chrono::Duration::from_std(lookback)
                    .ok()
                    .and_then(|w| now.checked_sub_signed(w))
                    .unwrap_or(now);
                let q = format!("{query} pushed:>{}", since.format("%Y-%m-%d"));
                let per_page = max_items.clamp(1, 100).to_string();
                let mut req = client
                    .get(format!("{api_url}/search/repositories"))
                    .query(&[
                        ("q", q.as_str()),
                        ("sort", "stars"),
                        ("order", "desc"),
                        ("per_page", per_page.as_str()),
                    ])
                    .header(reqwest::header::USER_AGENT, "news-feeder")
                    .header(reqwest::header::ACCEPT, "application/vnd.github+json")
                    .timeout(Duration::from_secs(15));
                if let Some(t) = token {
                    req = req.bearer_auth(t);
                }
                let body = req
                    .send()
                    .await
                    .context("github search get()")?
                    .error_for_status()
                    .context("github search status")?
                    .text()
                    .await
                    .context("github search body")?;
                parse_search(&body)?
            }
        };
        let mut items = self.select(repos, lookback, now);
        items.truncate(max_items);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(pushed: DateTime<Utc>) -> String {
        serde_json::json!({
            "total_count": 2,
            "items": [
                {
                    "full_name": "acme/llm-kit",
                    "description": "A toolkit for LLM agents",
                    "html_url": "https://github.com/acme/llm-kit",
                    "stargazers_count": 1200,
                    "forks_count": 40,
                    "language": "Rust",
                    "topics": ["llm", "agents"],
                    "owner": {"login": "acme"},
                    "pushed_at": pushed.to_rfc3339()
                },
                {
                    "full_name": "acme/tiny",
                    "description": null,
                    "html_url": "https://github.com/acme/tiny",
                    "stargazers_count": 3,
                    "pushed_at": pushed.to_rfc3339()
                }
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn fixture_search_maps_repos() {
        let c = GitHubCollector::from_fixture_str(
            &fixture(Utc::now()),
            TopicFilter::new(vec!["llm".into()], 100),
        );
        let items = c.fetch(Duration::from_secs(24 * 3600), 5).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "acme/llm-kit: A toolkit for LLM agents");
        assert_eq!(items[0].popularity_score, 1200);
        assert_eq!(items[0].provenance_metadata["language"], serde_json::json!("Rust"));
    }

    #[test]
    fn long_descriptions_are_cut() {
        let repo = Repo {
            full_name: "o/r".into(),
            description: Some("d".repeat(150)),
            html_url: "https://github.com/o/r".into(),
            stargazers_count: 1,
            forks_count: 0,
            language: None,
            topics: vec![],
            owner: Owner::default(),
            pushed_at: None,
        };
        let title = repo_title(&repo);
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), "o/r: ".len() + 100 + 3);
    }
}
