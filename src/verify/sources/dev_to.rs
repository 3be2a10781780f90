// src/verify/sources/dev_to.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{tag_slug, MAX_TAG_QUERIES, PER_TAG_RESULTS};
use crate::verify::{Corroboration, CorroborationSource};

pub const DEFAULT_API_URL: &str = "https://dev.to/api";

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
}

fn parse_articles(s: &str) -> Result<Vec<Corroboration>> {
    let articles: Vec<Article> = serde_json::from_str(s).context("parsing dev.to articles json")?;
    Ok(articles
        .into_iter()
        .map(|a| Corroboration {
            title: crate::ingest::normalize_text(&a.title),
            link: a.url,
        })
        .collect())
}

/// dev.to articles API, one tag query per leading keyword.
pub struct DevToSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        api_url: String,
        client: reqwest::Client,
    },
}

impl DevToSource {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(api_url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                api_url: api_url.into(),
                client: reqwest::Client::new(),
            },
        }
    }
}

impl Default for DevToSource {
    fn default() -> Self {
        Self::from_url(DEFAULT_API_URL)
    }
}

#[async_trait]
impl CorroborationSource for DevToSource {
    fn name(&self) -> &str {
        "dev.to"
    }

    async fn search(&self, keywords: &[String]) -> Result<Vec<Corroboration>> {
        match &self.mode {
            Mode::Fixture(s) => parse_articles(s),
            Mode::Http { api_url, client } => {
                let mut out = Vec::new();
                for kw in keywords.iter().take(MAX_TAG_QUERIES) {
                    let tag = tag_slug(kw, "");
                    if tag.is_empty() {
                        continue;
                    }
                    let per_page = PER_TAG_RESULTS.to_string();
                    let body = client
                        .get(format!("{api_url}/articles"))
                        .query(&[("tag", tag.as_str()), ("per_page", per_page.as_str())])
                        .timeout(Duration::from_secs(10))
                        .send()
                        .await
                        .context("dev.to get()")?
                        .error_for_status()
                        .context("dev.to status")?
                        .text()
                        .await
                        .context("dev.to body")?;
                    out.extend(parse_articles(&body)?);
                }
                Ok(out)
            }
        }
    }
}
