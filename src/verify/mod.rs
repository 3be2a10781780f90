// src/verify/mod.rs
//! Verification engine: corroborate an item against secondary sources and
//! turn the hit counts into a bounded confidence plus a tri-state status.

pub mod scoring;
pub mod sources;

use anyhow::Result;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::config::VerificationConfig;
use crate::ingest::types::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    PartiallyVerified,
    Unverified,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::PartiallyVerified => "partially_verified",
            VerificationStatus::Unverified => "unverified",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    pub confidence: f32,
    pub corroboration_counts: BTreeMap<String, u32>,
    pub corroborating_links: BTreeMap<String, Vec<String>>,
    /// Search terms derived from the title.
    pub keywords: Vec<String>,
    /// Secondaries whose query failed or timed out for this item.
    pub failed_sources: Vec<String>,
}

impl VerificationResult {
    pub fn empty(keywords: Vec<String>) -> Self {
        Self {
            status: VerificationStatus::Unverified,
            confidence: 0.0,
            corroboration_counts: BTreeMap::new(),
            corroborating_links: BTreeMap::new(),
            keywords,
            failed_sources: Vec::new(),
        }
    }

    pub fn total_hits(&self) -> u32 {
        scoring::total_hits(&self.corroboration_counts)
    }
}

/// A candidate corroborating article returned by a secondary source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corroboration {
    pub title: String,
    pub link: String,
}

/// A secondary corroboration source (dev.to, Medium, ...).
#[async_trait::async_trait]
pub trait CorroborationSource: Send + Sync {
    fn name(&self) -> &str;
    async fn search(&self, keywords: &[String]) -> Result<Vec<Corroboration>>;
}

/// Configured topic keywords found in the title first, then capitalized
/// words longer than 4 characters; case-insensitively unique, capped.
///
/// A topic keyword counts only as a whole word, case-insensitively, so
/// "AI" is found in "AI agents" but not in "said".
pub fn extract_keywords(title: &str, cfg: &VerificationConfig) -> Vec<String> {
    let lowered = title.to_lowercase();
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for kw in &cfg.topic_keywords {
        if out.len() >= cfg.max_keywords {
            return out;
        }
        let k = kw.to_lowercase();
        if !k.is_empty() && contains_word(&lowered, &k) && seen.insert(k) {
            out.push(kw.clone());
        }
    }

    for word in title.split_whitespace() {
        if out.len() >= cfg.max_keywords {
            break;
        }
        let w = word.trim_matches(|c: char| !c.is_alphanumeric());
        let capitalized = w.chars().next().is_some_and(char::is_uppercase);
        if capitalized && w.chars().count() > 4 && seen.insert(w.to_lowercase()) {
            out.push(w.to_string());
        }
    }
    out
}

/// Keyword match on word boundaries so "AI" does not hit "said".
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Loose title match: any keyword occurs as a case-insensitive substring.
pub fn corroborates(candidate_title: &str, keywords: &[String]) -> bool {
    let t = candidate_title.to_lowercase();
    keywords.iter().any(|k| t.contains(&k.to_lowercase()))
}

pub struct Verifier {
    sources: Vec<Arc<dyn CorroborationSource>>,
    config: VerificationConfig,
}

impl Verifier {
    pub fn new(sources: Vec<Arc<dyn CorroborationSource>>, config: VerificationConfig) -> Self {
        Self { sources, config }
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Never fails: a secondary that errors or times out counts zero hits
    /// and is listed in `failed_sources`.
    pub async fn verify(&self, item: &Item) -> VerificationResult {
        let keywords = extract_keywords(&item.title, &self.config);
        let mut result = VerificationResult::empty(keywords);
        for s in &self.sources {
            result.corroboration_counts.insert(s.name().to_string(), 0);
            result
                .corroborating_links
                .insert(s.name().to_string(), Vec::new());
        }

        if result.keywords.is_empty() {
            tracing::debug!(target: "verify", item = %item.log_id(), "no keywords, skipping queries");
            counter!("verify_items_total", "status" => result.status.as_str()).increment(1);
            return result;
        }

        for source in &self.sources {
            let name = source.name().to_string();
            let outcome =
                tokio::time::timeout(self.config.query_timeout(), source.search(&result.keywords))
                    .await;
            let candidates = match outcome {
                Ok(Ok(c)) => c,
                Ok(Err(e)) => {
                    tracing::warn!(target: "verify", secondary = %name, item = %item.log_id(), error = %e, "secondary query failed");
                    counter!("verify_secondary_errors_total", "secondary" => name.clone()).increment(1);
                    result.failed_sources.push(name);
                    continue;
                }
                Err(_) => {
                    tracing::warn!(target: "verify", secondary = %name, item = %item.log_id(), "secondary query timed out");
                    counter!("verify_secondary_errors_total", "secondary" => name.clone()).increment(1);
                    result.failed_sources.push(name);
                    continue;
                }
            };

            let mut seen = HashSet::new();
            let links: Vec<String> = candidates
                .into_iter()
                .filter(|c| !c.link.trim().is_empty())
                .filter(|c| corroborates(&c.title, &result.keywords))
                .filter(|c| seen.insert(c.link.clone()))
                .map(|c| c.link)
                .collect();
            result
                .corroboration_counts
                .insert(name.clone(), links.len() as u32);
            result.corroborating_links.insert(name, links);
        }

        result.confidence = scoring::confidence(&result.corroboration_counts, &self.config);
        result.status = scoring::status_for(
            &result.corroboration_counts,
            result.confidence,
            &self.config,
        );
        tracing::info!(
            target: "verify",
            item = %item.log_id(),
            status = %result.status,
            confidence = result.confidence,
            hits = result.total_hits(),
            "item verified"
        );
        counter!("verify_items_total", "status" => result.status.as_str()).increment(1);
        result
    }
}
