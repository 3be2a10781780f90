// src/dedup/similarity.rs
//! Pairwise similarity between two items.
//!
//! Alignment ratio: `strsim::normalized_levenshtein` (symmetric, 0.0..=1.0).

use serde::Serialize;
use std::collections::HashSet;
use strsim::normalized_levenshtein;

use super::canonical::{canonicalize_link, canonicalize_title, CanonicalLink};
use crate::config::DedupConfig;
use crate::ingest::types::Item;

pub const LINK_WEIGHT: f64 = 0.5;
pub const TITLE_WEIGHT: f64 = 0.4;
pub const BODY_WEIGHT: f64 = 0.1;

/// Bodies shorter than this are compared in full.
pub const SHORT_BODY_CHARS: usize = 50;
/// Longer bodies are compared on this many leading characters only.
pub const BODY_PREFIX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityScore {
    pub link_similarity: f64,
    pub title_similarity: f64,
    pub body_similarity: f64,
    pub combined_score: f64,
    pub is_duplicate: bool,
}

/// Canonical forms of one item, computed once per dedup pass.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub link: CanonicalLink,
    pub title: String,
    pub body: String,
}

impl Fingerprint {
    pub fn of(item: &Item) -> Self {
        Self {
            link: canonicalize_link(&item.canonical_link),
            title: canonicalize_title(&item.title),
            body: normalize_body(&item.body_excerpt),
        }
    }
}

fn normalize_body(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn link_similarity(a: &CanonicalLink, b: &CanonicalLink) -> f64 {
    if a.serialized == b.serialized {
        1.0
    } else if a.host != b.host {
        0.0
    } else {
        normalized_levenshtein(&a.path, &b.path)
    }
}

/// Operates on canonical titles. An empty title carries no signal.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let chars = normalized_levenshtein(a, b);
    let wa: HashSet<&str> = a.split(' ').collect();
    let wb: HashSet<&str> = b.split(' ').collect();
    let union = wa.union(&wb).count();
    if union == 0 {
        return chars;
    }
    let jaccard = wa.intersection(&wb).count() as f64 / union as f64;
    0.6 * chars + 0.4 * jaccard
}

/// Operates on whitespace-normalized bodies.
pub fn body_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.chars().count() < SHORT_BODY_CHARS || b.chars().count() < SHORT_BODY_CHARS {
        return normalized_levenshtein(a, b);
    }
    let pa: String = a.chars().take(BODY_PREFIX_CHARS).collect();
    let pb: String = b.chars().take(BODY_PREFIX_CHARS).collect();
    normalized_levenshtein(&pa, &pb)
}

pub fn compare(a: &Fingerprint, b: &Fingerprint, cfg: &DedupConfig) -> SimilarityScore {
    let link_similarity = link_similarity(&a.link, &b.link);
    let title_similarity = title_similarity(&a.title, &b.title);
    let body_similarity = body_similarity(&a.body, &b.body);
    let combined_score =
        LINK_WEIGHT * link_similarity + TITLE_WEIGHT * title_similarity + BODY_WEIGHT * body_similarity;
    SimilarityScore {
        link_similarity,
        title_similarity,
        body_similarity,
        combined_score,
        is_duplicate: link_similarity >= cfg.link_threshold
            || title_similarity >= cfg.title_threshold
            || combined_score >= cfg.overall_threshold,
    }
}

/// Convenience wrapper that canonicalizes both items first.
pub fn similarity(a: &Item, b: &Item, cfg: &DedupConfig) -> SimilarityScore {
    compare(&Fingerprint::of(a), &Fingerprint::of(b), cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Provenance;
    use chrono::Utc;

    fn item(title: &str, link: &str, body: &str) -> Item {
        Item::new(Provenance::HackerNews, title, link, 1, Utc::now()).with_body(body)
    }

    #[test]
    fn tracking_params_give_identical_links() {
        let s = similarity(
            &item("a", "https://example.com/x?utm_source=rss", ""),
            &item("b", "https://example.com/x", ""),
            &DedupConfig::default(),
        );
        assert_eq!(s.link_similarity, 1.0);
        assert!(s.is_duplicate);
    }

    #[test]
    fn different_hosts_score_zero() {
        let a = canonicalize_link("https://a.com/story");
        let b = canonicalize_link("https://b.com/story");
        assert_eq!(link_similarity(&a, &b), 0.0);
    }

    #[test]
    fn same_host_uses_path_ratio() {
        let a = canonicalize_link("https://a.com/posts/1234");
        let b = canonicalize_link("https://a.com/posts/1235");
        let s = link_similarity(&a, &b);
        assert!(s > 0.8 && s < 1.0, "{s}");
    }

    #[test]
    fn case_only_title_difference_is_identical() {
        let a = canonicalize_title("Model X releases update");
        let b = canonicalize_title("Model X Releases Update");
        assert_eq!(title_similarity(&a, &b), 1.0);
    }

    #[test]
    fn title_mixes_chars_and_words() {
        let s = title_similarity("openai releases gpt 5", "openai launches gpt 5");
        // 3 of 5 distinct words shared
        let jaccard = 3.0 / 5.0;
        let chars = normalized_levenshtein("openai releases gpt 5", "openai launches gpt 5");
        assert!((s - (0.6 * chars + 0.4 * jaccard)).abs() < 1e-12);
    }

    #[test]
    fn body_rules() {
        assert_eq!(body_similarity("", "anything"), 0.0);
        assert_eq!(body_similarity("short", "short"), 1.0);
        let long_a = format!("{}{}", "x".repeat(200), "tail one");
        let long_b = format!("{}{}", "x".repeat(200), "completely different tail");
        assert_eq!(body_similarity(&long_a, &long_b), 1.0);
    }

    #[test]
    fn similarity_is_symmetric() {
        let cfg = DedupConfig::default();
        let pairs = [
            (
                item("Show HN: Rust LLM runtime", "https://github.com/a/rt", "fast inference"),
                item("Rust runtime for LLMs", "https://github.com/a/rt/", "inference, fast"),
            ),
            (
                item("Claude 4 announced", "https://anthropic.com/news/claude-4", ""),
                item("Claude four is here", "https://news.example.com/c4?ref=x", "long body ".repeat(20).as_str()),
            ),
        ];
        for (a, b) in &pairs {
            assert_eq!(similarity(a, b, &cfg), similarity(b, a, &cfg));
        }
    }

    #[test]
    fn combined_is_weighted_sum() {
        let s = similarity(
            &item("OpenAI ships agents", "https://a.com/1", "same body"),
            &item("Unrelated words here", "https://a.com/2", "same body"),
            &DedupConfig::default(),
        );
        let want = 0.5 * s.link_similarity + 0.4 * s.title_similarity + 0.1 * s.body_similarity;
        assert!((s.combined_score - want).abs() < 1e-12);
    }
}
