// src/dedup/mod.rs
//! Deduplication engine: greedy first-match merge where the better item wins.
//!
//! Each incoming item is compared against the current survivors in order and
//! stops at the first duplicate. The survivor slot then holds whichever of the
//! two ranks higher on (provenance priority, popularity, body length, metadata
//! richness); ties keep the survivor. Unmergeable items are always kept.

pub mod canonical;
pub mod similarity;

use metrics::counter;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::DedupConfig;
use crate::ingest::types::{Item, Provenance};
use similarity::{compare, Fingerprint};

/// Summary of one dedup pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DedupStats {
    pub total_items: usize,
    pub unique_items: usize,
    pub duplicates_removed: usize,
    /// `duplicates_removed / total_items`, 0.0 for empty input.
    pub duplication_rate: f64,
    pub by_source_before: BTreeMap<Provenance, usize>,
    pub by_source_after: BTreeMap<Provenance, usize>,
}

/// Orders two items by merge preference; `Greater` means `a` is better.
pub fn preference(a: &Item, b: &Item, cfg: &DedupConfig) -> Ordering {
    // Lower rank wins, hence reversed.
    cfg.rank(b.provenance)
        .cmp(&cfg.rank(a.provenance))
        .then(a.popularity_score.cmp(&b.popularity_score))
        .then_with(|| {
            a.body_excerpt
                .chars()
                .count()
                .cmp(&b.body_excerpt.chars().count())
        })
        .then(a.provenance_metadata.len().cmp(&b.provenance_metadata.len()))
}

/// Does `candidate` replace `existing`? Ties keep `existing`.
pub fn candidate_wins(existing: &Item, candidate: &Item, cfg: &DedupConfig) -> bool {
    preference(candidate, existing, cfg) == Ordering::Greater
}

pub fn deduplicate(items: Vec<Item>, cfg: &DedupConfig) -> Vec<Item> {
    deduplicate_with_stats(items, cfg).0
}

pub fn deduplicate_with_stats(items: Vec<Item>, cfg: &DedupConfig) -> (Vec<Item>, DedupStats) {
    let mut stats = DedupStats {
        total_items: items.len(),
        ..DedupStats::default()
    };
    for it in &items {
        *stats.by_source_before.entry(it.provenance).or_default() += 1;
    }

    // Survivors with their fingerprint; `None` marks an unmergeable item.
    let mut out: Vec<(Item, Option<Fingerprint>)> = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_mergeable() {
            out.push((item, None));
            continue;
        }
        let fp = Fingerprint::of(&item);
        let hit = out.iter().enumerate().find_map(|(idx, (_, other))| {
            let other = other.as_ref()?;
            let score = compare(other, &fp, cfg);
            score.is_duplicate.then_some((idx, score))
        });

        match hit {
            Some((idx, score)) => {
                stats.duplicates_removed += 1;
                let existing = &out[idx].0;
                let replace = candidate_wins(existing, &item, cfg);
                let (kept, dropped) = if replace {
                    (&item, existing)
                } else {
                    (existing, &item)
                };
                tracing::debug!(
                    target: "dedup",
                    kept = %kept.log_id(),
                    kept_source = %kept.provenance,
                    dropped = %dropped.log_id(),
                    dropped_source = %dropped.provenance,
                    link = score.link_similarity,
                    title = score.title_similarity,
                    combined = score.combined_score,
                    "duplicate merged"
                );
                if replace {
                    out[idx] = (item, Some(fp));
                }
            }
            None => out.push((item, Some(fp))),
        }
    }

    let unique: Vec<Item> = out.into_iter().map(|(it, _)| it).collect();
    for it in &unique {
        *stats.by_source_after.entry(it.provenance).or_default() += 1;
    }
    stats.unique_items = unique.len();
    if stats.total_items > 0 {
        stats.duplication_rate = stats.duplicates_removed as f64 / stats.total_items as f64;
    }

    counter!("dedup_removed_total").increment(stats.duplicates_removed as u64);
    tracing::info!(
        target: "dedup",
        total = stats.total_items,
        unique = stats.unique_items,
        removed = stats.duplicates_removed,
        "dedup finished"
    );
    (unique, stats)
}
