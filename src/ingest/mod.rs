// src/ingest/mod.rs
//! Collection orchestrator: fan out to every enabled source on a bounded
//! worker pool, isolate failures per source, merge what came back.

pub mod providers;
pub mod run_result;
pub mod types;

use crate::config::CollectionConfig;
use crate::ingest::run_result::{CollectionRunResult, RunIssue};
use crate::ingest::types::{Item, Provenance, SourceCollector};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Upper bound on stored body excerpts, in characters.
pub const BODY_MAX_CHARS: usize = 1500;

/// One-time metrics registration (so series show up in the exposition output).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Items kept per source after truncation.");
        describe_counter!(
            "ingest_source_errors_total",
            "Collector failures and timeouts per source."
        );
        describe_counter!("ingest_malformed_total", "Items missing a title or link.");
        describe_histogram!("ingest_collect_ms", "Per-source collection time in milliseconds.");
        describe_counter!("dedup_removed_total", "Items absorbed into a surviving duplicate.");
        describe_counter!("verify_items_total", "Verification results by status.");
        describe_counter!(
            "verify_secondary_errors_total",
            "Corroboration query failures per secondary source."
        );
        describe_counter!("notify_sent_total", "Items handed to the notifier successfully.");
        describe_counter!("notify_failed_total", "Notifier failures.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Normalize provider text: decode entities, strip tags, fold quotes,
/// collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > BODY_MAX_CHARS {
        out = out.chars().take(BODY_MAX_CHARS).collect();
    }
    out
}

/// Short anonymized id (first 6 bytes of SHA-256, hex) for log lines.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

enum TaskOutcome {
    Items(Vec<Item>),
    Failed(String),
    TimedOut,
}

/// Run every enabled collector concurrently and merge the results.
///
/// Items are concatenated in task completion order; each source is truncated
/// to its `max_items` first. A collector that errors, panics or times out is
/// recorded in the run result and contributes nothing. Never fails.
pub async fn collect(
    collectors: &[Arc<dyn SourceCollector>],
    cfg: &CollectionConfig,
) -> (Vec<Item>, CollectionRunResult) {
    ensure_metrics_described();
    let started = Instant::now();
    let mut run = CollectionRunResult::default();

    let permits = Arc::new(Semaphore::new(cfg.max_concurrency.max(1)));
    let lookback = cfg.lookback();
    let mut tasks = JoinSet::new();

    for collector in collectors {
        let provenance = collector.provenance();
        let Some(source_cfg) = cfg.sources.get(&provenance).copied().filter(|s| s.enabled) else {
            tracing::debug!(target: "ingest", source = %provenance, "source disabled, skipping");
            continue;
        };
        run.sources_attempted.push(provenance);
        run.record_items(provenance, 0);

        let collector = Arc::clone(collector);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            // Semaphore is never closed.
            let _permit = permits.acquire_owned().await.ok();
            let t0 = Instant::now();
            let timeout = source_cfg.timeout();
            // Inner task so a panicking collector is caught as a JoinError.
            let inner = tokio::spawn(async move {
                tokio::time::timeout(timeout, collector.fetch(lookback, source_cfg.max_items)).await
            });
            let outcome = match inner.await {
                Ok(Ok(Ok(items))) => TaskOutcome::Items(items),
                Ok(Ok(Err(e))) => TaskOutcome::Failed(format!("{e:#}")),
                Ok(Err(_elapsed)) => TaskOutcome::TimedOut,
                Err(join) => TaskOutcome::Failed(format!("collector task aborted: {join}")),
            };
            (provenance, source_cfg, outcome, t0.elapsed())
        });
    }

    let mut merged = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (provenance, source_cfg, outcome, took) = match joined {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(target: "ingest", error = %e, "collection task lost");
                continue;
            }
        };
        histogram!("ingest_collect_ms", "source" => provenance.as_str()).record(millis(took));

        match outcome {
            TaskOutcome::Items(mut items) => {
                items.truncate(source_cfg.max_items);
                for it in items.iter_mut() {
                    it.provenance = provenance;
                    if !it.is_mergeable() {
                        counter!("ingest_malformed_total").increment(1);
                        run.warn(RunIssue::MalformedItem {
                            source: provenance,
                            item: it.title.chars().take(50).collect(),
                        });
                    }
                }
                tracing::info!(
                    target: "ingest",
                    source = %provenance,
                    items = items.len(),
                    ms = took.as_millis() as u64,
                    "source collected"
                );
                counter!("ingest_items_total", "source" => provenance.as_str())
                    .increment(items.len() as u64);
                run.record_items(provenance, items.len());
                merged.extend(items);
            }
            TaskOutcome::Failed(reason) => {
                tracing::warn!(target: "ingest", source = %provenance, error = %reason, "source failed");
                counter!("ingest_source_errors_total", "source" => provenance.as_str()).increment(1);
                run.error(RunIssue::SourceUnavailable {
                    source: provenance,
                    reason,
                });
            }
            TaskOutcome::TimedOut => {
                tracing::warn!(
                    target: "ingest",
                    source = %provenance,
                    timeout_secs = source_cfg.timeout_secs,
                    "source timed out"
                );
                counter!("ingest_source_errors_total", "source" => provenance.as_str()).increment(1);
                run.error(RunIssue::SourceTimedOut {
                    source: provenance,
                    timeout_secs: source_cfg.timeout_secs,
                });
            }
        }
    }

    tracing::info!(
        target: "ingest",
        total = merged.len(),
        attempted = run.sources_attempted.len(),
        failed = run.failed_sources().len(),
        "collection finished"
    );
    (merged, run.freeze(started))
}

/// Order used when reproducibility matters: provenance priority, then
/// observation time, then link.
pub fn sort_stable(items: &mut [Item], priority: impl Fn(Provenance) -> usize) {
    items.sort_by(|a, b| {
        priority(a.provenance)
            .cmp(&priority(b.provenance))
            .then(a.observed_at.cmp(&b.observed_at))
            .then_with(|| a.canonical_link.cmp(&b.canonical_link))
    });
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}
