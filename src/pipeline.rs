// src/pipeline.rs
//! One pipeline run: collect → (stable sort) → dedup → verify → gate → notify.

use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::dedup::{deduplicate_with_stats, DedupStats};
use crate::ingest::run_result::{CollectionRunResult, RunIssue};
use crate::ingest::types::{Item, SourceCollector};
use crate::ingest::{collect, ensure_metrics_described, sort_stable};
use crate::notify::{should_notify, NotificationEvent, Notifier};
use crate::verify::{VerificationResult, VerificationStatus, Verifier};

/// How a run ended, without raising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Completed,
    /// No source was enabled.
    NoSources,
    /// Sources answered but produced nothing.
    Empty,
    /// Every attempted source failed and nothing was collected.
    AllSourcesFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifiedItem {
    pub item: Item,
    pub verification: VerificationResult,
    pub notified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub state: RunState,
    pub run: CollectionRunResult,
    pub collected: usize,
    pub dedup: DedupStats,
    pub results: Vec<VerifiedItem>,
    pub verified: usize,
    pub partially_verified: usize,
    pub notified: usize,
}

impl PipelineReport {
    pub fn is_run_failure(&self) -> bool {
        self.state == RunState::AllSourcesFailed
    }
}

pub struct Pipeline {
    collectors: Vec<Arc<dyn SourceCollector>>,
    verifier: Verifier,
    notifier: Option<Arc<dyn Notifier>>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        collectors: Vec<Arc<dyn SourceCollector>>,
        verifier: Verifier,
        config: PipelineConfig,
    ) -> Self {
        Self {
            collectors,
            verifier,
            notifier: None,
            config,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn run(&self) -> PipelineReport {
        ensure_metrics_described();
        let started = Instant::now();

        let (mut items, mut run) = collect(&self.collectors, &self.config.collection).await;
        let collected = items.len();
        let state = if run.sources_attempted.is_empty() {
            RunState::NoSources
        } else if run.is_run_failure() {
            RunState::AllSourcesFailed
        } else if items.is_empty() {
            RunState::Empty
        } else {
            RunState::Completed
        };
        if state == RunState::AllSourcesFailed {
            tracing::error!(target: "pipeline", failed = ?run.failed_sources(), "all sources failed");
        }

        if self.config.collection.stable_order {
            let dedup_cfg = &self.config.dedup;
            sort_stable(&mut items, |p| dedup_cfg.rank(p));
        }
        let (unique, dedup) = deduplicate_with_stats(items, &self.config.dedup);

        let results = self.verify_all(unique, &mut run).await;
        let mut report = PipelineReport {
            state,
            run: CollectionRunResult::default(),
            collected,
            dedup,
            verified: count_status(&results, VerificationStatus::Verified),
            partially_verified: count_status(&results, VerificationStatus::PartiallyVerified),
            notified: 0,
            results,
        };

        self.release(&mut report.results, &mut run).await;
        report.notified = report.results.iter().filter(|r| r.notified).count();

        gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        report.run = run.freeze(started);
        tracing::info!(
            target: "pipeline",
            state = ?report.state,
            collected = report.collected,
            unique = report.dedup.unique_items,
            verified = report.verified,
            partial = report.partially_verified,
            notified = report.notified,
            errors = report.run.errors.len(),
            warnings = report.run.warnings.len(),
            ms = report.run.elapsed_time.as_millis() as u64,
            "pipeline run finished"
        );
        report
    }

    /// Sequential, with a pause between items for secondary rate limits.
    async fn verify_all(&self, unique: Vec<Item>, run: &mut CollectionRunResult) -> Vec<VerifiedItem> {
        let delay = self.verifier.config().inter_item_delay();
        let n = unique.len();
        let mut out = Vec::with_capacity(n);
        for (idx, item) in unique.into_iter().enumerate() {
            let verification = self.verifier.verify(&item).await;
            for secondary in &verification.failed_sources {
                run.warn(RunIssue::SecondaryUnavailable {
                    secondary: secondary.clone(),
                    item: label(&item),
                    reason: "query failed or timed out".to_string(),
                });
            }
            if verification.status != VerificationStatus::Verified {
                run.warn(RunIssue::NotVerified {
                    item: label(&item),
                    status: verification.status.to_string(),
                });
            }
            out.push(VerifiedItem {
                item,
                verification,
                notified: false,
            });
            if idx + 1 < n && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        out
    }

    /// Hand gated items to the notifier, at most `max_per_run` of them.
    async fn release(&self, results: &mut [VerifiedItem], run: &mut CollectionRunResult) {
        let Some(notifier) = self.notifier.as_ref().filter(|n| n.is_enabled()) else {
            tracing::debug!(target: "notify", "no enabled notifier, nothing released");
            return;
        };
        let level = self.config.notify.level;
        let mut sent = 0usize;
        for r in results.iter_mut() {
            if sent >= self.config.notify.max_per_run {
                tracing::info!(target: "notify", cap = self.config.notify.max_per_run, "notification cap reached");
                break;
            }
            if !should_notify(r.verification.status, level) {
                continue;
            }
            let ev = NotificationEvent::new(r.item.clone(), r.verification.clone());
            match notifier.send(&ev).await {
                Ok(()) => {
                    sent += 1;
                    r.notified = true;
                    counter!("notify_sent_total").increment(1);
                    tracing::info!(target: "notify", item = %r.item.log_id(), status = %r.verification.status, "notification sent");
                }
                Err(e) => {
                    counter!("notify_failed_total").increment(1);
                    tracing::warn!(target: "notify", item = %r.item.log_id(), error = %e, "notification failed");
                    run.error(RunIssue::NotificationFailed {
                        item: label(&r.item),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }
    }
}

/// Human-facing item label for run issues.
fn label(item: &Item) -> String {
    item.title.chars().take(60).collect()
}

fn count_status(results: &[VerifiedItem], status: VerificationStatus) -> usize {
    results
        .iter()
        .filter(|r| r.verification.status == status)
        .count()
}
