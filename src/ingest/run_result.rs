// src/ingest/run_result.rs
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::ingest::types::Provenance;

/// Structured description of a partial failure. Nothing in this list aborts a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunIssue {
    /// Collector returned an error (or its task panicked).
    SourceUnavailable { source: Provenance, reason: String },
    /// Collector exceeded its per-task timeout.
    SourceTimedOut { source: Provenance, timeout_secs: u64 },
    /// A corroboration query failed; that secondary contributed zero hits.
    SecondaryUnavailable {
        secondary: String,
        item: String,
        reason: String,
    },
    /// Item without title or link; kept, never compared.
    MalformedItem { source: Provenance, item: String },
    NotificationFailed { item: String, reason: String },
    NotVerified { item: String, status: String },
}

impl RunIssue {
    /// Collector that caused the issue, if any.
    pub fn failed_source(&self) -> Option<Provenance> {
        match self {
            RunIssue::SourceUnavailable { source, .. } | RunIssue::SourceTimedOut { source, .. } => {
                Some(*source)
            }
            _ => None,
        }
    }
}

impl fmt::Display for RunIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunIssue::SourceUnavailable { source, reason } => {
                write!(f, "source {source} unavailable: {reason}")
            }
            RunIssue::SourceTimedOut {
                source,
                timeout_secs,
            } => write!(f, "source {source} timed out after {timeout_secs}s"),
            RunIssue::SecondaryUnavailable {
                secondary,
                item,
                reason,
            } => write!(f, "secondary {secondary} failed for '{item}': {reason}"),
            RunIssue::MalformedItem { source, item } => {
                write!(f, "malformed item from {source}: '{item}'")
            }
            RunIssue::NotificationFailed { item, reason } => {
                write!(f, "notification failed for '{item}': {reason}")
            }
            RunIssue::NotVerified { item, status } => {
                write!(f, "item not verified ({status}): '{item}'")
            }
        }
    }
}

/// Aggregate outcome of one run. Mutated while stages execute, frozen at the end.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionRunResult {
    pub items_by_source: BTreeMap<Provenance, usize>,
    pub sources_attempted: Vec<Provenance>,
    pub errors: Vec<RunIssue>,
    pub warnings: Vec<RunIssue>,
    #[serde(with = "duration_ms")]
    pub elapsed_time: Duration,
}

impl CollectionRunResult {
    pub fn record_items(&mut self, source: Provenance, n: usize) {
        *self.items_by_source.entry(source).or_insert(0) += n;
    }

    pub fn error(&mut self, issue: RunIssue) {
        self.errors.push(issue);
    }

    pub fn warn(&mut self, issue: RunIssue) {
        self.warnings.push(issue);
    }

    pub fn total_items(&self) -> usize {
        self.items_by_source.values().sum()
    }

    pub fn failed_sources(&self) -> Vec<Provenance> {
        let mut v: Vec<Provenance> = self.errors.iter().filter_map(RunIssue::failed_source).collect();
        v.sort();
        v.dedup();
        v
    }

    /// Every attempted source failed and nothing came back.
    pub fn is_run_failure(&self) -> bool {
        !self.sources_attempted.is_empty()
            && self.total_items() == 0
            && self.failed_sources().len() == self.sources_attempted.len()
    }

    /// Stamp the elapsed time and hand back the final value.
    pub fn freeze(mut self, started: Instant) -> Self {
        self.elapsed_time = started.elapsed();
        self
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
