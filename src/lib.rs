// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod dedup;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod verify;

// ---- Re-exports for stable public API ----
pub use crate::config::PipelineConfig;
pub use crate::dedup::{deduplicate, deduplicate_with_stats, DedupStats};
pub use crate::ingest::run_result::{CollectionRunResult, RunIssue};
pub use crate::ingest::types::{Item, Provenance, SourceCollector};
pub use crate::ingest::collect;
pub use crate::notify::{should_notify, NotificationEvent, Notifier, NotifyLevel};
pub use crate::pipeline::{Pipeline, PipelineReport, RunState, VerifiedItem};
pub use crate::verify::{
    Corroboration, CorroborationSource, VerificationResult, VerificationStatus, Verifier,
};
