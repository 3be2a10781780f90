// src/notify/mod.rs
//! Notification gate and the downstream notifier seam.

pub mod slack;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ingest::types::Item;
use crate::verify::{VerificationResult, VerificationStatus};

/// How strict the gate is about releasing items downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyLevel {
    VerifiedOnly,
    #[serde(alias = "verified_partial")]
    VerifiedOrPartial,
    All,
}

impl NotifyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyLevel::VerifiedOnly => "verified_only",
            NotifyLevel::VerifiedOrPartial => "verified_or_partial",
            NotifyLevel::All => "all",
        }
    }
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotifyLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verified_only" => Ok(NotifyLevel::VerifiedOnly),
            "verified_or_partial" | "verified_partial" => Ok(NotifyLevel::VerifiedOrPartial),
            "all" => Ok(NotifyLevel::All),
            other => anyhow::bail!("unknown notification level: {other}"),
        }
    }
}

/// Pure go/no-go for a single item.
pub fn should_notify(status: VerificationStatus, level: NotifyLevel) -> bool {
    match level {
        NotifyLevel::VerifiedOnly => status == VerificationStatus::Verified,
        NotifyLevel::VerifiedOrPartial => matches!(
            status,
            VerificationStatus::Verified | VerificationStatus::PartiallyVerified
        ),
        NotifyLevel::All => true,
    }
}

/// What a notifier receives: the surviving item plus its verification.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub item: Item,
    pub verification: VerificationResult,
    pub ts: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(item: Item, verification: VerificationResult) -> Self {
        Self {
            item,
            verification,
            ts: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, ev: &NotificationEvent) -> Result<()>;

    /// A disabled notifier is skipped by the pipeline; nothing is counted as sent.
    fn is_enabled(&self) -> bool {
        true
    }
}
