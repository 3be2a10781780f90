use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::{NotificationEvent, Notifier};

pub struct SlackNotifier {
    webhook_url: Option<String>,
    client: Client,
    timeout: Duration,
}

impl SlackNotifier {
    pub fn from_env() -> Self {
        Self {
            webhook_url: std::env::var("SLACK_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn new(url: String) -> Self {
        Self {
            webhook_url: Some(url),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Plain-text Slack message for one item.
pub fn render_text(ev: &NotificationEvent) -> String {
    let v = &ev.verification;
    let mut text = format!(
        "*{}*\n<{}>\nSource: {} (score {})\nVerification: {} ({:.0}% confidence)",
        ev.item.title,
        ev.item.canonical_link,
        ev.item.provenance,
        ev.item.popularity_score,
        v.status,
        v.confidence * 100.0,
    );
    for (secondary, links) in &v.corroborating_links {
        for link in links.iter().take(3) {
            text.push_str(&format!("\n- {secondary}: {link}"));
        }
    }
    text
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn send(&self, ev: &NotificationEvent) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!(target: "notify", "Slack disabled (no SLACK_WEBHOOK_URL)");
            return Ok(());
        };

        let body = serde_json::json!({ "text": render_text(ev) });

        self.client
            .post(url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{Item, Provenance};
    use crate::verify::{VerificationResult, VerificationStatus};
    use std::collections::BTreeMap;

    #[test]
    fn text_carries_title_link_and_corroboration() {
        let item = Item::new(
            Provenance::HackerNews,
            "Model X releases update",
            "https://example.com/x",
            120,
            chrono::Utc::now(),
        );
        let mut links = BTreeMap::new();
        links.insert("dev.to".to_string(), vec!["https://dev.to/a".to_string()]);
        let v = VerificationResult {
            status: VerificationStatus::Verified,
            confidence: 0.81,
            corroboration_counts: BTreeMap::from([("dev.to".to_string(), 1)]),
            corroborating_links: links,
            keywords: vec!["Model".into()],
            failed_sources: vec![],
        };
        let text = render_text(&NotificationEvent::new(item, v));
        assert!(text.contains("Model X releases update"));
        assert!(text.contains("<https://example.com/x>"));
        assert!(text.contains("verified (81% confidence)"));
        assert!(text.contains("dev.to: https://dev.to/a"));
    }

    #[tokio::test]
    async fn missing_webhook_skips_send() {
        let n = SlackNotifier {
            webhook_url: None,
            client: Client::new(),
            timeout: Duration::from_secs(1),
        };
        assert!(!n.is_enabled());
        let item = Item::new(
            Provenance::Reddit,
            "t",
            "https://example.com/t",
            1,
            chrono::Utc::now(),
        );
        let ev = NotificationEvent::new(item, VerificationResult::empty(vec![]));
        assert!(n.send(&ev).await.is_ok());
    }

    #[tokio::test]
    async fn explicit_webhook_is_enabled_and_reports_delivery_failure() {
        let n = SlackNotifier::new("http://127.0.0.1:9/hook".into());
        assert!(n.is_enabled());
        let item = Item::new(
            Provenance::HackerNews,
            "t",
            "https://example.com/t",
            1,
            chrono::Utc::now(),
        );
        let ev = NotificationEvent::new(item, VerificationResult::empty(vec![]));
        assert!(n.send(&ev).await.is_err());
    }
}
