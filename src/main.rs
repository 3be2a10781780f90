//! Run-once entrypoint: load config, collect, dedup, verify, notify, exit.
//! Meant to be driven by cron or a systemd timer.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use news_feeder::config::{load_config_default, PipelineConfig};
use news_feeder::ingest::providers::{github, hacker_news, reddit, TopicFilter};
use news_feeder::metrics::{Metrics, ENV_METRICS_TEXTFILE};
use news_feeder::notify::slack::SlackNotifier;
use news_feeder::verify::sources::{dev_to::DevToSource, medium::MediumSource};
use news_feeder::{
    CorroborationSource, Notifier, Pipeline, Provenance, SourceCollector, Verifier,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn build_collectors(cfg: &PipelineConfig) -> Vec<Arc<dyn SourceCollector>> {
    let keywords = cfg.verification.topic_keywords.clone();
    let min_score = |p: Provenance| {
        cfg.collection
            .sources
            .get(&p)
            .map(|s| s.min_score)
            .unwrap_or_default()
    };
    let subreddits = reddit::DEFAULT_SUBREDDITS
        .iter()
        .map(|s| s.to_string())
        .collect();

    vec![
        Arc::new(hacker_news::HackerNewsCollector::from_url(
            hacker_news::DEFAULT_BASE_URL,
            TopicFilter::new(keywords.clone(), min_score(Provenance::HackerNews)),
        )),
        Arc::new(reddit::RedditCollector::new(
            subreddits,
            TopicFilter::new(keywords, min_score(Provenance::Reddit)),
        )),
        // The search query already restricts topics.
        Arc::new(github::GitHubCollector::from_env(
            github::DEFAULT_QUERY,
            TopicFilter::new(Vec::new(), min_score(Provenance::GitHub)),
        )),
    ]
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = match Metrics::install() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder not installed");
            None
        }
    };

    let cfg = match load_config_default() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "invalid configuration");
            return ExitCode::from(2);
        }
    };

    let collectors = build_collectors(&cfg);
    let secondaries: Vec<Arc<dyn CorroborationSource>> =
        vec![Arc::new(DevToSource::default()), Arc::new(MediumSource::default())];
    let verifier = Verifier::new(secondaries, cfg.verification.clone());
    tracing::info!(
        target: "pipeline",
        secondaries = ?verifier.source_names(),
        lookback_h = cfg.collection.lookback_hours,
        level = %cfg.notify.level,
        "starting run"
    );

    let slack = SlackNotifier::from_env();
    let mut pipeline = Pipeline::new(collectors, verifier, cfg);
    if slack.is_enabled() {
        pipeline = pipeline.with_notifier(Arc::new(slack));
    } else {
        tracing::warn!(target: "notify", "SLACK_WEBHOOK_URL not set; notifications are skipped");
    }

    let report = pipeline.run().await;
    for issue in &report.run.errors {
        tracing::warn!(target: "pipeline", issue = %issue, "run error");
    }
    for issue in &report.run.warnings {
        tracing::debug!(target: "pipeline", issue = %issue, "run warning");
    }

    if let (Some(m), Ok(path)) = (&metrics, std::env::var(ENV_METRICS_TEXTFILE)) {
        if let Err(e) = m.write_textfile(&PathBuf::from(path)) {
            tracing::warn!(error = %format!("{e:#}"), "metrics textfile not written");
        }
    }

    if report.is_run_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
