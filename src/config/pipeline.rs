// src/config/pipeline.rs
use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::ingest::types::Provenance;
use crate::notify::NotifyLevel;

/// Every knob the pipeline stages read. Built once, then passed by reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub collection: CollectionConfig,
    pub dedup: DedupConfig,
    pub verification: VerificationConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub lookback_hours: u64,
    /// Worker pool size; independent of how many sources are configured.
    pub max_concurrency: usize,
    /// Sort the merged list by a stable key before dedup (see `pipeline`).
    pub stable_order: bool,
    #[serde(deserialize_with = "merge_sources")]
    pub sources: BTreeMap<Provenance, SourceConfig>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            lookback_hours: 24,
            max_concurrency: 3,
            stable_order: true,
            sources: default_sources(),
        }
    }
}

fn default_sources() -> BTreeMap<Provenance, SourceConfig> {
    Provenance::ALL
        .iter()
        .map(|p| (*p, SourceConfig::default_for(*p)))
        .collect()
}

/// File entries are merged over the per-source defaults; a source the file
/// does not mention keeps its default, and so does any key a listed source omits.
fn merge_sources<'de, D>(deserializer: D) -> Result<BTreeMap<Provenance, SourceConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let partial: BTreeMap<Provenance, PartialSourceConfig> = BTreeMap::deserialize(deserializer)?;
    let mut sources = default_sources();
    for (p, over) in partial {
        let s = sources.entry(p).or_insert_with(|| SourceConfig::default_for(p));
        if let Some(v) = over.enabled {
            s.enabled = v;
        }
        if let Some(v) = over.max_items {
            s.max_items = v;
        }
        if let Some(v) = over.timeout_secs {
            s.timeout_secs = v;
        }
        if let Some(v) = over.min_score {
            s.min_score = v;
        }
    }
    Ok(sources)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PartialSourceConfig {
    enabled: Option<bool>,
    max_items: Option<usize>,
    timeout_secs: Option<u64>,
    min_score: Option<i64>,
}

impl CollectionConfig {
    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_hours.saturating_mul(3600))
    }

    /// Settings for `p`, created from its defaults when absent.
    pub fn source_mut(&mut self, p: Provenance) -> &mut SourceConfig {
        self.sources
            .entry(p)
            .or_insert_with(|| SourceConfig::default_for(p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub enabled: bool,
    pub max_items: usize,
    pub timeout_secs: u64,
    /// Popularity floor applied inside the collector (points, upvotes, stars).
    pub min_score: i64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_items: 5,
            timeout_secs: 300,
            min_score: 0,
        }
    }
}

impl SourceConfig {
    /// Defaults for one provenance; only the popularity floor differs.
    pub fn default_for(p: Provenance) -> Self {
        let min_score = match p {
            Provenance::HackerNews | Provenance::Reddit => 50,
            Provenance::GitHub => 10,
        };
        Self {
            min_score,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub link_threshold: f64,
    pub title_threshold: f64,
    pub overall_threshold: f64,
    /// Highest priority first. Provenances not listed rank below all listed ones.
    pub provenance_priority: Vec<Provenance>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            link_threshold: 0.8,
            title_threshold: 0.85,
            overall_threshold: 0.7,
            provenance_priority: vec![
                Provenance::HackerNews,
                Provenance::GitHub,
                Provenance::Reddit,
            ],
        }
    }
}

impl DedupConfig {
    /// Rank of a provenance: 0 is best.
    pub fn rank(&self, p: Provenance) -> usize {
        self.provenance_priority
            .iter()
            .position(|x| *x == p)
            .unwrap_or(self.provenance_priority.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Topic keywords, preferred over capitalized title words when searching.
    pub topic_keywords: Vec<String>,
    pub max_keywords: usize,
    pub min_total_hits: u32,
    /// Per-secondary minimum hit count; secondaries not listed need 0.
    pub min_hits_per_source: BTreeMap<String, u32>,
    /// Per-secondary weight; secondaries not listed weigh 1.0.
    pub source_weights: BTreeMap<String, f32>,
    pub saturation_hits: u32,
    pub diversity_bonus: f32,
    pub min_confidence: f32,
    /// When false, anything short of `verified` is `unverified`.
    pub partial_tier: bool,
    pub inter_item_delay_ms: u64,
    pub query_timeout_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        let topic_keywords = [
            "ChatGPT",
            "Claude",
            "AI",
            "LLM",
            "OpenAI",
            "Google AI",
            "GPT-4",
            "artificial intelligence",
            "machine learning",
            "deep learning",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut source_weights = BTreeMap::new();
        source_weights.insert("dev.to".to_string(), 0.6);
        source_weights.insert("medium".to_string(), 0.4);

        Self {
            topic_keywords,
            max_keywords: 5,
            min_total_hits: 1,
            min_hits_per_source: BTreeMap::new(),
            source_weights,
            saturation_hits: 10,
            diversity_bonus: 0.2,
            min_confidence: 0.0,
            partial_tier: true,
            inter_item_delay_ms: 500,
            query_timeout_secs: 10,
        }
    }
}

impl VerificationConfig {
    pub fn weight_for(&self, secondary: &str) -> f32 {
        self.source_weights.get(secondary).copied().unwrap_or(1.0)
    }

    pub fn min_hits_for(&self, secondary: &str) -> u32 {
        self.min_hits_per_source.get(secondary).copied().unwrap_or(0)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn inter_item_delay(&self) -> Duration {
        Duration::from_millis(self.inter_item_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub level: NotifyLevel,
    /// Upper bound on items released to the notifier in one run.
    pub max_per_run: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            level: NotifyLevel::VerifiedOnly,
            max_per_run: 5,
        }
    }
}

impl PipelineConfig {
    /// Reject configurations that would make the stages meaningless.
    pub fn validate(&self) -> Result<()> {
        let c = &self.collection;
        if c.max_concurrency == 0 {
            bail!("collection.max_concurrency must be > 0");
        }
        for (p, s) in &c.sources {
            if s.max_items == 0 {
                bail!("collection.sources.{p}.max_items must be > 0");
            }
            if s.timeout_secs == 0 {
                bail!("collection.sources.{p}.timeout_secs must be > 0");
            }
        }

        let d = &self.dedup;
        for (name, v) in [
            ("link_threshold", d.link_threshold),
            ("title_threshold", d.title_threshold),
            ("overall_threshold", d.overall_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                bail!("dedup.{name} must be within [0, 1], got {v}");
            }
        }

        let v = &self.verification;
        if v.max_keywords == 0 {
            bail!("verification.max_keywords must be > 0");
        }
        if v.saturation_hits == 0 {
            bail!("verification.saturation_hits must be > 0");
        }
        if let Some((name, w)) = v
            .source_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            bail!("verification.source_weights.{name} must be >= 0, got {w}");
        }
        for (name, x) in [
            ("diversity_bonus", v.diversity_bonus),
            ("min_confidence", v.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&x) {
                bail!("verification.{name} must be within [0, 1], got {x}");
            }
        }

        if self.notify.max_per_run == 0 {
            bail!("notify.max_per_run must be > 0");
        }
        Ok(())
    }

    /// Apply the flat environment overrides used by deployments.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        for (var, p) in [
            ("ENABLE_HACKERNEWS", Provenance::HackerNews),
            ("ENABLE_REDDIT", Provenance::Reddit),
            ("ENABLE_GITHUB", Provenance::GitHub),
        ] {
            if let Some(raw) = env_var(var) {
                let on = parse_bool(&raw).ok_or_else(|| anyhow!("{var}: expected a boolean, got '{raw}'"))?;
                self.collection.source_mut(p).enabled = on;
            }
        }
        if let Some(n) = env_parse::<usize>("MAX_ARTICLES_PER_SOURCE")? {
            for s in self.collection.sources.values_mut() {
                s.max_items = n;
            }
        }
        if let Some(n) = env_parse::<i64>("MINIMUM_SCORE")? {
            for p in [Provenance::HackerNews, Provenance::Reddit] {
                self.collection.source_mut(p).min_score = n;
            }
        }
        if let Some(h) = env_parse::<u64>("CHECK_INTERVAL_HOURS")? {
            self.collection.lookback_hours = h;
        }
        if let Some(raw) = env_var("NOTIFY_VERIFICATION_LEVEL") {
            self.notify.level = raw.parse()?;
        }
        if let Some(n) = env_parse::<usize>("MAX_ARTICLES_PER_DAY")? {
            self.notify.max_per_run = n;
        }
        if let Some(n) = env_parse::<u32>("FACTCHECK_MIN_SOURCES")? {
            self.verification.min_total_hits = n;
        }
        for (var, secondary) in [("FACTCHECK_MIN_DEV_TO", "dev.to"), ("FACTCHECK_MIN_MEDIUM", "medium")] {
            if let Some(n) = env_parse::<u32>(var)? {
                self.verification
                    .min_hits_per_source
                    .insert(secondary.to_string(), n);
            }
        }
        if let Some(t) = env_parse::<f32>("FACTCHECK_CONFIDENCE_THRESHOLD")? {
            self.verification.min_confidence = t;
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("{name}: invalid value '{raw}': {e}")),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
