// tests/config_loading.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use news_feeder::config::{load_config_default, load_config_from, ENV_PIPELINE_CONFIG_PATH};
use news_feeder::{collect, Item, NotifyLevel, Provenance, SourceCollector};
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs};

const OVERRIDE_VARS: &[&str] = &[
    ENV_PIPELINE_CONFIG_PATH,
    "ENABLE_HACKERNEWS",
    "ENABLE_REDDIT",
    "ENABLE_GITHUB",
    "MAX_ARTICLES_PER_SOURCE",
    "MINIMUM_SCORE",
    "CHECK_INTERVAL_HOURS",
    "NOTIFY_VERIFICATION_LEVEL",
    "MAX_ARTICLES_PER_DAY",
    "FACTCHECK_MIN_SOURCES",
    "FACTCHECK_MIN_DEV_TO",
    "FACTCHECK_MIN_MEDIUM",
    "FACTCHECK_CONFIDENCE_THRESHOLD",
];

fn clear_env() {
    for v in OVERRIDE_VARS {
        env::remove_var(v);
    }
}

/// Run `f` from an empty working directory so the repo's config/ is not read.
fn in_tmp_cwd(f: impl FnOnce(&std::path::Path)) {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();
    f(tmp.path());
    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[test]
fn toml_and_json_files_parse() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("pipeline.toml");
    fs::write(
        &p_toml,
        r#"
[collection]
lookback_hours = 6
max_concurrency = 2

[verification]
min_total_hits = 2
source_weights = { "dev.to" = 0.5, medium = 0.5 }
"#,
    )
    .unwrap();
    let c = load_config_from(&p_toml).unwrap();
    assert_eq!(c.collection.lookback_hours, 6);
    assert_eq!(c.collection.max_concurrency, 2);
    assert_eq!(c.collection.sources.len(), 3);
    assert_eq!(c.verification.min_total_hits, 2);
    assert_eq!(c.verification.weight_for("medium"), 0.5);

    let p_json = dir.path().join("pipeline.json");
    fs::write(&p_json, r#"{"notify": {"level": "verified_or_partial", "max_per_run": 9}}"#).unwrap();
    let j = load_config_from(&p_json).unwrap();
    assert_eq!(j.notify.level, NotifyLevel::VerifiedOrPartial);
    assert_eq!(j.notify.max_per_run, 9);
}

#[test]
fn malformed_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("broken.toml");
    fs::write(&p, "[collection\nlookback_hours = ").unwrap();
    let err = format!("{:#}", load_config_from(&p).unwrap_err());
    assert!(err.contains("broken.toml"), "{err}");
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    in_tmp_cwd(|tmp| {
        // 1) nothing on disk: built-in defaults
        let c = load_config_default().unwrap();
        assert_eq!(c.collection.lookback_hours, 24);

        // 2) ./config/pipeline.toml
        let cfg_dir = tmp.join("config");
        fs::create_dir_all(&cfg_dir).unwrap();
        fs::write(cfg_dir.join("pipeline.toml"), "[collection]\nlookback_hours = 12\n").unwrap();
        assert_eq!(load_config_default().unwrap().collection.lookback_hours, 12);

        // 3) explicit path wins over the fallback
        let p_env = tmp.join("other.json");
        fs::write(&p_env, r#"{"collection": {"lookback_hours": 3}}"#).unwrap();
        env::set_var(ENV_PIPELINE_CONFIG_PATH, p_env.display().to_string());
        assert_eq!(load_config_default().unwrap().collection.lookback_hours, 3);

        // 4) explicit path that does not exist is an error, not a silent fallback
        env::set_var(ENV_PIPELINE_CONFIG_PATH, tmp.join("missing.toml").display().to_string());
        assert!(load_config_default().is_err());
    });
}

#[serial_test::serial]
#[test]
fn env_overrides_apply_over_file_values() {
    in_tmp_cwd(|_| {
        env::set_var("ENABLE_REDDIT", "false");
        env::set_var("MAX_ARTICLES_PER_SOURCE", "7");
        env::set_var("MINIMUM_SCORE", "100");
        env::set_var("CHECK_INTERVAL_HOURS", "2");
        env::set_var("NOTIFY_VERIFICATION_LEVEL", "verified_partial");
        env::set_var("MAX_ARTICLES_PER_DAY", "3");
        env::set_var("FACTCHECK_MIN_SOURCES", "2");
        env::set_var("FACTCHECK_MIN_MEDIUM", "1");
        env::set_var("FACTCHECK_CONFIDENCE_THRESHOLD", "0.4");

        let c = load_config_default().unwrap();
        let sources = &c.collection.sources;
        assert!(!sources[&Provenance::Reddit].enabled);
        assert!(sources[&Provenance::HackerNews].enabled);
        assert!(sources.values().all(|s| s.max_items == 7));
        assert_eq!(sources[&Provenance::HackerNews].min_score, 100);
        assert_eq!(sources[&Provenance::Reddit].min_score, 100);
        assert_eq!(sources[&Provenance::GitHub].min_score, 10);
        assert_eq!(c.collection.lookback_hours, 2);
        assert_eq!(c.notify.level, NotifyLevel::VerifiedOrPartial);
        assert_eq!(c.notify.max_per_run, 3);
        assert_eq!(c.verification.min_total_hits, 2);
        assert_eq!(c.verification.min_hits_for("medium"), 1);
        assert_eq!(c.verification.min_hits_for("dev.to"), 0);
        assert!((c.verification.min_confidence - 0.4).abs() < 1e-6);
    });
}

#[serial_test::serial]
#[test]
fn invalid_values_are_rejected_at_load() {
    in_tmp_cwd(|tmp| {
        env::set_var("MAX_ARTICLES_PER_SOURCE", "lots");
        let err = format!("{:#}", load_config_default().unwrap_err());
        assert!(err.contains("MAX_ARTICLES_PER_SOURCE"), "{err}");
        env::remove_var("MAX_ARTICLES_PER_SOURCE");

        env::set_var("NOTIFY_VERIFICATION_LEVEL", "loud");
        assert!(load_config_default().is_err());
        env::remove_var("NOTIFY_VERIFICATION_LEVEL");

        env::set_var("FACTCHECK_CONFIDENCE_THRESHOLD", "1.5");
        assert!(load_config_default().is_err());
        env::remove_var("FACTCHECK_CONFIDENCE_THRESHOLD");

        let p = tmp.join("bad.toml");
        fs::write(&p, "[dedup]\noverall_threshold = 2.0\n").unwrap();
        env::set_var(ENV_PIPELINE_CONFIG_PATH, p.display().to_string());
        let err = format!("{:#}", load_config_default().unwrap_err());
        assert!(err.contains("overall_threshold"), "{err}");
    });
}

struct OneItem(Provenance);

#[async_trait]
impl SourceCollector for OneItem {
    fn provenance(&self) -> Provenance {
        self.0
    }

    async fn fetch(&self, _lookback: Duration, _max_items: usize) -> Result<Vec<Item>> {
        Ok(vec![Item::new(
            self.0,
            format!("{} story", self.0),
            format!("https://{}.example/1", self.0),
            100,
            Utc::now(),
        )])
    }
}

#[tokio::test]
async fn disabling_one_source_leaves_the_others_collecting() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("pipeline.toml");
    fs::write(&p, "[collection.sources.reddit]\nenabled = false\n").unwrap();
    let cfg = load_config_from(&p).unwrap();
    cfg.validate().unwrap();

    let collectors: Vec<Arc<dyn SourceCollector>> = Provenance::ALL
        .iter()
        .map(|p| Arc::new(OneItem(*p)) as Arc<dyn SourceCollector>)
        .collect();
    let (items, run) = collect(&collectors, &cfg.collection).await;

    assert_eq!(run.sources_attempted.len(), 2);
    assert!(!run.sources_attempted.contains(&Provenance::Reddit));
    assert_eq!(items.len(), 2);
}

#[serial_test::serial]
#[test]
fn env_toggle_on_a_source_missing_from_the_file_keeps_its_floor() {
    in_tmp_cwd(|tmp| {
        let p = tmp.join("only_hn.json");
        fs::write(&p, r#"{"collection": {"sources": {"hackernews": {"max_items": 3}}}}"#).unwrap();
        env::set_var(ENV_PIPELINE_CONFIG_PATH, p.display().to_string());
        env::set_var("ENABLE_GITHUB", "true");

        let c = load_config_default().unwrap();
        let gh = c.collection.sources[&Provenance::GitHub];
        assert!(gh.enabled);
        assert_eq!(gh.min_score, 10);
        assert_eq!(c.collection.sources[&Provenance::HackerNews].max_items, 3);
        assert!(c.collection.sources[&Provenance::Reddit].enabled);
    });
}
