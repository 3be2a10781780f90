// src/config/mod.rs
pub mod pipeline;

pub use pipeline::{
    CollectionConfig, DedupConfig, NotifyConfig, PipelineConfig, SourceConfig, VerificationConfig,
};

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";

/// Load a pipeline config from an explicit path. Supports TOML or JSON.
pub fn load_config_from(path: &Path) -> Result<PipelineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading pipeline config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing pipeline config {}", path.display()))
}

/// Load config using env var + fallbacks, then apply env overrides and validate:
/// 1) $PIPELINE_CONFIG_PATH
/// 2) config/pipeline.toml
/// 3) config/pipeline.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<PipelineConfig> {
    let mut cfg = load_file_layer()?;
    cfg.apply_env_overrides()?;
    cfg.validate()?;
    Ok(cfg)
}

fn load_file_layer() -> Result<PipelineConfig> {
    if let Ok(p) = std::env::var(ENV_PIPELINE_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
        return Err(anyhow!("{ENV_PIPELINE_CONFIG_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/pipeline.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/pipeline.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(PipelineConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<PipelineConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    if hint_ext == "toml" {
        return Ok(toml::from_str(s)?);
    }
    // No usable extension: JSON objects start with '{', everything else is TOML.
    if s.trim_start().starts_with('{') {
        Ok(serde_json::from_str(s)?)
    } else {
        Ok(toml::from_str(s)?)
    }
}
