use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;

pub const ENV_METRICS_TEXTFILE: &str = "METRICS_TEXTFILE";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn install() -> Result<Self> {
        // Default buckets avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        crate::ingest::ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Exposition-format snapshot of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the snapshot for a node-exporter textfile collector.
    /// Goes through a sibling temp file so scrapers never see a partial write.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, self.render())
            .with_context(|| format!("writing metrics to {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("moving metrics into {}", path.display()))?;
        Ok(())
    }
}
