// Report Persistence
// Pluggable sink for finished reports, with a local JSON directory fallback

use crate::models::ComplianceReport;
use anyhow::Context;
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use tracing::info;

/// Append-only store for finished reports, keyed by document id. Callers own
/// report construction; a sink only records what it is given.
pub trait PersistenceSink: Send + Sync {
    fn store(&self, report: &ComplianceReport) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Writes each report as `{id}.json` under a local directory. Existing
/// reports are never rewritten.
pub struct LocalJsonSink {
    dir: PathBuf,
}

impl LocalJsonSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Default store location next to the config directory.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("compliscan").join("reports"))
    }

    pub fn report_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl PersistenceSink for LocalJsonSink {
    async fn store(&self, report: &ComplianceReport) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create report dir {}", self.dir.display()))?;

        let path = self.report_path(&report.id);
        if path.exists() {
            anyhow::bail!("report {} already stored", report.id);
        }

        let content = serde_json::to_string_pretty(report)
            .context("failed to serialize report")?;
        fs::write(&path, content)
            .with_context(|| format!("failed to write report {}", path.display()))?;

        info!("[PERSISTENCE] stored report {}", path.display());
        Ok(())
    }
}
