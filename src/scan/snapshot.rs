// src/scan/snapshot.rs
use anyhow::Context;
use std::path::PathBuf;

use super::planner::BatchJob;
use crate::ct_log::GetEntriesResponse;

/// Persists raw per-batch entry responses for offline replay.
///
/// One JSON file per executed batch; the filename is injective across
/// distinct windows of one log because no two jobs share a window. Never
/// read back during a live scan.
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create snapshot dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Deterministic filename keyed by (provider, sanitized log id, window)
    pub fn filename(provider: &str, log_id: &str, start: u64, end: u64) -> String {
        let clean_log_id = log_id.replace('/', "_");
        let clean_log_id = if clean_log_id.is_empty() {
            "root"
        } else {
            clean_log_id.as_str()
        };
        format!("{provider}_{clean_log_id}_{start}_{end}.json")
    }

    /// Write one batch's raw response, pretty-printed
    pub async fn write(&self, job: &BatchJob, response: &GetEntriesResponse) -> anyhow::Result<()> {
        let filename = Self::filename(
            &job.source.provider,
            &job.source.log_id,
            job.start,
            job.end,
        );
        let path = self.dir.join(filename);

        let data = serde_json::to_vec_pretty(response).context("failed to serialize entries")?;

        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        Ok(())
    }
}
