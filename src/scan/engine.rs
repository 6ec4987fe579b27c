// src/scan/engine.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use super::discovery::discover_tree_heads;
use super::executor::BatchExecutor;
use super::pipeline::{CertificatePipeline, DomainExtractor, EntryDecoder};
use super::planner::{plan_batches, BatchLimit};
use super::snapshot::SnapshotWriter;
use crate::config::ScanConfig;
use crate::ct_log::CtLogClient;
use crate::types::{LogSource, ScanFailure, ScanSummary};

/// The scan orchestration engine.
///
/// Owns the two strictly sequenced concurrency phases: unbounded tree-head
/// discovery fan-out, then bounded worker-pool batch execution. The registry
/// is injected at construction; there is no global accessor.
pub struct ScanEngine {
    config: ScanConfig,
    sources: Vec<LogSource>,
    http: reqwest::Client,
    decoder: Arc<dyn EntryDecoder>,
    extractor: Arc<dyn DomainExtractor>,
    snapshots: Option<Arc<SnapshotWriter>>,
}

impl ScanEngine {
    pub fn new(
        config: ScanConfig,
        sources: Vec<LogSource>,
        decoder: Arc<dyn EntryDecoder>,
        extractor: Arc<dyn DomainExtractor>,
    ) -> anyhow::Result<Self> {
        let http = CtLogClient::build_http_client()?;

        let snapshots = match &config.snapshot_dir {
            Some(dir) => Some(Arc::new(SnapshotWriter::new(dir)?)),
            None => None,
        };

        Ok(Self {
            config,
            sources,
            http,
            decoder,
            extractor,
            snapshots,
        })
    }

    pub fn sources(&self) -> &[LogSource] {
        &self.sources
    }

    /// Cutoff applied when the request does not carry one
    pub fn default_cutoff(&self) -> DateTime<Utc> {
        Utc::now() - ChronoDuration::days(self.config.default_cutoff_days)
    }

    /// Overall scan deadline, if configured
    pub fn scan_timeout(&self) -> Option<Duration> {
        self.config.scan_timeout_secs.map(Duration::from_secs)
    }

    /// Run one full scan: discover every log's tree head, plan the backward
    /// walk, execute it through the worker pool, and aggregate.
    ///
    /// Fail-soft throughout: once discovery has started there is no fatal
    /// error path, only partial results plus the structured failure list.
    pub async fn run(
        &self,
        cutoff: DateTime<Utc>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> ScanSummary {
        info!(
            "Starting CT log scan: {} logs, cutoff {}, window {}",
            self.sources.len(),
            cutoff,
            self.config.window_size
        );

        // Phase 1: tree-head discovery, fully barriered before planning
        let snapshots = discover_tree_heads(&self.http, &self.sources, &shutdown_rx).await;

        let mut failures: Vec<ScanFailure> = snapshots
            .iter()
            .filter_map(|snapshot| {
                snapshot.head.as_ref().err().map(|e| ScanFailure {
                    provider: snapshot.source.provider.clone(),
                    log_id: snapshot.source.log_id.clone(),
                    stage: "tree_head".to_string(),
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                })
            })
            .collect();

        let limit = match self.config.max_batches_per_log {
            Some(cap) => BatchLimit::Capped(cap),
            None => BatchLimit::Unbounded,
        };

        let jobs = plan_batches(&snapshots, self.config.window_size, limit);
        let total_batches = jobs.len();

        info!(
            "Discovery complete: {}/{} logs reachable, {} batches planned",
            snapshots.iter().filter(|s| s.head.is_ok()).count(),
            self.sources.len(),
            total_batches
        );

        // Phase 2: bounded worker-pool execution
        let pipeline = Arc::new(CertificatePipeline::new(
            Arc::clone(&self.decoder),
            Arc::clone(&self.extractor),
            cutoff,
        ));

        let executor = BatchExecutor::new(
            self.http.clone(),
            self.config.max_workers,
            self.config.fetch_retries,
            pipeline,
            self.snapshots.clone(),
        );

        let outcome = executor.execute(jobs, shutdown_rx).await;
        failures.extend(outcome.failures);

        info!(
            "Scan completed: {} results, {} failures",
            outcome.results.len(),
            failures.len()
        );

        ScanSummary {
            message: "Scan completed".to_string(),
            total_logs: self.sources.len(),
            total_batches,
            total_results: outcome.results.len(),
            window_size: self.config.window_size,
            max_workers: self.config.max_workers,
            cut_off_date: cutoff,
            failures,
            results: outcome.results,
        }
    }
}
