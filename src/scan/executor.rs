// src/scan/executor.rs
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::cancelled;
use super::pipeline::CertificatePipeline;
use super::planner::BatchJob;
use super::snapshot::SnapshotWriter;
use crate::ct_log::CtLogClient;
use crate::error::ScanError;
use crate::types::{ScanFailure, ScanResult};

/// Everything the execution phase produced: aggregated results plus the
/// structured record of every batch that was lost.
#[derive(Debug, Default)]
pub struct ExecutionOutcome {
    pub results: Vec<ScanResult>,
    pub failures: Vec<ScanFailure>,
}

/// Bounded worker pool over the planned job sequence.
///
/// A channel feeds `workers` persistent tasks; each pulls the next job,
/// fetches the window, optionally persists the raw response, and runs the
/// entries through the pipeline. No ordering guarantee between jobs; the
/// pool only guarantees every queued job is attempted once (or skipped once
/// its log crossed the cutoff or the scan was cancelled). One job's failure
/// never cancels its siblings.
pub struct BatchExecutor {
    http: reqwest::Client,
    workers: usize,
    fetch_retries: u32,
    pipeline: Arc<CertificatePipeline>,
    snapshots: Option<Arc<SnapshotWriter>>,
}

/// Key into the per-log early-stop set
type LogKey = (String, String);

impl BatchExecutor {
    pub fn new(
        http: reqwest::Client,
        workers: usize,
        fetch_retries: u32,
        pipeline: Arc<CertificatePipeline>,
        snapshots: Option<Arc<SnapshotWriter>>,
    ) -> Self {
        Self {
            http,
            workers: workers.max(1),
            fetch_retries,
            pipeline,
            snapshots,
        }
    }

    /// Run every planned job through the pool and drain the aggregation
    /// channel. Returns only after all workers have finished.
    pub async fn execute(
        &self,
        jobs: Vec<BatchJob>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> ExecutionOutcome {
        let total_jobs = jobs.len();
        if total_jobs == 0 {
            return ExecutionOutcome::default();
        }

        info!(
            "Executing {} batches with {} workers",
            total_jobs, self.workers
        );

        let (job_tx, job_rx) = mpsc::channel::<BatchJob>(self.workers * 2);
        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<ScanResult>(1000);
        let stop_set: Arc<Mutex<HashSet<LogKey>>> = Arc::new(Mutex::new(HashSet::new()));

        // Feed the queue in planned (interleaved) order; stop feeding on
        // cancellation so queued-but-unstarted work is dropped promptly.
        let feeder = {
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                for job in jobs {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    tokio::select! {
                        sent = job_tx.send(job) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                        _ = cancelled(&mut shutdown_rx) => break,
                    }
                }
            })
        };

        let mut worker_handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            let stop_set = Arc::clone(&stop_set);
            let pipeline = Arc::clone(&self.pipeline);
            let snapshots = self.snapshots.clone();
            let http = self.http.clone();
            let retries = self.fetch_retries;
            let mut shutdown_rx = shutdown_rx.clone();

            worker_handles.push(tokio::spawn(async move {
                let mut failures = Vec::new();

                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }

                    let job = {
                        let mut rx = job_rx.lock().await;
                        rx.recv().await
                    };
                    let Some(job) = job else { break };

                    let key: LogKey =
                        (job.source.provider.clone(), job.source.log_id.clone());
                    if stop_set.lock().unwrap().contains(&key) {
                        debug!(
                            "[{}] Skipping batch {}-{}: cutoff already reached",
                            job.source, job.start, job.end
                        );
                        continue;
                    }

                    debug!(
                        "[{}] Worker {} fetching entries {}-{}",
                        job.source, worker_id, job.start, job.end
                    );

                    let client = CtLogClient::new(http.clone(), &job.source);
                    let fetched = tokio::select! {
                        res = client.get_entries_with_retry(job.start, job.end, retries) => res,
                        _ = cancelled(&mut shutdown_rx) => Err(ScanError::Cancelled),
                    };

                    let response = match fetched {
                        Ok(response) => response,
                        Err(e) => {
                            warn!(
                                "[{}] Batch {}-{} failed: {}",
                                job.source, job.start, job.end, e
                            );
                            let was_cancelled = matches!(e, ScanError::Cancelled);
                            failures.push(ScanFailure {
                                provider: job.source.provider.clone(),
                                log_id: job.source.log_id.clone(),
                                stage: "entries".to_string(),
                                kind: e.kind().to_string(),
                                reason: e.to_string(),
                            });
                            if was_cancelled {
                                break;
                            }
                            continue;
                        }
                    };

                    if let Some(writer) = &snapshots {
                        if let Err(e) = writer.write(&job, &response).await {
                            warn!(
                                "[{}] Failed to persist snapshot for {}-{}: {}",
                                job.source, job.start, job.end, e
                            );
                        }
                    }

                    let output = pipeline.process(&job, &response.entries);

                    if output.reached_cutoff {
                        info!(
                            "[{}] Reached cutoff date, abandoning older batches",
                            job.source
                        );
                        stop_set.lock().unwrap().insert(key);
                    }

                    for result in output.results {
                        if result_tx.send(result).await.is_err() {
                            return failures;
                        }
                    }
                }

                failures
            }));
        }

        // The pool's join barrier owns channel closure: this original sender
        // is dropped now, the worker clones drop as each worker exits, and
        // the collector drains until the last one is gone.
        drop(result_tx);

        let collector = tokio::spawn(async move {
            let mut results = Vec::new();
            while let Some(result) = result_rx.recv().await {
                results.push(result);
            }
            results
        });

        let mut failures = Vec::new();
        for handle in worker_handles {
            match handle.await {
                Ok(worker_failures) => failures.extend(worker_failures),
                Err(e) => warn!("Worker task failed: {}", e),
            }
        }
        feeder.abort();

        let results = collector.await.unwrap_or_default();

        info!(
            "Execution finished: {} results, {} failed batches",
            results.len(),
            failures.len()
        );

        ExecutionOutcome { results, failures }
    }
}
