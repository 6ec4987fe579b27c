// src/scan/planner.rs
use std::sync::Arc;
use tracing::debug;

use super::discovery::TreeHeadSnapshot;
use crate::types::LogSource;

/// Ceiling on batches planned per log.
///
/// `Unbounded` makes the cutoff date the sole stopping condition: the plan
/// covers every window down to index 0 and the executor abandons a log's
/// remaining jobs once its walk crosses the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchLimit {
    Capped(u32),
    Unbounded,
}

impl BatchLimit {
    fn allows(self, batch_index: u32) -> bool {
        match self {
            BatchLimit::Capped(cap) => batch_index < cap,
            BatchLimit::Unbounded => true,
        }
    }
}

/// One inclusive entry window to fetch from one log. Ephemeral: lives only
/// for the duration of the scan that planned it.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub source: Arc<LogSource>,
    pub start: u64,
    pub end: u64,
}

/// Plan the backward walk over every successfully discovered log.
///
/// For tree size T and window W, batch k covers end = T-1-k*W and
/// start = max(0, end-W+1); a log stops producing batches once start hits 0
/// or the limit is reached. A zero window plans nothing (config validation
/// rejects it before a scan starts). Logs with a discovery error or an empty
/// tree are skipped entirely. The per-log sequences are then interleaved
/// round-robin so a concurrency-limited pool makes visible progress on every
/// log instead of exhausting one before starting the next.
pub fn plan_batches(
    snapshots: &[TreeHeadSnapshot],
    window: u64,
    limit: BatchLimit,
) -> Vec<BatchJob> {
    if window == 0 {
        debug!("No batches planned: window size is 0");
        return Vec::new();
    }

    let mut per_log: Vec<Vec<BatchJob>> = Vec::new();

    for snapshot in snapshots {
        let sth = match &snapshot.head {
            Ok(sth) => sth,
            Err(e) => {
                debug!("[{}] No batches planned: {}", snapshot.source, e);
                continue;
            }
        };

        if sth.tree_size == 0 {
            debug!("[{}] No batches planned: empty tree", snapshot.source);
            continue;
        }

        let source = Arc::new(snapshot.source.clone());
        let mut jobs = Vec::new();
        let mut end = sth.tree_size - 1;
        let mut batch_index: u32 = 0;

        loop {
            if !limit.allows(batch_index) {
                break;
            }

            let start = end.saturating_sub(window - 1);
            jobs.push(BatchJob {
                source: Arc::clone(&source),
                start,
                end,
            });

            if start == 0 {
                break;
            }
            batch_index += 1;
            end = start - 1;
        }

        per_log.push(jobs);
    }

    // Round-robin interleave: step i takes the i-th batch of every log that
    // still has one.
    let total: usize = per_log.iter().map(Vec::len).sum();
    let mut interleaved = Vec::with_capacity(total);
    let mut round = 0;

    loop {
        let mut emitted = false;
        for jobs in &per_log {
            if let Some(job) = jobs.get(round) {
                interleaved.push(job.clone());
                emitted = true;
            }
        }
        if !emitted {
            break;
        }
        round += 1;
    }

    interleaved
}
