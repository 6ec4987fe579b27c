// src/scan/mod.rs
// Scan orchestration: tree-head discovery, backward batch planning,
// bounded worker-pool execution, and result aggregation.

pub mod discovery;
pub mod engine;
pub mod executor;
pub mod pipeline;
pub mod planner;
pub mod snapshot;

pub use discovery::{discover_tree_heads, TreeHeadSnapshot};
pub use engine::ScanEngine;
pub use executor::{BatchExecutor, ExecutionOutcome};
pub use pipeline::{CertificatePipeline, DomainExtractor, EntryDecoder, SanExtractor, X509Decoder};
pub use planner::{plan_batches, BatchJob, BatchLimit};
pub use snapshot::SnapshotWriter;

use tokio::sync::watch;

/// Resolve once the scan-wide cancellation signal fires.
///
/// If the sender side is gone, cancellation can never fire; park forever so
/// a select against this future falls through to the real work.
pub(crate) async fn cancelled(shutdown_rx: &mut watch::Receiver<bool>) {
    if shutdown_rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
