// src/scan/discovery.rs
use futures_util::future::join_all;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::cancelled;
use crate::ct_log::{CtLogClient, SignedTreeHead};
use crate::error::ScanError;
use crate::types::LogSource;

/// One log's tree head as observed at the start of a scan.
///
/// Either a valid STH or the error that prevented fetching it; produced
/// exactly once per source per scan and immutable afterwards.
#[derive(Debug)]
pub struct TreeHeadSnapshot {
    pub source: LogSource,
    pub head: Result<SignedTreeHead, ScanError>,
}

/// Fan the tree-head fetch out across every source concurrently.
///
/// Fail-soft: a log's failure is captured in its snapshot and never aborts
/// the others. The returned vector always has the same length and order as
/// the input, and the call blocks until every fetch has returned.
pub async fn discover_tree_heads(
    http: &reqwest::Client,
    sources: &[LogSource],
    shutdown_rx: &watch::Receiver<bool>,
) -> Vec<TreeHeadSnapshot> {
    let fetches = sources.iter().map(|source| {
        let client = CtLogClient::new(http.clone(), source);
        let source = source.clone();
        let mut shutdown_rx = shutdown_rx.clone();

        async move {
            let head = if *shutdown_rx.borrow() {
                Err(ScanError::Cancelled)
            } else {
                tokio::select! {
                    res = client.get_sth() => res,
                    _ = cancelled(&mut shutdown_rx) => Err(ScanError::Cancelled),
                }
            };

            match &head {
                Ok(sth) => debug!("[{}] Tree size: {}", source, sth.tree_size),
                Err(e) => warn!("[{}] Tree-head fetch failed: {}", source, e),
            }

            TreeHeadSnapshot { source, head }
        }
    });

    join_all(fetches).await
}
