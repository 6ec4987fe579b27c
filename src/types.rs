// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single CT log as flattened from the provider registry.
///
/// Identity key is `(provider, log_id)`; the registry owns these values and
/// downstream stages only hold references or clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    pub provider: String,
    pub base_url: String,
    pub log_id: String,
    #[serde(default)]
    pub description: String,
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.log_id)
    }
}

/// Request body for POST /scan
#[derive(Debug, Default, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub cut_off_date: Option<String>,
}

/// Certificate attributes decoded from one log entry.
///
/// Decoding may fail independently per entry; a failed entry never aborts
/// its batch.
#[derive(Debug, Clone)]
pub struct DecodedCertificate {
    pub subject: Option<String>,
    pub issuer: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub sans: Vec<String>,
    pub fingerprint: String,
    pub is_precert: bool,
}

/// One domain discovered in one certificate at one log position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub log_id: String,
    pub provider: String,
    pub domain: String,
    pub issuer: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub fingerprint: String,
    pub index: u64,
}

/// Structured record of a partial failure surfaced in the scan summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanFailure {
    pub provider: String,
    pub log_id: String,
    /// Which stage failed: "tree_head" or "entries"
    pub stage: String,
    /// Error classification from [`ScanError::kind`](crate::error::ScanError::kind)
    pub kind: String,
    pub reason: String,
}

/// Summary returned to the caller once both scan phases have completed
#[derive(Debug, Serialize)]
pub struct ScanSummary {
    pub message: String,
    pub total_logs: usize,
    pub total_batches: usize,
    pub total_results: usize,
    pub window_size: u64,
    pub max_workers: usize,
    pub cut_off_date: DateTime<Utc>,
    pub failures: Vec<ScanFailure>,
    #[serde(skip)]
    pub results: Vec<ScanResult>,
}
