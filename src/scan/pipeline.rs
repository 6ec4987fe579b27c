// src/scan/pipeline.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::planner::BatchJob;
use crate::cert_parser::CertificateParser;
use crate::ct_log::LogEntry;
use crate::error::ScanError;
use crate::types::{DecodedCertificate, ScanResult};

/// Decodes one raw log entry into certificate attributes.
///
/// A pluggable seam: the orchestration core is testable with a stub decoder
/// and a real X.509 parser substitutes without touching scheduling logic.
pub trait EntryDecoder: Send + Sync {
    fn decode(&self, entry: &LogEntry) -> Result<DecodedCertificate, ScanError>;
}

/// Extracts candidate domains from a decoded certificate.
pub trait DomainExtractor: Send + Sync {
    fn extract(&self, cert: &DecodedCertificate) -> Vec<String>;
}

/// Production decoder backed by the RFC 6962 leaf parser
pub struct X509Decoder;

impl EntryDecoder for X509Decoder {
    fn decode(&self, entry: &LogEntry) -> Result<DecodedCertificate, ScanError> {
        CertificateParser::parse_log_entry(&entry.leaf_input, &entry.extra_data)
    }
}

/// SAN DNS names, deduplicated, falling back to the subject CN when the
/// certificate carries no SAN extension
pub struct SanExtractor;

impl DomainExtractor for SanExtractor {
    fn extract(&self, cert: &DecodedCertificate) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut domains: Vec<String> = cert
            .sans
            .iter()
            .filter(|d| seen.insert(d.to_lowercase()))
            .cloned()
            .collect();

        if domains.is_empty() {
            if let Some(cn) = &cert.subject {
                domains.push(cn.clone());
            }
        }

        domains
    }
}

/// Output of running one batch's entries through the pipeline
#[derive(Debug, Default)]
pub struct BatchOutput {
    pub results: Vec<ScanResult>,
    /// True once any entry's notBefore fell strictly before the cutoff;
    /// the log's remaining backward batches should be abandoned
    pub reached_cutoff: bool,
}

/// Decode + extract + cutoff policy for a single scan invocation
pub struct CertificatePipeline {
    decoder: Arc<dyn EntryDecoder>,
    extractor: Arc<dyn DomainExtractor>,
    cutoff: DateTime<Utc>,
}

impl CertificatePipeline {
    pub fn new(
        decoder: Arc<dyn EntryDecoder>,
        extractor: Arc<dyn DomainExtractor>,
        cutoff: DateTime<Utc>,
    ) -> Self {
        Self {
            decoder,
            extractor,
            cutoff,
        }
    }

    /// Process one batch of entries.
    ///
    /// A decode failure skips that entry only. An entry older than the
    /// cutoff is itself outside scan interest and sets the early-stop flag,
    /// but newer entries later in the same batch are still processed.
    pub fn process(&self, job: &BatchJob, entries: &[LogEntry]) -> BatchOutput {
        let mut output = BatchOutput::default();

        for (offset, entry) in entries.iter().enumerate() {
            let index = job.start + offset as u64;

            let cert = match self.decoder.decode(entry) {
                Ok(cert) => cert,
                Err(e) => {
                    warn!("[{}] Failed to decode entry at index {}: {}", job.source, index, e);
                    continue;
                }
            };

            if let Some(not_before) = cert.not_before {
                if not_before < self.cutoff {
                    debug!(
                        "[{}] Entry at index {} predates cutoff ({} < {})",
                        job.source, index, not_before, self.cutoff
                    );
                    output.reached_cutoff = true;
                    continue;
                }
            }

            for domain in self.extractor.extract(&cert) {
                output.results.push(ScanResult {
                    log_id: job.source.log_id.clone(),
                    provider: job.source.provider.clone(),
                    domain,
                    issuer: cert.issuer.clone(),
                    not_before: cert.not_before,
                    not_after: cert.not_after,
                    fingerprint: cert.fingerprint.clone(),
                    index,
                });
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogSource;
    use chrono::TimeZone;

    /// Decoder stub that maps leaf_input to a fixed certificate shape
    struct StubDecoder;

    impl EntryDecoder for StubDecoder {
        fn decode(&self, entry: &LogEntry) -> Result<DecodedCertificate, ScanError> {
            // leaf_input encodes "<domain>@<unix not_before>" or "fail"
            if entry.leaf_input == "fail" {
                return Err(ScanError::Decode("stub failure".to_string()));
            }
            let (domain, ts) = entry.leaf_input.split_once('@').unwrap();
            Ok(DecodedCertificate {
                subject: Some(domain.to_string()),
                issuer: Some("Stub CA".to_string()),
                not_before: Some(Utc.timestamp_opt(ts.parse().unwrap(), 0).unwrap()),
                not_after: None,
                sans: vec![domain.to_string()],
                fingerprint: "00".to_string(),
                is_precert: false,
            })
        }
    }

    fn job(start: u64, end: u64) -> BatchJob {
        BatchJob {
            source: Arc::new(LogSource {
                provider: "p".to_string(),
                base_url: "https://example.test".to_string(),
                log_id: "log".to_string(),
                description: String::new(),
            }),
            start,
            end,
        }
    }

    fn entry(leaf: &str) -> LogEntry {
        LogEntry {
            leaf_input: leaf.to_string(),
            extra_data: String::new(),
        }
    }

    fn pipeline(cutoff_ts: i64) -> CertificatePipeline {
        CertificatePipeline::new(
            Arc::new(StubDecoder),
            Arc::new(SanExtractor),
            Utc.timestamp_opt(cutoff_ts, 0).unwrap(),
        )
    }

    #[test]
    fn test_results_carry_log_position() {
        let p = pipeline(1_000);
        let out = p.process(
            &job(500, 501),
            &[entry("a.example@2000"), entry("b.example@2000")],
        );

        assert!(!out.reached_cutoff);
        assert_eq!(out.results.len(), 2);
        assert_eq!(out.results[0].domain, "a.example");
        assert_eq!(out.results[0].index, 500);
        assert_eq!(out.results[1].index, 501);
    }

    #[test]
    fn test_decode_failure_skips_entry_only() {
        let p = pipeline(1_000);
        let out = p.process(&job(0, 2), &[entry("fail"), entry("ok.example@2000")]);

        assert_eq!(out.results.len(), 1);
        assert_eq!(out.results[0].domain, "ok.example");
        assert_eq!(out.results[0].index, 1);
    }

    #[test]
    fn test_pre_cutoff_entry_sets_stop_and_is_dropped() {
        let p = pipeline(1_000);
        let out = p.process(
            &job(0, 1),
            &[entry("old.example@500"), entry("new.example@2000")],
        );

        assert!(out.reached_cutoff);
        // The old entry itself is dropped; the newer entry in the same
        // batch is still emitted.
        assert_eq!(out.results.len(), 1);
        assert_eq!(out.results[0].domain, "new.example");
    }

    #[test]
    fn test_missing_not_before_does_not_stop() {
        struct NoDateDecoder;
        impl EntryDecoder for NoDateDecoder {
            fn decode(&self, _: &LogEntry) -> Result<DecodedCertificate, ScanError> {
                Ok(DecodedCertificate {
                    subject: Some("undated.example".to_string()),
                    issuer: None,
                    not_before: None,
                    not_after: None,
                    sans: vec![],
                    fingerprint: "00".to_string(),
                    is_precert: false,
                })
            }
        }

        let p = CertificatePipeline::new(
            Arc::new(NoDateDecoder),
            Arc::new(SanExtractor),
            Utc::now(),
        );
        let out = p.process(&job(0, 0), &[entry("whatever")]);

        assert!(!out.reached_cutoff);
        // No SANs, so the subject CN is the fallback domain
        assert_eq!(out.results[0].domain, "undated.example");
    }

    #[test]
    fn test_san_extractor_dedupes_case_insensitively() {
        let cert = DecodedCertificate {
            subject: Some("cn.example".to_string()),
            issuer: None,
            not_before: None,
            not_after: None,
            sans: vec![
                "Example.COM".to_string(),
                "example.com".to_string(),
                "www.example.com".to_string(),
            ],
            fingerprint: String::new(),
            is_precert: false,
        };

        let domains = SanExtractor.extract(&cert);
        assert_eq!(domains.len(), 2);
        assert_eq!(domains[0], "Example.COM");
        assert_eq!(domains[1], "www.example.com");
    }
}
