// src/ct_log/client.rs
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{GetEntriesResponse, SignedTreeHead};
use crate::error::ScanError;
use crate::types::LogSource;

/// Timeout for tree-head requests (small, cheap responses)
const STH_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for entry-range requests (bodies can run to megabytes)
const ENTRIES_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for one CT log's RFC 6962 API.
///
/// Holds no retry policy of its own beyond the explicit `_with_retry`
/// helpers; single-shot calls fail fast and the caller decides.
pub struct CtLogClient {
    base_url: String,
    log_id: String,
    http_client: reqwest::Client,
}

impl CtLogClient {
    /// Create a client for one log. The reqwest client is shared across all
    /// logs in a scan; cloning it is a cheap handle copy.
    pub fn new(http_client: reqwest::Client, source: &LogSource) -> Self {
        Self {
            base_url: source.base_url.trim_end_matches('/').to_string(),
            log_id: source.log_id.trim_matches('/').to_string(),
            http_client,
        }
    }

    /// Build a shared reqwest client with the settings every log fetch uses
    pub fn build_http_client() -> Result<reqwest::Client, ScanError> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .build()?;
        Ok(client)
    }

    fn endpoint(&self, path: &str) -> String {
        if self.log_id.is_empty() {
            format!("{}/ct/v1/{}", self.base_url, path)
        } else {
            format!("{}/{}/ct/v1/{}", self.base_url, self.log_id, path)
        }
    }

    /// Get Signed Tree Head (current log size and timestamp)
    /// Endpoint: GET {base_url}/{log_id}/ct/v1/get-sth
    pub async fn get_sth(&self) -> Result<SignedTreeHead, ScanError> {
        let url = self.endpoint("get-sth");

        debug!("Fetching STH from {}", url);

        let response = self
            .http_client
            .get(&url)
            .timeout(STH_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::Protocol { status, body });
        }

        let body = response.text().await?;
        let sth: SignedTreeHead = serde_json::from_str(&body)
            .map_err(|e| ScanError::Decode(format!("malformed STH response: {e}")))?;

        debug!(
            "STH received: tree_size={}, timestamp={}",
            sth.tree_size, sth.timestamp
        );

        Ok(sth)
    }

    /// Get an inclusive entry range from the log
    /// Endpoint: GET {base_url}/{log_id}/ct/v1/get-entries?start={start}&end={end}
    pub async fn get_entries(&self, start: u64, end: u64) -> Result<GetEntriesResponse, ScanError> {
        let url = format!("{}?start={}&end={}", self.endpoint("get-entries"), start, end);

        debug!("Fetching entries {}-{} from {}", start, end, self.base_url);

        let response = self
            .http_client
            .get(&url)
            .timeout(ENTRIES_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();

            if status == 429 {
                warn!("Rate limited by CT log: {}", self.base_url);
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::Protocol { status, body });
        }

        let body = response.text().await?;
        let entries: GetEntriesResponse = serde_json::from_str(&body)
            .map_err(|e| ScanError::Decode(format!("malformed entries response: {e}")))?;

        debug!(
            "Received {} entries from {}",
            entries.entries.len(),
            self.base_url
        );

        Ok(entries)
    }

    /// Get entries with `retries` extra attempts and exponential backoff.
    /// `retries == 0` means a single attempt.
    pub async fn get_entries_with_retry(
        &self,
        start: u64,
        end: u64,
        retries: u32,
    ) -> Result<GetEntriesResponse, ScanError> {
        let mut attempt = 0;
        let mut backoff = Duration::from_secs(1);

        loop {
            match self.get_entries(start, end).await {
                Ok(entries) => return Ok(entries),
                Err(e) => {
                    if attempt >= retries {
                        return Err(e);
                    }
                    attempt += 1;

                    warn!(
                        "Error fetching entries {}-{} (attempt {}/{}): {}. Retrying in {:?}",
                        start,
                        end,
                        attempt,
                        retries + 1,
                        e,
                        backoff
                    );

                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, Duration::from_secs(60));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(base_url: &str, log_id: &str) -> LogSource {
        LogSource {
            provider: "test".to_string(),
            base_url: base_url.to_string(),
            log_id: log_id.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_get_sth_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/argon/ct/v1/get-sth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tree_size": 2500,
                "timestamp": 1724700000000u64,
                "sha256_root_hash": "q83v",
                "tree_head_signature": "sig"
            })))
            .mount(&server)
            .await;

        let client = CtLogClient::new(
            CtLogClient::build_http_client().unwrap(),
            &source(&server.uri(), "argon"),
        );

        let sth = client.get_sth().await.unwrap();
        assert_eq!(sth.tree_size, 2500);
        assert_eq!(sth.sha256_root_hash, "q83v");
    }

    #[tokio::test]
    async fn test_get_sth_empty_log_id_rooted_at_base() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ct/v1/get-sth"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tree_size": 10,
                "timestamp": 1u64,
                "sha256_root_hash": "x"
            })))
            .mount(&server)
            .await;

        let client = CtLogClient::new(
            CtLogClient::build_http_client().unwrap(),
            &source(&server.uri(), ""),
        );

        assert_eq!(client.get_sth().await.unwrap().tree_size, 10);
    }

    #[tokio::test]
    async fn test_get_sth_non_success_is_protocol_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/argon/ct/v1/get-sth"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = CtLogClient::new(
            CtLogClient::build_http_client().unwrap(),
            &source(&server.uri(), "argon"),
        );

        match client.get_sth().await {
            Err(ScanError::Protocol { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("expected protocol error, got {:?}", other.map(|s| s.tree_size)),
        }
    }

    #[tokio::test]
    async fn test_get_sth_malformed_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/argon/ct/v1/get-sth"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = CtLogClient::new(
            CtLogClient::build_http_client().unwrap(),
            &source(&server.uri(), "argon"),
        );

        assert!(matches!(client.get_sth().await, Err(ScanError::Decode(_))));
    }

    #[tokio::test]
    async fn test_get_entries_passes_range() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/argon/ct/v1/get-entries"))
            .and(query_param("start", "1500"))
            .and(query_param("end", "2499"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "entries": [{"leaf_input": "AAA=", "extra_data": ""}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CtLogClient::new(
            CtLogClient::build_http_client().unwrap(),
            &source(&server.uri(), "argon"),
        );

        let resp = client.get_entries(1500, 2499).await.unwrap();
        assert_eq!(resp.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_get_entries_retry_then_success() {
        let server = MockServer::start().await;

        // First attempt fails, retry succeeds
        Mock::given(method("GET"))
            .and(path("/argon/ct/v1/get-entries"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/argon/ct/v1/get-entries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "entries": []
            })))
            .mount(&server)
            .await;

        let client = CtLogClient::new(
            CtLogClient::build_http_client().unwrap(),
            &source(&server.uri(), "argon"),
        );

        let resp = client.get_entries_with_retry(0, 9, 2).await.unwrap();
        assert!(resp.entries.is_empty());
    }

    #[tokio::test]
    async fn test_get_entries_zero_retries_fails_fast() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/argon/ct/v1/get-entries"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = CtLogClient::new(
            CtLogClient::build_http_client().unwrap(),
            &source(&server.uri(), "argon"),
        );

        assert!(client.get_entries_with_retry(0, 9, 0).await.is_err());
    }
}
