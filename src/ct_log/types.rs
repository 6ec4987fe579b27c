// src/ct_log/types.rs
use serde::{Deserialize, Serialize};

/// Response from CT log's get-sth endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTreeHead {
    pub tree_size: u64,
    pub timestamp: u64,
    pub sha256_root_hash: String,
    #[serde(default)]
    pub tree_head_signature: String,
}

/// Single entry from CT log's get-entries endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub leaf_input: String,  // base64-encoded MerkleTreeLeaf
    pub extra_data: String,  // base64-encoded certificate chain
}

/// Response wrapper for get-entries endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetEntriesResponse {
    pub entries: Vec<LogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sth_missing_signature_defaults_empty() {
        let json = r#"{
            "tree_size": 123456,
            "timestamp": 1724700000000,
            "sha256_root_hash": "abc="
        }"#;

        let sth: SignedTreeHead = serde_json::from_str(json).unwrap();
        assert_eq!(sth.tree_size, 123456);
        assert_eq!(sth.timestamp, 1724700000000);
        assert_eq!(sth.tree_head_signature, "");
    }

    #[test]
    fn test_entries_response_roundtrip_shape() {
        let json = r#"{"entries": [{"leaf_input": "AAA=", "extra_data": ""}]}"#;
        let resp: GetEntriesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.entries.len(), 1);
        assert_eq!(resp.entries[0].leaf_input, "AAA=");
    }
}
