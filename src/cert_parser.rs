// src/cert_parser.rs
use base64::Engine;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::*;

use crate::error::ScanError;
use crate::types::DecodedCertificate;

/// Parses RFC 6962 log entries into certificate attributes.
///
/// Handles both x509_entry (type 0, certificate inside leaf_input) and
/// precert_entry (type 1, full precertificate inside extra_data).
pub struct CertificateParser;

impl CertificateParser {
    /// Parse a CT log entry from its base64 leaf_input and extra_data.
    pub fn parse_log_entry(
        base64_leaf_input: &str,
        base64_extra_data: &str,
    ) -> Result<DecodedCertificate, ScanError> {
        let leaf_bytes = base64::engine::general_purpose::STANDARD
            .decode(base64_leaf_input)
            .map_err(|e| ScanError::Decode(format!("bad base64 leaf_input: {e}")))?;

        if leaf_bytes.len() < 12 {
            return Err(ScanError::Decode(format!(
                "leaf_input too short: {} bytes",
                leaf_bytes.len()
            )));
        }

        // MerkleTreeLeaf entry type at bytes 10-11 (big-endian u16)
        let entry_type = ((leaf_bytes[10] as u16) << 8) | (leaf_bytes[11] as u16);

        match entry_type {
            0 => {
                // x509_entry: 3-byte length prefix at offset 12, DER follows
                if leaf_bytes.len() < 15 {
                    return Err(ScanError::Decode("x509_entry too short".to_string()));
                }

                let cert_len = ((leaf_bytes[12] as usize) << 16)
                    | ((leaf_bytes[13] as usize) << 8)
                    | (leaf_bytes[14] as usize);

                let end_pos = std::cmp::min(15 + cert_len, leaf_bytes.len());
                let cert_der = &leaf_bytes[15..end_pos];

                Self::decode_der(cert_der, false)
            }
            1 => {
                // precert_entry: leaf_input only carries the TBSCertificate;
                // the full precertificate lives at the front of extra_data
                let extra_bytes = base64::engine::general_purpose::STANDARD
                    .decode(base64_extra_data)
                    .map_err(|e| ScanError::Decode(format!("bad base64 extra_data: {e}")))?;

                if extra_bytes.len() < 3 {
                    return Err(ScanError::Decode(
                        "extra_data too short for precert_entry".to_string(),
                    ));
                }

                let precert_len = ((extra_bytes[0] as usize) << 16)
                    | ((extra_bytes[1] as usize) << 8)
                    | (extra_bytes[2] as usize);

                if extra_bytes.len() < 3 + precert_len {
                    return Err(ScanError::Decode(format!(
                        "extra_data truncated: expected {} bytes",
                        3 + precert_len
                    )));
                }

                let precert_der = &extra_bytes[3..3 + precert_len];

                Self::decode_der(precert_der, true)
            }
            other => Err(ScanError::Decode(format!("unknown entry type: {other}"))),
        }
    }

    /// Decode certificate attributes from DER bytes
    fn decode_der(der_bytes: &[u8], is_precert: bool) -> Result<DecodedCertificate, ScanError> {
        let fingerprint = {
            let mut hasher = Sha256::new();
            hasher.update(der_bytes);
            hex::encode(hasher.finalize())
        };

        let (_, cert) = X509Certificate::from_der(der_bytes)
            .map_err(|e| ScanError::Decode(format!("invalid X.509 DER: {e:?}")))?;

        let mut sans = Vec::new();
        for ext in cert.extensions() {
            if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                for general_name in &san.general_names {
                    if let GeneralName::DNSName(dns_name) = general_name {
                        sans.push(dns_name.to_string());
                    }
                }
            }
        }

        let subject = Self::common_name(cert.subject());
        let issuer = Self::common_name(cert.issuer())
            .or_else(|| Some(cert.issuer().to_string()));

        let not_before = DateTime::<Utc>::from_timestamp(cert.validity().not_before.timestamp(), 0);
        let not_after = DateTime::<Utc>::from_timestamp(cert.validity().not_after.timestamp(), 0);

        Ok(DecodedCertificate {
            subject,
            issuer,
            not_before,
            not_after,
            sans,
            fingerprint,
            is_precert,
        })
    }

    /// Extract the CN attribute from a distinguished name
    fn common_name(name: &X509Name) -> Option<String> {
        for rdn in name.iter() {
            for attr in rdn.iter() {
                if attr.attr_type() == &oid_registry::OID_X509_COMMON_NAME {
                    if let Ok(cn) = attr.attr_value().as_str() {
                        return Some(cn.to_string());
                    }
                }
            }
        }
        None
    }
}
