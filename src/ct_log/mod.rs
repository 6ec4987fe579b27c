// src/ct_log/mod.rs
// RFC 6962 CT log protocol client

pub mod client;
pub mod types;

pub use client::CtLogClient;
pub use types::{GetEntriesResponse, LogEntry, SignedTreeHead};
