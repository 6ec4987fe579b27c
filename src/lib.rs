// src/lib.rs
// Library interface for ct-backscan
pub mod api;
pub mod cert_parser;
pub mod cli;
pub mod config;
pub mod ct_log;
pub mod error;
pub mod scan;
pub mod types;
